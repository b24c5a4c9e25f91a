//! Adapters for the document API.
//!
//! In-process implementations of the outbound ports.

pub mod cache_store;
pub mod clock;
mod error_conversions;
pub mod mailer;
pub mod memory;
pub mod object_store;

pub use cache_store::InMemoryCacheStore;
pub use clock::{ManualClock, SystemTimeSource};
pub use mailer::{extract_activation_token, welcome_email, LogMailer, MemoryMailer};
pub use memory::{InMemoryDocumentRepository, InMemoryTokenRepository, InMemoryUserRepository};
pub use object_store::{FsObjectStore, InMemoryObjectStore};
