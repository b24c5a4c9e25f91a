//! # Ports Layer
//!
//! - `outbound.rs` - Driven ports (stores, object storage, mail, clock)

pub mod outbound;

pub use outbound::*;
