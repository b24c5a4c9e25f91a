//! # Viadro Test Suite
//!
//! End-to-end scenarios driving the full router in-process.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # TestApp: router + in-memory collaborators
//! └── integration/
//!     ├── e2e_scenario.rs   # register → activate → upload → access checks
//!     ├── users.rs          # registration, activation, login, deletion
//!     ├── documents.rs      # upload, visibility, listings, admin views
//!     └── cache.rs          # cache keys and invalidation over HTTP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p viadro-tests
//! cargo test -p viadro-tests integration::cache::
//! ```

pub mod harness;
