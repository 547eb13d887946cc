//! Tape Core
//!
//! Domain types, collaborator traits, and error handling shared by the Tape
//! storage backends and server.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `User`, `AudioRecord`, `ShareTicket` and their ids
//! - **Collaborator Traits**: `CredentialStore`, `AudioCatalog`, `TicketStore`
//! - **Clock**: injectable time source so expiry rules can be tested
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use tape_core::types::{AudioId, ShareTicket, UserId};
//!
//! let now = Utc::now();
//! let ticket = ShareTicket::new(AudioId::generate(), UserId::generate(), now, Duration::hours(6));
//!
//! assert!(!ticket.is_expired_at(now));
//! assert!(ticket.is_expired_at(now + Duration::hours(7)));
//! ```

#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod storage;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
pub use storage::{AudioCatalog, CredentialStore, TicketStore};
pub use types::{AudioId, AudioRecord, AudioUpdate, ShareTicket, TicketId, User, UserId};
