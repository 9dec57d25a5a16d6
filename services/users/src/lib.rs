//! Users service for the Joy Kunga application
//!
//! Owns user identities and decides which media libraries each user may
//! see. Libraries themselves belong to another service; this crate only
//! references their ids and prunes grants when a library is deleted.

pub mod access;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod settings;
pub mod state;
pub mod sync;
pub mod validation;

pub use access::{LibraryAccess, can_access_library, visible_libraries};
pub use directory::UserDirectory;
pub use error::{UserError, UserResult};
pub use repositories::{MemoryUserStore, PgUserStore, UserStore};
pub use sync::{LibraryEvent, LibraryGrantSynchronizer, PruneOutcome, SyncReport};
