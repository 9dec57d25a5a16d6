//! User record storage
//!
//! The store is the single writer of `id`, `created_at` and `updated_at`, and
//! enforces case-insensitive email uniqueness as part of the write itself.

use async_trait::async_trait;

use crate::{
    error::UserResult,
    models::{NewUser, User, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Persistence contract for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user, assigning its id and timestamps.
    ///
    /// Fails with `DuplicateEmail` when the email is taken, ignoring case.
    async fn insert(&self, new_user: NewUser) -> UserResult<User>;

    /// Overwrite the stored record with `user`'s fields.
    ///
    /// `created_at` is kept from the stored record and `updated_at` is
    /// refreshed. Fails with `NotFound` for an unknown id and with
    /// `DuplicateEmail` when the email belongs to another user.
    async fn update(&self, user: &User) -> UserResult<User>;

    async fn find_by_id(&self, id: UserId) -> UserResult<Option<User>>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Case-insensitive existence check
    async fn exists_by_email(&self, email: &str) -> UserResult<bool>;

    /// Users whose explicit grants contain `library_id`
    async fn find_by_library_id(&self, library_id: &str) -> UserResult<Vec<User>>;

    /// Every user, in no particular order
    async fn find_all(&self) -> UserResult<Vec<User>>;

    async fn count(&self) -> UserResult<u64>;

    /// Remove a user; unknown ids are ignored
    async fn delete(&self, id: UserId) -> UserResult<()>;

    async fn delete_all(&self) -> UserResult<()>;
}
