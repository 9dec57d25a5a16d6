//! User directory: identity and authorization operations for the API layer

use std::{collections::BTreeSet, sync::Arc};
use tracing::info;

use crate::{
    access,
    error::{UserError, UserResult},
    models::{LibraryId, NewUser, Role, User, UserId},
    repositories::UserStore,
};

/// Orchestrates the user store and access resolution
///
/// Each targeted update re-reads the latest stored record right before
/// writing, so it only overwrites the field it is responsible for.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Create a user with the given roles; the credential is set separately
    pub async fn create_user<S: AsRef<str>>(&self, email: &str, roles: &[S]) -> UserResult<User> {
        let roles = Role::parse_all(roles)?;

        let user = self
            .store
            .insert(NewUser::new(email).administrator(roles.contains(&Role::Admin)))
            .await?;

        info!("Created user {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> UserResult<User> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    pub async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        self.store.find_by_email(email).await
    }

    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        self.store.find_all().await
    }

    pub async fn update_credential(&self, id: UserId, secret: String) -> UserResult<User> {
        let mut user = self.get_user(id).await?;
        user.credential_secret = secret;

        let user = self.store.update(&user).await?;
        info!("Updated credential of user {}", id);
        Ok(user)
    }

    pub async fn update_roles<S: AsRef<str>>(&self, id: UserId, roles: &[S]) -> UserResult<User> {
        let roles = Role::parse_all(roles)?;

        let mut user = self.get_user(id).await?;
        user.is_administrator = roles.contains(&Role::Admin);

        let user = self.store.update(&user).await?;
        info!("Updated roles of user {}: {:?}", id, user.roles());
        Ok(user)
    }

    /// Switch between blanket and explicit access and replace the explicit
    /// grant set
    pub async fn update_library_grants(
        &self,
        id: UserId,
        shared_all_libraries: bool,
        shared_library_ids: impl IntoIterator<Item = LibraryId>,
    ) -> UserResult<User> {
        let shared_library_ids: BTreeSet<LibraryId> = shared_library_ids.into_iter().collect();

        let mut user = self.get_user(id).await?;
        user.shared_all_libraries = shared_all_libraries;
        user.shared_library_ids = shared_library_ids;

        let user = self.store.update(&user).await?;
        info!(
            "Updated library grants of user {}: all={}, libraries={:?}",
            id, user.shared_all_libraries, user.shared_library_ids
        );
        Ok(user)
    }

    /// Delete a user; unlike the store, an unknown id is an error here
    pub async fn delete_user(&self, id: UserId) -> UserResult<()> {
        let user = self.get_user(id).await?;
        self.store.delete(user.id).await?;

        info!("Deleted user {} ({})", user.id, user.email);
        Ok(())
    }

    pub async fn can_access_library(&self, id: UserId, library_id: &str) -> UserResult<bool> {
        let user = self.get_user(id).await?;
        Ok(access::can_access_library(&user, library_id))
    }

    pub async fn visible_libraries(
        &self,
        id: UserId,
        all_library_ids: impl IntoIterator<Item = LibraryId>,
    ) -> UserResult<BTreeSet<LibraryId>> {
        let user = self.get_user(id).await?;
        Ok(access::visible_libraries(&user, all_library_ids))
    }
}
