//! Library access resolution
//!
//! Pure decisions over an already-loaded [`User`]: no store access, so every
//! call site resolves visibility the same way.

use std::collections::BTreeSet;

use crate::models::{LibraryId, User};

/// Effective library scope of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryAccess<'a> {
    /// Every library, either as administrator or through blanket access
    All,
    /// Only the explicitly granted libraries
    Only(&'a BTreeSet<LibraryId>),
}

impl User {
    /// Resolve the stored flags into an access mode. Explicit grants kept
    /// while blanket access is on are ignored here.
    pub fn library_access(&self) -> LibraryAccess<'_> {
        if self.is_administrator || self.shared_all_libraries {
            LibraryAccess::All
        } else {
            LibraryAccess::Only(&self.shared_library_ids)
        }
    }
}

impl LibraryAccess<'_> {
    pub fn allows(&self, library_id: &str) -> bool {
        match self {
            LibraryAccess::All => true,
            LibraryAccess::Only(granted) => granted.contains(library_id),
        }
    }
}

/// Whether `user` may see the library `library_id`
pub fn can_access_library(user: &User, library_id: &str) -> bool {
    user.library_access().allows(library_id)
}

/// The subset of `all_library_ids` visible to `user`
pub fn visible_libraries<I>(user: &User, all_library_ids: I) -> BTreeSet<LibraryId>
where
    I: IntoIterator<Item = LibraryId>,
{
    let access = user.library_access();
    all_library_ids
        .into_iter()
        .filter(|id| access.allows(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, user::now};
    use uuid::Uuid;

    fn libraries(ids: &[&str]) -> BTreeSet<LibraryId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn user(admin: bool, blanket: bool, grants: &[&str]) -> User {
        NewUser::new("user@example.org")
            .administrator(admin)
            .with_library_grants(blanket, libraries(grants))
            .into_user(Uuid::new_v4(), now())
    }

    #[test]
    fn test_administrator_sees_everything() {
        let admin = user(true, false, &[]);
        assert_eq!(admin.library_access(), LibraryAccess::All);
        assert!(can_access_library(&admin, "lib1"));

        let all = libraries(&["lib1", "lib2", "lib3"]);
        assert_eq!(visible_libraries(&admin, all.clone()), all);
    }

    #[test]
    fn test_blanket_access_ignores_dormant_grants() {
        let blanket = user(false, true, &["lib1"]);
        assert!(can_access_library(&blanket, "lib2"));

        let all = libraries(&["lib2", "lib3"]);
        assert_eq!(visible_libraries(&blanket, all.clone()), all);
    }

    #[test]
    fn test_restricted_user_sees_intersection() {
        let restricted = user(false, false, &["lib1", "lib4"]);
        assert!(can_access_library(&restricted, "lib1"));
        assert!(!can_access_library(&restricted, "lib2"));

        let visible = visible_libraries(&restricted, libraries(&["lib1", "lib2", "lib3"]));
        assert_eq!(visible, libraries(&["lib1"]));
    }

    #[test]
    fn test_restricted_user_without_grants_sees_nothing() {
        let restricted = user(false, false, &[]);
        assert!(!can_access_library(&restricted, "lib1"));
        assert!(visible_libraries(&restricted, libraries(&["lib1"])).is_empty());
    }
}
