//! End-to-end flows through the directory, access checks and grant pruning

use std::{collections::BTreeSet, sync::Arc};

use users::{
    LibraryEvent, LibraryGrantSynchronizer, MemoryUserStore, UserDirectory, UserError, UserStore,
    can_access_library, visible_libraries,
};

const NO_ROLES: &[&str] = &[];

fn setup() -> (Arc<dyn UserStore>, UserDirectory, LibraryGrantSynchronizer) {
    let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    (
        store.clone(),
        UserDirectory::new(store.clone()),
        LibraryGrantSynchronizer::new(store),
    )
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[tokio::test]
async fn test_deleted_library_revokes_explicit_grant() {
    let (_, directory, synchronizer) = setup();

    let user = directory
        .create_user("user@example.org", NO_ROLES)
        .await
        .unwrap();
    let user = directory
        .update_library_grants(user.id, false, ids(&["lib1"]))
        .await
        .unwrap();

    assert!(can_access_library(&user, "lib1"));
    assert!(!can_access_library(&user, "lib2"));

    let report = synchronizer.on_library_deleted("lib1").await.unwrap();
    assert!(report.is_complete());

    let reloaded = directory.get_user(user.id).await.unwrap();
    assert!(!reloaded.shared_library_ids.contains("lib1"));
    assert!(!can_access_library(&reloaded, "lib1"));
}

#[tokio::test]
async fn test_two_users_are_listed_and_counted() {
    let (store, directory, _) = setup();

    directory
        .create_user("u1@example.org", NO_ROLES)
        .await
        .unwrap();
    directory
        .create_user("u2@example.org", NO_ROLES)
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 2);

    let emails: BTreeSet<String> = directory
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.email)
        .collect();
    assert_eq!(emails, ids(&["u1@example.org", "u2@example.org"]));
}

#[tokio::test]
async fn test_switching_modes_keeps_dormant_grants() {
    let (_, directory, _) = setup();
    let all = ids(&["lib1", "lib2", "lib3"]);

    let user = directory
        .create_user("user@example.org", NO_ROLES)
        .await
        .unwrap();
    let restricted = directory
        .update_library_grants(user.id, false, ids(&["lib2"]))
        .await
        .unwrap();
    assert_eq!(visible_libraries(&restricted, all.clone()), ids(&["lib2"]));

    let blanket = directory
        .update_library_grants(user.id, true, restricted.shared_library_ids.clone())
        .await
        .unwrap();
    assert_eq!(visible_libraries(&blanket, all.clone()), all);
    assert_eq!(blanket.shared_library_ids, ids(&["lib2"]));

    let promoted = directory
        .update_library_grants(user.id, false, blanket.shared_library_ids.clone())
        .await
        .unwrap();
    let promoted = directory.update_roles(promoted.id, &["ADMIN"]).await.unwrap();
    assert_eq!(visible_libraries(&promoted, all.clone()), all);
}

#[tokio::test]
async fn test_directory_and_store_disagree_on_missing_deletes() {
    let (store, directory, _) = setup();
    let missing = uuid::Uuid::new_v4();

    store.delete(missing).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);

    let result = directory.delete_user(missing).await;
    assert!(matches!(result, Err(UserError::NotFound(id)) if id == missing));
}

#[tokio::test]
async fn test_listener_prunes_on_queued_event() {
    let (_, directory, synchronizer) = setup();
    let user = directory
        .create_user("user@example.org", NO_ROLES)
        .await
        .unwrap();
    directory
        .update_library_grants(user.id, false, ids(&["lib1", "lib2"]))
        .await
        .unwrap();

    let (sender, receiver) = tokio::sync::mpsc::channel(4);
    let listener = synchronizer.listen(receiver);

    sender
        .send(LibraryEvent::Deleted("lib2".to_string()))
        .await
        .unwrap();
    drop(sender);
    listener.await.unwrap();

    let user = directory.get_user(user.id).await.unwrap();
    assert_eq!(user.shared_library_ids, ids(&["lib1"]));
}

#[tokio::test]
async fn test_back_to_back_deletions_leave_no_stale_grants() {
    let (_, directory, synchronizer) = setup();
    let user = directory
        .create_user("user@example.org", NO_ROLES)
        .await
        .unwrap();
    directory
        .update_library_grants(user.id, false, ids(&["lib1", "lib2"]))
        .await
        .unwrap();

    // A one-slot queue: the second deletion waits for the first to be taken.
    let (sender, receiver) = tokio::sync::mpsc::channel(1);
    let listener = synchronizer.listen(receiver);

    sender
        .send(LibraryEvent::Deleted("lib1".to_string()))
        .await
        .unwrap();
    sender
        .send(LibraryEvent::Deleted("lib2".to_string()))
        .await
        .unwrap();
    drop(sender);
    listener.await.unwrap();

    let user = directory.get_user(user.id).await.unwrap();
    assert!(user.shared_library_ids.is_empty());
}
