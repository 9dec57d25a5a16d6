//! Library grant synchronization
//!
//! When the library owner removes a library, its id is pruned from the
//! explicit grants of every user so that a later library reusing the id does
//! not inherit stale access.

use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    error::{UserError, UserResult},
    models::{LibraryId, User, UserId},
    repositories::UserStore,
};

/// Notifications emitted by the library owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    Deleted(LibraryId),
}

/// Result of pruning one user's grants
#[derive(Debug)]
pub enum PruneOutcome {
    /// The grant was removed and the user saved
    Pruned(User),
    /// Nothing to do: the user or the grant disappeared in the meantime
    AlreadyAbsent(UserId),
    /// Saving this user failed; other users are unaffected
    Failed { user_id: UserId, error: UserError },
}

/// Per-user outcomes of one library deletion
#[derive(Debug)]
pub struct SyncReport {
    pub library_id: LibraryId,
    pub outcomes: Vec<PruneOutcome>,
}

impl SyncReport {
    pub fn pruned(&self) -> impl Iterator<Item = &User> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PruneOutcome::Pruned(user) => Some(user),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (UserId, &UserError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PruneOutcome::Failed { user_id, error } => Some((*user_id, error)),
            _ => None,
        })
    }

    /// True when no user update failed
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Removes grants to deleted libraries from every user
#[derive(Clone)]
pub struct LibraryGrantSynchronizer {
    store: Arc<dyn UserStore>,
}

impl LibraryGrantSynchronizer {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Prune `library_id` from all users holding an explicit grant to it.
    ///
    /// Only the initial lookup can fail the whole call; each user update is
    /// independent and reported in the returned [`SyncReport`]. Running it
    /// again for the same id is a no-op.
    pub async fn on_library_deleted(&self, library_id: &str) -> UserResult<SyncReport> {
        info!("Pruning grants to deleted library {}", library_id);

        let affected = self.store.find_by_library_id(library_id).await?;
        let mut outcomes = Vec::with_capacity(affected.len());

        for user in affected {
            let outcome = self.prune(user.id, library_id).await;
            if let PruneOutcome::Failed { user_id, error } = &outcome {
                warn!(
                    "Failed to prune library {} from user {}: {}",
                    library_id, user_id, error
                );
            }
            outcomes.push(outcome);
        }

        let report = SyncReport {
            library_id: library_id.to_string(),
            outcomes,
        };
        info!(
            "Pruned library {} from {} user(s), {} failure(s)",
            library_id,
            report.pruned().count(),
            report.failures().count()
        );

        Ok(report)
    }

    async fn prune(&self, user_id: UserId, library_id: &str) -> PruneOutcome {
        // Re-read so the write is based on the latest version of the user.
        let mut user = match self.store.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("User {} vanished before pruning", user_id);
                return PruneOutcome::AlreadyAbsent(user_id);
            }
            Err(error) => return PruneOutcome::Failed { user_id, error },
        };

        if !user.shared_library_ids.remove(library_id) {
            return PruneOutcome::AlreadyAbsent(user_id);
        }

        match self.store.update(&user).await {
            Ok(user) => PruneOutcome::Pruned(user),
            Err(UserError::NotFound(_)) => PruneOutcome::AlreadyAbsent(user_id),
            Err(error) => PruneOutcome::Failed { user_id, error },
        }
    }

    /// React to library events until every sender is dropped
    ///
    /// Events are queued on a bounded `mpsc` channel: a full queue makes
    /// senders wait instead of dropping deletions.
    pub fn listen(self, mut events: mpsc::Receiver<LibraryEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    LibraryEvent::Deleted(library_id) => {
                        if let Err(e) = self.on_library_deleted(&library_id).await {
                            error!("Failed to synchronize deleted library {}: {}", library_id, e);
                        }
                    }
                }
            }

            info!("Library event channel closed, stopping listener");
        })
    }
}
