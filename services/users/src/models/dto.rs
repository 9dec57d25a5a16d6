//! Request and response payloads exposed over HTTP

use serde::{Deserialize, Serialize};

use super::user::{LibraryId, Role, User, UserId};
use crate::sync::{PruneOutcome, SyncReport};

/// Minimal identity view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub email: String,
    pub roles: Vec<Role>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles(),
        }
    }
}

/// Identity view extended with the library grant state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithSharedLibrariesDto {
    pub id: UserId,
    pub email: String,
    pub roles: Vec<Role>,
    pub shared_all_libraries: bool,
    pub shared_libraries: Vec<SharedLibraryDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLibraryDto {
    pub id: LibraryId,
}

impl From<&User> for UserWithSharedLibrariesDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles(),
            shared_all_libraries: user.shared_all_libraries,
            shared_libraries: user
                .shared_library_ids
                .iter()
                .map(|id| SharedLibraryDto { id: id.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreationDto {
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordUpdateDto {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLibrariesUpdateDto {
    pub all: bool,
    #[serde(default)]
    pub library_ids: Vec<LibraryId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolesUpdateDto {
    pub roles: Vec<String>,
}

/// Notification sent by the library owner after a library is removed
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDeletedDto {
    pub library_id: LibraryId,
}

/// Batch of library removals, queued for background pruning
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrariesDeletedDto {
    pub library_ids: Vec<LibraryId>,
}

/// Summary of a grant synchronization run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReportDto {
    pub library_id: LibraryId,
    pub pruned: Vec<UserId>,
    pub unchanged: Vec<UserId>,
    pub failed: Vec<FailedPruneDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPruneDto {
    pub user_id: UserId,
    pub error: String,
}

impl From<&SyncReport> for SyncReportDto {
    fn from(report: &SyncReport) -> Self {
        let mut dto = Self {
            library_id: report.library_id.clone(),
            pruned: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
        };

        for outcome in &report.outcomes {
            match outcome {
                PruneOutcome::Pruned(user) => dto.pruned.push(user.id),
                PruneOutcome::AlreadyAbsent(user_id) => dto.unchanged.push(*user_id),
                PruneOutcome::Failed { user_id, error } => dto.failed.push(FailedPruneDto {
                    user_id: *user_id,
                    error: error.to_string(),
                }),
            }
        }

        dto
    }
}
