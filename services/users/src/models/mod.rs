//! User service models

pub mod dto;
pub mod user;

// Re-export for convenience
pub use dto::{
    LibrariesDeletedDto, LibraryDeletedDto, PasswordUpdateDto, RolesUpdateDto, SharedLibrariesUpdateDto,
    SharedLibraryDto, SyncReportDto, UserCreationDto, UserDto, UserWithSharedLibrariesDto,
};
pub use user::{LibraryId, NewUser, Role, User, UserId};
