//! Users service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    credentials,
    error::{ApiError, ApiResult},
    models::{
        LibrariesDeletedDto, LibraryDeletedDto, PasswordUpdateDto, RolesUpdateDto, SharedLibrariesUpdateDto,
        SyncReportDto, UserCreationDto, UserDto, UserWithSharedLibrariesDto,
    },
    state::AppState,
    sync::LibraryEvent,
    validation,
};

/// Create the router for the users service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/users", get(get_users).post(create_user))
        .route(
            "/api/v1/users/:id",
            get(get_user).patch(update_roles).delete(delete_user),
        )
        .route("/api/v1/users/:id/password", patch(update_password))
        .route(
            "/api/v1/users/:id/shared-libraries",
            patch(update_shared_libraries),
        )
        .route("/api/v1/events/library-deleted", post(library_deleted))
        .route("/api/v1/events/libraries-deleted", post(libraries_deleted))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "users-service"
    }))
}

/// List all users with their library grants
pub async fn get_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state.directory.list_users().await?;

    let users: Vec<UserWithSharedLibrariesDto> = users.iter().map(Into::into).collect();
    Ok(Json(users))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state.directory.get_user(id).await?;

    Ok(Json(UserWithSharedLibrariesDto::from(&user)))
}

/// Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserCreationDto>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_email(&payload.email).map_err(ApiError::BadRequest)?;

    let user = state
        .directory
        .create_user(&payload.email, &payload.roles)
        .await?;

    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

/// Delete a user
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.directory.delete_user(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Replace a user's roles
pub async fn update_roles(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RolesUpdateDto>,
) -> ApiResult<impl IntoResponse> {
    state.directory.update_roles(id, &payload.roles).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Set a user's password
pub async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PasswordUpdateDto>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_password(&payload.password).map_err(ApiError::BadRequest)?;

    let password_hash = credentials::hash_password(&payload.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::InternalServerError
    })?;

    state.directory.update_credential(id, password_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Replace a user's library grants
pub async fn update_shared_libraries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SharedLibrariesUpdateDto>,
) -> ApiResult<impl IntoResponse> {
    state
        .directory
        .update_library_grants(id, payload.all, payload.library_ids)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Library owner notification: prune grants to a deleted library
pub async fn library_deleted(
    State(state): State<AppState>,
    Json(payload): Json<LibraryDeletedDto>,
) -> ApiResult<impl IntoResponse> {
    info!("Received deletion of library {}", payload.library_id);

    let report = state
        .synchronizer
        .on_library_deleted(&payload.library_id)
        .await?;

    Ok(Json(SyncReportDto::from(&report)))
}

/// Queue several library deletions for the background listener
pub async fn libraries_deleted(
    State(state): State<AppState>,
    Json(payload): Json<LibrariesDeletedDto>,
) -> ApiResult<impl IntoResponse> {
    info!("Queueing {} library deletion(s)", payload.library_ids.len());

    for library_id in payload.library_ids {
        state
            .library_events
            .send(LibraryEvent::Deleted(library_id))
            .await
            .map_err(|e| {
                error!("Library event listener is gone: {}", e);
                ApiError::InternalServerError
            })?;
    }

    Ok(StatusCode::ACCEPTED)
}
