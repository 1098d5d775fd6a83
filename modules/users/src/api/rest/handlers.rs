use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    response::Json,
    Extension,
};
use tracing::{info, warn};

use crate::api::rest::dto::{CreateUserReq, DataEnvelope, MessageEnvelope, UserDto, UserListDto};
use crate::api::rest::error::ApiError;
use crate::domain::service::Service;

/// Liveness probe kept at the module's own prefix.
pub async fn ping() -> Json<MessageEnvelope> {
    Json(MessageEnvelope::success("pong!"))
}

/// List all users in creation order
pub async fn list_users(
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<DataEnvelope<UserListDto>>, ApiError> {
    info!("Listing users");

    let users = svc.list_users().await?;
    let users = users.into_iter().map(UserDto::from).collect();
    Ok(Json(DataEnvelope::success(UserListDto { users })))
}

/// Get a specific user by ID
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> Result<Json<DataEnvelope<UserDto>>, ApiError> {
    info!("Getting user with id: {}", id);

    let user = svc.get_user_by_key(&id).await?;
    Ok(Json(DataEnvelope::success(UserDto::from(user))))
}

/// Create a new user
pub async fn create_user(
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateUserReq>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageEnvelope>), ApiError> {
    let Json(req_body) = payload.inspect_err(|rejection| {
        warn!(status = %rejection.status(), "Create user payload rejected");
    })?;
    info!(
        has_username = req_body.username.is_some(),
        has_email = req_body.email.is_some(),
        "Creating user"
    );

    let user = svc.create_user(req_body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageEnvelope::success(format!("{} was added!", user.email))),
    ))
}
