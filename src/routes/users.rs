use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Account, UserResponse},
    routes::AppState,
    services::users::{self, AdminUserUpdate},
};

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = users::list_users(state.repo.as_ref(), &account).await?;
    Ok(Json(users))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = users::get_user(state.repo.as_ref(), &account, id).await?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Path(id): Path<i64>,
    Json(update): Json<AdminUserUpdate>,
) -> AppResult<Json<UserResponse>> {
    tracing::info!(request_id = %request_id, admin_id = account.id, user_id = id, "Updating user");

    let user = users::update_user(state.repo.as_ref(), &account, id, update).await?;
    Ok(Json(user))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    tracing::info!(request_id = %request_id, admin_id = account.id, user_id = id, "Deleting user");

    users::delete_user(state.repo.as_ref(), &account, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
