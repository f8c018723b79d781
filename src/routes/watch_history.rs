use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Account, WatchHistoryResponse},
    routes::AppState,
    services::watch_history::{self, AddWatchRequest, AddWatchResponse},
};

pub async fn add(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Json(request): Json<AddWatchRequest>,
) -> AppResult<Json<AddWatchResponse>> {
    tracing::info!(request_id = %request_id, user_id = account.id, movie_id = ?request.movie_id, "Adding to watch history");

    let response = watch_history::add(state.repo.as_ref(), &account, request).await?;
    Ok(Json(response))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> AppResult<Json<Vec<WatchHistoryResponse>>> {
    let entries = watch_history::list(state.repo.as_ref(), &account).await?;
    Ok(Json(entries))
}
