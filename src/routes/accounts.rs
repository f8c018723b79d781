use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Account, PreferenceResponse, PreferenceUpdate, UserResponse},
    routes::AppState,
    services::{
        accounts::{
            self, AccessToken, LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse,
        },
        auth::TokenPair,
    },
};

pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    tracing::info!(request_id = %request_id, username = %request.username, "Registration attempt");

    let response = accounts::register(state.repo.as_ref(), &state.tokens, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    tracing::info!(request_id = %request_id, username = %request.username, "Login attempt");

    let tokens = accounts::login(state.repo.as_ref(), &state.tokens, request).await?;
    Ok(Json(tokens))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> AppResult<Json<AccessToken>> {
    let access = accounts::refresh(state.repo.as_ref(), &state.tokens, request).await?;
    Ok(Json(access))
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> AppResult<Json<UserResponse>> {
    let user = accounts::current_user(state.repo.as_ref(), &account).await?;
    Ok(Json(user))
}

pub async fn preferences(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> AppResult<Json<PreferenceResponse>> {
    let preference = accounts::get_preferences(state.repo.as_ref(), &account).await?;
    Ok(Json(preference))
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Json(update): Json<PreferenceUpdate>,
) -> AppResult<Json<PreferenceResponse>> {
    tracing::info!(request_id = %request_id, user_id = account.id, "Updating preferences");

    let preference = accounts::update_preferences(state.repo.as_ref(), &account, update).await?;
    Ok(Json(preference))
}
