use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Account, CatalogMovie, ChatMessage},
    routes::AppState,
    services::{
        chat::{self, ChatExchange, ChatRequest},
        recommendations::{
            RecommendationEngine, DEFAULT_LIMIT, DEFAULT_SIMILAR_LIMIT, MAX_LIMIT,
        },
    },
};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<CatalogMovie>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SimilarMoviesResponse {
    pub similar_movies: Vec<CatalogMovie>,
    pub count: usize,
}

pub async fn personalized(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    tracing::info!(request_id = %request_id, user_id = account.id, limit = limit, "Personalized recommendations");

    let recommendations = RecommendationEngine::new(state.repo.as_ref(), state.catalog.as_ref())
        .personalized(&account, limit)
        .await?;

    Ok(Json(RecommendationsResponse {
        count: recommendations.len(),
        recommendations,
    }))
}

pub async fn similar(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(movie_id): Path<i64>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<SimilarMoviesResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT).min(MAX_LIMIT);
    tracing::info!(request_id = %request_id, movie_id = movie_id, limit = limit, "Similar movies");

    let similar_movies = RecommendationEngine::new(state.repo.as_ref(), state.catalog.as_ref())
        .similar(movie_id, limit)
        .await?;

    Ok(Json(SimilarMoviesResponse {
        count: similar_movies.len(),
        similar_movies,
    }))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatExchange>> {
    tracing::info!(request_id = %request_id, user_id = account.id, "Chat message");

    let exchange = chat::send(
        state.repo.as_ref(),
        state.catalog.as_ref(),
        &account,
        request,
    )
    .await?;
    Ok(Json(exchange))
}

pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let messages = chat::history(state.repo.as_ref(), &account).await?;
    Ok(Json(messages))
}

pub async fn clear_chat(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> AppResult<StatusCode> {
    chat::clear(state.repo.as_ref(), &account).await?;
    Ok(StatusCode::NO_CONTENT)
}
