use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Account, CreateReviewRequest, RatingSummary, Review, UpdateReviewRequest},
    routes::AppState,
    services::reviews,
};

/// 201 for a new review, 200 when the caller's existing review was overwritten
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Json(request): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    tracing::info!(request_id = %request_id, user_id = account.id, movie_id = request.movie, "Submitting review");

    let (review, created) = reviews::upsert_review(state.repo.as_ref(), &account, request).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(review)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateReviewRequest>,
) -> AppResult<Json<Review>> {
    tracing::info!(request_id = %request_id, user_id = account.id, review_id = id, "Updating review");

    let review = reviews::update_review(state.repo.as_ref(), &account, id, update).await?;
    Ok(Json(review))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    reviews::delete_review(state.repo.as_ref(), &account, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mine(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = reviews::reviews_by_user(state.repo.as_ref(), &account).await?;
    Ok(Json(reviews))
}

pub async fn for_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = reviews::reviews_for_movie(state.repo.as_ref(), movie_id).await?;
    Ok(Json(reviews))
}

pub async fn average(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<RatingSummary>> {
    let summary = reviews::average_rating(state.repo.as_ref(), movie_id).await?;
    Ok(Json(summary))
}
