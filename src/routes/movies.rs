use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{
        Account, CatalogMovieDetail, CatalogPage, CreateMovieRequest, DiscoverQuery, Genre,
        MovieFilter, MovieResponse,
    },
    routes::AppState,
    services::movies::{self, GenreSyncSummary},
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    /// Comma-separated catalog genre ids, e.g. `28,12`
    genre_ids: Option<String>,
    year: Option<i32>,
    min_rating: Option<f64>,
    page: Option<u32>,
}

impl From<DiscoverParams> for DiscoverQuery {
    fn from(params: DiscoverParams) -> Self {
        Self {
            genre_ids: movies::parse_genre_ids(params.genre_ids.as_deref()),
            year: params.year,
            min_rating: params.min_rating,
            page: params.page.unwrap_or(1).max(1),
        }
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MovieFilter>,
) -> AppResult<Json<Vec<MovieResponse>>> {
    let movies = movies::list_movies(state.repo.as_ref(), &filter).await?;
    Ok(Json(movies))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<MovieResponse>> {
    let movie = movies::get_movie(state.repo.as_ref(), id).await?;
    Ok(Json(movie))
}

pub async fn genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Genre>>> {
    let genres = movies::list_genres(state.repo.as_ref()).await?;
    Ok(Json(genres))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Json(request): Json<CreateMovieRequest>,
) -> AppResult<(StatusCode, Json<MovieResponse>)> {
    tracing::info!(request_id = %request_id, admin_id = account.id, title = %request.title, "Uploading movie");

    let movie = movies::create_movie(state.repo.as_ref(), &account, request).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn sync_genres(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
) -> AppResult<Json<GenreSyncSummary>> {
    tracing::info!(request_id = %request_id, admin_id = account.id, "Syncing genres");

    let summary =
        movies::sync_genres(state.repo.as_ref(), state.catalog.as_ref(), &account).await?;
    Ok(Json(summary))
}

pub async fn import(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(account): Extension<Account>,
    Path(tmdb_id): Path<i64>,
) -> AppResult<(StatusCode, Json<MovieResponse>)> {
    tracing::info!(request_id = %request_id, admin_id = account.id, tmdb_id = tmdb_id, "Importing movie");

    let movie =
        movies::import_movie(state.repo.as_ref(), state.catalog.as_ref(), &account, tmdb_id)
            .await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn tmdb_search(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<CatalogPage>> {
    tracing::info!(request_id = %request_id, query = ?params.q, "Searching catalog");

    let page = params.page.unwrap_or(1).max(1);
    let results = movies::search_catalog(state.catalog.as_ref(), params.q.as_deref(), page).await?;
    Ok(Json(results))
}

pub async fn tmdb_popular(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Json<CatalogPage> {
    Json(state.catalog.popular(params.page()).await)
}

pub async fn tmdb_top_rated(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Json<CatalogPage> {
    Json(state.catalog.top_rated(params.page()).await)
}

pub async fn tmdb_discover(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverParams>,
) -> Json<CatalogPage> {
    Json(movies::discover_catalog(state.catalog.as_ref(), params.into()).await)
}

pub async fn tmdb_detail(
    State(state): State<Arc<AppState>>,
    Path(tmdb_id): Path<i64>,
) -> AppResult<Json<CatalogMovieDetail>> {
    let detail = movies::catalog_detail(state.catalog.as_ref(), tmdb_id).await?;
    Ok(Json(detail))
}
