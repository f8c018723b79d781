use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::Repository,
    middleware::{
        auth::auth_middleware,
        request_id::{make_span_with_request_id, request_id_middleware},
    },
    services::{auth::TokenService, catalog::MovieCatalog},
};

pub mod accounts;
pub mod movies;
pub mod recommendations;
pub mod reviews;
pub mod users;
pub mod watch_history;

/// Shared handles every handler works through
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub catalog: Arc<dyn MovieCatalog>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        catalog: Arc<dyn MovieCatalog>,
        tokens: TokenService,
    ) -> Self {
        Self {
            repo,
            catalog,
            tokens,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public_routes().merge(protected_routes(state.clone())))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// Routes reachable without a token
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register/", post(accounts::register))
        .route("/login/", post(accounts::login))
        .route("/token/refresh/", post(accounts::refresh))
        .route("/movies/", get(movies::list))
        .route("/movies/genres/", get(movies::genres))
        .route("/movies/:id/", get(movies::detail))
        .route("/movies/tmdb/search/", get(movies::tmdb_search))
        .route("/movies/tmdb/popular/", get(movies::tmdb_popular))
        .route("/movies/tmdb/top-rated/", get(movies::tmdb_top_rated))
        .route("/movies/tmdb/discover/", get(movies::tmdb_discover))
        .route("/movies/tmdb/:tmdb_id/", get(movies::tmdb_detail))
        .route("/reviews/movie/:movie_id/", get(reviews::for_movie))
        .route("/reviews/movie/:movie_id/average/", get(reviews::average))
}

/// Routes behind the bearer-token middleware; admin checks happen in the services
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/", get(accounts::current_user))
        .route("/preferences/", get(accounts::preferences))
        .route(
            "/preferences/update/",
            put(accounts::update_preferences).patch(accounts::update_preferences),
        )
        // Admin user management
        .route("/users/", get(users::list))
        .route("/users/:id/", get(users::detail))
        .route("/users/:id/update/", put(users::update).patch(users::update))
        .route("/users/:id/delete/", delete(users::remove))
        // Catalog administration
        .route("/movies/create/", post(movies::create))
        .route("/movies/genres/sync/", post(movies::sync_genres))
        .route("/movies/tmdb/:tmdb_id/import/", post(movies::import))
        // Watch history
        .route("/movies/watch-history/", get(watch_history::list))
        .route("/movies/watch-history/add/", post(watch_history::add))
        // Reviews
        .route("/reviews/", post(reviews::create))
        .route("/reviews/my-reviews/", get(reviews::mine))
        .route("/reviews/:id/", put(reviews::update).patch(reviews::update))
        .route("/reviews/:id/delete/", delete(reviews::remove))
        // Recommendations and chat
        .route("/recommendations/", get(recommendations::personalized))
        .route(
            "/recommendations/similar/:movie_id/",
            get(recommendations::similar),
        )
        .route("/recommendations/chat/", post(recommendations::chat))
        .route(
            "/recommendations/chat/history/",
            get(recommendations::chat_history).delete(recommendations::clear_chat),
        )
        .route(
            "/recommendations/chat/history/clear/",
            delete(recommendations::clear_chat),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
