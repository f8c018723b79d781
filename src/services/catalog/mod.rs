//! External movie catalog abstraction
//!
//! The catalog is the source of truth for movie metadata that has not been
//! mirrored locally. Implementations never fail: a missing API key, a
//! transport error, a non-2xx status or an undecodable body all come back as
//! an empty value, so callers degrade to "no results" instead of erroring.
use async_trait::async_trait;

use crate::models::{
    CatalogCredits, CatalogGenre, CatalogMovieDetail, CatalogPage, CatalogVideo, DiscoverQuery,
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

/// Cast names kept on enriched details
pub const MAX_ACTORS: usize = 10;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Full-text title search
    async fn search(&self, query: &str, page: u32) -> CatalogPage;

    async fn popular(&self, page: u32) -> CatalogPage;

    async fn top_rated(&self, page: u32) -> CatalogPage;

    /// Popularity-ordered discovery filtered by genres, year and minimum rating
    async fn discover(&self, query: DiscoverQuery) -> CatalogPage;

    /// Base details of one movie, `None` when unknown or unreachable
    async fn movie_details(&self, tmdb_id: i64) -> Option<CatalogMovieDetail>;

    /// YouTube trailers of one movie
    async fn movie_videos(&self, tmdb_id: i64) -> Vec<CatalogVideo>;

    /// Top-billed cast and the full crew
    async fn movie_credits(&self, tmdb_id: i64) -> CatalogCredits;

    /// The catalog's genre list
    async fn genres(&self) -> Vec<CatalogGenre>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Details with trailer, actors and director filled in
///
/// The three lookups run concurrently; missing videos or credits simply leave
/// the corresponding fields empty.
pub async fn enriched_details(
    catalog: &dyn MovieCatalog,
    tmdb_id: i64,
) -> Option<CatalogMovieDetail> {
    let (details, videos, credits) = tokio::join!(
        catalog.movie_details(tmdb_id),
        catalog.movie_videos(tmdb_id),
        catalog.movie_credits(tmdb_id),
    );

    let mut details = details?;
    details.trailer_url = videos.first().map(CatalogVideo::youtube_url);
    details.actors = credits
        .cast
        .iter()
        .take(MAX_ACTORS)
        .map(|c| c.name.clone())
        .collect();
    details.director = credits.director();

    Some(details)
}
