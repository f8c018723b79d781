/// TMDb catalog client
///
/// Every endpoint is a GET against `{base_url}{endpoint}` carrying `api_key`
/// and `language=en-US`. Responses are normalized into the crate's catalog
/// types, with image paths joined onto the configured image base URL.
///
/// API Flow:
/// 1. Listing: /search/movie, /movie/popular, /movie/top_rated, /discover/movie
/// 2. Detail: /movie/{id}, /movie/{id}/videos, /movie/{id}/credits
/// 3. Genres: /genre/movie/list
use crate::{
    config::Config,
    models::{
        catalog::{TmdbGenreList, TmdbMovieDetail, TmdbPage, TmdbVideoList},
        CatalogCredits, CatalogGenre, CatalogMovieDetail, CatalogPage, CatalogVideo,
        DiscoverQuery,
    },
    services::catalog::{MovieCatalog, MAX_ACTORS},
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    image_base_url: String,
}

impl TmdbCatalog {
    /// Creates a client whose every request is bounded by `timeout`
    pub fn new(
        api_key: Option<String>,
        api_url: String,
        image_base_url: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: api_url.trim_end_matches('/').to_string(),
            image_base_url,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.tmdb_api_key.clone(),
            config.tmdb_base_url.clone(),
            config.tmdb_image_base_url.clone(),
            Duration::from_secs(config.tmdb_timeout_secs),
        )
    }

    /// Issues one GET and decodes the body, or `None` on any failure
    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Option<T> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(endpoint = %endpoint, "TMDb API key not configured");
            return None;
        };

        let url = format!("{}{}", self.api_url, endpoint);
        let response = match self
            .http_client
            .get(&url)
            .query(&[("api_key", api_key), ("language", "en-US")])
            .query(params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "TMDb request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                endpoint = %endpoint,
                status = %response.status(),
                "TMDb API returned an error status"
            );
            return None;
        }

        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Failed to decode TMDb response");
                None
            }
        }
    }

    async fn page(&self, endpoint: &str, params: &[(&str, String)], page: u32) -> CatalogPage {
        match self.get::<TmdbPage>(endpoint, params).await {
            Some(raw) => raw.into_catalog(&self.image_base_url),
            None => CatalogPage::empty(page),
        }
    }
}

/// Query parameters for the discovery endpoint
fn discover_params(query: &DiscoverQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("sort_by", "popularity.desc".to_string()),
        ("page", query.page.to_string()),
    ];

    if !query.genre_ids.is_empty() {
        let genres = query
            .genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        params.push(("with_genres", genres));
    }
    if let Some(year) = query.year {
        params.push(("primary_release_year", year.to_string()));
    }
    if let Some(min_rating) = query.min_rating {
        params.push(("vote_average.gte", min_rating.to_string()));
    }

    params
}

fn youtube_trailers(videos: Vec<CatalogVideo>) -> Vec<CatalogVideo> {
    videos
        .into_iter()
        .filter(|v| v.site == "YouTube" && v.video_type == "Trailer")
        .collect()
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbCatalog {
    async fn search(&self, query: &str, page: u32) -> CatalogPage {
        let params = [("query", query.to_string()), ("page", page.to_string())];
        let results = self.page("/search/movie", &params, page).await;

        tracing::info!(
            query = %query,
            results_count = results.results.len(),
            "TMDb search completed"
        );

        results
    }

    async fn popular(&self, page: u32) -> CatalogPage {
        self.page("/movie/popular", &[("page", page.to_string())], page)
            .await
    }

    async fn top_rated(&self, page: u32) -> CatalogPage {
        self.page("/movie/top_rated", &[("page", page.to_string())], page)
            .await
    }

    async fn discover(&self, query: DiscoverQuery) -> CatalogPage {
        let params = discover_params(&query);
        self.page("/discover/movie", &params, query.page).await
    }

    async fn movie_details(&self, tmdb_id: i64) -> Option<CatalogMovieDetail> {
        self.get::<TmdbMovieDetail>(&format!("/movie/{}", tmdb_id), &[])
            .await
            .map(|raw| raw.into_catalog(&self.image_base_url))
    }

    async fn movie_videos(&self, tmdb_id: i64) -> Vec<CatalogVideo> {
        self.get::<TmdbVideoList>(&format!("/movie/{}/videos", tmdb_id), &[])
            .await
            .map(|list| youtube_trailers(list.results))
            .unwrap_or_default()
    }

    async fn movie_credits(&self, tmdb_id: i64) -> CatalogCredits {
        let mut credits = self
            .get::<CatalogCredits>(&format!("/movie/{}/credits", tmdb_id), &[])
            .await
            .unwrap_or_default();
        credits.cast.truncate(MAX_ACTORS);
        credits
    }

    async fn genres(&self) -> Vec<CatalogGenre> {
        self.get::<TmdbGenreList>("/genre/movie/list", &[])
            .await
            .map(|list| list.genres)
            .unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "TMDb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(api_key: Option<&str>) -> TmdbCatalog {
        TmdbCatalog::new(
            api_key.map(str::to_string),
            "https://api.themoviedb.org/3/".to_string(),
            "https://image.tmdb.org/t/p/w500".to_string(),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    #[test]
    fn test_catalog_creation() {
        let catalog = catalog(Some("test_key"));
        assert_eq!(catalog.name(), "TMDb");
        assert_eq!(catalog.api_url, "https://api.themoviedb.org/3");
        assert_eq!(catalog.api_key.as_deref(), Some("test_key"));
    }

    #[test]
    fn test_blank_api_key_treated_as_missing() {
        assert!(catalog(Some("  ")).api_key.is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_yields_empty_results() {
        let catalog = catalog(None);

        assert!(catalog.popular(1).await.is_empty());
        assert_eq!(catalog.search("matrix", 3).await.page, 3);
        assert!(catalog.movie_details(603).await.is_none());
        assert!(catalog.movie_videos(603).await.is_empty());
        assert!(catalog.genres().await.is_empty());
    }

    #[test]
    fn test_discover_params() {
        let query = DiscoverQuery {
            genre_ids: vec![28, 12],
            year: Some(1999),
            min_rating: Some(7.5),
            page: 2,
        };
        let params = discover_params(&query);

        assert!(params.contains(&("sort_by", "popularity.desc".to_string())));
        assert!(params.contains(&("with_genres", "28,12".to_string())));
        assert!(params.contains(&("primary_release_year", "1999".to_string())));
        assert!(params.contains(&("vote_average.gte", "7.5".to_string())));
        assert!(params.contains(&("page", "2".to_string())));
    }

    #[test]
    fn test_discover_params_omit_unset_filters() {
        let params = discover_params(&DiscoverQuery::default());
        let keys: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["sort_by", "page"]);
    }

    #[test]
    fn test_youtube_trailers_filter() {
        let json = r#"{"results": [
            {"key": "a", "name": "Teaser", "site": "YouTube", "type": "Teaser"},
            {"key": "b", "name": "Trailer", "site": "Vimeo", "type": "Trailer"},
            {"key": "c", "name": "Official Trailer", "site": "YouTube", "type": "Trailer"}
        ]}"#;
        let list: TmdbVideoList = serde_json::from_str(json).unwrap();
        let trailers = youtube_trailers(list.results);

        assert_eq!(trailers.len(), 1);
        assert_eq!(trailers[0].key, "c");
    }
}
