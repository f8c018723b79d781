use serde::{Deserialize, Serialize};

// ============================================================================
// Normalized catalog types returned to clients
// ============================================================================

/// A movie as listed by the external catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogMovie {
    pub tmdb_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub poster_url: String,
    pub backdrop_url: String,
    pub tmdb_rating: Option<f64>,
    pub tmdb_vote_count: Option<i64>,
    pub genre_ids: Vec<i64>,
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogPage {
    pub results: Vec<CatalogMovie>,
    pub total_pages: u32,
    pub total_results: u32,
    pub page: u32,
}

impl CatalogPage {
    /// What every failed or unconfigured catalog call resolves to
    pub fn empty(page: u32) -> Self {
        Self {
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
            page,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl From<Vec<CatalogMovie>> for CatalogPage {
    fn from(results: Vec<CatalogMovie>) -> Self {
        let total = results.len() as u32;
        Self {
            results,
            total_pages: 1,
            total_results: total,
            page: 1,
        }
    }
}

/// Full movie details, optionally enriched with trailer, cast and director
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogMovieDetail {
    pub tmdb_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    pub poster_url: String,
    pub backdrop_url: String,
    pub tmdb_rating: Option<f64>,
    pub tmdb_vote_count: Option<i64>,
    pub genres: Vec<String>,
    pub genre_ids: Vec<i64>,
    pub language: Option<String>,
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,
    pub actors: Vec<String>,
    pub director: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogVideo {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

impl CatalogVideo {
    pub fn youtube_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogCredits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

impl CatalogCredits {
    /// First crew member credited as director, or empty
    pub fn director(&self) -> String {
        self.crew
            .iter()
            .find(|c| c.job == "Director")
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }
}

/// A genre from the catalog's genre list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogGenre {
    pub id: i64,
    pub name: String,
}

/// Filters for the discovery endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    pub genre_ids: Vec<i64>,
    pub year: Option<i32>,
    pub min_rating: Option<f64>,
    pub page: u32,
}

impl Default for DiscoverQuery {
    fn default() -> Self {
        Self {
            genre_ids: Vec::new(),
            year: None,
            min_rating: None,
            page: 1,
        }
    }
}

impl DiscoverQuery {
    pub fn genres(genre_ids: Vec<i64>) -> Self {
        Self {
            genre_ids,
            ..Default::default()
        }
    }
}

// ============================================================================
// TMDb API Types
// ============================================================================

/// Raw paged list response (search, popular, top rated, discover)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetail {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genres: Vec<CatalogGenre>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<CatalogGenre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideoList {
    #[serde(default)]
    pub results: Vec<CatalogVideo>,
}

/// Year prefix of a TMDb `YYYY-MM-DD` date
pub fn release_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

/// Joins an image path onto the configured base, or empty when absent
pub fn image_url(base: &str, path: Option<&str>) -> String {
    match path {
        Some(p) if !p.is_empty() => format!("{}{}", base, p),
        _ => String::new(),
    }
}

impl TmdbMovie {
    pub fn into_catalog(self, image_base_url: &str) -> CatalogMovie {
        CatalogMovie {
            tmdb_id: self.id,
            title: self.title.unwrap_or_default(),
            description: self.overview,
            release_year: release_year(self.release_date.as_deref()),
            poster_url: image_url(image_base_url, self.poster_path.as_deref()),
            backdrop_url: image_url(image_base_url, self.backdrop_path.as_deref()),
            tmdb_rating: self.vote_average,
            tmdb_vote_count: self.vote_count,
            genre_ids: self.genre_ids,
        }
    }
}

impl TmdbPage {
    pub fn into_catalog(self, image_base_url: &str) -> CatalogPage {
        CatalogPage {
            results: self
                .results
                .into_iter()
                .map(|m| m.into_catalog(image_base_url))
                .collect(),
            total_pages: self.total_pages,
            total_results: self.total_results,
            page: self.page,
        }
    }
}

impl TmdbMovieDetail {
    pub fn into_catalog(self, image_base_url: &str) -> CatalogMovieDetail {
        CatalogMovieDetail {
            tmdb_id: self.id,
            title: self.title.unwrap_or_default(),
            description: self.overview,
            release_year: release_year(self.release_date.as_deref()),
            runtime: self.runtime,
            poster_url: image_url(image_base_url, self.poster_path.as_deref()),
            backdrop_url: image_url(image_base_url, self.backdrop_path.as_deref()),
            tmdb_rating: self.vote_average,
            tmdb_vote_count: self.vote_count,
            genre_ids: self.genres.iter().map(|g| g.id).collect(),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            language: self.original_language,
            homepage: self.homepage,
            trailer_url: None,
            actors: Vec::new(),
            director: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGES: &str = "https://image.tmdb.org/t/p/w500";

    #[test]
    fn test_release_year_parsing() {
        assert_eq!(release_year(Some("2010-07-15")), Some(2010));
        assert_eq!(release_year(Some("")), None);
        assert_eq!(release_year(Some("19")), None);
        assert_eq!(release_year(None), None);
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url(IMAGES, Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(image_url(IMAGES, None), "");
        assert_eq!(image_url(IMAGES, Some("")), "");
    }

    #[test]
    fn test_page_deserialization_and_normalization() {
        let json = r#"{
            "page": 2,
            "results": [{
                "id": 27205,
                "title": "Inception",
                "overview": "A thief who steals corporate secrets",
                "release_date": "2010-07-15",
                "poster_path": "/inception.jpg",
                "backdrop_path": null,
                "vote_average": 8.4,
                "vote_count": 35000,
                "genre_ids": [28, 878]
            }],
            "total_pages": 10,
            "total_results": 200
        }"#;

        let page: TmdbPage = serde_json::from_str(json).unwrap();
        let page = page.into_catalog(IMAGES);

        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 10);
        let movie = &page.results[0];
        assert_eq!(movie.tmdb_id, 27205);
        assert_eq!(movie.release_year, Some(2010));
        assert_eq!(movie.poster_url, format!("{}/inception.jpg", IMAGES));
        assert_eq!(movie.backdrop_url, "");
        assert_eq!(movie.genre_ids, vec![28, 878]);
    }

    #[test]
    fn test_detail_normalization() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "release_date": "1999-03-30",
            "runtime": 136,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "original_language": "en"
        }"#;

        let detail: TmdbMovieDetail = serde_json::from_str(json).unwrap();
        let detail = detail.into_catalog(IMAGES);

        assert_eq!(detail.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(detail.genre_ids, vec![28, 878]);
        assert_eq!(detail.runtime, Some(136));
        assert_eq!(detail.language.as_deref(), Some("en"));
        assert_eq!(detail.poster_url, "");
    }

    #[test]
    fn test_credits_director() {
        let credits = CatalogCredits {
            cast: vec![],
            crew: vec![
                CrewMember {
                    name: "Bill Pope".to_string(),
                    job: "Director of Photography".to_string(),
                },
                CrewMember {
                    name: "Lana Wachowski".to_string(),
                    job: "Director".to_string(),
                },
            ],
        };
        assert_eq!(credits.director(), "Lana Wachowski");
        assert_eq!(CatalogCredits::default().director(), "");
    }
}
