use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Movie genre, optionally linked to its TMDb genre id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
    pub tmdb_id: Option<i64>,
}

/// Where a local movie record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovieSource {
    /// Imported from the external catalog
    Tmdb,
    /// Uploaded directly by an administrator
    Admin,
}

impl MovieSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovieSource::Tmdb => "tmdb",
            MovieSource::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "tmdb" => MovieSource::Tmdb,
            _ => MovieSource::Admin,
        }
    }
}

/// A movie in the local catalog mirror
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    pub tmdb_id: Option<i64>,
    pub tmdb_rating: Option<f64>,
    pub tmdb_vote_count: Option<i64>,
    pub poster_url: String,
    pub backdrop_url: String,
    pub trailer_url: String,
    pub genres: Vec<Genre>,
    pub actors: Vec<String>,
    pub director: String,
    pub language: String,
    pub source: MovieSource,
    pub uploaded_by: Option<i64>,
    /// Mean of the movie's review ratings at load time, `None` without reviews
    pub review_average: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    /// Average user rating, falling back to the mirrored TMDb rating, then 0
    pub fn average_rating(&self) -> f64 {
        self.review_average.or(self.tmdb_rating).unwrap_or(0.0)
    }

    /// External genre ids of this movie's genres, skipping unlinked genres
    pub fn tmdb_genre_ids(&self) -> Vec<i64> {
        self.genres.iter().filter_map(|g| g.tmdb_id).collect()
    }
}

/// Fields required to insert a movie; `genre_ids` are local genre ids
#[derive(Debug, Clone, Default)]
pub struct NewMovie {
    pub title: String,
    pub description: String,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    pub tmdb_id: Option<i64>,
    pub tmdb_rating: Option<f64>,
    pub tmdb_vote_count: Option<i64>,
    pub poster_url: String,
    pub backdrop_url: String,
    pub trailer_url: String,
    pub genre_ids: Vec<i64>,
    pub actors: Vec<String>,
    pub director: String,
    pub language: String,
    pub source: Option<MovieSource>,
    pub uploaded_by: Option<i64>,
}

/// Filters accepted by the movie list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieFilter {
    /// Case-insensitive substring of a genre name
    pub genre: Option<String>,
    pub year: Option<i32>,
    /// Case-insensitive substring of title, description or director
    pub search: Option<String>,
}

impl MovieFilter {
    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(genre) = non_empty(&self.genre) {
            let needle = genre.to_lowercase();
            if !movie
                .genres
                .iter()
                .any(|g| g.name.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        if let Some(year) = self.year {
            if movie.release_year != Some(year) {
                return false;
            }
        }

        if let Some(search) = non_empty(&self.search) {
            let needle = search.to_lowercase();
            let hit = [&movie.title, &movie.description, &movie.director]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        true
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Admin upload payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovieRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub trailer_url: String,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub language: String,
}

/// Movie representation returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct MovieResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    pub poster_image_url: String,
    pub poster_url: String,
    pub backdrop_url: String,
    pub trailer_url: String,
    pub genres: Vec<Genre>,
    pub actors: Vec<String>,
    pub director: String,
    pub language: String,
    pub tmdb_id: Option<i64>,
    pub tmdb_rating: Option<f64>,
    pub tmdb_vote_count: Option<i64>,
    pub average_rating: f64,
    pub source: MovieSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Movie> for MovieResponse {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            description: movie.description.clone(),
            release_year: movie.release_year,
            runtime: movie.runtime,
            poster_image_url: movie.poster_url.clone(),
            poster_url: movie.poster_url.clone(),
            backdrop_url: movie.backdrop_url.clone(),
            trailer_url: movie.trailer_url.clone(),
            genres: movie.genres.clone(),
            actors: movie.actors.clone(),
            director: movie.director.clone(),
            language: movie.language.clone(),
            tmdb_id: movie.tmdb_id,
            tmdb_rating: movie.tmdb_rating,
            tmdb_vote_count: movie.tmdb_vote_count,
            average_rating: movie.average_rating(),
            source: movie.source,
            created_at: movie.created_at,
            updated_at: movie.updated_at,
        }
    }
}
