use serde::Serialize;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{
        Account, CatalogMovieDetail, CatalogPage, CreateMovieRequest, DiscoverQuery, Genre, Movie,
        MovieFilter, MovieResponse, MovieSource, NewMovie,
    },
    services::{
        auth::require_admin,
        catalog::{enriched_details, MovieCatalog},
    },
};

const MAX_TITLE_LEN: usize = 500;

#[derive(Debug, Serialize)]
pub struct GenreSyncSummary {
    pub message: String,
    pub total_genres: usize,
}

pub async fn list_movies(
    repo: &dyn Repository,
    filter: &MovieFilter,
) -> AppResult<Vec<MovieResponse>> {
    let movies = repo.list_movies(filter).await?;
    Ok(movies.iter().map(MovieResponse::from).collect())
}

pub async fn load_movie(repo: &dyn Repository, id: i64) -> AppResult<Movie> {
    repo.movie_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))
}

pub async fn get_movie(repo: &dyn Repository, id: i64) -> AppResult<MovieResponse> {
    let movie = load_movie(repo, id).await?;
    Ok(MovieResponse::from(&movie))
}

/// Admin upload; unknown genre ids are ignored
pub async fn create_movie(
    repo: &dyn Repository,
    actor: &Account,
    request: CreateMovieRequest,
) -> AppResult<MovieResponse> {
    require_admin(actor)?;

    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::InvalidInput(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    if matches!(request.runtime, Some(runtime) if runtime < 0) {
        return Err(AppError::InvalidInput(
            "Runtime must not be negative".to_string(),
        ));
    }

    let movie = repo
        .create_movie(NewMovie {
            title,
            description: request.description,
            release_year: request.release_year,
            runtime: request.runtime,
            poster_url: request.poster_url,
            trailer_url: request.trailer_url,
            genre_ids: request.genre_ids,
            actors: request.actors,
            director: request.director,
            language: request.language,
            source: Some(MovieSource::Admin),
            uploaded_by: Some(actor.id),
            ..Default::default()
        })
        .await?;

    tracing::info!(
        movie_id = movie.id,
        title = %movie.title,
        uploaded_by = actor.id,
        "Admin created movie"
    );

    Ok(MovieResponse::from(&movie))
}

pub async fn list_genres(repo: &dyn Repository) -> AppResult<Vec<Genre>> {
    repo.list_genres().await
}

/// Mirrors the catalog's genre list into the local genre table
///
/// A genre whose external id is already known is left alone. A local genre
/// with the same name and no external id gets linked instead of duplicated.
pub async fn sync_genres(
    repo: &dyn Repository,
    catalog: &dyn MovieCatalog,
    actor: &Account,
) -> AppResult<GenreSyncSummary> {
    require_admin(actor)?;

    let remote = catalog.genres().await;
    let mut local = repo.list_genres().await?;
    let mut created = 0;

    for genre in remote {
        if local.iter().any(|g| g.tmdb_id == Some(genre.id)) {
            continue;
        }

        let unlinked = local
            .iter()
            .position(|g| g.tmdb_id.is_none() && g.name.eq_ignore_ascii_case(&genre.name));

        match unlinked {
            Some(index) => {
                let mut linked = local[index].clone();
                linked.tmdb_id = Some(genre.id);
                local[index] = repo.update_genre(&linked).await?;
            }
            None => {
                local.push(repo.create_genre(&genre.name, Some(genre.id)).await?);
                created += 1;
            }
        }
    }

    tracing::info!(
        provider = catalog.name(),
        created_count = created,
        total_genres = local.len(),
        "Synced genres"
    );

    Ok(GenreSyncSummary {
        message: format!("Synced {} new genres", created),
        total_genres: local.len(),
    })
}

/// Copies a catalog movie into the local mirror
pub async fn import_movie(
    repo: &dyn Repository,
    catalog: &dyn MovieCatalog,
    actor: &Account,
    tmdb_id: i64,
) -> AppResult<MovieResponse> {
    require_admin(actor)?;

    if repo.movie_by_tmdb_id(tmdb_id).await?.is_some() {
        return Err(AppError::InvalidInput("Movie already imported".to_string()));
    }

    let details = enriched_details(catalog, tmdb_id)
        .await
        .ok_or_else(|| AppError::NotFound("Movie not found on TMDb".to_string()))?;

    let genre_ids: Vec<i64> = repo
        .list_genres()
        .await?
        .into_iter()
        .filter(|g| matches!(g.tmdb_id, Some(id) if details.genre_ids.contains(&id)))
        .map(|g| g.id)
        .collect();

    let movie = repo
        .create_movie(NewMovie {
            title: details.title,
            description: details.description.unwrap_or_default(),
            release_year: details.release_year,
            runtime: details.runtime,
            tmdb_id: Some(tmdb_id),
            tmdb_rating: details.tmdb_rating,
            tmdb_vote_count: details.tmdb_vote_count,
            poster_url: details.poster_url,
            backdrop_url: details.backdrop_url,
            trailer_url: details.trailer_url.unwrap_or_default(),
            genre_ids,
            actors: details.actors,
            director: details.director,
            language: details.language.unwrap_or_default(),
            source: Some(MovieSource::Tmdb),
            uploaded_by: Some(actor.id),
        })
        .await?;

    tracing::info!(
        movie_id = movie.id,
        tmdb_id = tmdb_id,
        title = %movie.title,
        "Imported movie from catalog"
    );

    Ok(MovieResponse::from(&movie))
}

pub async fn search_catalog(
    catalog: &dyn MovieCatalog,
    query: Option<&str>,
    page: u32,
) -> AppResult<CatalogPage> {
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Search query required".to_string()))?;

    Ok(catalog.search(query, page).await)
}

pub async fn catalog_detail(
    catalog: &dyn MovieCatalog,
    tmdb_id: i64,
) -> AppResult<CatalogMovieDetail> {
    enriched_details(catalog, tmdb_id)
        .await
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))
}

/// Parses `28,12` into genre ids, skipping anything non-numeric
pub fn parse_genre_ids(raw: Option<&str>) -> Vec<i64> {
    raw.unwrap_or_default()
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

pub async fn discover_catalog(catalog: &dyn MovieCatalog, query: DiscoverQuery) -> CatalogPage {
    catalog.discover(query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::models::{CatalogCredits, CatalogGenre, NewAccount, Role};
    use crate::services::catalog::MockMovieCatalog;

    async fn account(repo: &MemoryRepository, username: &str, role: Role) -> Account {
        repo.create_account(NewAccount {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: String::new(),
            role,
            is_superuser: role == Role::Admin,
        })
        .await
        .unwrap()
    }

    fn create_request(title: &str, genre_ids: Vec<i64>) -> CreateMovieRequest {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "genre_ids": genre_ids,
        }))
        .unwrap()
    }

    fn matrix_catalog() -> MockMovieCatalog {
        let mut catalog = MockMovieCatalog::new();
        catalog.expect_movie_details().returning(|id| {
            (id == 603).then(|| CatalogMovieDetail {
                tmdb_id: 603,
                title: "The Matrix".to_string(),
                release_year: Some(1999),
                genre_ids: vec![28, 878],
                genres: vec!["Action".to_string(), "Science Fiction".to_string()],
                tmdb_rating: Some(8.2),
                ..Default::default()
            })
        });
        catalog.expect_movie_videos().returning(|_| Vec::new());
        catalog
            .expect_movie_credits()
            .returning(|_| CatalogCredits::default());
        catalog
    }

    #[tokio::test]
    async fn test_create_movie_requires_admin() {
        let repo = MemoryRepository::new();
        let user = account(&repo, "alice", Role::User).await;

        let result = create_movie(&repo, &user, create_request("Heat", vec![])).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_movie_sets_source_and_uploader() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        let drama = repo.create_genre("Drama", None).await.unwrap();

        let movie = create_movie(&repo, &admin, create_request("Heat", vec![drama.id, 404]))
            .await
            .unwrap();

        assert_eq!(movie.source, MovieSource::Admin);
        assert_eq!(movie.genres.len(), 1);
        let stored = repo.movie_by_id(movie.id).await.unwrap().unwrap();
        assert_eq!(stored.uploaded_by, Some(admin.id));
    }

    #[tokio::test]
    async fn test_create_movie_requires_title() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;

        let result = create_movie(&repo, &admin, create_request("   ", vec![])).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_sync_genres_creates_and_links() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        let action = repo.create_genre("Action", None).await.unwrap();
        repo.create_genre("Drama", Some(18)).await.unwrap();

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_name().return_const("TMDb");
        catalog.expect_genres().returning(|| {
            vec![
                CatalogGenre {
                    id: 28,
                    name: "Action".to_string(),
                },
                CatalogGenre {
                    id: 18,
                    name: "Drama".to_string(),
                },
                CatalogGenre {
                    id: 35,
                    name: "Comedy".to_string(),
                },
            ]
        });

        let summary = sync_genres(&repo, &catalog, &admin).await.unwrap();
        assert_eq!(summary.message, "Synced 1 new genres");
        assert_eq!(summary.total_genres, 3);

        let genres = repo.list_genres().await.unwrap();
        let linked = genres.iter().find(|g| g.id == action.id).unwrap();
        assert_eq!(linked.tmdb_id, Some(28));
    }

    #[tokio::test]
    async fn test_sync_genres_is_idempotent() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_name().return_const("TMDb");
        catalog.expect_genres().returning(|| {
            vec![CatalogGenre {
                id: 35,
                name: "Comedy".to_string(),
            }]
        });

        sync_genres(&repo, &catalog, &admin).await.unwrap();
        let summary = sync_genres(&repo, &catalog, &admin).await.unwrap();
        assert_eq!(summary.message, "Synced 0 new genres");
        assert_eq!(summary.total_genres, 1);
    }

    #[tokio::test]
    async fn test_import_links_known_genres_only() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        repo.create_genre("Action", Some(28)).await.unwrap();

        let movie = import_movie(&repo, &matrix_catalog(), &admin, 603)
            .await
            .unwrap();

        assert_eq!(movie.source, MovieSource::Tmdb);
        assert_eq!(movie.tmdb_id, Some(603));
        assert_eq!(movie.release_year, Some(1999));
        let names: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Action"]);
    }

    #[tokio::test]
    async fn test_import_twice_rejected() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        let catalog = matrix_catalog();

        import_movie(&repo, &catalog, &admin, 603).await.unwrap();
        let again = import_movie(&repo, &catalog, &admin, 603).await;
        assert!(matches!(again, Err(AppError::InvalidInput(msg)) if msg == "Movie already imported"));
    }

    #[tokio::test]
    async fn test_import_unknown_movie() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;

        let result = import_movie(&repo, &matrix_catalog(), &admin, 1).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let catalog = MockMovieCatalog::new();
        let result = search_catalog(&catalog, Some("  "), 1).await;
        assert!(matches!(result, Err(AppError::InvalidInput(msg)) if msg == "Search query required"));
        assert!(search_catalog(&catalog, None, 1).await.is_err());
    }

    #[test]
    fn test_parse_genre_ids() {
        assert_eq!(parse_genre_ids(Some("28,12")), vec![28, 12]);
        assert_eq!(parse_genre_ids(Some("28,,abc, 35")), vec![28, 35]);
        assert!(parse_genre_ids(None).is_empty());
    }
}
