use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{
        Account, ChatMessage, Genre, Movie, MovieFilter, MovieSource, NewAccount, NewMovie,
        NewReview, Preference, Review, Role, Sender, WatchHistoryEntry,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

const MOVIE_COLUMNS: &str = r#"
    m.id, m.title, m.description, m.release_year, m.runtime, m.tmdb_id, m.tmdb_rating,
    m.tmdb_vote_count, m.poster_url, m.backdrop_url, m.trailer_url, m.actors, m.director,
    m.language, m.source, m.uploaded_by, m.created_at, m.updated_at,
    (SELECT AVG(r.rating)::float8 FROM reviews r WHERE r.movie_id = m.id) AS review_average
"#;

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.account_id, a.username, r.movie_id, m.title AS movie_title,
           r.rating, r.review_text, r.created_at, r.updated_at
    FROM reviews r
    JOIN accounts a ON a.id = r.account_id
    JOIN movies m ON m.id = r.movie_id
"#;

#[derive(FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    is_superuser: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::parse(&row.role),
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: row.date_joined,
        }
    }
}

#[derive(FromRow)]
struct PreferenceRow {
    account_id: i64,
    favorite_genres: Vec<String>,
    favorite_actors: Vec<String>,
    preferred_languages: Vec<String>,
    min_rating: f64,
    preferred_release_year_start: Option<i32>,
    preferred_release_year_end: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PreferenceRow> for Preference {
    fn from(row: PreferenceRow) -> Self {
        Preference {
            account_id: row.account_id,
            favorite_genres: row.favorite_genres,
            favorite_actors: row.favorite_actors,
            preferred_languages: row.preferred_languages,
            min_rating: row.min_rating,
            preferred_release_year_start: row.preferred_release_year_start,
            preferred_release_year_end: row.preferred_release_year_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct GenreRow {
    id: i64,
    name: String,
    tmdb_id: Option<i64>,
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Genre {
            id: row.id,
            name: row.name,
            tmdb_id: row.tmdb_id,
        }
    }
}

#[derive(FromRow)]
struct MovieGenreRow {
    movie_id: i64,
    id: i64,
    name: String,
    tmdb_id: Option<i64>,
}

#[derive(FromRow)]
struct MovieRow {
    id: i64,
    title: String,
    description: String,
    release_year: Option<i32>,
    runtime: Option<i32>,
    tmdb_id: Option<i64>,
    tmdb_rating: Option<f64>,
    tmdb_vote_count: Option<i64>,
    poster_url: String,
    backdrop_url: String,
    trailer_url: String,
    actors: Vec<String>,
    director: String,
    language: String,
    source: String,
    uploaded_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    review_average: Option<f64>,
}

impl MovieRow {
    fn into_movie(self, genres: Vec<Genre>) -> Movie {
        Movie {
            id: self.id,
            title: self.title,
            description: self.description,
            release_year: self.release_year,
            runtime: self.runtime,
            tmdb_id: self.tmdb_id,
            tmdb_rating: self.tmdb_rating,
            tmdb_vote_count: self.tmdb_vote_count,
            poster_url: self.poster_url,
            backdrop_url: self.backdrop_url,
            trailer_url: self.trailer_url,
            genres,
            actors: self.actors,
            director: self.director,
            language: self.language,
            source: MovieSource::parse(&self.source),
            uploaded_by: self.uploaded_by,
            review_average: self.review_average,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: i64,
    account_id: i64,
    username: String,
    movie_id: i64,
    movie_title: String,
    rating: i32,
    review_text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            user: row.account_id,
            user_username: row.username,
            movie: row.movie_id,
            movie_title: row.movie_title,
            rating: row.rating,
            review_text: row.review_text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct WatchRow {
    id: i64,
    movie_id: i64,
    watched_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ChatRow {
    id: i64,
    account_id: i64,
    sender: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<ChatRow> for ChatMessage {
    fn from(row: ChatRow) -> Self {
        ChatMessage {
            id: row.id,
            user: row.account_id,
            sender: Sender::parse(&row.sender),
            message: row.message,
            created_at: row.created_at,
        }
    }
}

/// Escapes LIKE metacharacters and wraps the term for a substring match
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads genres for the given movie rows and assembles full movies, keeping row order
    async fn hydrate(&self, rows: Vec<MovieRow>) -> AppResult<Vec<Movie>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, MovieGenreRow>(
            r#"
            SELECT mg.movie_id, g.id, g.name, g.tmdb_id
            FROM movie_genres mg
            JOIN genres g ON g.id = mg.genre_id
            WHERE mg.movie_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
        for link in links {
            genres.entry(link.movie_id).or_default().push(Genre {
                id: link.id,
                name: link.name,
                tmdb_id: link.tmdb_id,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let movie_genres = genres.remove(&row.id).unwrap_or_default();
                row.into_movie(movie_genres)
            })
            .collect())
    }

    async fn movies_by_ids(&self, ids: &[i64]) -> AppResult<HashMap<i64, Movie>> {
        let sql = format!("SELECT {} FROM movies m WHERE m.id = ANY($1)", MOVIE_COLUMNS);
        let rows = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(self
            .hydrate(rows)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect())
    }

    async fn single_movie(&self, column: &str, value: i64) -> AppResult<Option<Movie>> {
        let sql = format!("SELECT {} FROM movies m WHERE m.{} = $1", MOVIE_COLUMNS, column);
        let row = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn fetch_reviews(&self, clause: &str, value: i64) -> AppResult<Vec<Review>> {
        let sql = format!(
            "{} WHERE {} = $1 ORDER BY r.created_at DESC, r.id DESC",
            REVIEW_SELECT, clause
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn account_where(&self, column: &str, value: &str) -> AppResult<Option<Account>> {
        let sql = format!("SELECT * FROM accounts WHERE {} = $1", column);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Account::from))
    }
}

#[async_trait::async_trait]
impl Repository for PgRepository {
    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (username, email, password_hash, role, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_superuser)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn account_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Account::from))
    }

    async fn account_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        self.account_where("username", username).await
    }

    async fn account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        self.account_where("email", email).await
    }

    async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn update_account(&self, account: &Account) -> AppResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET username = $2, email = $3, password_hash = $4, role = $5,
                is_superuser = $6, is_active = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_superuser)
        .bind(account.is_active)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", account.id)))
    }

    async fn delete_account(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn preference_for(&self, account_id: i64) -> AppResult<Option<Preference>> {
        let row =
            sqlx::query_as::<_, PreferenceRow>("SELECT * FROM preferences WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Preference::from))
    }

    async fn save_preference(&self, preference: &Preference) -> AppResult<Preference> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            r#"
            INSERT INTO preferences (
                account_id, favorite_genres, favorite_actors, preferred_languages, min_rating,
                preferred_release_year_start, preferred_release_year_end, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (account_id) DO UPDATE SET
                favorite_genres = EXCLUDED.favorite_genres,
                favorite_actors = EXCLUDED.favorite_actors,
                preferred_languages = EXCLUDED.preferred_languages,
                min_rating = EXCLUDED.min_rating,
                preferred_release_year_start = EXCLUDED.preferred_release_year_start,
                preferred_release_year_end = EXCLUDED.preferred_release_year_end,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(preference.account_id)
        .bind(&preference.favorite_genres[..])
        .bind(&preference.favorite_actors[..])
        .bind(&preference.preferred_languages[..])
        .bind(preference.min_rating)
        .bind(preference.preferred_release_year_start)
        .bind(preference.preferred_release_year_end)
        .bind(preference.created_at)
        .bind(preference.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let rows = sqlx::query_as::<_, GenreRow>("SELECT id, name, tmdb_id FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Genre::from).collect())
    }

    async fn create_genre(&self, name: &str, tmdb_id: Option<i64>) -> AppResult<Genre> {
        let row = sqlx::query_as::<_, GenreRow>(
            "INSERT INTO genres (name, tmdb_id) VALUES ($1, $2) RETURNING id, name, tmdb_id",
        )
        .bind(name)
        .bind(tmdb_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_genre(&self, genre: &Genre) -> AppResult<Genre> {
        let row = sqlx::query_as::<_, GenreRow>(
            "UPDATE genres SET name = $2, tmdb_id = $3 WHERE id = $1 RETURNING id, name, tmdb_id",
        )
        .bind(genre.id)
        .bind(&genre.name)
        .bind(genre.tmdb_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Genre::from)
            .ok_or_else(|| AppError::NotFound(format!("Genre {} not found", genre.id)))
    }

    async fn list_movies(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        query.push(MOVIE_COLUMNS);
        query.push(" FROM movies m WHERE TRUE");

        if let Some(genre) = filter.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            query.push(
                " AND EXISTS (SELECT 1 FROM movie_genres mg JOIN genres g ON g.id = mg.genre_id \
                 WHERE mg.movie_id = m.id AND g.name ILIKE ",
            );
            query.push_bind(contains_pattern(genre));
            query.push(")");
        }

        if let Some(year) = filter.year {
            query.push(" AND m.release_year = ");
            query.push_bind(year);
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            query.push(" AND (m.title ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR m.description ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR m.director ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }

        query.push(" ORDER BY m.created_at DESC, m.id DESC");

        let rows = query
            .build_query_as::<MovieRow>()
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(rows).await
    }

    async fn movie_by_id(&self, id: i64) -> AppResult<Option<Movie>> {
        self.single_movie("id", id).await
    }

    async fn movie_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        self.single_movie("tmdb_id", tmdb_id).await
    }

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO movies (
                title, description, release_year, runtime, tmdb_id, tmdb_rating,
                tmdb_vote_count, poster_url, backdrop_url, trailer_url, actors, director,
                language, source, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.release_year)
        .bind(movie.runtime)
        .bind(movie.tmdb_id)
        .bind(movie.tmdb_rating)
        .bind(movie.tmdb_vote_count)
        .bind(&movie.poster_url)
        .bind(&movie.backdrop_url)
        .bind(&movie.trailer_url)
        .bind(&movie.actors[..])
        .bind(&movie.director)
        .bind(&movie.language)
        .bind(movie.source.unwrap_or(MovieSource::Admin).as_str())
        .bind(movie.uploaded_by)
        .fetch_one(&mut *tx)
        .await?;

        if !movie.genre_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO movie_genres (movie_id, genre_id)
                SELECT $1, id FROM genres WHERE id = ANY($2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(&movie.genre_ids[..])
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.movie_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Movie {} vanished after insert", id)))
    }

    async fn review_by_id(&self, id: i64) -> AppResult<Option<Review>> {
        Ok(self.fetch_reviews("r.id", id).await?.pop())
    }

    async fn review_for(&self, user: i64, movie: i64) -> AppResult<Option<Review>> {
        let sql = format!("{} WHERE r.account_id = $1 AND r.movie_id = $2", REVIEW_SELECT);
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(user)
            .bind(movie)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Review::from))
    }

    async fn create_review(&self, review: NewReview) -> AppResult<Review> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reviews (account_id, movie_id, rating, review_text)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(review.user)
        .bind(review.movie)
        .bind(review.rating)
        .bind(&review.review_text)
        .fetch_one(&self.pool)
        .await?;

        self.review_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Review {} vanished after insert", id)))
    }

    async fn update_review(&self, id: i64, rating: i32, review_text: &str) -> AppResult<Review> {
        let result = sqlx::query(
            "UPDATE reviews SET rating = $2, review_text = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(rating)
        .bind(review_text)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Review {} not found", id)));
        }

        self.review_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))
    }

    async fn delete_review(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reviews_for_movie(&self, movie: i64) -> AppResult<Vec<Review>> {
        self.fetch_reviews("r.movie_id", movie).await
    }

    async fn reviews_by_user(&self, user: i64) -> AppResult<Vec<Review>> {
        self.fetch_reviews("r.account_id", user).await
    }

    async fn rating_stats(&self, movie: i64) -> AppResult<(Option<f64>, i64)> {
        let stats = sqlx::query_as::<_, (Option<f64>, i64)>(
            "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE movie_id = $1",
        )
        .bind(movie)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn add_watch(&self, user: i64, movie: i64) -> AppResult<(WatchHistoryEntry, bool)> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO watch_history (account_id, movie_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id, movie_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user)
        .bind(movie)
        .fetch_optional(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, WatchRow>(
            "SELECT id, movie_id, watched_at FROM watch_history WHERE account_id = $1 AND movie_id = $2",
        )
        .bind(user)
        .bind(movie)
        .fetch_one(&self.pool)
        .await?;

        let movie = self
            .movie_by_id(row.movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", row.movie_id)))?;

        let entry = WatchHistoryEntry {
            id: row.id,
            user,
            movie,
            watched_at: row.watched_at,
        };

        Ok((entry, inserted.is_some()))
    }

    async fn watch_history(&self, user: i64) -> AppResult<Vec<WatchHistoryEntry>> {
        let rows = sqlx::query_as::<_, WatchRow>(
            r#"
            SELECT id, movie_id, watched_at FROM watch_history
            WHERE account_id = $1
            ORDER BY watched_at DESC, id DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.movie_id).collect();
        let mut movies = self.movies_by_ids(&ids).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                movies.remove(&row.movie_id).map(|movie| WatchHistoryEntry {
                    id: row.id,
                    user,
                    movie,
                    watched_at: row.watched_at,
                })
            })
            .collect())
    }

    async fn append_chat(
        &self,
        user: i64,
        sender: Sender,
        message: &str,
    ) -> AppResult<ChatMessage> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            INSERT INTO chat_messages (account_id, sender, message)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, sender, message, created_at
            "#,
        )
        .bind(user)
        .bind(sender.as_str())
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn chat_history(&self, user: i64) -> AppResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, account_id, sender, message, created_at FROM chat_messages
            WHERE account_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn clear_chat(&self, user: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE account_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
