//! Persistence for accounts, the movie mirror, reviews, watch history and chat
//!
//! Every store sits behind the [`Repository`] trait so handlers and the
//! recommendation engine never see which backend is in use. `PgRepository`
//! is the production store; `MemoryRepository` backs local development and
//! the test suites.
use crate::{
    error::AppResult,
    models::{
        Account, ChatMessage, Genre, Movie, MovieFilter, NewAccount, NewMovie, NewReview,
        Preference, Review, Sender, WatchHistoryEntry,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::{create_pool, run_migrations, PgRepository};

/// Storage operations used by the services
///
/// Uniqueness invariants (one review and one watch entry per user/movie pair,
/// one preference per account, unique usernames, emails and movie external ids)
/// are enforced by implementations; violations come back as `InvalidInput`.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    // Accounts

    async fn create_account(&self, account: NewAccount) -> AppResult<Account>;

    async fn account_by_id(&self, id: i64) -> AppResult<Option<Account>>;

    async fn account_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    async fn account_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    async fn list_accounts(&self) -> AppResult<Vec<Account>>;

    /// Persists every mutable account field; `NotFound` if the id is gone
    async fn update_account(&self, account: &Account) -> AppResult<Account>;

    /// Removes the account and everything it owns; uploaded movies are kept
    async fn delete_account(&self, id: i64) -> AppResult<bool>;

    // Preferences

    async fn preference_for(&self, account_id: i64) -> AppResult<Option<Preference>>;

    /// Inserts or replaces the account's preference record
    async fn save_preference(&self, preference: &Preference) -> AppResult<Preference>;

    // Genres

    /// All genres ordered by name
    async fn list_genres(&self) -> AppResult<Vec<Genre>>;

    async fn create_genre(&self, name: &str, tmdb_id: Option<i64>) -> AppResult<Genre>;

    async fn update_genre(&self, genre: &Genre) -> AppResult<Genre>;

    // Movies

    /// Movies matching the filter, newest first
    async fn list_movies(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>>;

    async fn movie_by_id(&self, id: i64) -> AppResult<Option<Movie>>;

    async fn movie_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>>;

    /// Inserts the movie, linking only genre ids that exist
    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie>;

    // Reviews

    async fn review_by_id(&self, id: i64) -> AppResult<Option<Review>>;

    async fn review_for(&self, user: i64, movie: i64) -> AppResult<Option<Review>>;

    async fn create_review(&self, review: NewReview) -> AppResult<Review>;

    async fn update_review(&self, id: i64, rating: i32, review_text: &str) -> AppResult<Review>;

    async fn delete_review(&self, id: i64) -> AppResult<bool>;

    /// Reviews of one movie, newest first
    async fn reviews_for_movie(&self, movie: i64) -> AppResult<Vec<Review>>;

    /// Reviews written by one account, newest first
    async fn reviews_by_user(&self, user: i64) -> AppResult<Vec<Review>>;

    /// Mean rating (`None` without reviews) and review count
    async fn rating_stats(&self, movie: i64) -> AppResult<(Option<f64>, i64)>;

    // Watch history

    /// Get-or-create; the flag is `true` when the entry was just created
    async fn add_watch(&self, user: i64, movie: i64) -> AppResult<(WatchHistoryEntry, bool)>;

    /// Entries of one account, most recent first
    async fn watch_history(&self, user: i64) -> AppResult<Vec<WatchHistoryEntry>>;

    // Chat

    async fn append_chat(&self, user: i64, sender: Sender, message: &str)
        -> AppResult<ChatMessage>;

    /// Transcript of one account in the order it was written
    async fn chat_history(&self, user: i64) -> AppResult<Vec<ChatMessage>>;

    async fn clear_chat(&self, user: i64) -> AppResult<u64>;
}
