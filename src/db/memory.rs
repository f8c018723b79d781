use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{
        Account, ChatMessage, Genre, Movie, MovieFilter, MovieSource, NewAccount, NewMovie,
        NewReview, Preference, Review, Sender, WatchHistoryEntry,
    },
};

/// Movie as stored; genres are links resolved when read
#[derive(Debug, Clone)]
struct StoredMovie {
    movie: Movie,
    genre_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
struct StoredReview {
    id: i64,
    user: i64,
    movie: i64,
    rating: i32,
    review_text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredWatch {
    id: i64,
    user: i64,
    movie: i64,
    watched_at: DateTime<Utc>,
}

/// Tables of the in-memory store
#[derive(Default)]
struct Inner {
    next_id: HashMap<&'static str, i64>,
    accounts: BTreeMap<i64, Account>,
    preferences: HashMap<i64, Preference>,
    genres: BTreeMap<i64, Genre>,
    movies: BTreeMap<i64, StoredMovie>,
    reviews: BTreeMap<i64, StoredReview>,
    watches: BTreeMap<i64, StoredWatch>,
    chat: BTreeMap<i64, ChatMessage>,
}

impl Inner {
    fn next(&mut self, table: &'static str) -> i64 {
        let id = self.next_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn hydrate(&self, stored: &StoredMovie) -> Movie {
        let mut movie = stored.movie.clone();

        let mut genres: Vec<Genre> = stored
            .genre_ids
            .iter()
            .filter_map(|id| self.genres.get(id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        movie.genres = genres;

        let ratings: Vec<i32> = self
            .reviews
            .values()
            .filter(|r| r.movie == movie.id)
            .map(|r| r.rating)
            .collect();
        movie.review_average = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64)
        };

        movie
    }

    fn movie(&self, id: i64) -> Option<Movie> {
        self.movies.get(&id).map(|stored| self.hydrate(stored))
    }

    fn review(&self, stored: &StoredReview) -> Review {
        Review {
            id: stored.id,
            user: stored.user,
            user_username: self
                .accounts
                .get(&stored.user)
                .map(|a| a.username.clone())
                .unwrap_or_default(),
            movie: stored.movie,
            movie_title: self
                .movies
                .get(&stored.movie)
                .map(|m| m.movie.title.clone())
                .unwrap_or_default(),
            rating: stored.rating,
            review_text: stored.review_text.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    fn reviews_where(&self, predicate: impl Fn(&StoredReview) -> bool) -> Vec<Review> {
        let mut reviews: Vec<&StoredReview> =
            self.reviews.values().filter(|r| predicate(r)).collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews.into_iter().map(|r| self.review(r)).collect()
    }

    fn watch_entry(&self, stored: &StoredWatch) -> Option<WatchHistoryEntry> {
        self.movie(stored.movie).map(|movie| WatchHistoryEntry {
            id: stored.id,
            user: stored.user,
            movie,
            watched_at: stored.watched_at,
        })
    }

    fn ensure_unique_account(&self, username: &str, email: &str, skip: Option<i64>) -> AppResult<()> {
        for account in self.accounts.values() {
            if Some(account.id) == skip {
                continue;
            }
            if account.username == username {
                return Err(already_exists("accounts_username_key"));
            }
            if account.email == email {
                return Err(already_exists("accounts_email_key"));
            }
        }
        Ok(())
    }
}

fn already_exists(constraint: &str) -> AppError {
    AppError::InvalidInput(format!("Record already exists ({})", constraint))
}

/// In-memory repository for development and tests
///
/// Mirrors the PostgreSQL store's constraints: unique usernames, emails,
/// genre names and movie external ids, one review and one watch entry per
/// user/movie pair, and cascading deletes from accounts.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_account(&account.username, &account.email, None)?;

        let id = inner.next("accounts");
        let account = Account {
            id,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            is_superuser: account.is_superuser,
            is_active: true,
            date_joined: Utc::now(),
        };
        inner.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn account_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn account_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        Ok(self.inner.read().await.accounts.values().cloned().collect())
    }

    async fn update_account(&self, account: &Account) -> AppResult<Account> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.contains_key(&account.id) {
            return Err(AppError::NotFound(format!("User {} not found", account.id)));
        }
        inner.ensure_unique_account(&account.username, &account.email, Some(account.id))?;
        inner.accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn delete_account(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.accounts.remove(&id).is_none() {
            return Ok(false);
        }

        inner.preferences.remove(&id);
        inner.reviews.retain(|_, r| r.user != id);
        inner.watches.retain(|_, w| w.user != id);
        inner.chat.retain(|_, c| c.user != id);
        for stored in inner.movies.values_mut() {
            if stored.movie.uploaded_by == Some(id) {
                stored.movie.uploaded_by = None;
            }
        }
        Ok(true)
    }

    async fn preference_for(&self, account_id: i64) -> AppResult<Option<Preference>> {
        Ok(self.inner.read().await.preferences.get(&account_id).cloned())
    }

    async fn save_preference(&self, preference: &Preference) -> AppResult<Preference> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.contains_key(&preference.account_id) {
            return Err(AppError::NotFound(format!(
                "User {} not found",
                preference.account_id
            )));
        }

        let mut saved = preference.clone();
        if let Some(existing) = inner.preferences.get(&preference.account_id) {
            saved.created_at = existing.created_at;
        }
        inner.preferences.insert(saved.account_id, saved.clone());
        Ok(saved)
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let inner = self.inner.read().await;
        let mut genres: Vec<Genre> = inner.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn create_genre(&self, name: &str, tmdb_id: Option<i64>) -> AppResult<Genre> {
        let mut inner = self.inner.write().await;
        if inner.genres.values().any(|g| g.name == name) {
            return Err(already_exists("genres_name_key"));
        }
        if tmdb_id.is_some() && inner.genres.values().any(|g| g.tmdb_id == tmdb_id) {
            return Err(already_exists("genres_tmdb_id_key"));
        }

        let id = inner.next("genres");
        let genre = Genre {
            id,
            name: name.to_string(),
            tmdb_id,
        };
        inner.genres.insert(id, genre.clone());
        Ok(genre)
    }

    async fn update_genre(&self, genre: &Genre) -> AppResult<Genre> {
        let mut inner = self.inner.write().await;
        if !inner.genres.contains_key(&genre.id) {
            return Err(AppError::NotFound(format!("Genre {} not found", genre.id)));
        }
        let clash = inner.genres.values().any(|g| {
            g.id != genre.id
                && (g.name == genre.name || (genre.tmdb_id.is_some() && g.tmdb_id == genre.tmdb_id))
        });
        if clash {
            return Err(already_exists("genres"));
        }
        inner.genres.insert(genre.id, genre.clone());
        Ok(genre.clone())
    }

    async fn list_movies(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        let mut movies: Vec<Movie> = inner
            .movies
            .values()
            .map(|stored| inner.hydrate(stored))
            .filter(|movie| filter.matches(movie))
            .collect();
        movies.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(movies)
    }

    async fn movie_by_id(&self, id: i64) -> AppResult<Option<Movie>> {
        Ok(self.inner.read().await.movie(id))
    }

    async fn movie_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .values()
            .find(|stored| stored.movie.tmdb_id == Some(tmdb_id))
            .map(|stored| inner.hydrate(stored)))
    }

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let mut inner = self.inner.write().await;
        if let Some(tmdb_id) = movie.tmdb_id {
            if inner
                .movies
                .values()
                .any(|stored| stored.movie.tmdb_id == Some(tmdb_id))
            {
                return Err(already_exists("movies_tmdb_id_key"));
            }
        }

        let mut genre_ids: Vec<i64> = movie
            .genre_ids
            .iter()
            .copied()
            .filter(|id| inner.genres.contains_key(id))
            .collect();
        genre_ids.sort_unstable();
        genre_ids.dedup();

        let id = inner.next("movies");
        let now = Utc::now();
        let stored = StoredMovie {
            movie: Movie {
                id,
                title: movie.title,
                description: movie.description,
                release_year: movie.release_year,
                runtime: movie.runtime,
                tmdb_id: movie.tmdb_id,
                tmdb_rating: movie.tmdb_rating,
                tmdb_vote_count: movie.tmdb_vote_count,
                poster_url: movie.poster_url,
                backdrop_url: movie.backdrop_url,
                trailer_url: movie.trailer_url,
                genres: Vec::new(),
                actors: movie.actors,
                director: movie.director,
                language: movie.language,
                source: movie.source.unwrap_or(MovieSource::Admin),
                uploaded_by: movie.uploaded_by,
                review_average: None,
                created_at: now,
                updated_at: now,
            },
            genre_ids,
        };
        let hydrated = inner.hydrate(&stored);
        inner.movies.insert(id, stored);
        Ok(hydrated)
    }

    async fn review_by_id(&self, id: i64) -> AppResult<Option<Review>> {
        let inner = self.inner.read().await;
        Ok(inner.reviews.get(&id).map(|r| inner.review(r)))
    }

    async fn review_for(&self, user: i64, movie: i64) -> AppResult<Option<Review>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .find(|r| r.user == user && r.movie == movie)
            .map(|r| inner.review(r)))
    }

    async fn create_review(&self, review: NewReview) -> AppResult<Review> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.contains_key(&review.user) {
            return Err(AppError::NotFound(format!("User {} not found", review.user)));
        }
        if !inner.movies.contains_key(&review.movie) {
            return Err(AppError::NotFound(format!("Movie {} not found", review.movie)));
        }
        if inner
            .reviews
            .values()
            .any(|r| r.user == review.user && r.movie == review.movie)
        {
            return Err(already_exists("reviews_account_id_movie_id_key"));
        }

        let id = inner.next("reviews");
        let now = Utc::now();
        let stored = StoredReview {
            id,
            user: review.user,
            movie: review.movie,
            rating: review.rating,
            review_text: review.review_text,
            created_at: now,
            updated_at: now,
        };
        let created = inner.review(&stored);
        inner.reviews.insert(id, stored);
        Ok(created)
    }

    async fn update_review(&self, id: i64, rating: i32, review_text: &str) -> AppResult<Review> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .reviews
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))?;
        stored.rating = rating;
        stored.review_text = review_text.to_string();
        stored.updated_at = Utc::now();

        let stored = stored.clone();
        Ok(inner.review(&stored))
    }

    async fn delete_review(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.write().await.reviews.remove(&id).is_some())
    }

    async fn reviews_for_movie(&self, movie: i64) -> AppResult<Vec<Review>> {
        Ok(self.inner.read().await.reviews_where(|r| r.movie == movie))
    }

    async fn reviews_by_user(&self, user: i64) -> AppResult<Vec<Review>> {
        Ok(self.inner.read().await.reviews_where(|r| r.user == user))
    }

    async fn rating_stats(&self, movie: i64) -> AppResult<(Option<f64>, i64)> {
        let inner = self.inner.read().await;
        let ratings: Vec<i32> = inner
            .reviews
            .values()
            .filter(|r| r.movie == movie)
            .map(|r| r.rating)
            .collect();

        if ratings.is_empty() {
            return Ok((None, 0));
        }
        let sum: f64 = ratings.iter().map(|&r| f64::from(r)).sum();
        Ok((Some(sum / ratings.len() as f64), ratings.len() as i64))
    }

    async fn add_watch(&self, user: i64, movie: i64) -> AppResult<(WatchHistoryEntry, bool)> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.contains_key(&user) {
            return Err(AppError::NotFound(format!("User {} not found", user)));
        }

        if let Some(existing) = inner
            .watches
            .values()
            .find(|w| w.user == user && w.movie == movie)
        {
            let entry = inner
                .watch_entry(existing)
                .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie)))?;
            return Ok((entry, false));
        }

        if !inner.movies.contains_key(&movie) {
            return Err(AppError::NotFound(format!("Movie {} not found", movie)));
        }

        let id = inner.next("watch_history");
        let stored = StoredWatch {
            id,
            user,
            movie,
            watched_at: Utc::now(),
        };
        let entry = inner
            .watch_entry(&stored)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie)))?;
        inner.watches.insert(id, stored);
        Ok((entry, true))
    }

    async fn watch_history(&self, user: i64) -> AppResult<Vec<WatchHistoryEntry>> {
        let inner = self.inner.read().await;
        let mut watches: Vec<&StoredWatch> =
            inner.watches.values().filter(|w| w.user == user).collect();
        watches.sort_by(|a, b| b.watched_at.cmp(&a.watched_at).then(b.id.cmp(&a.id)));
        Ok(watches
            .into_iter()
            .filter_map(|w| inner.watch_entry(w))
            .collect())
    }

    async fn append_chat(
        &self,
        user: i64,
        sender: Sender,
        message: &str,
    ) -> AppResult<ChatMessage> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.contains_key(&user) {
            return Err(AppError::NotFound(format!("User {} not found", user)));
        }

        let id = inner.next("chat_messages");
        let line = ChatMessage {
            id,
            user,
            sender,
            message: message.to_string(),
            created_at: Utc::now(),
        };
        inner.chat.insert(id, line.clone());
        Ok(line)
    }

    async fn chat_history(&self, user: i64) -> AppResult<Vec<ChatMessage>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chat
            .values()
            .filter(|c| c.user == user)
            .cloned()
            .collect())
    }

    async fn clear_chat(&self, user: i64) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.chat.len();
        inner.chat.retain(|_, c| c.user != user);
        Ok((before - inner.chat.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn new_account(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            role: Role::User,
            is_superuser: false,
        }
    }

    fn new_movie(title: &str, tmdb_id: Option<i64>) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            tmdb_id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = MemoryRepository::new();
        repo.create_account(new_account("alice")).await.unwrap();

        let mut dup = new_account("alice");
        dup.email = "other@example.com".to_string();
        let result = repo.create_account(dup).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_movie_genres_hydrated_and_unknown_ids_dropped() {
        let repo = MemoryRepository::new();
        let drama = repo.create_genre("Drama", Some(18)).await.unwrap();
        let action = repo.create_genre("Action", Some(28)).await.unwrap();

        let mut movie = new_movie("Heat", None);
        movie.genre_ids = vec![drama.id, action.id, 999];
        let movie = repo.create_movie(movie).await.unwrap();

        let names: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Action", "Drama"]);
        assert_eq!(movie.source, MovieSource::Admin);
    }

    #[tokio::test]
    async fn test_duplicate_tmdb_id_rejected() {
        let repo = MemoryRepository::new();
        repo.create_movie(new_movie("Heat", Some(949))).await.unwrap();

        let result = repo.create_movie(new_movie("Heat again", Some(949))).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_movies_listed_newest_first() {
        let repo = MemoryRepository::new();
        repo.create_movie(new_movie("First", None)).await.unwrap();
        repo.create_movie(new_movie("Second", None)).await.unwrap();

        let movies = repo.list_movies(&MovieFilter::default()).await.unwrap();
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_review_average_and_pair_uniqueness() {
        let repo = MemoryRepository::new();
        let alice = repo.create_account(new_account("alice")).await.unwrap();
        let bob = repo.create_account(new_account("bob")).await.unwrap();
        let movie = repo.create_movie(new_movie("Heat", None)).await.unwrap();

        for (user, rating) in [(alice.id, 4), (bob.id, 5)] {
            repo.create_review(NewReview {
                user,
                movie: movie.id,
                rating,
                review_text: String::new(),
            })
            .await
            .unwrap();
        }

        let (average, count) = repo.rating_stats(movie.id).await.unwrap();
        assert_eq!(average, Some(4.5));
        assert_eq!(count, 2);

        let movie = repo.movie_by_id(movie.id).await.unwrap().unwrap();
        assert_eq!(movie.review_average, Some(4.5));

        let dup = repo
            .create_review(NewReview {
                user: alice.id,
                movie: movie.id,
                rating: 1,
                review_text: String::new(),
            })
            .await;
        assert!(matches!(dup, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_watch_is_idempotent() {
        let repo = MemoryRepository::new();
        let alice = repo.create_account(new_account("alice")).await.unwrap();
        let movie = repo.create_movie(new_movie("Heat", None)).await.unwrap();

        let (first, created) = repo.add_watch(alice.id, movie.id).await.unwrap();
        assert!(created);
        let (second, created) = repo.add_watch(alice.id, movie.id).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(repo.watch_history(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_account_cascades() {
        let repo = MemoryRepository::new();
        let alice = repo.create_account(new_account("alice")).await.unwrap();
        let mut upload = new_movie("Heat", None);
        upload.uploaded_by = Some(alice.id);
        let movie = repo.create_movie(upload).await.unwrap();

        repo.save_preference(&Preference::empty(alice.id)).await.unwrap();
        repo.add_watch(alice.id, movie.id).await.unwrap();
        repo.append_chat(alice.id, Sender::User, "hi").await.unwrap();
        repo.create_review(NewReview {
            user: alice.id,
            movie: movie.id,
            rating: 3,
            review_text: String::new(),
        })
        .await
        .unwrap();

        assert!(repo.delete_account(alice.id).await.unwrap());

        assert!(repo.preference_for(alice.id).await.unwrap().is_none());
        assert!(repo.reviews_for_movie(movie.id).await.unwrap().is_empty());
        assert!(repo.chat_history(alice.id).await.unwrap().is_empty());
        let movie = repo.movie_by_id(movie.id).await.unwrap().unwrap();
        assert_eq!(movie.uploaded_by, None);
    }

    #[tokio::test]
    async fn test_clear_chat_only_touches_owner() {
        let repo = MemoryRepository::new();
        let alice = repo.create_account(new_account("alice")).await.unwrap();
        let bob = repo.create_account(new_account("bob")).await.unwrap();
        repo.append_chat(alice.id, Sender::User, "hello").await.unwrap();
        repo.append_chat(alice.id, Sender::Bot, "hi there").await.unwrap();
        repo.append_chat(bob.id, Sender::User, "hey").await.unwrap();

        assert_eq!(repo.clear_chat(alice.id).await.unwrap(), 2);
        assert_eq!(repo.chat_history(bob.id).await.unwrap().len(), 1);
    }
}
