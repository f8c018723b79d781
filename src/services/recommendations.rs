use std::collections::HashSet;

use crate::{
    db::Repository,
    error::AppResult,
    models::{Account, CatalogMovie, DiscoverQuery},
    services::catalog::MovieCatalog,
};

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_SIMILAR_LIMIT: usize = 5;

/// Upper bound on any requested list length
pub const MAX_LIMIT: usize = 100;

/// Movies listed in a single chat reply
const CHAT_LIST_LIMIT: usize = 3;

/// Minimum review rating that counts as liking a movie's genres
const LIKED_RATING: i32 = 4;

/// Genre keywords in match order, with the catalog genre each one names
const GENRE_KEYWORDS: [(&str, &str); 9] = [
    ("action", "Action"),
    ("comedy", "Comedy"),
    ("drama", "Drama"),
    ("horror", "Horror"),
    ("thriller", "Thriller"),
    ("romance", "Romance"),
    ("sci-fi", "Science Fiction"),
    ("fantasy", "Fantasy"),
    ("animation", "Animation"),
];

const MOOD_KEYWORDS: [(&[&str], &str); 3] = [
    (&["happy", "feel good"], "Comedy"),
    (&["scary", "frightening"], "Horror"),
    (&["exciting", "thrilling"], "Action"),
];

const GREETINGS: [&str; 3] = ["hello", "hi", "hey"];

const REQUEST_WORDS: [&str; 4] = ["recommend", "suggest", "movie", "watch"];

pub const FALLBACK_REPLY: &str = "I can help you find great movies! Try asking me for recommendations, or tell me what genre you're interested in (action, comedy, drama, etc.).";

const STILL_LEARNING_REPLY: &str =
    "I'm still learning your preferences. Try rating some movies to get better recommendations!";

/// What a chat message asks for, decided by keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    Greeting,
    Genre(&'static str),
    Recommendations,
    Unknown,
}

impl ChatIntent {
    /// First matching rule wins: greeting, named genre, mood, generic request
    pub fn classify(message: &str) -> Self {
        let text = message.to_lowercase();

        let is_greeting = text
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| GREETINGS.contains(&word));
        if is_greeting {
            return ChatIntent::Greeting;
        }

        if let Some((_, genre)) = GENRE_KEYWORDS.iter().find(|(kw, _)| text.contains(kw)) {
            return ChatIntent::Genre(*genre);
        }

        if let Some((_, genre)) = MOOD_KEYWORDS
            .iter()
            .find(|(words, _)| words.iter().any(|w| text.contains(w)))
        {
            return ChatIntent::Genre(*genre);
        }

        if REQUEST_WORDS.iter().any(|w| text.contains(w)) {
            return ChatIntent::Recommendations;
        }

        ChatIntent::Unknown
    }
}

/// One list line of a chat reply
fn format_movie_line(movie: &CatalogMovie) -> String {
    let year = movie
        .release_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let rating = movie
        .tmdb_rating
        .map(|r| format!("{:.1}", r))
        .unwrap_or_else(|| "N/A".to_string());

    format!("- {} ({}) - Rating: {}/10", movie.title, year, rating)
}

fn format_movie_list(movies: &[CatalogMovie]) -> String {
    movies
        .iter()
        .map(format_movie_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rule-based recommendations over the local mirror and the external catalog
///
/// Every pass is a linear filter over lists already in memory. Upstream
/// ordering is preserved as returned; nothing is re-ranked locally.
pub struct RecommendationEngine<'a> {
    repo: &'a dyn Repository,
    catalog: &'a dyn MovieCatalog,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(repo: &'a dyn Repository, catalog: &'a dyn MovieCatalog) -> Self {
        Self { repo, catalog }
    }

    async fn popular(&self, limit: usize) -> Vec<CatalogMovie> {
        let mut results = self.catalog.popular(1).await.results;
        results.truncate(limit);
        results
    }

    /// External genre ids from favorite genre names and highly rated reviews
    async fn genre_affinity(
        &self,
        account: &Account,
        favorite_genres: &[String],
    ) -> AppResult<Vec<i64>> {
        let mut genre_ids: Vec<i64> = self
            .repo
            .list_genres()
            .await?
            .into_iter()
            .filter(|g| favorite_genres.contains(&g.name))
            .filter_map(|g| g.tmdb_id)
            .collect();

        let reviews = self.repo.reviews_by_user(account.id).await?;
        for review in reviews.iter().filter(|r| r.rating >= LIKED_RATING) {
            if let Some(movie) = self.repo.movie_by_id(review.movie).await? {
                genre_ids.extend(movie.tmdb_genre_ids());
            }
        }

        genre_ids.sort_unstable();
        genre_ids.dedup();
        Ok(genre_ids)
    }

    /// Personalized picks, topped up with popular movies
    ///
    /// Accounts without a preference record get the popular list as is.
    /// Movies already in the account's watch history are skipped.
    pub async fn personalized(
        &self,
        account: &Account,
        limit: usize,
    ) -> AppResult<Vec<CatalogMovie>> {
        let limit = limit.min(MAX_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let Some(preference) = self.repo.preference_for(account.id).await? else {
            tracing::info!(user_id = account.id, "No preferences, falling back to popular");
            return Ok(self.popular(limit).await);
        };

        let genre_ids = self
            .genre_affinity(account, &preference.favorite_genres)
            .await?;

        let watched: HashSet<i64> = self
            .repo
            .watch_history(account.id)
            .await?
            .iter()
            .filter_map(|entry| entry.movie.tmdb_id)
            .collect();

        let mut recommendations = Vec::new();

        if !genre_ids.is_empty() {
            let query = DiscoverQuery {
                genre_ids,
                min_rating: (preference.min_rating > 0.0).then_some(preference.min_rating),
                ..Default::default()
            };

            for movie in self.catalog.discover(query).await.results {
                if recommendations.len() >= limit {
                    break;
                }
                if !watched.contains(&movie.tmdb_id) {
                    recommendations.push(movie);
                }
            }
        }

        let discovered = recommendations.len();
        if discovered < limit {
            recommendations.extend(self.popular(limit - discovered).await);
        }
        recommendations.truncate(limit);

        tracing::info!(
            user_id = account.id,
            discovered = discovered,
            returned = recommendations.len(),
            "Generated personalized recommendations"
        );

        Ok(recommendations)
    }

    /// Catalog movies sharing genres with a local movie, excluding itself
    pub async fn similar(&self, movie_id: i64, limit: usize) -> AppResult<Vec<CatalogMovie>> {
        let Some(movie) = self.repo.movie_by_id(movie_id).await? else {
            return Ok(Vec::new());
        };

        let genre_ids = movie.tmdb_genre_ids();
        if genre_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .catalog
            .discover(DiscoverQuery::genres(genre_ids))
            .await
            .results
            .into_iter()
            .filter(|m| Some(m.tmdb_id) != movie.tmdb_id)
            .take(limit.min(MAX_LIMIT))
            .collect())
    }

    async fn genre_reply(&self, genre_name: &str) -> AppResult<String> {
        let genre = self
            .repo
            .list_genres()
            .await?
            .into_iter()
            .find(|g| g.name.eq_ignore_ascii_case(genre_name));

        if let Some(tmdb_id) = genre.and_then(|g| g.tmdb_id) {
            let mut movies = self
                .catalog
                .discover(DiscoverQuery::genres(vec![tmdb_id]))
                .await
                .results;
            movies.truncate(CHAT_LIST_LIMIT);

            if !movies.is_empty() {
                return Ok(format!(
                    "Here are some great {} movies:\n\n{}\n\nWould you like more suggestions?",
                    genre_name,
                    format_movie_list(&movies)
                ));
            }
        }

        Ok(format!(
            "I don't have enough {} movies yet, but I'm working on it! Try asking for other genres.",
            genre_name
        ))
    }

    /// Reply of the keyword chatbot to one message
    pub async fn chat_response(&self, account: &Account, message: &str) -> AppResult<String> {
        let intent = ChatIntent::classify(message);

        tracing::info!(user_id = account.id, intent = ?intent, "Classified chat message");

        match intent {
            ChatIntent::Greeting => Ok(format!(
                "Hello {}! I'm your movie recommendation assistant. I can help you discover great movies based on your preferences. What kind of movies are you in the mood for?",
                account.username
            )),
            ChatIntent::Genre(genre) => self.genre_reply(genre).await,
            ChatIntent::Recommendations => {
                let movies = self.personalized(account, CHAT_LIST_LIMIT).await?;
                if movies.is_empty() {
                    Ok(STILL_LEARNING_REPLY.to_string())
                } else {
                    Ok(format!(
                        "Based on your preferences, I recommend:\n\n{}\n\nWould you like more suggestions?",
                        format_movie_list(&movies)
                    ))
                }
            }
            ChatIntent::Unknown => Ok(FALLBACK_REPLY.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::models::{CatalogPage, NewAccount, NewMovie, NewReview, Preference, Role};
    use crate::services::catalog::MockMovieCatalog;

    fn catalog_movie(tmdb_id: i64, title: &str) -> CatalogMovie {
        CatalogMovie {
            tmdb_id,
            title: title.to_string(),
            description: None,
            release_year: Some(2000),
            poster_url: String::new(),
            backdrop_url: String::new(),
            tmdb_rating: Some(7.5),
            tmdb_vote_count: Some(100),
            genre_ids: Vec::new(),
        }
    }

    fn page(ids: &[i64]) -> CatalogPage {
        ids.iter()
            .map(|&id| catalog_movie(id, &format!("Movie {}", id)))
            .collect::<Vec<_>>()
            .into()
    }

    fn ids(movies: &[CatalogMovie]) -> Vec<i64> {
        movies.iter().map(|m| m.tmdb_id).collect()
    }

    async fn account(repo: &MemoryRepository) -> Account {
        repo.create_account(NewAccount {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            role: Role::User,
            is_superuser: false,
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_classify_greeting_is_whole_word() {
        assert_eq!(ChatIntent::classify("Hello there"), ChatIntent::Greeting);
        assert_eq!(ChatIntent::classify("hey!"), ChatIntent::Greeting);
        assert_eq!(ChatIntent::classify("what is this"), ChatIntent::Unknown);
    }

    #[test]
    fn test_classify_genres_and_moods() {
        assert_eq!(
            ChatIntent::classify("Any good COMEDY?"),
            ChatIntent::Genre("Comedy")
        );
        assert_eq!(
            ChatIntent::classify("something sci-fi"),
            ChatIntent::Genre("Science Fiction")
        );
        assert_eq!(
            ChatIntent::classify("action or drama"),
            ChatIntent::Genre("Action")
        );
        assert_eq!(
            ChatIntent::classify("I want to feel good"),
            ChatIntent::Genre("Comedy")
        );
        assert_eq!(
            ChatIntent::classify("something scary"),
            ChatIntent::Genre("Horror")
        );
    }

    #[test]
    fn test_genre_word_containing_greeting_letters_is_not_a_greeting() {
        assert_eq!(
            ChatIntent::classify("this comedy"),
            ChatIntent::Genre("Comedy")
        );
        assert_eq!(
            ChatIntent::classify("anything with a high body count"),
            ChatIntent::Unknown
        );
    }

    #[test]
    fn test_classify_requests_and_fallback() {
        assert_eq!(
            ChatIntent::classify("what should I watch tonight"),
            ChatIntent::Recommendations
        );
        assert_eq!(ChatIntent::classify("qwerty"), ChatIntent::Unknown);
    }

    #[test]
    fn test_format_movie_line_handles_missing_fields() {
        let mut movie = catalog_movie(1, "Heat");
        assert_eq!(format_movie_line(&movie), "- Heat (2000) - Rating: 7.5/10");

        movie.release_year = None;
        movie.tmdb_rating = None;
        assert_eq!(format_movie_line(&movie), "- Heat (N/A) - Rating: N/A/10");
    }

    #[tokio::test]
    async fn test_without_preferences_returns_popular() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_discover().never();
        catalog.expect_popular().returning(|_| page(&[1, 2, 3, 4]));

        let engine = RecommendationEngine::new(&repo, &catalog);
        let recommendations = engine.personalized(&account, 3).await.unwrap();

        assert_eq!(ids(&recommendations), vec![1, 2, 3]);
    }

    #[test]
    fn test_format_movie_line_rounds_rating() {
        let mut movie = catalog_movie(1, "Heat");
        movie.tmdb_rating = Some(7.346);
        assert_eq!(format_movie_line(&movie), "- Heat (2000) - Rating: 7.3/10");
    }

    #[tokio::test]
    async fn test_personalized_clamps_oversized_limit() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;
        repo.save_preference(&Preference::empty(account.id))
            .await
            .unwrap();

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_discover().never();
        catalog.expect_popular().returning(|_| {
            let ids: Vec<i64> = (1..=150).collect();
            page(&ids)
        });

        let engine = RecommendationEngine::new(&repo, &catalog);

        let recommendations = engine.personalized(&account, usize::MAX).await.unwrap();
        assert_eq!(recommendations.len(), MAX_LIMIT);

        assert!(engine.personalized(&account, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_personalized_filters_watched_and_tops_up() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;
        repo.create_genre("Action", Some(28)).await.unwrap();

        let mut preference = Preference::empty(account.id);
        preference.favorite_genres = vec!["Action".to_string()];
        preference.min_rating = 6.0;
        repo.save_preference(&preference).await.unwrap();

        let watched = repo
            .create_movie(NewMovie {
                title: "Watched".to_string(),
                tmdb_id: Some(11),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.add_watch(account.id, watched.id).await.unwrap();

        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_discover()
            .withf(|q| q.genre_ids == vec![28] && q.min_rating == Some(6.0) && q.page == 1)
            .returning(|_| page(&[10, 11, 12]));
        catalog
            .expect_popular()
            .returning(|_| page(&[90, 91, 92]));

        let engine = RecommendationEngine::new(&repo, &catalog);
        let recommendations = engine.personalized(&account, 4).await.unwrap();

        assert_eq!(ids(&recommendations), vec![10, 12, 90, 91]);
    }

    #[tokio::test]
    async fn test_highly_rated_reviews_add_genres() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;
        let horror = repo.create_genre("Horror", Some(27)).await.unwrap();
        let drama = repo.create_genre("Drama", Some(18)).await.unwrap();
        repo.save_preference(&Preference::empty(account.id))
            .await
            .unwrap();

        for (title, genre, rating) in [("Alien", horror.id, 5), ("Heat", drama.id, 2)] {
            let movie = repo
                .create_movie(NewMovie {
                    title: title.to_string(),
                    genre_ids: vec![genre],
                    ..Default::default()
                })
                .await
                .unwrap();
            repo.create_review(NewReview {
                user: account.id,
                movie: movie.id,
                rating,
                review_text: String::new(),
            })
            .await
            .unwrap();
        }

        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_discover()
            .withf(|q| q.genre_ids == vec![27] && q.min_rating.is_none())
            .returning(|_| page(&[5, 6]));
        catalog.expect_popular().returning(|_| page(&[]));

        let engine = RecommendationEngine::new(&repo, &catalog);
        let recommendations = engine.personalized(&account, 2).await.unwrap();

        assert_eq!(ids(&recommendations), vec![5, 6]);
    }

    #[tokio::test]
    async fn test_similar_excludes_source_movie() {
        let repo = MemoryRepository::new();
        let action = repo.create_genre("Action", Some(28)).await.unwrap();
        let movie = repo
            .create_movie(NewMovie {
                title: "The Matrix".to_string(),
                tmdb_id: Some(603),
                genre_ids: vec![action.id],
                ..Default::default()
            })
            .await
            .unwrap();

        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_discover()
            .returning(|_| page(&[603, 604, 605, 606]));

        let engine = RecommendationEngine::new(&repo, &catalog);
        let similar = engine.similar(movie.id, 2).await.unwrap();

        assert_eq!(ids(&similar), vec![604, 605]);
    }

    #[tokio::test]
    async fn test_similar_without_genres_or_movie_is_empty() {
        let repo = MemoryRepository::new();
        let movie = repo
            .create_movie(NewMovie {
                title: "Unlinked".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_discover().never();

        let engine = RecommendationEngine::new(&repo, &catalog);
        assert!(engine.similar(movie.id, 5).await.unwrap().is_empty());
        assert!(engine.similar(999, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_greeting_and_fallback() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;
        let catalog = MockMovieCatalog::new();
        let engine = RecommendationEngine::new(&repo, &catalog);

        let greeting = engine.chat_response(&account, "hello").await.unwrap();
        assert!(greeting.starts_with("Hello alice! I'm your movie recommendation assistant."));

        let fallback = engine.chat_response(&account, "qwerty").await.unwrap();
        assert_eq!(fallback, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_chat_genre_branch() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;
        repo.create_genre("Comedy", Some(35)).await.unwrap();

        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_discover()
            .withf(|q| q.genre_ids == vec![35])
            .returning(|_| page(&[1, 2, 3, 4]));

        let engine = RecommendationEngine::new(&repo, &catalog);
        let reply = engine
            .chat_response(&account, "I want a comedy")
            .await
            .unwrap();

        assert_eq!(
            reply,
            "Here are some great Comedy movies:\n\n\
             - Movie 1 (2000) - Rating: 7.5/10\n\
             - Movie 2 (2000) - Rating: 7.5/10\n\
             - Movie 3 (2000) - Rating: 7.5/10\n\n\
             Would you like more suggestions?"
        );
    }

    #[tokio::test]
    async fn test_chat_unknown_genre() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;
        let catalog = MockMovieCatalog::new();
        let engine = RecommendationEngine::new(&repo, &catalog);

        let reply = engine
            .chat_response(&account, "any horror?")
            .await
            .unwrap();
        assert_eq!(
            reply,
            "I don't have enough Horror movies yet, but I'm working on it! Try asking for other genres."
        );
    }

    #[tokio::test]
    async fn test_chat_recommendations_when_catalog_empty() {
        let repo = MemoryRepository::new();
        let account = account(&repo).await;

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_popular().returning(|page| CatalogPage::empty(page));

        let engine = RecommendationEngine::new(&repo, &catalog);
        let reply = engine
            .chat_response(&account, "recommend something")
            .await
            .unwrap();
        assert_eq!(reply, STILL_LEARNING_REPLY);
    }
}
