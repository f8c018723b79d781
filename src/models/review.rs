use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// A user's rating of a movie, unique per (user, movie)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: i64,
    pub user: i64,
    pub user_username: String,
    pub movie: i64,
    pub movie_title: String,
    pub rating: i32,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user: i64,
    pub movie: i64,
    pub rating: i32,
    pub review_text: String,
}

/// Create-or-update payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    pub movie: i64,
    pub rating: i32,
    #[serde(default)]
    pub review_text: Option<String>,
}

/// Partial update payload for an existing review
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub review_text: Option<String>,
}

/// Average rating summary for one movie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub movie_id: i64,
    pub average_rating: f64,
    pub total_reviews: i64,
}

pub fn validate_rating(rating: i32) -> AppResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(())
}
