use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{
        review::validate_rating, Account, CreateReviewRequest, NewReview, RatingSummary, Review,
        UpdateReviewRequest,
    },
    services::movies::load_movie,
};

/// Creates the caller's review of a movie, or overwrites the existing one
///
/// The flag is `true` when a new review was created.
pub async fn upsert_review(
    repo: &dyn Repository,
    account: &Account,
    request: CreateReviewRequest,
) -> AppResult<(Review, bool)> {
    validate_rating(request.rating)?;

    if repo.movie_by_id(request.movie).await?.is_none() {
        return Err(AppError::InvalidInput(format!(
            "Movie {} does not exist",
            request.movie
        )));
    }

    let review_text = request.review_text.unwrap_or_default();

    if let Some(existing) = repo.review_for(account.id, request.movie).await? {
        let review = repo
            .update_review(existing.id, request.rating, &review_text)
            .await?;

        tracing::info!(
            review_id = review.id,
            user_id = account.id,
            movie_id = review.movie,
            rating = review.rating,
            "Updated existing review"
        );

        return Ok((review, false));
    }

    let review = repo
        .create_review(NewReview {
            user: account.id,
            movie: request.movie,
            rating: request.rating,
            review_text,
        })
        .await?;

    tracing::info!(
        review_id = review.id,
        user_id = account.id,
        movie_id = review.movie,
        rating = review.rating,
        "Created review"
    );

    Ok((review, true))
}

async fn owned_review(
    repo: &dyn Repository,
    account: &Account,
    id: i64,
    action: &str,
) -> AppResult<Review> {
    let review = repo
        .review_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))?;

    if review.user != account.id {
        return Err(AppError::Forbidden(format!(
            "You can only {} your own reviews",
            action
        )));
    }

    Ok(review)
}

/// Partial update of the caller's own review; the movie never changes
pub async fn update_review(
    repo: &dyn Repository,
    account: &Account,
    id: i64,
    update: UpdateReviewRequest,
) -> AppResult<Review> {
    let review = owned_review(repo, account, id, "update").await?;

    let rating = update.rating.unwrap_or(review.rating);
    validate_rating(rating)?;
    let review_text = update.review_text.unwrap_or(review.review_text);

    repo.update_review(id, rating, &review_text).await
}

pub async fn delete_review(repo: &dyn Repository, account: &Account, id: i64) -> AppResult<()> {
    owned_review(repo, account, id, "delete").await?;
    repo.delete_review(id).await?;

    tracing::info!(review_id = id, user_id = account.id, "Deleted review");

    Ok(())
}

pub async fn reviews_for_movie(repo: &dyn Repository, movie: i64) -> AppResult<Vec<Review>> {
    repo.reviews_for_movie(movie).await
}

pub async fn reviews_by_user(repo: &dyn Repository, account: &Account) -> AppResult<Vec<Review>> {
    repo.reviews_by_user(account.id).await
}

/// Mean review rating to one decimal, or the mirrored catalog rating without reviews
pub async fn average_rating(repo: &dyn Repository, movie_id: i64) -> AppResult<RatingSummary> {
    let movie = load_movie(repo, movie_id).await?;
    let (average, total_reviews) = repo.rating_stats(movie_id).await?;

    let average_rating = match average {
        Some(avg) if total_reviews > 0 => (avg * 10.0).round() / 10.0,
        _ => movie.tmdb_rating.unwrap_or(0.0),
    };

    Ok(RatingSummary {
        movie_id,
        average_rating,
        total_reviews,
    })
}
