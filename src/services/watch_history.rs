use serde::{Deserialize, Serialize};

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{Account, WatchHistoryResponse},
};

#[derive(Debug, Clone, Deserialize)]
pub struct AddWatchRequest {
    pub movie_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AddWatchResponse {
    pub message: String,
    pub data: WatchHistoryResponse,
}

/// Records that the caller watched a movie; repeating it is a no-op
pub async fn add(
    repo: &dyn Repository,
    account: &Account,
    request: AddWatchRequest,
) -> AppResult<AddWatchResponse> {
    let movie_id = request
        .movie_id
        .ok_or_else(|| AppError::InvalidInput("movie_id required".to_string()))?;

    if repo.movie_by_id(movie_id).await?.is_none() {
        return Err(AppError::NotFound("Movie not found".to_string()));
    }

    let (entry, created) = repo.add_watch(account.id, movie_id).await?;

    tracing::info!(
        user_id = account.id,
        movie_id = movie_id,
        created = created,
        "Recorded watch history"
    );

    let message = if created {
        "Added to watch history"
    } else {
        "Already in watch history"
    };

    Ok(AddWatchResponse {
        message: message.to_string(),
        data: WatchHistoryResponse::from(&entry),
    })
}

pub async fn list(repo: &dyn Repository, account: &Account) -> AppResult<Vec<WatchHistoryResponse>> {
    let entries = repo.watch_history(account.id).await?;
    Ok(entries.iter().map(WatchHistoryResponse::from).collect())
}
