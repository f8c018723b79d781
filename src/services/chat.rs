use serde::{Deserialize, Serialize};

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{Account, ChatMessage, Sender},
    services::{catalog::MovieCatalog, recommendations::RecommendationEngine},
};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Both transcript lines written by one exchange
#[derive(Debug, Serialize)]
pub struct ChatExchange {
    pub user_message: ChatMessage,
    pub bot_response: ChatMessage,
}

/// Stores the caller's message, generates the bot reply and stores it too
pub async fn send(
    repo: &dyn Repository,
    catalog: &dyn MovieCatalog,
    account: &Account,
    request: ChatRequest,
) -> AppResult<ChatExchange> {
    if request.message.trim().is_empty() {
        return Err(AppError::InvalidInput("Message is required".to_string()));
    }

    let user_message = repo
        .append_chat(account.id, Sender::User, &request.message)
        .await?;

    let reply = RecommendationEngine::new(repo, catalog)
        .chat_response(account, &request.message)
        .await?;

    let bot_response = repo.append_chat(account.id, Sender::Bot, &reply).await?;

    tracing::info!(
        user_id = account.id,
        user_message_id = user_message.id,
        bot_message_id = bot_response.id,
        "Chat exchange stored"
    );

    Ok(ChatExchange {
        user_message,
        bot_response,
    })
}

pub async fn history(repo: &dyn Repository, account: &Account) -> AppResult<Vec<ChatMessage>> {
    repo.chat_history(account.id).await
}

pub async fn clear(repo: &dyn Repository, account: &Account) -> AppResult<u64> {
    let removed = repo.clear_chat(account.id).await?;

    tracing::info!(user_id = account.id, removed = removed, "Chat history cleared");

    Ok(removed)
}
