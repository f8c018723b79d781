use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, routes::AppState, services::auth::TokenType};

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the bearer access token to an active [`Account`](crate::models::Account)
/// and stores it in request extensions
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or_else(|| {
        AppError::Unauthorized("Authentication credentials were not provided".to_string())
    })?;

    let claims = state.tokens.validate(token, TokenType::Access)?;

    let account = state
        .repo
        .account_by_id(claims.sub)
        .await?
        .filter(|account| account.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;

    tracing::debug!(user_id = account.id, "Authenticated request");

    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/user/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&request_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&request_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request_with(Some("Bearer  "))), None);
        assert_eq!(bearer_token(&request_with(None)), None);
    }
}
