use serde::{Deserialize, Serialize};

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{
        Account, NewAccount, Preference, PreferenceResponse, PreferenceUpdate, Role, UserResponse,
    },
    services::auth::{hash_password, verify_password, TokenPair, TokenService, TokenType},
};

const MAX_USERNAME_LEN: usize = 150;
const MAX_MIN_RATING: f64 = 10.0;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub preferences: Option<PreferenceUpdate>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access: String,
}

fn bad_credentials() -> AppError {
    AppError::Unauthorized("No active account found with the given credentials".to_string())
}

/// Username and email checks shared by registration and admin updates
pub fn validate_identity(username: &str, email: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::InvalidInput("Username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidInput(
            "Username may not contain whitespace".to_string(),
        ));
    }

    let valid_email = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid_email {
        return Err(AppError::InvalidInput(
            "Enter a valid email address".to_string(),
        ));
    }

    Ok(())
}

/// Rejects a minimum rating outside 0..=10 and an inverted year range
pub fn validate_preference(preference: &Preference) -> AppResult<()> {
    if !(0.0..=MAX_MIN_RATING).contains(&preference.min_rating) {
        return Err(AppError::InvalidInput(format!(
            "min_rating must be between 0 and {}",
            MAX_MIN_RATING
        )));
    }

    if let (Some(start), Some(end)) = (
        preference.preferred_release_year_start,
        preference.preferred_release_year_end,
    ) {
        if start > end {
            return Err(AppError::InvalidInput(
                "preferred_release_year_start must not be after preferred_release_year_end"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

/// Creates an account with its preference record and returns a token pair
pub async fn register(
    repo: &dyn Repository,
    tokens: &TokenService,
    request: RegisterRequest,
) -> AppResult<RegisterResponse> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();
    validate_identity(&username, &email)?;

    if request.password.is_empty() {
        return Err(AppError::InvalidInput("Password is required".to_string()));
    }
    if request.password != request.password_confirm {
        return Err(AppError::InvalidInput("Passwords do not match".to_string()));
    }

    let mut preference = Preference::empty(0);
    if let Some(update) = request.preferences {
        preference.apply(update);
    }
    validate_preference(&preference)?;

    if repo.account_by_username(&username).await?.is_some() {
        return Err(AppError::InvalidInput(
            "A user with that username already exists".to_string(),
        ));
    }
    if repo.account_by_email(&email).await?.is_some() {
        return Err(AppError::InvalidInput(
            "A user with that email already exists".to_string(),
        ));
    }

    let role = request.role.unwrap_or_default();
    let account = repo
        .create_account(NewAccount {
            username,
            email,
            password_hash: hash_password(&request.password)?,
            role,
            is_superuser: role == Role::Admin,
        })
        .await?;

    preference.account_id = account.id;
    let preference = repo.save_preference(&preference).await?;

    tracing::info!(
        user_id = account.id,
        username = %account.username,
        role = %account.role,
        "Registered account"
    );

    Ok(RegisterResponse {
        user: UserResponse::new(&account, Some(&preference)),
        tokens: tokens.token_pair(&account)?,
        message: "User registered successfully".to_string(),
    })
}

pub async fn login(
    repo: &dyn Repository,
    tokens: &TokenService,
    request: LoginRequest,
) -> AppResult<TokenPair> {
    let account = repo
        .account_by_username(request.username.trim())
        .await?
        .ok_or_else(bad_credentials)?;

    if !account.is_active || !verify_password(&request.password, &account.password_hash) {
        tracing::info!(username = %account.username, "Rejected login");
        return Err(bad_credentials());
    }

    tokens.token_pair(&account)
}

/// Exchanges a refresh token for a fresh access token
pub async fn refresh(
    repo: &dyn Repository,
    tokens: &TokenService,
    request: RefreshRequest,
) -> AppResult<AccessToken> {
    let claims = tokens.validate(&request.refresh, TokenType::Refresh)?;

    let account = repo
        .account_by_id(claims.sub)
        .await?
        .filter(|a| a.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;

    Ok(AccessToken {
        access: tokens.access_token(&account)?,
    })
}

pub async fn current_user(repo: &dyn Repository, account: &Account) -> AppResult<UserResponse> {
    let preference = repo.preference_for(account.id).await?;
    Ok(UserResponse::new(account, preference.as_ref()))
}

pub async fn get_preferences(
    repo: &dyn Repository,
    account: &Account,
) -> AppResult<PreferenceResponse> {
    repo.preference_for(account.id)
        .await?
        .map(|p| PreferenceResponse::from(&p))
        .ok_or_else(|| AppError::NotFound("Preferences not found".to_string()))
}

/// Partial update; creates the record when the account has none yet
pub async fn update_preferences(
    repo: &dyn Repository,
    account: &Account,
    update: PreferenceUpdate,
) -> AppResult<PreferenceResponse> {
    let mut preference = repo
        .preference_for(account.id)
        .await?
        .unwrap_or_else(|| Preference::empty(account.id));

    preference.apply(update);
    validate_preference(&preference)?;

    let saved = repo.save_preference(&preference).await?;

    tracing::info!(user_id = account.id, "Updated preferences");

    Ok(PreferenceResponse::from(&saved))
}
