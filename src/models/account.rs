use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Access role; `Admin` gates every write to the shared catalog and user management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parses a stored role, treating anything unknown as a plain user
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields required to insert an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_superuser: bool,
}

/// Recommendation preferences, one per account
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    pub account_id: i64,
    pub favorite_genres: Vec<String>,
    pub favorite_actors: Vec<String>,
    pub preferred_languages: Vec<String>,
    pub min_rating: f64,
    pub preferred_release_year_start: Option<i32>,
    pub preferred_release_year_end: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Preference {
    /// Empty preferences for a freshly registered account
    pub fn empty(account_id: i64) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            favorite_genres: Vec::new(),
            favorite_actors: Vec::new(),
            preferred_languages: Vec::new(),
            min_rating: 0.0,
            preferred_release_year_start: None,
            preferred_release_year_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the supplied fields, leaving the others untouched
    pub fn apply(&mut self, update: PreferenceUpdate) {
        if let Some(genres) = update.favorite_genres {
            self.favorite_genres = genres;
        }
        if let Some(actors) = update.favorite_actors {
            self.favorite_actors = actors;
        }
        if let Some(languages) = update.preferred_languages {
            self.preferred_languages = languages;
        }
        if let Some(min_rating) = update.min_rating {
            self.min_rating = min_rating;
        }
        if let Some(start) = update.preferred_release_year_start {
            self.preferred_release_year_start = start;
        }
        if let Some(end) = update.preferred_release_year_end {
            self.preferred_release_year_end = end;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial preference payload; explicit `null` clears a year bound
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferenceUpdate {
    pub favorite_genres: Option<Vec<String>>,
    pub favorite_actors: Option<Vec<String>>,
    pub preferred_languages: Option<Vec<String>>,
    pub min_rating: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub preferred_release_year_start: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub preferred_release_year_end: Option<Option<i32>>,
}

/// Distinguishes a present `null` (`Some(None)`) from an absent field (`None`)
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

/// Preference representation returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceResponse {
    pub favorite_genres: Vec<String>,
    pub favorite_actors: Vec<String>,
    pub preferred_languages: Vec<String>,
    pub min_rating: f64,
    pub preferred_release_year_start: Option<i32>,
    pub preferred_release_year_end: Option<i32>,
}

impl From<&Preference> for PreferenceResponse {
    fn from(pref: &Preference) -> Self {
        Self {
            favorite_genres: pref.favorite_genres.clone(),
            favorite_actors: pref.favorite_actors.clone(),
            preferred_languages: pref.preferred_languages.clone(),
            min_rating: pref.min_rating,
            preferred_release_year_start: pref.preferred_release_year_start,
            preferred_release_year_end: pref.preferred_release_year_end,
        }
    }
}

/// Account representation returned to clients; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub is_superuser: bool,
    pub preferences: Option<PreferenceResponse>,
    pub date_joined: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(account: &Account, preference: Option<&Preference>) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            is_active: account.is_active,
            is_superuser: account.is_superuser,
            preferences: preference.map(PreferenceResponse::from),
            date_joined: account.date_joined,
        }
    }
}
