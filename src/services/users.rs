use serde::Deserialize;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{Account, Role, UserResponse},
    services::{accounts::validate_identity, auth::require_admin},
};

/// Admin update payload; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

async fn load(repo: &dyn Repository, id: i64) -> AppResult<Account> {
    repo.account_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

async fn respond(repo: &dyn Repository, account: &Account) -> AppResult<UserResponse> {
    let preference = repo.preference_for(account.id).await?;
    Ok(UserResponse::new(account, preference.as_ref()))
}

pub async fn list_users(repo: &dyn Repository, actor: &Account) -> AppResult<Vec<UserResponse>> {
    require_admin(actor)?;

    let accounts = repo.list_accounts().await?;
    let mut users = Vec::with_capacity(accounts.len());
    for account in &accounts {
        users.push(respond(repo, account).await?);
    }
    Ok(users)
}

pub async fn get_user(repo: &dyn Repository, actor: &Account, id: i64) -> AppResult<UserResponse> {
    require_admin(actor)?;
    let account = load(repo, id).await?;
    respond(repo, &account).await
}

pub async fn update_user(
    repo: &dyn Repository,
    actor: &Account,
    id: i64,
    update: AdminUserUpdate,
) -> AppResult<UserResponse> {
    require_admin(actor)?;
    let mut account = load(repo, id).await?;

    if let Some(username) = update.username {
        account.username = username.trim().to_string();
    }
    if let Some(email) = update.email {
        account.email = email.trim().to_string();
    }
    validate_identity(&account.username, &account.email)?;

    if let Some(role) = update.role {
        account.role = role;
        account.is_superuser = role == Role::Admin;
    }
    if let Some(is_active) = update.is_active {
        account.is_active = is_active;
    }

    let account = repo.update_account(&account).await?;

    tracing::info!(
        admin_id = actor.id,
        user_id = account.id,
        role = %account.role,
        is_active = account.is_active,
        "Admin updated user"
    );

    respond(repo, &account).await
}

/// Deletes an account; never the caller's own and never a superuser
pub async fn delete_user(repo: &dyn Repository, actor: &Account, id: i64) -> AppResult<()> {
    require_admin(actor)?;

    if actor.id == id {
        return Err(AppError::Forbidden(
            "You cannot delete your own account".to_string(),
        ));
    }

    let account = load(repo, id).await?;
    if account.is_superuser {
        return Err(AppError::Forbidden(
            "Superuser accounts cannot be deleted".to_string(),
        ));
    }

    repo.delete_account(id).await?;

    tracing::info!(admin_id = actor.id, user_id = id, "Admin deleted user");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::models::NewAccount;

    async fn account(repo: &MemoryRepository, username: &str, role: Role) -> Account {
        repo.create_account(NewAccount {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: String::new(),
            role,
            is_superuser: role == Role::Admin,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_non_admin_forbidden() {
        let repo = MemoryRepository::new();
        let user = account(&repo, "alice", Role::User).await;

        assert!(matches!(
            list_users(&repo, &user).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            delete_user(&repo, &user, 99).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_self_and_superuser_blocked() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        let other_admin = account(&repo, "boss", Role::Admin).await;

        assert!(matches!(
            delete_user(&repo, &admin, admin.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            delete_user(&repo, &admin, other_admin.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(repo.account_by_id(other_admin.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_regular_user() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        let user = account(&repo, "alice", Role::User).await;

        delete_user(&repo, &admin, user.id).await.unwrap();
        assert!(repo.account_by_id(user.id).await.unwrap().is_none());
        assert!(matches!(
            delete_user(&repo, &admin, user.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_role_keeps_superuser_in_sync() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        let user = account(&repo, "alice", Role::User).await;

        let promoted = update_user(
            &repo,
            &admin,
            user.id,
            AdminUserUpdate {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(promoted.is_superuser);

        let demoted = update_user(
            &repo,
            &admin,
            user.id,
            AdminUserUpdate {
                role: Some(Role::User),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!demoted.is_superuser);
        assert!(!demoted.is_active);
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let repo = MemoryRepository::new();
        let admin = account(&repo, "root", Role::Admin).await;
        let user = account(&repo, "alice", Role::User).await;

        let result = update_user(
            &repo,
            &admin,
            user.id,
            AdminUserUpdate {
                username: Some("root".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
