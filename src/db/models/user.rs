//! User accounts and their sanitized client-facing projection.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{now_rfc3339, DbPool};

/// Membership role. Checks against roles are exact-match: `Admin` does
/// not implicitly satisfy a check for `Pastor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Member,
    Leader,
    Pastor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Leader => "leader",
            Role::Pastor => "pastor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub last_seen: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Client-facing user record. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub last_seen: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone_number: user.phone_number,
            role: user.role,
            is_active: user.is_active,
            google_id: user.google_id,
            profile_picture: user.profile_picture,
            last_seen: user.last_seen,
            created_at: user.created_at,
        }
    }
}

/// Fields needed to create a new account. Everything else takes its
/// schema default.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
}

impl User {
    pub async fn find_by_id(pool: &DbPool, id: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lookup by email, case-normalized. Email is the login identifier.
    pub async fn find_by_email(pool: &DbPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// Admin login accepts either the display name or the email.
    pub async fn find_by_name_or_email(pool: &DbPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE name = ? OR email = ?")
            .bind(username)
            .bind(username.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &DbPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    pub async fn insert(pool: &DbPool, new: NewUser) -> sqlx::Result<User> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, phone_number, role, is_active, \
             google_id, profile_picture, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(new.email.trim().to_lowercase())
        .bind(&new.password_hash)
        .bind(new.name.trim())
        .bind(&new.phone_number)
        .bind(new.role)
        .bind(&new.google_id)
        .bind(&new.profile_picture)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        let user = Self::find_by_id(pool, &id).await?;
        user.ok_or(sqlx::Error::RowNotFound)
    }

    /// Record that the user was just seen. Called on every successful
    /// authentication; failures are the caller's to swallow.
    pub async fn touch_last_seen(pool: &DbPool, id: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
            .bind(now_rfc3339())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Link a federated subject id to this account, optionally filling
    /// in a profile picture the account did not have.
    pub async fn link_google(
        pool: &DbPool,
        id: &str,
        google_id: &str,
        profile_picture: Option<&str>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET google_id = ?, \
             profile_picture = COALESCE(profile_picture, ?), updated_at = ? WHERE id = ?",
        )
        .bind(google_id)
        .bind(profile_picture)
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_profile(
        pool: &DbPool,
        id: &str,
        name: Option<&str>,
        phone_number: Option<Option<&str>>,
    ) -> sqlx::Result<()> {
        if let Some(name) = name {
            sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
                .bind(name.trim())
                .bind(now_rfc3339())
                .bind(id)
                .execute(pool)
                .await?;
        }
        if let Some(phone) = phone_number {
            sqlx::query("UPDATE users SET phone_number = ?, updated_at = ? WHERE id = ?")
                .bind(phone.map(str::trim))
                .bind(now_rfc3339())
                .bind(id)
                .execute(pool)
                .await?;
        }
        Ok(())
    }

    pub async fn set_password(pool: &DbPool, id: &str, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now_rfc3339())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_role(pool: &DbPool, id: &str, role: Role) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role)
            .bind(now_rfc3339())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_active(pool: &DbPool, id: &str, is_active: bool) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(now_rfc3339())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
