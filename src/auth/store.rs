use axum::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// User record as persisted. The password hash and reset-token fields never
/// leave the service layer in JSON form.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Partial profile update: `Some` fields are written, `None` fields left
/// alone. The password arrives already hashed.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}

/// Persistence contract the auth service depends on.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>>;
    /// Matches only users whose stored token is currently non-null; expiry is
    /// checked by the caller, not here.
    async fn find_by_reset_token(&self, token: &str) -> ApiResult<Option<User>>;
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> ApiResult<User>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> ApiResult<Option<User>>;
    async fn delete(&self, id: Uuid) -> ApiResult<Option<User>>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> ApiResult<()>;
    /// Stores the new hash and clears both reset fields in one statement.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> ApiResult<()>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, reset_password_token, \
     reset_password_expires, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_reset_token(&self, token: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_password_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, name: &str, email: &str, password_hash: &str) -> ApiResult<User> {
        let res = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(user) => Ok(user),
            // The unique index on email is the authoritative conflict signal;
            // the service's pre-check only covers the common case.
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(ApiError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> ApiResult<Option<User>> {
        if changes.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = now()");
        if let Some(name) = changes.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(email) = changes.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(hash) = changes.password_hash {
            qb.push(", password_hash = ").push_bind(hash);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {USER_COLUMNS}"));

        match qb.build_query_as::<User>().fetch_optional(&self.pool).await {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(ApiError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> ApiResult<()> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_password_expires = $3, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> ApiResult<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, reset_password_token = NULL, \
             reset_password_expires = NULL, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-memory store for unit tests of the auth service.
    #[derive(Default)]
    pub struct InMemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.id == id).cloned())
        }

        async fn find_by_reset_token(&self, token: &str) -> ApiResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .find(|u| u.reset_password_token.as_deref() == Some(token))
                .cloned())
        }

        async fn create(&self, name: &str, email: &str, password_hash: &str) -> ApiResult<User> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == email) {
                return Err(ApiError::Conflict);
            }
            let now = OffsetDateTime::now_utc();
            let user = User {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                reset_password_token: None,
                reset_password_expires: None,
                created_at: now,
                updated_at: now,
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn update(&self, id: Uuid, changes: UserChanges) -> ApiResult<Option<User>> {
            let mut users = self.users.lock().unwrap();
            if let Some(email) = &changes.email {
                if users.iter().any(|u| u.email == *email && u.id != id) {
                    return Err(ApiError::Conflict);
                }
            }
            let Some(user) = users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            if let Some(name) = changes.name {
                user.name = name;
            }
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(hash) = changes.password_hash {
                user.password_hash = hash;
            }
            user.updated_at = OffsetDateTime::now_utc();
            Ok(Some(user.clone()))
        }

        async fn delete(&self, id: Uuid) -> ApiResult<Option<User>> {
            let mut users = self.users.lock().unwrap();
            let pos = users.iter().position(|u| u.id == id);
            Ok(pos.map(|i| users.remove(i)))
        }

        async fn set_reset_token(
            &self,
            id: Uuid,
            token: &str,
            expires: OffsetDateTime,
        ) -> ApiResult<()> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                user.reset_password_token = Some(token.to_string());
                user.reset_password_expires = Some(expires);
                user.updated_at = OffsetDateTime::now_utc();
            }
            Ok(())
        }

        async fn update_password(&self, id: Uuid, password_hash: &str) -> ApiResult<()> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                user.password_hash = password_hash.to_string();
                user.reset_password_token = None;
                user.reset_password_expires = None;
                user.updated_at = OffsetDateTime::now_utc();
            }
            Ok(())
        }
    }

    impl InMemoryUserStore {
        /// Test helper: force-expire a pending reset token.
        pub fn expire_reset_token(&self, id: Uuid, at: OffsetDateTime) {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                user.reset_password_expires = Some(at);
            }
        }
    }
}
