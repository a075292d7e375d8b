use std::sync::Arc;

use rand::RngCore;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        store::{User, UserChanges, UserStore},
    },
    email::Mailer,
    error::{ApiError, ApiResult},
};

/// Returned for every forgot-password request, existing account or not, so
/// the endpoint cannot be used to probe which emails are registered.
pub const PASSWORD_RESET_REQUESTED: &str =
    "If that email address is registered, a password reset link has been sent";

pub const PASSWORD_RESET_DONE: &str = "Password reset successfully";

const RESET_TOKEN_TTL: Duration = Duration::hours(1);
const RESET_TOKEN_BYTES: usize = 32;

/// Sanitized user view. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Sanitized user including timestamps, for credential-check call sites.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct AuthSuccess {
    pub user: PublicUser,
    pub token: String,
}

/// Orchestrates registration, login and the password-reset lifecycle over
/// explicitly wired collaborators.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>, keys: JwtKeys) -> Self {
        Self {
            users,
            mailer,
            keys,
        }
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<AuthSuccess> {
        if self.users.find_by_email(email).await?.is_some() {
            warn!(email = %email, "registration for existing email");
            return Err(ApiError::Conflict);
        }

        let hash = hash_password(password)?;
        // The store's unique index still backstops concurrent registrations.
        let user = self.users.create(name, email, &hash).await?;
        let token = self.keys.sign(user.id, &user.email)?;

        info!(user_id = %user.id, "user registered");
        Ok(AuthSuccess {
            user: PublicUser::from(&user),
            token,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSuccess> {
        // Unknown email and wrong password must be indistinguishable.
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(email = %email, "login for unknown email");
            return Err(ApiError::Unauthorized);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login with invalid password");
            return Err(ApiError::Unauthorized);
        }

        let token = self.keys.sign(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthSuccess {
            user: PublicUser::from(&user),
            token,
        })
    }

    /// Credential check without an error channel: `None` for any failure.
    pub async fn validate_user(&self, email: &str, password: &str) -> ApiResult<Option<ValidatedUser>> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(None);
        };
        if !verify_password(password, &user.password_hash)? {
            return Ok(None);
        }
        Ok(Some(ValidatedUser {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }))
    }

    /// Partial profile update for the authenticated user. A plaintext
    /// password is hashed here; an email change hits the unique index.
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> ApiResult<PublicUser> {
        let password_hash = password.as_deref().map(hash_password).transpose()?;
        let changes = UserChanges {
            name,
            email,
            password_hash,
        };
        let user = self
            .users
            .update(id, changes)
            .await?
            .ok_or(ApiError::NotFound("User not found"))?;
        info!(user_id = %id, "profile updated");
        Ok(PublicUser::from(&user))
    }

    pub async fn delete_account(&self, id: Uuid) -> ApiResult<()> {
        self.users
            .delete(id)
            .await?
            .ok_or(ApiError::NotFound("User not found"))?;
        info!(user_id = %id, "account deleted");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> ApiResult<&'static str> {
        let Some(user) = self.users.find_by_email(email).await? else {
            // No side effects for unknown accounts, same response shape.
            info!("password reset requested for unknown email");
            return Ok(PASSWORD_RESET_REQUESTED);
        };

        let token = generate_reset_token();
        let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;

        // The token must be durably stored before the email goes out; a
        // failed write must not produce a link that can never redeem.
        self.users.set_reset_token(user.id, &token, expires).await?;
        self.mailer.send_password_reset(&user.email, &token).await?;

        info!(user_id = %user.id, "password reset email queued");
        Ok(PASSWORD_RESET_REQUESTED)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<&'static str> {
        let invalid = || ApiError::BadRequest("Invalid or expired reset token".into());

        let Some(user) = self.users.find_by_reset_token(token).await? else {
            return Err(invalid());
        };

        // Expiry is enforced lazily at redemption time.
        match user.reset_password_expires {
            Some(expires) if expires > OffsetDateTime::now_utc() => {}
            _ => return Err(invalid()),
        }

        let hash = hash_password(new_password)?;
        // Clearing both reset fields makes the token single-use.
        self.users.update_password(user.id, &hash).await?;

        info!(user_id = %user.id, "password reset");
        Ok(PASSWORD_RESET_DONE)
    }
}

/// 256 bits from the OS RNG, hex-encoded so it is URL-safe.
pub(crate) fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
