use anyhow::Context;
use axum::{async_trait, extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{
    auth::{handlers::is_valid_email, jwt::AuthUser, service::generate_reset_token},
    config::EmailConfig,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Outbound email contract. The auth service only ever talks to this trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, email: &str, reset_token: &str) -> anyhow::Result<()>;
    async fn send_custom(
        &self,
        to: &str,
        subject: &str,
        html: Option<&str>,
        text: Option<&str>,
    ) -> anyhow::Result<()>;
}

/// Mailer backed by the Resend HTTP API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from_address: String,
    frontend_url: String,
}

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

impl ResendMailer {
    pub fn new(cfg: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: cfg.resend_api_key.clone(),
            from_address: cfg.from_address.clone(),
            frontend_url: cfg.frontend_url.clone(),
        }
    }

    async fn post(&self, body: serde_json::Value) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("resend request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("resend returned {}", resp.status());
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_password_reset(&self, email: &str, reset_token: &str) -> anyhow::Result<()> {
        let reset_url = format!("{}/reset-password?token={}", self.frontend_url, reset_token);
        self.post(json!({
            "from": self.from_address,
            "to": [email],
            "subject": "Reset your password - Cinelist",
            "html": password_reset_template(&reset_url),
        }))
        .await?;
        info!(email = %email, "password reset email sent");
        Ok(())
    }

    async fn send_custom(
        &self,
        to: &str,
        subject: &str,
        html: Option<&str>,
        text: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut body = json!({
            "from": self.from_address,
            "to": [to],
            "subject": subject,
        });
        if let Some(html) = html {
            body["html"] = json!(html);
        }
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.post(body).await?;
        info!(to = %to, subject = %subject, "custom email sent");
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email/send", post(send_email))
        .route("/email/send-password-reset", post(send_password_reset))
}

#[derive(Debug, Deserialize)]
struct SendEmailRequest {
    to: String,
    subject: String,
    html: Option<String>,
    text: Option<String>,
}

#[instrument(skip(state, payload))]
async fn send_email(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(payload): Json<SendEmailRequest>,
) -> ApiResult<Json<Value>> {
    if !is_valid_email(payload.to.trim()) {
        return Err(ApiError::BadRequest("Invalid recipient email".into()));
    }
    if payload.subject.trim().is_empty() {
        return Err(ApiError::BadRequest("Subject is required".into()));
    }
    if payload.html.is_none() && payload.text.is_none() {
        return Err(ApiError::BadRequest(
            "Either html or text body is required".into(),
        ));
    }

    state
        .mailer
        .send_custom(
            payload.to.trim(),
            payload.subject.trim(),
            payload.html.as_deref(),
            payload.text.as_deref(),
        )
        .await?;

    Ok(Json(json!({ "message": "Email sent" })))
}

#[derive(Debug, Deserialize)]
struct SendPasswordResetRequest {
    email: String,
}

/// Fires a reset email with a fresh throwaway token. The redeemable flow is
/// `/auth/forgot-password`; this endpoint only exercises delivery.
#[instrument(skip(state, payload))]
async fn send_password_reset(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(payload): Json<SendPasswordResetRequest>,
) -> ApiResult<Json<Value>> {
    let email = payload.email.trim();
    dispatch_password_reset(state.mailer.as_ref(), email).await?;
    Ok(Json(json!({
        "message": "Password reset email sent",
        "email": email,
    })))
}

async fn dispatch_password_reset(mailer: &dyn Mailer, email: &str) -> ApiResult<()> {
    if !is_valid_email(email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    let token = generate_reset_token();
    mailer.send_password_reset(email, &token).await?;
    Ok(())
}

fn password_reset_template(reset_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
      <h1>Cinelist</h1>
      <h2>Reset your password</h2>
      <p>You requested a password reset. Click the button below to choose a new password:</p>
      <a href="{reset_url}"
         style="display: inline-block; background: #007bff; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px;">
        Reset password
      </a>
      <p>If you did not request this, you can safely ignore this email.</p>
      <p><strong>This link expires in 1 hour.</strong></p>
    </div>
  </body>
</html>"#
    )
}

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;

    use super::*;

    /// Records every send so tests can assert on side effects.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub reset_emails: Mutex<Vec<(String, String)>>,
        pub custom_emails: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_password_reset(&self, email: &str, reset_token: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("mailer down");
            }
            self.reset_emails
                .lock()
                .unwrap()
                .push((email.to_string(), reset_token.to_string()));
            Ok(())
        }

        async fn send_custom(
            &self,
            to: &str,
            subject: &str,
            _html: Option<&str>,
            _text: Option<&str>,
        ) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("mailer down");
            }
            self.custom_emails
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }
}
