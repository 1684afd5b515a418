//! `/auth/*` endpoints.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ApiClient;
use crate::error::ApiError;
use crate::session::{Principal, Role};

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// User block inside the auth payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub company_id: Option<u64>,
    #[serde(default)]
    pub agent_id: Option<u64>,
}

/// `data` of a login or refresh response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl AuthPayload {
    /// Builds the principal. When the payload has no `user` block (some
    /// refresh responses), identity fields come from `previous`.
    pub fn into_principal(self, previous: Option<&Principal>) -> Result<Principal, ApiError> {
        let token_type = self
            .token_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Bearer".to_string());

        let (id, name, email, role, company_id, agent_id) = match (self.user, previous) {
            (Some(user), _) => (
                user.id,
                user.name,
                user.email,
                user.role,
                user.company_id,
                user.agent_id,
            ),
            (None, Some(prev)) => (
                prev.id,
                prev.name.clone(),
                prev.email.clone(),
                prev.role,
                prev.company_id,
                prev.agent_id,
            ),
            (None, None) => {
                return Err(ApiError::Decode {
                    detail: "auth response has no user".to_string(),
                });
            }
        };

        Ok(Principal {
            id,
            name,
            email,
            role,
            company_id,
            agent_id,
            access_token: self.access_token,
            token_type,
            expires_in: self.expires_in,
            issued_at: Utc::now(),
        })
    }
}

/// `POST /auth/login`. Does not touch the session.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<Principal, ApiError> {
    let payload: AuthPayload = client
        .post("auth/login", &Credentials { email, password })
        .await?;
    payload.into_principal(None)
}

/// `POST /auth/refresh` with the current token. Does not touch the session.
pub async fn refresh(client: &ApiClient) -> Result<Principal, ApiError> {
    client.send_refresh().await
}

/// `POST /auth/logout`.
pub async fn logout(client: &ApiClient) -> Result<Option<String>, ApiError> {
    client.post_for_message("auth/logout", &json!({})).await
}

/// `POST /auth/forgot-password`.
pub async fn forgot_password(client: &ApiClient, email: &str) -> Result<Option<String>, ApiError> {
    client
        .post_for_message("auth/forgot-password", &json!({ "email": email }))
        .await
}
