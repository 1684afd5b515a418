//! Login and logout orchestration.
//!
//! [`AuthContext`] owns the loading flag and last error for the login flow
//! and writes the principal into the shared [`Session`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::api::{self, ApiClient};
use crate::error::ApiError;
use crate::session::{Principal, Session};

/// Shown when email or password is blank.
pub const CREDENTIALS_REQUIRED: &str = "Informe e-mail e senha para continuar.";
/// Shown when a login fails without a backend message.
pub const LOGIN_FAILED: &str = "Erro ao autenticar";
pub const EMAIL_REQUIRED: &str = "Informe seu e-mail.";
const FORGOT_PASSWORD_FAILED: &str = "Erro ao solicitar redefinição de senha";
const FORGOT_PASSWORD_SENT: &str = "Se o e-mail estiver cadastrado, você receberá as instruções.";

/// Login state shared by every clone.
#[derive(Debug, Clone)]
pub struct AuthContext {
    client: ApiClient,
    loading: Arc<AtomicBool>,
    error: Arc<Mutex<Option<String>>>,
}

impl AuthContext {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            loading: Arc::new(AtomicBool::new(false)),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &Session {
        self.client.session()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.session().current()
    }

    /// True while a login call is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Message of the last failed login, cleared when a new one starts.
    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_error(&self, message: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }

    /// Authenticates and makes the returned principal current.
    ///
    /// Blank credentials fail locally without a request. On failure the
    /// previous session, if any, is left as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, ApiError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            self.set_error(Some(CREDENTIALS_REQUIRED.to_string()));
            return Err(ApiError::Validation {
                message: Some(CREDENTIALS_REQUIRED.to_string()),
                fields: crate::error::FieldErrors::new(),
            });
        }

        self.loading.store(true, Ordering::SeqCst);
        self.set_error(None);

        let result = api::auth::login(&self.client, email, password).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(principal) => {
                if let Err(err) = self.session().replace(principal.clone()) {
                    tracing::warn!(error = %format!("{err:#}"), "failed to persist session");
                }
                tracing::info!(user_id = principal.id, role = %principal.role, "logged in");
                Ok(principal)
            }
            Err(err) => {
                tracing::info!(error = %err, "login failed");
                self.set_error(Some(err.user_message(LOGIN_FAILED)));
                Err(err)
            }
        }
    }

    /// Ends the session locally. No request is sent.
    pub fn logout(&self) -> Result<()> {
        let had_session = self.session().is_authenticated();
        self.session().teardown()?;
        self.set_error(None);
        if had_session {
            tracing::info!("logged out");
        }
        Ok(())
    }

    /// Tells the backend first (best effort, outcome ignored), then ends
    /// the session locally.
    pub async fn logout_remote(&self) -> Result<()> {
        if self.session().is_authenticated()
            && let Err(err) = api::auth::logout(&self.client).await
        {
            tracing::debug!(error = %err, "remote logout failed, ignoring");
        }
        self.logout()
    }

    /// Requests a password reset email. Returns the message to show.
    pub async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ApiError::Validation {
                message: Some(EMAIL_REQUIRED.to_string()),
                fields: crate::error::FieldErrors::new(),
            });
        }

        match api::auth::forgot_password(&self.client, email).await {
            Ok(message) => Ok(message.unwrap_or_else(|| FORGOT_PASSWORD_SENT.to_string())),
            Err(err) => Err(ApiError::Validation {
                message: Some(err.user_message(FORGOT_PASSWORD_FAILED)),
                fields: err.field_errors().cloned().unwrap_or_default(),
            }),
        }
    }
}
