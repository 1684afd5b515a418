//! HTTP client for the service-desk backend.
//!
//! Every request carries the session's `Authorization` header. A 401 from a
//! regular endpoint triggers one token refresh followed by one replay of the
//! original request; a 401 from login/refresh, or a second 401 after the
//! replay, is final. If the refresh itself fails the session is torn down
//! and the caller gets [`ApiError::SessionExpired`].

pub mod auth;
pub mod companies;
pub mod projects;

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use self::auth::AuthPayload;
use crate::config::Config;
use crate::error::ApiError;
use crate::session::{Principal, Session};

const LOGIN_PATH: &str = "auth/login";
const REFRESH_PATH: &str = "auth/refresh";

/// `{success, data, message}` wrapper used by every JSON response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Some endpoints skip the envelope and return the payload directly.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Enveloped(Envelope<T>),
    Bare(T),
}

/// Whether a request is the first try or the replay after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Replayed,
}

/// A request that can be sent again after a refresh.
#[derive(Debug, Clone)]
struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.trim_start_matches('/').to_string(),
            query: Vec::new(),
            body: None,
        }
    }

    fn query<Q: Serialize>(mut self, query: &Q) -> Result<Self, ApiError> {
        self.query = query_pairs(query)?;
        Ok(self)
    }

    fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode {
            detail: format!("failed to encode request body: {e}"),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Login and refresh never go through the refresh cycle.
    fn is_auth_endpoint(&self) -> bool {
        self.path.starts_with(LOGIN_PATH) || self.path.starts_with(REFRESH_PATH)
    }
}

/// Flattens a serializable struct into query pairs. `None` fields are
/// expected to be skipped by the struct itself.
fn query_pairs<Q: Serialize>(query: &Q) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(query).map_err(|e| ApiError::Decode {
        detail: format!("failed to encode query: {e}"),
    })?;
    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, text))
        })
        .collect())
}

/// Backend client bound to one [`Session`].
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
    refresh_lock: std::sync::Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(base_url: Url, timeout: Duration, session: Session) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            session,
            refresh_lock: std::sync::Arc::new(Mutex::new(())),
        })
    }

    /// Builds a client from the resolved base URL and timeout in `config`.
    pub fn from_config(config: &Config, session: Session) -> anyhow::Result<Self> {
        Self::new(
            config.resolve_base_url()?,
            config.request_timeout(),
            session,
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn get_with<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        self.fetch(ApiRequest::new(Method::GET, path).query(query)?)
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.fetch(ApiRequest::new(Method::POST, path).json(body)?)
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.fetch(ApiRequest::new(Method::PUT, path).json(body)?)
            .await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(ApiRequest::new(Method::PATCH, path)).await
    }

    /// Sends a DELETE and returns the backend message, if any.
    pub async fn delete(&self, path: &str) -> Result<Option<String>, ApiError> {
        self.fetch_message(ApiRequest::new(Method::DELETE, path))
            .await
    }

    /// Sends a POST whose response data is irrelevant; returns the message.
    pub async fn post_for_message<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<String>, ApiError> {
        self.fetch_message(ApiRequest::new(Method::POST, path).json(body)?)
            .await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(&request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;
        decode_data(status, &body)
    }

    async fn fetch_message(&self, request: ApiRequest) -> Result<Option<String>, ApiError> {
        let response = self.execute(&request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str::<Envelope<Value>>(&body)
            .ok()
            .and_then(|envelope| envelope.message))
    }

    /// Sends `request`, refreshing and replaying once on a 401.
    /// Returns the response only if it is a success.
    async fn execute(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let mut attempt = Attempt::First;
        loop {
            let sent_with = self.session.authorization();
            let response = self.dispatch(request, sent_with.as_deref()).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED
                && attempt == Attempt::First
                && !request.is_auth_endpoint()
            {
                tracing::info!(path = %request.path, "access token rejected, refreshing");
                self.refresh_after_rejection(sent_with).await?;
                attempt = Attempt::Replayed;
                continue;
            }

            return Err(error_from_response(response).await);
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        authorization: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| ApiError::Decode {
                detail: format!("invalid request path {}: {e}", request.path),
            })?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(method = %request.method, path = %request.path, error = %e, "request failed");
            ApiError::from_transport(&e)
        })?;
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = response.status().as_u16(),
            "api response"
        );
        Ok(response)
    }

    /// Refreshes the token unless another request already did so since
    /// `rejected` was sent.
    ///
    /// The refresh runs on its own task so that a caller dropping this
    /// future (a cancelled fetch) cannot lose a rotated token halfway.
    async fn refresh_after_rejection(&self, rejected: Option<String>) -> Result<(), ApiError> {
        let client = self.clone();
        let task =
            tokio::spawn(async move { client.refresh_unless_current(rejected.as_deref()).await });

        task.await.map_err(|e| ApiError::Network {
            timeout: false,
            detail: format!("token refresh task failed: {e}"),
        })?
    }

    /// Tears the session down if the refresh fails.
    async fn refresh_unless_current(&self, rejected: Option<&str>) -> Result<(), ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.session.authorization();
        if current.is_some() && current.as_deref() != rejected {
            tracing::debug!("token already refreshed by a concurrent request");
            return Ok(());
        }

        match self.send_refresh().await {
            Ok(principal) => {
                if let Err(err) = self.session.replace(principal) {
                    tracing::warn!(error = %format!("{err:#}"), "failed to persist refreshed session");
                }
                tracing::info!("access token refreshed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed, ending session");
                if let Err(teardown) = self.session.teardown() {
                    tracing::warn!(error = %format!("{teardown:#}"), "failed to clear session");
                }
                Err(ApiError::SessionExpired {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// `POST auth/refresh` with the current token, sent straight through
    /// [`Self::dispatch`]: a rejected refresh is final. Does not touch the
    /// session.
    async fn send_refresh(&self) -> Result<Principal, ApiError> {
        let previous = self.session.current();
        let authorization = previous.as_ref().map(Principal::authorization_header);
        let request = ApiRequest::new(Method::POST, REFRESH_PATH).json(&json!({}))?;

        let response = self.dispatch(&request, authorization.as_deref()).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;
        let payload: AuthPayload = decode_data(status, &body)?;
        payload.into_principal(previous.as_ref())
    }
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::from_response(status, &body)
}

fn decode_data<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ApiError> {
    let payload: Payload<T> = serde_json::from_str(body).map_err(|e| ApiError::Decode {
        detail: e.to_string(),
    })?;

    match payload {
        Payload::Enveloped(Envelope {
            success: Some(false),
            message,
            ..
        }) => Err(ApiError::Http {
            status: status.as_u16(),
            message,
        }),
        Payload::Enveloped(envelope) => Ok(envelope.data),
        Payload::Bare(data) => Ok(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, ProjectQuery};

    #[test]
    fn test_auth_endpoints_detected() {
        assert!(ApiRequest::new(Method::POST, "/auth/login").is_auth_endpoint());
        assert!(ApiRequest::new(Method::POST, "auth/refresh").is_auth_endpoint());
        assert!(!ApiRequest::new(Method::POST, "/auth/logout").is_auth_endpoint());
        assert!(!ApiRequest::new(Method::GET, "/companies").is_auth_endpoint());
    }

    #[test]
    fn test_query_pairs_from_struct() {
        let query = ProjectQuery {
            page: 2,
            per_page: 10,
            search: Some("portal web".into()),
            is_active: Some(false),
            show_inactive: true,
            ..Default::default()
        };
        let mut pairs = query_pairs(&query).unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("is_active".to_string(), "false".to_string()),
                ("page".to_string(), "2".to_string()),
                ("per_page".to_string(), "10".to_string()),
                ("search".to_string(), "portal web".to_string()),
                ("show_inactive".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_enveloped_and_bare_pages() {
        let enveloped = json!({
            "success": true,
            "data": {"data": [1, 2], "current_page": 1, "per_page": 2, "total": 2, "last_page": 1},
            "message": "ok"
        })
        .to_string();
        let page: Page<u32> = decode_data(StatusCode::OK, &enveloped).unwrap();
        assert_eq!(page.data, vec![1, 2]);

        let bare = json!({"data": [3], "current_page": 1, "per_page": 10, "total": 1, "last_page": 1})
            .to_string();
        let page: Page<u32> = decode_data(StatusCode::OK, &bare).unwrap();
        assert_eq!(page.data, vec![3]);
    }

    #[test]
    fn test_decode_unsuccessful_envelope() {
        let body = json!({"success": false, "data": null, "message": "Falhou"}).to_string();
        let err = decode_data::<Option<u32>>(StatusCode::OK, &body).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 200: Falhou");
    }
}
