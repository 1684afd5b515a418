//! Error type for backend calls.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Field name -> first validation message.
pub type FieldErrors = BTreeMap<String, String>;

/// Shown whenever a refresh failure forced the session closed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Sessão expirada. Faça login novamente.";

/// Failure of a backend call.
///
/// Variants holding `message: Option<String>` carry the backend-provided
/// text when the response body had one.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Field-level problems, from local form checks or a 422 response.
    #[error("{}", .message.as_deref().unwrap_or("Dados inválidos"))]
    Validation {
        message: Option<String>,
        fields: FieldErrors,
    },

    /// A 401 that is final: login/refresh rejected, or the replay after a
    /// refresh was rejected again.
    #[error("{}", .message.as_deref().unwrap_or("Não autorizado"))]
    Unauthorized { message: Option<String> },

    /// The refresh call failed and the session was torn down.
    #[error("{SESSION_EXPIRED_MESSAGE}")]
    SessionExpired { reason: String },

    #[error("{}", .message.as_deref().unwrap_or("Acesso negado"))]
    Forbidden { message: Option<String> },

    #[error("{}", .message.as_deref().unwrap_or("Registro não encontrado"))]
    NotFound { message: Option<String> },

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("erro no servidor"))]
    Http {
        status: u16,
        message: Option<String>,
    },

    /// No response: connection failure or timeout.
    #[error("{}", network_message(.timeout))]
    Network { timeout: bool, detail: String },

    /// The response arrived but did not match the expected shape.
    #[error("Resposta inválida do servidor: {detail}")]
    Decode { detail: String },
}

/// Error body shape: `{ "message": "...", "errors": { "field": ["..."] } }`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Value>>,
}

impl ApiError {
    /// Classifies a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        let fields = parsed.errors.map(flatten_field_errors).unwrap_or_default();

        match status {
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            422 => Self::Validation { message, fields },
            _ if !fields.is_empty() => Self::Validation { message, fields },
            _ => Self::Http { status, message },
        }
    }

    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode {
                detail: err.to_string(),
            };
        }
        Self::Network {
            timeout: err.is_timeout(),
            detail: err.to_string(),
        }
    }

    /// Local validation failure.
    pub fn validation(fields: FieldErrors) -> Self {
        Self::Validation {
            message: None,
            fields,
        }
    }

    /// The backend message, or `fallback` when there is none.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation { message, .. }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Http { message, .. } => {
                message.clone().unwrap_or_else(|| fallback.to_string())
            }
            Self::SessionExpired { .. } => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Network { .. } | Self::Decode { .. } => fallback.to_string(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Field errors carried by a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn network_message(timeout: &bool) -> &'static str {
    if *timeout {
        "Tempo limite da requisição excedido"
    } else {
        "Falha de conexão com o servidor"
    }
}

/// Keeps the first message for each field.
fn flatten_field_errors(errors: BTreeMap<String, Value>) -> FieldErrors {
    errors
        .into_iter()
        .filter_map(|(field, value)| {
            let message = match value {
                Value::String(s) => Some(s),
                Value::Array(items) => items.into_iter().find_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                }),
                _ => None,
            }?;
            Some((field, message))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_422_collects_first_message_per_field() {
        let body = r#"{"message":"The given data was invalid.","errors":{"email":["Email já cadastrado","outro"],"cnpj":"CNPJ inválido","noise":42}}"#;
        let err = ApiError::from_response(422, body);

        let fields = err.field_errors().unwrap();
        assert_eq!(fields.get("email").unwrap(), "Email já cadastrado");
        assert_eq!(fields.get("cnpj").unwrap(), "CNPJ inválido");
        assert!(!fields.contains_key("noise"));
        assert_eq!(err.to_string(), "The given data was invalid.");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ApiError::from_response(401, "{}"),
            ApiError::Unauthorized { message: None }
        ));
        assert!(matches!(
            ApiError::from_response(403, "{}"),
            ApiError::Forbidden { .. }
        ));
        assert!(ApiError::from_response(404, "").is_not_found());
        assert!(matches!(
            ApiError::from_response(500, "<html>oops</html>"),
            ApiError::Http {
                status: 500,
                message: None
            }
        ));
    }

    /// Backend message wins; otherwise the caller's fallback.
    #[test]
    fn test_user_message_fallbacks() {
        let with_message = ApiError::from_response(401, r#"{"message":"Credenciais inválidas"}"#);
        assert_eq!(
            with_message.user_message("Erro ao autenticar"),
            "Credenciais inválidas"
        );

        let blank = ApiError::from_response(401, r#"{"message":"   "}"#);
        assert_eq!(blank.user_message("Erro ao autenticar"), "Erro ao autenticar");

        let network = ApiError::Network {
            timeout: true,
            detail: "operation timed out".to_string(),
        };
        assert_eq!(network.user_message("Erro ao autenticar"), "Erro ao autenticar");
        assert_eq!(network.to_string(), "Tempo limite da requisição excedido");
    }

    #[test]
    fn test_session_expired_is_distinct_from_network() {
        let expired = ApiError::SessionExpired {
            reason: "refresh returned 401".to_string(),
        };
        assert!(expired.is_session_expired());
        assert_eq!(expired.user_message("x"), SESSION_EXPIRED_MESSAGE);

        let network = ApiError::Network {
            timeout: false,
            detail: "connection refused".to_string(),
        };
        assert!(!network.is_session_expired());
    }
}
