use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use trogon_llm::{LlmError, RouterError};
use trogon_vault::VaultError;

/// Failures while answering an agent request.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl SandboxError {
    /// A message safe to show the tenant.
    pub fn user_message(&self) -> String {
        match self {
            Self::Vault(err) => err.user_message(),
            Self::Router(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
        }
    }
}

/// An HTTP error with a `{code, message}` body.
///
/// `message` is always user-facing text; internal detail goes to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request:api", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized:api",
            "You need to sign in before continuing.",
        )
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        let (status, code) = match &err {
            VaultError::UnsupportedProvider(_) | VaultError::InvalidCredential(_) => {
                (StatusCode::BAD_REQUEST, "bad_request:api")
            }
            VaultError::Authentication | VaultError::Format(_) => {
                (StatusCode::CONFLICT, "corrupted:credential")
            }
            VaultError::Configuration(_) | VaultError::Encryption | VaultError::Store(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable:vault")
            }
        };
        Self::new(status, code, err.user_message())
    }
}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        let (status, code) = match &err {
            RouterError::UnknownProvider { .. } | RouterError::InvalidModelId { .. } => {
                (StatusCode::BAD_REQUEST, "bad_request:model")
            }
            RouterError::MissingCredential { .. } => (StatusCode::FORBIDDEN, "missing_credential:model"),
        };
        Self::new(status, code, err.user_message())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "bad_gateway:model", err.user_message())
    }
}

impl From<SandboxError> for ApiError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Vault(err) => err.into(),
            SandboxError::Router(err) => err.into(),
            SandboxError::Llm(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, status = %self.status, "Request failed");
        } else {
            tracing::debug!(code = self.code, status = %self.status, "Request rejected");
        }
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trogon_vault::ProviderTag;

    #[test]
    fn missing_credential_is_forbidden_with_guidance() {
        let err = ApiError::from(RouterError::MissingCredential {
            provider: ProviderTag::Anthropic,
        });
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(err.message.contains("Add your key"));
    }

    #[test]
    fn vault_failures_hide_detail() {
        let err = ApiError::from(VaultError::Store("connection refused to 10.0.0.3".into()));
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.message.contains("10.0.0.3"));

        let err = ApiError::from(VaultError::Authentication);
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn provider_failure_is_bad_gateway() {
        let err = ApiError::from(SandboxError::Llm(LlmError::Api {
            provider: ProviderTag::OpenAi,
            status: 401,
            message: "Incorrect API key provided".into(),
        }));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "openai rejected the configured API key");
    }

    #[test]
    fn unsupported_provider_is_bad_request() {
        let err = ApiError::from(VaultError::UnsupportedProvider(ProviderTag::Google));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request:api");
    }
}
