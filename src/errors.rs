use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raised when a rule is registered without one of its parts.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRuleError {
    #[error("rule role must be provided")]
    MissingRole,
    #[error("rule predicate must be provided")]
    MissingPredicate,
}

/// Failure to produce a custom maintenance page. Always recovered by
/// falling back to the built-in page.
#[derive(thiserror::Error, Debug)]
pub enum MaintenancePageError {
    #[error("failed to read maintenance page {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render maintenance page {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: Box<handlebars::RenderError>,
    },
}

/// Error returned by a host-supplied identity provider.
///
/// The gate never inspects or swallows it: `gate::decide` hands it back as-is
/// and the middleware answers with its `IntoResponse` rendering.
#[derive(thiserror::Error, Debug)]
#[error("identity provider failed: {source}")]
pub struct ProviderError {
    #[source]
    source: BoxError,
}

impl ProviderError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self { source: err.into() }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            source: message.into().into(),
        }
    }

    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

/// Invalid value found while reading settings from the environment.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    InvalidRule(#[from] InvalidRuleError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

fn error_response(status: StatusCode, error: &str, message: String) -> Response {
    let payload = ErrorResponse {
        error: error.to_string(),
        message,
    };

    (status, Json(payload)).into_response()
}

pub const PROVIDER_FAILURE_MESSAGE: &str = "identity provider unavailable";

/// Providers that fail with an [`AppError`] get that error's response,
/// anything else is a 500 whose body never carries the provider's own text.
impl IntoResponse for ProviderError {
    fn into_response(self) -> Response {
        match self.source.downcast::<AppError>() {
            Ok(app) => (*app).into_response(),
            Err(source) => {
                tracing::error!(error = %source, "identity provider failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "provider",
                    PROVIDER_FAILURE_MESSAGE.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Provider(err) = self {
            return err.into_response();
        }

        let status = match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidRule(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = match &self {
            AppError::Configuration(_) => "configuration",
            AppError::Token(_) => "token",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidRule(_) => "invalid_rule",
            AppError::Provider(_) => "provider",
            AppError::Internal(_) => "internal",
        };

        error_response(status, error, self.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}
