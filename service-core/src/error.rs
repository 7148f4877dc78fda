use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced to HTTP callers.
///
/// Every variant renders as a plain-text body. Internal failures only expose
/// their top-level message, never the error chain or a backtrace.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(anyhow::Error),

    #[error("{0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::InternalError(err) => {
                let message = err.to_string();
                if message.trim().is_empty() {
                    "Internal Server Error".to_string()
                } else {
                    message
                }
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "Configuration error while serving request");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn bad_request_is_plain_text() {
        let (status, body) =
            render(AppError::BadRequest(anyhow::anyhow!("Missing request body."))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Bad Request: Missing request body.");
    }

    #[tokio::test]
    async fn internal_error_without_message_uses_default() {
        let (status, body) = render(AppError::InternalError(anyhow::anyhow!(""))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal Server Error");
    }

    #[tokio::test]
    async fn internal_error_hides_context_chain() {
        let err = anyhow::anyhow!("socket closed").context("Error generating budget: upstream");
        let (_, body) = render(AppError::InternalError(err)).await;
        assert_eq!(body, "Error generating budget: upstream");
    }

    #[tokio::test]
    async fn method_not_allowed_has_fixed_body() {
        let (status, body) = render(AppError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "Method Not Allowed");
    }
}
