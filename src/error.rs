use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Request, State,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::AppConfig;

/// One violated field in a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Locked(String),
    #[error("{0}")]
    TooManyRequests(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Locked(_) => StatusCode::LOCKED,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

/// Underlying cause of a 500, attached to the response for the dev-mode rewriter.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(errors) => {
                let body = ErrorBody {
                    success: false,
                    message: "Validation failed".into(),
                    errors: Some(errors),
                };
                (status, Json(body)).into_response()
            }
            AppError::Internal(e) => {
                error!(error = ?e, "unhandled error");
                let body = ErrorBody {
                    success: false,
                    message: "Internal server error".into(),
                    errors: None,
                };
                let mut res = (status, Json(body)).into_response();
                res.extensions_mut().insert(ErrorDetail(format!("{e:#}")));
                res
            }
            other => {
                let body = ErrorBody {
                    success: false,
                    message: other.to_string(),
                    errors: None,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected json body");
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Replaces the generic 500 message with the underlying cause in development.
pub async fn expose_error_details(
    State(config): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let Some(ErrorDetail(detail)) = res.extensions_mut().remove::<ErrorDetail>() else {
        return res;
    };
    if !config.is_development() {
        return res;
    }
    let body = ErrorBody {
        success: false,
        message: detail,
        errors: None,
    };
    (res.status(), Json(body)).into_response()
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_lists_fields() {
        let err = AppError::Validation(vec![
            FieldError::new("title", "too short"),
            FieldError::new("category", "unknown"),
        ]);
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0]["field"], "title");
        assert_eq!(json["errors"][1]["field"], "category");
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let res = AppError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.extensions().get::<ErrorDetail>().is_some());
        let json = body_json(res).await;
        assert_eq!(json["message"], "Internal server error");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Locked("x".into()).status(), StatusCode::LOCKED);
        assert_eq!(
            AppError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn message_envelope_skips_data() {
        let json = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "done");
        assert!(json.get("data").is_none());
    }
}
