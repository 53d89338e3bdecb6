use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid total price")]
    InvalidAmount,

    #[error("Payment not completed.")]
    PaymentNotCompleted,

    #[error("Payment amount does not match booking total.")]
    AmountMismatch,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{context}: {detail}")]
    Server { context: &'static str, detail: String },

    #[error("{context}: {detail}")]
    Gateway { context: &'static str, detail: String },
}

impl AppError {
    pub fn server(context: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::Server {
            context,
            detail: err.to_string(),
        }
    }

    pub fn gateway(context: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::Gateway {
            context,
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidAmount
            | AppError::PaymentNotCompleted
            | AppError::AmountMismatch => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Server { .. } | AppError::Gateway { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                json!({ "message": msg })
            }
            AppError::InvalidAmount | AppError::PaymentNotCompleted | AppError::AmountMismatch => {
                json!({ "error": self.to_string() })
            }
            AppError::Server { context, detail } => {
                tracing::error!(error = %detail, "{context}");
                json!({ "message": context, "error": detail })
            }
            AppError::Gateway { context, detail } => {
                tracing::error!(error = %detail, "{context}");
                json!({ "error": context, "details": detail })
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
