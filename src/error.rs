//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies every failure a handler can report and converts into
//! a JSON response via its [`IntoResponse`] implementation. Optimization and
//! internal failures keep their detail out of the response body; the detail
//! is logged instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::domain::{EntityId, EntityKind};
use crate::optimizer::OptimizerError;
use crate::validation::{FieldError, ValidationErrors};

/// Generic message shown when an optimization run fails.
pub const OPTIMIZATION_FAILED: &str = "optimization failed";

/// Generic message shown for unexpected faults.
pub const INTERNAL_ERROR: &str = "internal server error";

/// Errors that can occur while handling an API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The payload violated one or more field constraints.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// No record of this kind has the given id.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },

    /// The path segment could not name any record.
    #[error("{kind} {raw:?} not found")]
    UnknownId { kind: EntityKind, raw: String },

    /// Another request is already optimizing this route.
    #[error("optimization already in progress for route {0}")]
    OptimizationInProgress(EntityId),

    /// The optimizer failed, timed out, or produced an unusable result.
    #[error("optimization failed: {0}")]
    OptimizationFailed(#[from] OptimizerError),

    /// An unexpected fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } | Self::UnknownId { .. } => StatusCode::NOT_FOUND,
            Self::OptimizationInProgress(_) => StatusCode::CONFLICT,
            Self::OptimizationFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, details) = match self {
            Self::Validation(errors) => ("validation failed".to_string(), Some(errors.errors)),
            Self::OptimizationFailed(_) => (OPTIMIZATION_FAILED.to_string(), None),
            Self::Internal(detail) => {
                error!(%detail, "Request failed with internal error");
                (INTERNAL_ERROR.to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error,
            status: status.as_u16(),
            details,
        };
        (status, Json(body)).into_response()
    }
}
