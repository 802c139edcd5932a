//! Error taxonomy shared by every service operation.
//!
//! Expected failures (bad input, missing entity, ownership violation) are
//! distinct variants rather than stringly-typed status codes so callers and
//! tests can match on them. Infrastructure failures ride along as `Internal`
//! with their `anyhow` context intact.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing identifiers/fields in the request.
    #[error("{0}")]
    InvalidArgument(String),

    /// Structurally valid request that the domain rules reject outright,
    /// e.g. subscribing to one's own channel.
    #[error("{0}")]
    InvalidOperation(String),

    /// Referenced entity or relation does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The acting user does not own the entity being mutated.
    #[error("{kind} {id} is not owned by the requesting user")]
    Forbidden { kind: &'static str, id: String },

    /// Uniqueness violation on a relation insert.
    #[error("{kind} already exists for {id}")]
    Conflict { kind: &'static str, id: String },

    /// A collaborator (media storage) failed or returned unusable data.
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn forbidden(kind: &'static str, id: impl Into<String>) -> Self {
        Self::Forbidden {
            kind,
            id: id.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = Envelope::<()> {
            status_code: status.as_u16(),
            data: None,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Wire shape returned by every endpoint, success and failure alike.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: u16,
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            data: Some(data),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert_eq!(
            ApiError::invalid("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidOperation("self".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("video", "v1").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::forbidden("playlist", "p1").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Upstream("no url".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = ApiError::not_found("video", "v1");
        assert_eq!(err.to_string(), "video v1 not found");
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let body = Envelope::ok(1, "done");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["data"], 1);
        assert_eq!(json["message"], "done");
    }
}
