//! Error types for REST dispatch failures.
//!
//! Every variant maps to one HTTP status and one reply body. Missing required
//! fields echo the raw request body back to the client unchanged; everything
//! else is rendered as an [`Envelope`].

use axum::http::StatusCode;
use thiserror::Error;

use cumulus_archive::CapabilityError;

use super::message::Envelope;

/// Message returned when a move or copy addresses the filesystem root on
/// Windows with the root marker configured.
pub const ROOT_GUARD_MESSAGE: &str = "Could not copy from/to root on windows!";

/// Errors surfaced while dispatching an API request.
#[derive(Debug, Error)]
pub enum RestError {
    /// The command does not exist.
    #[error("Not Found")]
    NotFound,

    /// The request body is not valid JSON of the expected shape.
    #[error("malformed request body: {message}")]
    MalformedBody { message: String },

    /// A required field was absent; carries the raw body for echoing.
    #[error("{body}")]
    MissingFields { body: String },

    /// The root guard rejected the operation.
    #[error("Could not copy from/to root on windows!")]
    RootGuard,

    /// A path or entry name cannot be used as an operand.
    #[error("invalid operand '{operand}': {reason}")]
    InvalidOperand {
        operand: String,
        reason: &'static str,
    },

    /// The request body could not be read.
    #[error("failed to read request body: {message}")]
    ReadBody { message: String },

    /// The capability reported a failure.
    #[error("{source}")]
    Capability {
        #[source]
        source: CapabilityError,
    },
}

impl RestError {
    pub(crate) fn malformed(error: &serde_json::Error) -> Self {
        Self::MalformedBody {
            message: error.to_string(),
        }
    }

    pub(crate) fn missing_fields(body: &str) -> Self {
        Self::MissingFields {
            body: body.to_owned(),
        }
    }

    pub(crate) fn invalid_operand(operand: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidOperand {
            operand: operand.into(),
            reason,
        }
    }

    pub(crate) fn read_body(message: impl Into<String>) -> Self {
        Self::ReadBody {
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MalformedBody { .. }
            | Self::MissingFields { .. }
            | Self::InvalidOperand { .. }
            | Self::ReadBody { .. } => StatusCode::BAD_REQUEST,
            Self::RootGuard => StatusCode::FORBIDDEN,
            Self::Capability { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reply envelope, or `None` when the raw body is echoed instead.
    #[must_use]
    pub fn to_envelope(&self) -> Option<Envelope> {
        match self {
            Self::MissingFields { .. } => None,
            other => Some(Envelope::error(
                other.to_string(),
                other.http_status().as_u16(),
            )),
        }
    }
}

impl From<CapabilityError> for RestError {
    fn from(source: CapabilityError) -> Self {
        Self::Capability { source }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::not_found(RestError::NotFound, StatusCode::NOT_FOUND)]
    #[case::guard(RestError::RootGuard, StatusCode::FORBIDDEN)]
    #[case::missing(RestError::missing_fields("{}"), StatusCode::BAD_REQUEST)]
    #[case::operand(RestError::invalid_operand("..", "bad"), StatusCode::BAD_REQUEST)]
    #[case::capability(
        RestError::from(CapabilityError::Disconnected),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    fn maps_errors_to_status(#[case] error: RestError, #[case] status: StatusCode) {
        assert_eq!(error.http_status(), status);
    }

    #[test]
    fn not_found_envelope_carries_status() {
        assert_eq!(
            RestError::NotFound.to_envelope(),
            Some(Envelope::error("Not Found", 404))
        );
    }

    #[test]
    fn missing_fields_has_no_envelope() {
        let error = RestError::missing_fields(r#"{"from":"a"}"#);
        assert!(error.to_envelope().is_none());
        assert_eq!(error.to_string(), r#"{"from":"a"}"#);
    }

    #[test]
    fn root_guard_uses_fixed_message() {
        assert_eq!(RestError::RootGuard.to_string(), ROOT_GUARD_MESSAGE);
    }
}
