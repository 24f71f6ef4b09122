//! Error types for device calls.

use thiserror::Error;

/// Convenience alias for device call results.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure modes of a call against the load balancer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured host could not be turned into a device endpoint.
    #[error("invalid device endpoint '{input}'")]
    Endpoint {
        /// Host value supplied by the operator.
        input: String,
        /// Underlying URL parse error.
        source: url::ParseError,
    },
    /// The request never produced a response.
    #[error("request for {method} failed")]
    Transport {
        /// aXAPI method being invoked.
        method: &'static str,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// The device refused the credentials or the session.
    #[error("device rejected authentication: {message}")]
    Auth {
        /// Message reported by the device.
        message: String,
    },
    /// The referenced object does not exist on the device.
    #[error("{message}")]
    NotFound {
        /// Device error code.
        code: i64,
        /// Message reported by the device.
        message: String,
    },
    /// The device reported a failure envelope.
    #[error("device error {code}: {message}")]
    Device {
        /// Device error code.
        code: i64,
        /// Message reported by the device.
        message: String,
    },
    /// The device answered with a non-success HTTP status.
    #[error("{method} returned HTTP {status}")]
    Http {
        /// aXAPI method being invoked.
        method: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The response payload did not have the expected shape.
    #[error("failed to decode {method} response")]
    Decode {
        /// aXAPI method being invoked.
        method: &'static str,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl ApiError {
    /// True when the failure happened at the transport or authentication layer.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Endpoint { .. } | Self::Transport { .. } | Self::Auth { .. }
        )
    }

    /// True when the device reported that the object is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers_match_variants() {
        let auth = ApiError::Auth {
            message: "bad password".into(),
        };
        assert!(auth.is_connection());
        assert!(!auth.is_not_found());

        let missing = ApiError::NotFound {
            code: 67_174_402,
            message: "No such Server".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_connection());
        assert_eq!(missing.to_string(), "No such Server");

        let http = ApiError::Http {
            method: "slb.server.getAll",
            status: 500,
        };
        assert!(!http.is_connection());
        assert_eq!(http.to_string(), "slb.server.getAll returned HTTP 500");
    }
}
