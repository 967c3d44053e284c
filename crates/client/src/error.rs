use reqwest::StatusCode;
use thiserror::Error;

use marketdesk_core::ErrorPresentation;

/// Failures talking to the marketplace backend.
///
/// Transport and server-side failures are retryable; contract violations and
/// client-side rejections are not. The resolvers in the core crate only see
/// these as collaborator error strings, but the CLI and UI layers use the
/// classification directly.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not build the http client: {source}")]
    Build { source: reqwest::Error },
    #[error("request to `{url}` failed: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("backend returned {status} for `{url}`: {body}")]
    Status { url: String, status: StatusCode, body: String },
    #[error("could not decode the response from `{url}`: {source}")]
    Decode { url: String, source: reqwest::Error },
    #[error("backend returned an invalid {entity}: {message}")]
    Contract { entity: &'static str, message: String },
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Build { .. } | Self::Decode { .. } | Self::Contract { .. } => false,
        }
    }

    pub fn presentation(&self) -> ErrorPresentation {
        if self.is_retryable() {
            ErrorPresentation::RetryableBanner
        } else {
            ErrorPresentation::RuleRejection
        }
    }
}
