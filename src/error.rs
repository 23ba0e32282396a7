//! Run-error taxonomy.
//!
//! One enum covers every way a sync run can fail. The variant tells the
//! caller which recovery policy applies:
//!
//! | Variant | Policy |
//! |---------|--------|
//! | [`RunError::Auth`] | Fatal. Missing secret or rejected credentials; retrying cannot help. |
//! | [`RunError::Protocol`] | Fatal. The remote violated its own pagination contract. |
//! | [`RunError::Api`] | Fatal at the run level; per-folder enumeration and per-file download failures are downgraded by the pipeline before they reach the caller. |
//! | [`RunError::Summarizer`] | Fatal. The AI provider failed after retries were exhausted. |
//! | [`RunError::State`] | Fatal. Cursor or cache persistence failed; silently degrading would corrupt the commit protocol. |
//! | [`RunError::Http`] | Fatal. Transport-level failure talking to a remote service. |
//!
//! Whatever fails, the cursor is only ever written after every artifact
//! write-back succeeded, so a failed run is always safe to retry.

use thiserror::Error;

pub type RunResult<T> = Result<T, RunError>;

#[derive(Debug, Error)]
pub enum RunError {
    /// Credential acquisition or a missing secret.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote change stream broke its pagination contract.
    #[error("change stream protocol violation: {0}")]
    Protocol(String),

    /// The remote API returned a non-success status.
    #[error("remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The AI provider failed, retries included.
    #[error("summarizer error: {0}")]
    Summarizer(String),

    /// Cursor or cache persistence failure.
    #[error("state error while {context}: {source}")]
    State {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level HTTP failure.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RunError {
    /// Wrap an I/O error from the state backend with what was being done.
    pub fn state(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::State {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_errors_carry_their_context() {
        let err = RunError::state(
            "reading cursor",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "state error while reading cursor: denied"
        );
    }

    #[test]
    fn api_errors_format_status_and_message() {
        let err = RunError::Api {
            status: 404,
            message: "item not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "remote API error (status 404): item not found"
        );
    }
}
