//! Error types for Kino Autoplay

use thiserror::Error;

/// Result type alias for autoplay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Autoplay error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Playback errors
    #[error("Playback blocked by autoplay policy: {0}")]
    PlaybackBlocked(String),

    #[error("Playback failed: {0}")]
    PlaybackError(String),

    // Probe errors
    #[error("Autoplay probe returned no pending result")]
    ProbeInconclusive,

    // Gesture errors
    #[error("Gesture-triggered playback failed: {0}")]
    GestureAttemptFailed(String),

    #[error("Failed to mount play prompt: {0}")]
    MountFailed(String),

    // Page errors
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a playback error from any displayable value
    pub fn playback(msg: impl Into<String>) -> Self {
        Error::PlaybackError(msg.into())
    }

    /// Create a policy block error from any displayable value
    pub fn blocked(msg: impl Into<String>) -> Self {
        Error::PlaybackBlocked(msg.into())
    }

    /// Returns true if a later strategy may still succeed after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PlaybackBlocked(_)
                | Error::PlaybackError(_)
                | Error::ProbeInconclusive
                | Error::GestureAttemptFailed(_)
        )
    }

    /// Returns the error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::PlaybackBlocked(_) => "PLAYBACK_BLOCKED",
            Error::PlaybackError(_) => "PLAYBACK_ERROR",
            Error::ProbeInconclusive => "PROBE_INCONCLUSIVE",
            Error::GestureAttemptFailed(_) => "GESTURE_FAILED",
            Error::MountFailed(_) => "MOUNT_FAILED",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_errors_are_recoverable() {
        assert!(Error::blocked("NotAllowedError").is_recoverable());
        assert!(Error::ProbeInconclusive.is_recoverable());
        assert!(!Error::InvalidConfig("bad".into()).is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::blocked("x").error_code(), "PLAYBACK_BLOCKED");
        assert_eq!(
            Error::GestureAttemptFailed("x".into()).error_code(),
            "GESTURE_FAILED"
        );
    }
}
