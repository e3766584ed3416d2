use thiserror::Error;

/// Marker text carried by errors raised when the surrounding run is shutting down.
pub const SHUTDOWN_MARKER: &str = "SHUTDOWN_HOOK";

/// A token was requested past the end of the record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("token index {index} is out of range for a record of {len} tokens")]
pub struct TokenOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Errors that abort processing of a single test record
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record is missing a token the interpreter needs (usually the command)
    #[error("malformed record: tokenIndex {index}, getting {field}, inputRecord: {record}")]
    MalformedRecord {
        index: usize,
        field: &'static str,
        record: String,
        #[source]
        source: TokenOutOfRange,
    },

    /// Record initialisation failed for a reason other than a missing token
    #[error("unable to initialise record '{record}': {message}")]
    FieldAccess { record: String, message: String },

    /// The run is shutting down; never converted into a per-record status
    #[error("shutdown requested: {0}")]
    Shutdown(String),
}

impl RecordError {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, RecordError::Shutdown(_))
    }
}

/// Check whether an error (or anything in its cause chain) is the shutdown signal.
pub fn is_shutdown_signal(error: &anyhow::Error) -> bool {
    if let Some(RecordError::Shutdown(_)) = error.downcast_ref::<RecordError>() {
        return true;
    }
    error
        .chain()
        .any(|cause| cause.to_string().to_uppercase().contains(SHUTDOWN_MARKER))
}

/// Re-raise the shutdown signal as a [`RecordError::Shutdown`], or hand the error back.
pub fn escalate_shutdown(error: anyhow::Error) -> Result<anyhow::Error, RecordError> {
    if is_shutdown_signal(&error) {
        Err(RecordError::Shutdown(error.to_string()))
    } else {
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_detected_in_context_chain() {
        let err = anyhow::anyhow!("probe interrupted by SHUTDOWN_HOOK").context("checking Win1:Comp1");
        assert!(is_shutdown_signal(&err));

        let err = anyhow::anyhow!("component lookup failed");
        assert!(!is_shutdown_signal(&err));
    }

    #[test]
    fn test_shutdown_detected_from_typed_error() {
        let err = anyhow::Error::new(RecordError::Shutdown("user abort".to_string()));
        assert!(is_shutdown_signal(&err));
        assert!(escalate_shutdown(err).is_err());
    }

    #[test]
    fn test_malformed_record_message_has_context() {
        let err = RecordError::MalformedRecord {
            index: 1,
            field: "command",
            record: "C".to_string(),
            source: TokenOutOfRange { index: 1, len: 1 },
        };
        let text = err.to_string();
        assert!(text.contains("tokenIndex 1"));
        assert!(text.contains("command"));
        assert!(text.contains("inputRecord: C"));
    }
}
