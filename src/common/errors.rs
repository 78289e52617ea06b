use serde::Serialize;

/// Outcome class of a player operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    Success,
    Failure,
    /// Succeeded with a caveat. Always carries a message for the user.
    Warning,
}

/// Result envelope returned by every player operation.
///
/// Expected failures ("not connected", "queue empty", lookup misses) are
/// reported here and never as `Err`/panics. `message` is the literal text
/// relayed to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T = ()> {
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> OperationResult<T> {
    pub fn success(payload: T) -> Self {
        Self {
            status: OperationStatus::Success,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Failure,
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Warning,
            message: Some(message.into()),
            payload: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == OperationStatus::Failure
    }

    pub fn is_warning(&self) -> bool {
        self.status == OperationStatus::Warning
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Drops the payload, keeping status and message.
    pub fn discard(self) -> OperationResult {
        OperationResult {
            status: self.status,
            message: self.message,
            payload: self.payload.map(|_| ()),
        }
    }

    /// Re-types a non-success result so it can be returned from an
    /// operation with a different payload type.
    pub fn forward<U>(self) -> OperationResult<U> {
        debug_assert!(!self.is_success() || self.payload.is_none());
        OperationResult {
            status: self.status,
            message: self.message,
            payload: None,
        }
    }
}

impl OperationResult {
    pub fn ok() -> Self {
        Self::success(())
    }
}

/// Errors raised by a voice connection. These never reach the command layer
/// directly; the player turns them into a failure result or a cleanup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    #[error("voice connection is closed")]
    Closed,
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("voice transport error: {0}")]
    Transport(String),
}
