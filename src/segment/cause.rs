//! Structured error detail attached to a segment.

use serde::Serialize;

/// Error detail block: the list of exceptions recorded against a segment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Cause {
    pub exceptions: Vec<ExceptionRecord>,
}

impl Cause {
    pub fn is_empty(&self) -> bool {
        self.exceptions.is_empty()
    }
}

/// One recorded exception.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionRecord {
    pub message: String,

    #[serde(rename = "type")]
    pub kind: String,

    /// Chain of underlying error sources, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
}

impl ExceptionRecord {
    /// Capture an error together with its source chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            kind: std::any::type_name_of_val(error).to_string(),
            stack,
        }
    }

    /// Capture a bare message when no error value is available.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: "error".to_string(),
            stack: Vec::new(),
        }
    }
}
