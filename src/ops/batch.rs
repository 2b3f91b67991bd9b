use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::Context;

/// Why one path of a batch call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub code: String,
    pub message: String,
}

impl BatchError {
    /// Denials keep the shared wording, with the requested path masked.
    pub(super) fn new(ctx: &Context, requested: &str, err: &Error) -> Self {
        let message = if err.is_access_denial() {
            format!("path is not accessible: {}", ctx.masker().mask(requested))
        } else {
            err.to_string()
        };
        Self {
            code: err.code().to_string(),
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome<T> {
    Ok(T),
    Error(BatchError),
}

/// Result for one requested path. `path` is the caller's input, masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem<T> {
    pub path: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome<T>,
}

impl<T> BatchItem<T> {
    pub(super) fn new(ctx: &Context, requested: &str, outcome: BatchOutcome<T>) -> Self {
        Self {
            path: ctx.masker().mask(requested).into_owned(),
            outcome,
        }
    }

    pub fn ok(&self) -> Option<&T> {
        match &self.outcome {
            BatchOutcome::Ok(value) => Some(value),
            BatchOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&BatchError> {
        match &self.outcome {
            BatchOutcome::Ok(_) => None,
            BatchOutcome::Error(err) => Some(err),
        }
    }
}
