//! The unit of data carried by a dispatch call.

use serde::{Deserialize, Serialize};

/// A message and the path it should be written to.
///
/// Immutable once constructed; two payloads are equal when their fields
/// are. `target_path` is interpreted in the filesystem namespace of the
/// execution context that runs the write, not the caller's. Relative
/// paths resolve against that context's working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    message: String,
    target_path: String,
}

impl Payload {
    pub fn new(message: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            target_path: target_path.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }
}
