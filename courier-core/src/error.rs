//! Error taxonomy for dispatch calls.

use std::io;

/// Why a dispatch call failed.
///
/// Two kinds only: the write itself failed inside the target context, or
/// the transport failed before a result could be observed. Both propagate
/// to the original caller unmodified; there is no retry or fallback at
/// this layer. Every message names the path and/or context involved, so
/// an operator can tell a wrong-filesystem mistake from a genuine I/O
/// failure.
#[derive(Debug)]
pub enum DispatchError {
    /// The write operation failed on the target context's filesystem.
    Io {
        /// Name of the context that ran the write.
        context: String,
        /// Target path as resolved by that context.
        path: String,
        /// Underlying failure, as reported by the context.
        detail: String,
    },
    /// The channel failed: context unreachable, handshake refused,
    /// serialization error, or connection lost before the result arrived.
    Channel {
        /// Name or address of the context being reached.
        context: String,
        detail: String,
    },
}

impl DispatchError {
    /// Write failure reported by `context` for `path`.
    pub fn io_in(context: &str, path: &str, detail: impl Into<String>) -> Self {
        Self::Io {
            context: context.to_string(),
            path: path.to_string(),
            detail: detail.into(),
        }
    }

    /// Write failure wrapping a local `io::Error`.
    pub fn from_io(context: &str, path: &str, err: &io::Error) -> Self {
        Self::io_in(context, path, err.to_string())
    }

    /// Transport-level failure reaching `context`.
    pub fn channel(context: &str, detail: impl Into<String>) -> Self {
        Self::Channel {
            context: context.to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Channel { .. })
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io {
                context,
                path,
                detail,
            } => {
                write!(f, "write to {} in context '{}' failed: {}", path, context, detail)
            }
            Self::Channel { context, detail } => {
                write!(f, "channel to '{}' failed: {}", context, detail)
            }
        }
    }
}

impl std::error::Error for DispatchError {}
