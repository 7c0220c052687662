//! Execution contexts and the dispatch abstraction.

use std::path::Path;

use log::info;

use crate::error::DispatchError;
use crate::io::write_to_file;
use crate::payload::Payload;

/// Name the in-process context goes by in logs and errors.
pub const LOCAL_CONTEXT: &str = "local";

/// What a context reports after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The path actually written, as resolved by the executing context.
    pub path: String,
}

/// A named environment that can run the write operation.
///
/// Implementations can be local (direct filesystem access) or remote
/// (network-based). The binary uses this trait to abstract over the
/// dispatch mechanism; the caller picks exactly one context per call.
pub trait ExecutionContext {
    /// Name of the context, used in logs and error messages.
    fn name(&self) -> &str;

    /// Run the write described by `payload` inside this context, blocking
    /// until it has concluded. Exactly one result is produced per call
    /// and the write runs at most once; nothing is retried.
    fn dispatch(&mut self, payload: &Payload) -> Result<Delivery, DispatchError>;
}

/// Context that executes writes directly in this process.
pub struct LocalContext;

impl ExecutionContext for LocalContext {
    fn name(&self) -> &str {
        LOCAL_CONTEXT
    }

    fn dispatch(&mut self, payload: &Payload) -> Result<Delivery, DispatchError> {
        let path = Path::new(payload.target_path());
        info!("Writing {} bytes to {}", payload.message().len(), path.display());

        write_to_file(path, payload.message())
            .map_err(|e| DispatchError::from_io(LOCAL_CONTEXT, payload.target_path(), &e))?;

        Ok(Delivery {
            path: payload.target_path().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn local_dispatch_writes_the_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let payload = Payload::new("hello\n", path.to_str().unwrap());
        let delivery = LocalContext.dispatch(&payload).unwrap();

        assert_eq!(delivery.path, path.to_str().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn local_dispatch_surfaces_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let payload = Payload::new("lost\n", path.to_str().unwrap());
        let err = LocalContext.dispatch(&payload).unwrap_err();

        assert!(err.is_io());
        assert!(err.to_string().contains("out.txt"));
        assert!(!path.exists());
    }
}
