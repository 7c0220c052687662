//! File-writing primitive and CLI message assembly.

use std::fs;
use std::io;
use std::path::Path;

/// Message written when the CLI is invoked with no arguments.
pub const DEFAULT_MESSAGE: &str = "Default message\n";

/// Write `contents` to the file at `path`.
///
/// Creates the file if absent, replaces whatever was there if not. The
/// whole contents land or an error is returned; a failure never leaves
/// truncated garbage behind. Parent directories are not created; a
/// missing parent is an error the caller sees unchanged.
pub fn write_to_file(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}

/// Assemble the outgoing message from free-form CLI arguments.
///
/// No arguments yields [`DEFAULT_MESSAGE`]. Otherwise each token is
/// followed by a single space, and a newline terminates the message.
pub fn assemble_message(args: &[String]) -> String {
    if args.is_empty() {
        return DEFAULT_MESSAGE.to_string();
    }

    let mut message = String::new();
    for arg in args {
        message.push_str(arg);
        message.push(' ');
    }
    message.push('\n');
    message
}
