use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Compile(#[from] httpdesign_core::Error),

    #[error("failed to render the resolved model as {format}: {message}")]
    Render { format: &'static str, message: String },

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiled model differs from the expected file; carries the diff.
    #[error("resolved model differs from {}:\n{diff}", expected.display())]
    Mismatch { expected: PathBuf, diff: String },
}

/// Print a command error to stderr and turn it into an exit status.
pub fn report(err: &CliError) -> i32 {
    eprintln!("{err}");
    1
}
