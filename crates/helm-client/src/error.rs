//! Helm client errors

use thiserror::Error;

/// Errors that can occur when driving the helm binary
#[derive(Debug, Error)]
pub enum HelmError {
    /// The helm process could not be spawned or awaited
    #[error("failed to run helm: {0}")]
    Io(#[from] std::io::Error),

    /// Helm exited non-zero; carries the command stderr
    #[error("helm {command} failed: {stderr}")]
    CommandFailed {
        /// The helm subcommand that failed
        command: String,
        /// Trimmed stderr from the helm process
        stderr: String,
    },

    /// Helm's JSON output could not be parsed
    #[error("failed to parse helm output: {0}")]
    OutputParse(#[from] serde_json::Error),
}
