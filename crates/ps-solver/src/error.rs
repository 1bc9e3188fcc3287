//! Error types for solver configuration and invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that prevent a calculation from running at all.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid solver configuration: {what}")]
    Config { what: String },

    #[error("Cannot read session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed session file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Solver invocation failed: {what}")]
    Invocation { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
