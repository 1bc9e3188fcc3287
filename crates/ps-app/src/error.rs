//! Error types for the ps-app service layer.

use std::path::PathBuf;

use ps_topology::TopologyError;

/// Application error type that wraps errors from the backend crates and
/// gives CLI and any other front end one error interface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Grid error: {0}")]
    Grid(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for ps-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<ps_project::ProjectError> for AppError {
    fn from(err: ps_project::ProjectError) -> Self {
        match err {
            ps_project::ProjectError::Validation(v) => AppError::Validation(v.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<ps_solver::SolverError> for AppError {
    fn from(err: ps_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<ps_grid::GridError> for AppError {
    fn from(err: ps_grid::GridError) -> Self {
        match err {
            ps_grid::GridError::Solver(e) => AppError::Solver(e.to_string()),
            other => AppError::Grid(other.to_string()),
        }
    }
}
