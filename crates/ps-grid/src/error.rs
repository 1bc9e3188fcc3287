//! Error types for gridding and isopleth construction.

use ps_core::PhaseSet;
use ps_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Section is not gridded yet")]
    NotGridded,

    #[error("Unknown field: {0}")]
    UnknownField(PhaseSet),

    #[error("Invalid grid: {what}")]
    InvalidGrid { what: String },

    #[error("Cannot evaluate expression '{expr}': {what}")]
    Expr { expr: String, what: String },

    #[error("No data for '{expr}' of phase {phase}")]
    NoData { phase: String, expr: String },

    #[error("Interpolation failed: {what}")]
    Interpolation { what: String },

    #[error(transparent)]
    Solver(#[from] SolverError),
}

pub type GridResult<T> = Result<T, GridError>;
