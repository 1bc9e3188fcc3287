//! Interface to the external phase-equilibrium calculator.
//!
//! The calculator itself is a black box: this crate only defines how it is
//! configured (`SolverSession`), how it is called (`Solver`) and what comes
//! back (`SolverRun`). "Nothing in range" and "bombed" are ordinary run
//! statuses, not errors.

pub mod error;
pub mod run;
pub mod session;
pub mod solver;

pub use error::{SolverError, SolverResult};
pub use run::{DogminRun, SolvedSample, SolverRun, SolverStatus};
pub use session::SolverSession;
pub use solver::{Solver, Sweep};
