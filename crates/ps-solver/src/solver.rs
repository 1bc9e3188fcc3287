//! The seam between the builder workflows and an external calculator.

use ps_core::{PhaseSet, Point2, Window};

use crate::error::SolverResult;
use crate::run::{DogminRun, SolverRun};
use crate::session::SolverSession;

/// Independent variable of a line sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sweep {
    /// Step along the x axis, solving for y.
    AlongX,
    /// Step along the y axis, solving for x.
    AlongY,
}

/// A phase-equilibrium calculator.
///
/// Implementations block until the calculation finishes. `Err` is reserved
/// for runs that could not be started; solver-side failures come back as a
/// `SolverRun` with a non-`Ok` status.
pub trait Solver {
    /// Trace the line where the single phase in `out` has zero mode.
    fn calc_line(
        &mut self,
        session: &SolverSession,
        phases: &PhaseSet,
        out: &PhaseSet,
        sweep: Sweep,
        window: Window,
    ) -> SolverResult<SolverRun>;

    /// Locate the point where both phases in `out` have zero mode.
    fn calc_point(
        &mut self,
        session: &SolverSession,
        phases: &PhaseSet,
        out: &PhaseSet,
        window: Window,
    ) -> SolverResult<SolverRun>;

    /// Solve a fixed assemblage at one coordinate.
    fn calc_assemblage(
        &mut self,
        session: &SolverSession,
        phases: &PhaseSet,
        at: Point2,
    ) -> SolverResult<SolverRun>;

    /// Search for the stable assemblage at one coordinate among assemblages
    /// of at most `variance`, `level` controlling how exhaustive the search is.
    fn dogmin(
        &mut self,
        session: &SolverSession,
        phases: &PhaseSet,
        at: Point2,
        variance: i32,
        level: u32,
    ) -> SolverResult<DogminRun>;
}
