//! Options steering the builder workflows.

use ps_core::Real;
use ps_solver::SolverSession;
use ps_topology::RecalcPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcOptions {
    /// Connect a new line when exactly two stored points fit it.
    pub autoconnect_uni: bool,
    /// Connect lines to a new point when the pairing is unambiguous.
    pub autoconnect_inv: bool,
    /// What to do with a result that already exists.
    pub policy: RecalcPolicy,
    /// Seed line exploration with the guesses of its only bound point.
    pub use_inv_guess: bool,
    /// Overrides of the session's sweep steps and window overshoot.
    pub steps: Option<usize>,
    pub overshoot_percent: Option<Real>,
}

impl Default for CalcOptions {
    fn default() -> Self {
        Self {
            autoconnect_uni: true,
            autoconnect_inv: true,
            policy: RecalcPolicy::Replace,
            use_inv_guess: true,
            steps: None,
            overshoot_percent: None,
        }
    }
}

impl CalcOptions {
    /// Session with the overrides applied.
    pub fn apply(&self, session: &SolverSession) -> SolverSession {
        let mut session = session.clone();
        if let Some(steps) = self.steps {
            session.steps = steps;
        }
        if let Some(overshoot) = self.overshoot_percent {
            session.overshoot_percent = overshoot;
        }
        session
    }
}
