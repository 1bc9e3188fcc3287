//! Topology store errors.

use ps_core::{DogminId, InvId, PhaseSet, PsError, UniId};
use thiserror::Error;

pub type TopologyResult<T> = Result<T, TopologyError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Invariant point {0} does not exist")]
    UnknownInv(InvId),

    #[error("Univariant line {0} does not exist")]
    UnknownUni(UniId),

    #[error("Dogmin {0} does not exist")]
    UnknownDogmin(DogminId),

    #[error("{kind} needs {expected} zero mode phase(s), got {got}")]
    BadOutCount {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Zero mode phases [{out}] are not part of assemblage [{phases}]")]
    OutNotInPhases { phases: PhaseSet, out: PhaseSet },

    /// Deleting the point would orphan a user-defined line.
    #[error("Cannot delete invariant point {inv}, which defines user-defined univariant lines {lines:?}")]
    DeleteRefused { inv: InvId, lines: Vec<UniId> },

    #[error("Expected exactly 2 connecting invariant points, found {found}")]
    NotEnoughCandidates { found: usize },

    #[error("Univariant line {uni} references missing invariant point {inv}")]
    DanglingEndpoint { uni: UniId, inv: InvId },

    #[error("{kind} {first} and {second} describe the same entity")]
    Duplicate {
        kind: &'static str,
        first: u32,
        second: u32,
    },

    #[error(transparent)]
    Core(#[from] PsError),
}
