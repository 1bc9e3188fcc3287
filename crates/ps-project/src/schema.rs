//! Persisted project schema.

use std::path::PathBuf;

use ps_core::PhaseSet;
use ps_grid::GridData;
use ps_solver::SolverSession;
use ps_topology::{Section, SectionKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub section: Section,
    /// Phases the user picked for calculations.
    #[serde(default)]
    pub selected: PhaseSet,
    /// Phases picked as zero-mode candidates; a subset of `selected`.
    #[serde(default)]
    pub out: PhaseSet,
    #[serde(default)]
    pub session: SolverSession,
    /// Version string reported by the solver that produced the data.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub solver_version: String,
    /// Bulk composition rows as reported by the solver.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bulk: Vec<Vec<String>>,
    /// RFC 3339 time of the last save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridData>,
}

impl Project {
    /// Empty project of the given kind working in `workdir`.
    pub fn new(name: impl Into<String>, kind: SectionKind, workdir: impl Into<PathBuf>) -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: name.into(),
            section: Section::new(kind),
            selected: PhaseSet::new(),
            out: PhaseSet::new(),
            session: SolverSession::new(workdir),
            solver_version: String::new(),
            bulk: Vec::new(),
            saved: None,
            grid: None,
        }
    }

    pub fn kind(&self) -> SectionKind {
        self.section.kind()
    }

    /// Refresh the bulk composition from the section's points.
    pub fn refresh_bulk(&mut self) {
        if let Some(bulk) = self.section.bulk_composition() {
            self.bulk = bulk;
        }
    }
}
