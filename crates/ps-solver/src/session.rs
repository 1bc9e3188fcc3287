//! Explicit solver configuration passed to every calculation.

use std::fs;
use std::path::{Path, PathBuf};

use ps_core::{PhaseSet, Real, Window};
use ps_topology::SectionKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SolverError, SolverResult};

/// Lowest temperature the solver accepts, degrees C.
pub const MIN_TEMPERATURE: Real = 11.0;
/// Lowest pressure the solver accepts, kbar.
pub const MIN_PRESSURE: Real = 0.01;

fn default_steps() -> usize {
    50
}

fn default_overshoot() -> Real {
    5.0
}

fn default_precision() -> usize {
    1
}

/// Everything a solver needs to know besides the assemblage itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverSession {
    /// Directory holding the solver's script and dataset.
    pub workdir: PathBuf,
    /// Solver executable; resolved by the implementation when absent.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Phases present everywhere in the section.
    #[serde(default)]
    pub excess: PhaseSet,
    /// Phases the dataset defines.
    #[serde(default)]
    pub phases: Vec<String>,
    /// Starting guess lines for the next run.
    #[serde(default)]
    pub guesses: Vec<String>,
    /// Number of steps of a line sweep.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// How far the calculation window reaches past the view, in percent.
    #[serde(default = "default_overshoot")]
    pub overshoot_percent: Real,
    /// Digits kept when solver output is echoed back.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for SolverSession {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            executable: None,
            excess: PhaseSet::new(),
            phases: Vec::new(),
            guesses: Vec::new(),
            steps: default_steps(),
            overshoot_percent: default_overshoot(),
            precision: default_precision(),
        }
    }
}

impl SolverSession {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(text: &str) -> SolverResult<Self> {
        let session: Self = serde_yaml::from_str(text)?;
        session.validate()?;
        Ok(session)
    }

    pub fn load_yaml(path: &Path) -> SolverResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| SolverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading solver session");
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> SolverResult<()> {
        if self.workdir.as_os_str().is_empty() {
            return Err(SolverError::Config {
                what: "working directory is not set".to_string(),
            });
        }
        if self.steps < 2 {
            return Err(SolverError::Config {
                what: format!("a sweep needs at least 2 steps, got {}", self.steps),
            });
        }
        if !self.overshoot_percent.is_finite() || self.overshoot_percent < 0.0 {
            return Err(SolverError::Config {
                what: format!("overshoot must be a non-negative percentage, got {}", self.overshoot_percent),
            });
        }
        Ok(())
    }

    /// Install new starting guesses and hand back the previous ones.
    pub fn swap_guesses(&mut self, guesses: Vec<String>) -> Vec<String> {
        std::mem::replace(&mut self.guesses, guesses)
    }

    /// Dataset phases that are not already part of `phases` or the excess.
    pub fn extra_phases<'a>(&'a self, phases: &'a PhaseSet) -> impl Iterator<Item = &'a str> + 'a {
        self.phases
            .iter()
            .map(String::as_str)
            .filter(move |p| !phases.contains(p) && !self.excess.contains(p))
    }

    /// Calculation window for the current view of a section.
    ///
    /// The view is widened by the overshoot, then temperature and pressure
    /// axes are clamped to what the solver accepts. Composition axes are
    /// left alone.
    pub fn calc_window(&self, kind: SectionKind, view: Window) -> Window {
        let mut w = view.extended(self.overshoot_percent);
        match kind {
            SectionKind::Pt => {
                w.xmin = w.xmin.max(MIN_TEMPERATURE);
                w.ymin = w.ymin.max(MIN_PRESSURE);
            }
            SectionKind::Tx => w.xmin = w.xmin.max(MIN_TEMPERATURE),
            SectionKind::Px => w.xmin = w.xmin.max(MIN_PRESSURE),
        }
        w
    }
}
