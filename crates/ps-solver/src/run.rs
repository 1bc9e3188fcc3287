//! Structured results of a solver run.

use ps_core::{PhaseSet, Point2};
use ps_topology::{InvariantPoint, ResultBlock, TopologyResult, UnivariantLine};
use serde::{Deserialize, Serialize};

/// How a run ended. Only `Ok` carries samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverStatus {
    Ok,
    /// Nothing in range: the request was valid but has no solution in the
    /// window.
    Nir,
    /// The solver failed internally.
    Bombed,
}

/// One solved coordinate with its structured result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolvedSample {
    pub point: Point2,
    pub result: ResultBlock,
}

/// Everything one invocation produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverRun {
    pub status: SolverStatus,
    pub variance: i32,
    pub samples: Vec<SolvedSample>,
    /// Raw text log of the run.
    pub output: String,
    /// Command line that reproduces the run.
    pub cmd: String,
}

impl SolverRun {
    pub fn ok(samples: Vec<SolvedSample>, output: impl Into<String>) -> Self {
        Self {
            status: SolverStatus::Ok,
            variance: 0,
            samples,
            output: output.into(),
            cmd: String::new(),
        }
    }

    pub fn nir(output: impl Into<String>) -> Self {
        Self {
            status: SolverStatus::Nir,
            ..Self::ok(Vec::new(), output)
        }
    }

    pub fn bombed(output: impl Into<String>) -> Self {
        Self {
            status: SolverStatus::Bombed,
            ..Self::ok(Vec::new(), output)
        }
    }

    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = cmd.into();
        self
    }

    pub fn with_variance(mut self, variance: i32) -> Self {
        self.variance = variance;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == SolverStatus::Ok
    }

    pub fn points(&self) -> Vec<Point2> {
        self.samples.iter().map(|s| s.point).collect()
    }

    pub fn results(&self) -> Vec<ResultBlock> {
        self.samples.iter().map(|s| s.result.clone()).collect()
    }

    /// Unstored line carrying every sample of this run.
    pub fn into_uniline(self, phases: PhaseSet, out: PhaseSet) -> TopologyResult<UnivariantLine> {
        let points = self.points();
        let results = self.results();
        Ok(UnivariantLine::new(phases, out)?
            .with_samples(points, results)
            .with_output(self.output)
            .with_cmd(self.cmd)
            .with_variance(self.variance))
    }

    /// Unstored point at the first sample of this run.
    pub fn into_invpoint(self, phases: PhaseSet, out: PhaseSet) -> TopologyResult<InvariantPoint> {
        let at = self.samples.first().map(|s| s.point).unwrap_or_default();
        let results = self.results();
        let inv = InvariantPoint::new(phases, out)?
            .at(at.x, at.y)
            .with_output(self.output)
            .with_cmd(self.cmd)
            .with_variance(self.variance);
        Ok(if results.is_empty() {
            inv
        } else {
            inv.with_results(results)
        })
    }
}

/// Result of an unconstrained-assemblage search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DogminRun {
    /// Stable assemblage found; empty when the search failed.
    pub phases: PhaseSet,
    pub output: String,
    pub resic: String,
    pub guess: Vec<String>,
}

impl DogminRun {
    pub fn found(&self) -> bool {
        !self.phases.is_empty()
    }
}
