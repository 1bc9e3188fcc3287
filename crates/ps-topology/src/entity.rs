//! Invariant points, univariant lines and dogmin runs.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use ps_core::geometry::{cumulative_length, interpolate};
use ps_core::{DogminId, InvId, PhaseSet, Point2, Real, UniId};
use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};

/// Per-phase solver values, e.g. `data["g"]["mode"]`.
pub type SolverData = BTreeMap<String, BTreeMap<String, Real>>;

/// One structured solver result: raw values plus the starting guess that
/// reproduces it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBlock {
    #[serde(default)]
    pub data: Option<SolverData>,
    #[serde(default)]
    pub guess: Option<Vec<String>>,
}

impl ResultBlock {
    pub fn new(data: SolverData, guess: Vec<String>) -> Self {
        Self {
            data: Some(data),
            guess: Some(guess),
        }
    }

    /// Value of `var` for `phase`, if the block carries it.
    pub fn value(&self, phase: &str, var: &str) -> Option<Real> {
        self.data.as_ref()?.get(phase)?.get(var).copied()
    }
}

const USER_DEFINED: &str = "User-defined";

fn placeholder_results() -> Vec<ResultBlock> {
    vec![ResultBlock::default()]
}

fn check_out(
    kind: &'static str,
    expected: usize,
    phases: &PhaseSet,
    out: &PhaseSet,
) -> TopologyResult<()> {
    if out.len() != expected {
        return Err(TopologyError::BadOutCount {
            kind,
            expected,
            got: out.len(),
        });
    }
    if !out.is_subset(phases) {
        return Err(TopologyError::OutNotInPhases {
            phases: phases.clone(),
            out: out.clone(),
        });
    }
    Ok(())
}

fn label(phases: &PhaseSet, out: &PhaseSet, excess: &PhaseSet) -> String {
    format!("{} - {}", phases.difference(excess), out)
}

fn annotation(id: u32, out: &PhaseSet, show_out: bool) -> String {
    if show_out {
        format!("{id} {out}")
    } else {
        id.to_string()
    }
}

/// Point where two zero-mode curves cross in a fixed assemblage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvariantPoint {
    /// Assigned when the point is stored.
    pub id: Option<InvId>,
    pub phases: PhaseSet,
    /// Exactly two phases.
    pub out: PhaseSet,
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub variance: i32,
    pub x: Real,
    pub y: Real,
    #[serde(default = "placeholder_results")]
    pub results: Vec<ResultBlock>,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub manual: bool,
}

impl InvariantPoint {
    pub fn new(phases: PhaseSet, out: PhaseSet) -> TopologyResult<Self> {
        check_out("Invariant point", 2, &phases, &out)?;
        Ok(Self {
            id: None,
            phases,
            out,
            cmd: String::new(),
            variance: 0,
            x: 0.0,
            y: 0.0,
            results: placeholder_results(),
            output: USER_DEFINED.to_string(),
            manual: false,
        })
    }

    /// User-placed point without solver results.
    pub fn manual(phases: PhaseSet, out: PhaseSet) -> TopologyResult<Self> {
        let mut inv = Self::new(phases, out)?;
        inv.manual = true;
        inv.output = "User-defined invariant point.".to_string();
        Ok(inv)
    }

    pub fn at(mut self, x: Real, y: Real) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_results(mut self, results: Vec<ResultBlock>) -> Self {
        self.results = results;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = cmd.into();
        self
    }

    pub fn with_variance(mut self, variance: i32) -> Self {
        self.variance = variance;
        self
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn midix(&self) -> usize {
        0
    }

    pub fn guess(&self, idx: Option<usize>) -> Option<&[String]> {
        self.results
            .get(idx.unwrap_or(self.midix()))?
            .guess
            .as_deref()
    }

    pub fn data(&self, idx: Option<usize>) -> Option<&SolverData> {
        self.results.get(idx.unwrap_or(self.midix()))?.data.as_ref()
    }

    pub fn label(&self, excess: &PhaseSet) -> String {
        label(&self.phases, &self.out, excess)
    }

    pub fn annotation(&self, show_out: bool) -> String {
        annotation(self.id.map_or(0, InvId::get), &self.out, show_out)
    }
}

impl fmt::Display for InvariantPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inv: {}", self.label(&PhaseSet::new()))
    }
}

/// Curve along which one phase has zero mode.
///
/// `raw` holds the computed sweep. `trimmed` is the part bounded by the
/// `begin`/`end` points, rebuilt by the section whenever either changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnivariantLine {
    pub id: Option<UniId>,
    pub phases: PhaseSet,
    /// Exactly one phase.
    pub out: PhaseSet,
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub variance: i32,
    #[serde(default)]
    pub(crate) raw: Vec<Point2>,
    #[serde(default = "placeholder_results")]
    pub results: Vec<ResultBlock>,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub begin: Option<InvId>,
    #[serde(default)]
    pub end: Option<InvId>,
    #[serde(default)]
    pub(crate) used: Range<usize>,
    #[serde(default)]
    pub(crate) trimmed: Vec<Point2>,
}

impl UnivariantLine {
    pub fn new(phases: PhaseSet, out: PhaseSet) -> TopologyResult<Self> {
        check_out("Univariant line", 1, &phases, &out)?;
        Ok(Self {
            id: None,
            phases,
            out,
            cmd: String::new(),
            variance: 0,
            raw: Vec::new(),
            results: placeholder_results(),
            output: USER_DEFINED.to_string(),
            manual: false,
            begin: None,
            end: None,
            used: 0..0,
            trimmed: Vec::new(),
        })
    }

    /// User-drawn connector without samples.
    pub fn manual(phases: PhaseSet, out: PhaseSet) -> TopologyResult<Self> {
        let mut uni = Self::new(phases, out)?;
        uni.manual = true;
        uni.output = "User-defined univariant line.".to_string();
        Ok(uni)
    }

    /// Raw samples with one result block per sample.
    pub fn with_samples(mut self, samples: Vec<Point2>, results: Vec<ResultBlock>) -> Self {
        self.set_samples(samples, results);
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = cmd.into();
        self
    }

    pub fn with_variance(mut self, variance: i32) -> Self {
        self.variance = variance;
        self
    }

    pub fn between(mut self, begin: Option<InvId>, end: Option<InvId>) -> Self {
        self.begin = begin;
        self.end = end;
        self
    }

    /// Replace the raw sweep; the trimmed view falls back to all samples
    /// until the owning section retrims.
    pub fn set_samples(&mut self, samples: Vec<Point2>, results: Vec<ResultBlock>) {
        self.used = 0..samples.len();
        self.trimmed = samples.clone();
        self.raw = samples;
        self.results = if results.is_empty() {
            placeholder_results()
        } else {
            results
        };
    }

    pub fn raw(&self) -> &[Point2] {
        &self.raw
    }

    pub fn trimmed(&self) -> &[Point2] {
        &self.trimmed
    }

    /// Slice of `raw` kept by the last trim.
    pub fn used(&self) -> Range<usize> {
        self.used.clone()
    }

    /// Number of bound ends.
    pub fn connected(&self) -> usize {
        usize::from(self.begin.is_some()) + usize::from(self.end.is_some())
    }

    /// Whether per-sample results line up with the raw sweep.
    pub fn has_sample_results(&self) -> bool {
        !self.raw.is_empty() && self.results.len() == self.raw.len()
    }

    pub fn midix(&self) -> usize {
        self.results.len() / 2
    }

    pub fn guess(&self, idx: Option<usize>) -> Option<&[String]> {
        self.results
            .get(idx.unwrap_or(self.midix()))?
            .guess
            .as_deref()
    }

    pub fn data(&self, idx: Option<usize>) -> Option<&SolverData> {
        self.results.get(idx.unwrap_or(self.midix()))?.data.as_ref()
    }

    pub fn label(&self, excess: &PhaseSet) -> String {
        label(&self.phases, &self.out, excess)
    }

    pub fn annotation(&self, show_out: bool) -> String {
        annotation(self.id.map_or(0, UniId::get), &self.out, show_out)
    }

    /// Point halfway along the trimmed curve.
    pub fn label_point(&self) -> Option<Point2> {
        let first = *self.trimmed.first()?;
        let total = cumulative_length(&self.trimmed).last().copied().unwrap_or(0.0);
        if total > 0.0 {
            interpolate(&self.trimmed, total / 2.0)
        } else {
            Some(first)
        }
    }
}

impl fmt::Display for UnivariantLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uni: {}", self.label(&PhaseSet::new()))
    }
}

/// Result of an unconstrained-assemblage search at one coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dogmin {
    pub id: Option<DogminId>,
    pub phases: PhaseSet,
    #[serde(default)]
    pub output: String,
    /// Raw per-assemblage listing.
    #[serde(default)]
    pub resic: String,
    pub x: Real,
    pub y: Real,
    #[serde(default)]
    pub guess: Vec<String>,
}

impl Dogmin {
    pub fn new(phases: PhaseSet, x: Real, y: Real) -> Self {
        Self {
            id: None,
            phases,
            output: String::new(),
            resic: String::new(),
            x,
            y,
            guess: Vec::new(),
        }
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn label(&self, excess: &PhaseSet) -> String {
        self.phases.difference(excess).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_cardinality_is_enforced() {
        let phases = PhaseSet::parse("g bi q");
        assert!(InvariantPoint::new(phases.clone(), PhaseSet::parse("g")).is_err());
        assert!(UnivariantLine::new(phases.clone(), PhaseSet::parse("g bi")).is_err());
        let err = UnivariantLine::new(phases, PhaseSet::parse("mu")).unwrap_err();
        assert!(matches!(err, TopologyError::OutNotInPhases { .. }));
    }

    #[test]
    fn labels_skip_excess() {
        let inv = InvariantPoint::new(PhaseSet::parse("q H2O g bi"), PhaseSet::parse("g bi"))
            .unwrap();
        assert_eq!(inv.label(&PhaseSet::parse("q H2O")), "bi g - bi g");
        assert_eq!(inv.annotation(false), "0");
        assert_eq!(inv.annotation(true), "0 bi g");
    }

    #[test]
    fn new_line_uses_all_samples() {
        let pts: Vec<Point2> = (0..5).map(|i| Point2::new(i as Real, 1.0)).collect();
        let uni = UnivariantLine::new(PhaseSet::parse("g bi q"), PhaseSet::parse("g"))
            .unwrap()
            .with_samples(pts.clone(), vec![ResultBlock::default(); 5]);
        assert_eq!(uni.used(), 0..5);
        assert_eq!(uni.trimmed(), pts.as_slice());
        assert_eq!(uni.midix(), 2);
        assert_eq!(uni.connected(), 0);
        assert!(uni.has_sample_results());
    }

    #[test]
    fn label_point_is_half_arclength() {
        let uni = UnivariantLine::new(PhaseSet::parse("g bi q"), PhaseSet::parse("g"))
            .unwrap()
            .with_samples(
                vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(4.0, 2.0)],
                Vec::new(),
            );
        assert_eq!(uni.label_point(), Some(Point2::new(3.0, 0.0)));
        assert_eq!(uni.results.len(), 1);
    }

    #[test]
    fn guess_defaults_to_middle_result() {
        let mut results = vec![ResultBlock::default(); 3];
        results[1].guess = Some(vec!["ptguess 1".into()]);
        let uni = UnivariantLine::new(PhaseSet::parse("g bi q"), PhaseSet::parse("g"))
            .unwrap()
            .with_samples(vec![Point2::default(); 3], results);
        assert_eq!(uni.guess(None), Some(&["ptguess 1".to_string()][..]));
        assert_eq!(uni.guess(Some(0)), None);
    }
}
