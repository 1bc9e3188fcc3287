//! Gridded exploration of a finished section: which field a coordinate
//! falls in, stable-assemblage calculations on a regular grid, and
//! collection of derived quantities per field.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;

use geo::Contains;
use ps_areas::{AreaReport, create_shapes};
use ps_core::{InvId, PhaseSet, Point2, Real, UniId};
use ps_solver::{Solver, SolverSession};
use ps_topology::{ResultBlock, Section};
use tracing::{debug, info, warn};

use crate::data::{FieldData, Sources};
use crate::error::{GridError, GridResult};
use crate::expr::Expr;
use crate::grid::{CellStatus, GridData};

/// Name of the phase a data key refers to: `g(alm)` belongs to `g`.
pub fn base_phase(phase: &str) -> &str {
    phase.split('(').next().unwrap_or(phase).trim()
}

/// Values of `expr` over one phase's entry of a result block.
fn eval_block(block: &ResultBlock, phase: &str, expr: &Expr, src: &str) -> GridResult<Option<Real>> {
    let Some(vars) = block.data.as_ref().and_then(|d| d.get(phase)) else {
        return Ok(None);
    };
    expr.eval(vars).map(Some).map_err(|what| GridError::Expr {
        expr: src.to_string(),
        what,
    })
}

/// Successful single-node calculation.
struct Solved {
    block: ResultBlock,
    delta: Real,
    variance: i32,
}

fn solve_at<S: Solver>(
    solver: &mut S,
    session: &SolverSession,
    phases: &PhaseSet,
    at: Point2,
) -> GridResult<Option<Solved>> {
    let start = Instant::now();
    let run = solver.calc_assemblage(session, phases, at)?;
    let delta = start.elapsed().as_secs_f64();
    if !run.is_ok() || run.samples.len() != 1 {
        return Ok(None);
    }
    let variance = run.variance;
    Ok(run.samples.into_iter().next().map(|s| Solved {
        block: s.result,
        delta,
        variance,
    }))
}

/// A section together with its fields and, once computed, its grid.
#[derive(Clone, Debug)]
pub struct Explorer {
    section: Section,
    report: AreaReport,
    grid: Option<GridData>,
    variance: BTreeMap<PhaseSet, i32>,
    all_data_keys: BTreeMap<String, Vec<String>>,
}

impl Explorer {
    pub fn new(section: Section) -> Self {
        let report = create_shapes(&section);
        if !report.log.is_empty() {
            info!("{}", report.log.join(" "));
        }
        Self {
            section,
            report,
            grid: None,
            variance: BTreeMap::new(),
            all_data_keys: BTreeMap::new(),
        }
    }

    /// Attach a previously computed grid.
    pub fn with_grid(mut self, grid: GridData) -> Self {
        self.grid = Some(grid);
        self.create_masks();
        self.collect_all_data_keys();
        self
    }

    pub fn section(&self) -> &Section {
        &self.section
    }

    pub fn report(&self) -> &AreaReport {
        &self.report
    }

    pub fn grid(&self) -> Option<&GridData> {
        self.grid.as_ref()
    }

    pub fn is_gridded(&self) -> bool {
        self.grid.is_some()
    }

    /// Variance of a field, known once a grid node inside it was solved.
    pub fn variance(&self, key: &PhaseSet) -> Option<i32> {
        self.variance.get(key).copied()
    }

    /// Variables available for each phase in the grid results.
    pub fn all_data_keys(&self) -> &BTreeMap<String, Vec<String>> {
        &self.all_data_keys
    }

    pub fn keys(&self) -> impl Iterator<Item = &PhaseSet> + '_ {
        self.report.shapes.keys()
    }

    /// Every phase stable somewhere in the section.
    pub fn phases(&self) -> PhaseSet {
        self.keys().flat_map(|k| k.iter().map(str::to_string)).collect()
    }

    pub fn identify(&self, p: Point2) -> Option<&PhaseSet> {
        self.report.field_at(p)
    }

    /// Points bounding the given lines.
    pub fn invs_from_edges(&self, edges: &[UniId]) -> BTreeSet<InvId> {
        edges
            .iter()
            .filter_map(|id| self.section.uniline(*id))
            .flat_map(|uni| [uni.begin, uni.end])
            .flatten()
            .collect()
    }

    fn edges_of(&self, key: &PhaseSet) -> GridResult<&[UniId]> {
        self.report
            .edges
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| GridError::UnknownField(key.clone()))
    }

    fn nearest_inv(&self, p: Point2) -> Option<InvId> {
        self.section
            .invpoints()
            .map(|(id, inv)| (id, inv.point().distance(p)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Guess of the bounding-line sample closest to `p`.
    fn nearest_edge_guess(&self, key: &PhaseSet, p: Point2) -> Option<Vec<String>> {
        let mut best: Option<(Real, Vec<String>)> = None;
        for id in self.report.edges.get(key)? {
            let Some(uni) = self.section.uniline(*id) else {
                continue;
            };
            for ix in uni.used() {
                let d = uni.raw()[ix].distance(p);
                if best.as_ref().is_none_or(|(bd, _)| d < *bd)
                    && let Some(g) = uni.guess(Some(ix))
                {
                    best = Some((d, g.to_vec()));
                }
            }
        }
        best.map(|(_, g)| g)
    }

    /// Solve the stable assemblage at every grid node inside a field.
    ///
    /// Each node is seeded with the guess of the nearest invariant point,
    /// retried with the nearest bounding-line sample, and finally with solved
    /// neighbours in a repair pass.
    pub fn calculate_composition<S: Solver>(
        &mut self,
        solver: &mut S,
        session: &mut SolverSession,
        nx: usize,
        ny: usize,
    ) -> GridResult<()> {
        let mut grid = GridData::new(self.section.window(), nx, ny)?;
        let mut last_inv = None;
        for i in 0..grid.len() {
            let (r, c) = grid.row_col(i);
            let p = grid.point(r, c);
            let Some(key) = self.identify(p).cloned() else {
                continue;
            };
            if let Some(id) = self.nearest_inv(p)
                && last_inv != Some(id)
            {
                if let Some(g) = self.section.invpoint(id).and_then(|inv| inv.guess(None)) {
                    session.guesses = g.to_vec();
                }
                last_inv = Some(id);
            }
            grid.cell_mut(r, c).status = CellStatus::Failed;
            let phases = key.difference(&self.section.excess);
            let mut solved = solve_at(solver, session, &phases, p)?;
            if solved.is_none()
                && let Some(g) = self.nearest_edge_guess(&key, p)
            {
                session.guesses = g;
                solved = solve_at(solver, session, &phases, p)?;
            }
            if let Some(s) = solved {
                self.variance.entry(key).or_insert(s.variance);
                let cell = grid.cell_mut(r, c);
                cell.status = CellStatus::Solved;
                cell.result = Some(s.block);
                cell.delta = Some(s.delta);
            }
        }
        info!(
            empty = grid.count(CellStatus::Failed),
            "grid search done"
        );
        self.grid = Some(grid);
        self.fix_solutions(solver, session)?;
        self.create_masks();
        self.collect_all_data_keys();
        Ok(())
    }

    /// Retry failed nodes seeded from solved neighbours. Returns how many
    /// were fixed.
    pub fn fix_solutions<S: Solver>(
        &mut self,
        solver: &mut S,
        session: &mut SolverSession,
    ) -> GridResult<usize> {
        let mut grid = self.grid.take().ok_or(GridError::NotGridded)?;
        let outcome = self.retry_failed(&mut grid, solver, session);
        let empty = grid.count(CellStatus::Failed);
        self.grid = Some(grid);
        let fixed = outcome?;
        info!(fixed, empty, "fix done");
        Ok(fixed)
    }

    fn retry_failed<S: Solver>(
        &self,
        grid: &mut GridData,
        solver: &mut S,
        session: &mut SolverSession,
    ) -> GridResult<usize> {
        let failed: Vec<(usize, usize)> = (0..grid.len())
            .map(|i| grid.row_col(i))
            .filter(|&(r, c)| grid.cell(r, c).status == CellStatus::Failed)
            .collect();
        let mut fixed = 0;
        for (r, c) in failed {
            let p = grid.point(r, c);
            let Some(key) = self.identify(p).cloned() else {
                continue;
            };
            let phases = key.difference(&self.section.excess);
            for (rn, cn) in grid.neighbours(r, c) {
                let neighbour = grid.cell(rn, cn);
                if neighbour.status != CellStatus::Solved {
                    continue;
                }
                if let Some(g) = neighbour.result.as_ref().and_then(|b| b.guess.clone()) {
                    session.guesses = g;
                }
                if let Some(s) = solve_at(solver, session, &phases, p)? {
                    let cell = grid.cell_mut(r, c);
                    cell.status = CellStatus::Solved;
                    cell.result = Some(s.block);
                    cell.delta = Some(s.delta);
                    fixed += 1;
                    break;
                }
            }
            if grid.cell(r, c).status != CellStatus::Solved {
                warn!(x = p.x, y = p.y, "no solution found");
            }
        }
        Ok(fixed)
    }

    /// Rebuild per-field node membership from the field polygons.
    pub fn create_masks(&mut self) {
        let Some(grid) = self.grid.as_mut() else {
            return;
        };
        let mut masks = BTreeMap::new();
        for (key, shape) in &self.report.shapes {
            let mask: Vec<bool> = grid
                .nodes()
                .map(|(_, _, p, _)| shape.contains(&geo::Point::new(p.x, p.y)))
                .collect();
            masks.insert(key.clone(), mask);
        }
        debug!(fields = masks.len(), "grid masks created");
        grid.masks = masks;
    }

    /// Record which variables each phase offers, from the first solved node
    /// of every field.
    pub fn collect_all_data_keys(&mut self) {
        let mut keys = BTreeMap::new();
        if let Some(grid) = &self.grid {
            for mask in grid.masks.values() {
                let first = grid
                    .nodes()
                    .zip(mask)
                    .filter(|(_, inside)| **inside)
                    .find_map(|((_, _, _, cell), _)| {
                        (cell.status == CellStatus::Solved).then_some(cell.result.as_ref()).flatten()
                    });
                if let Some(data) = first.and_then(|b| b.data.as_ref()) {
                    for (phase, vars) in data {
                        keys.insert(phase.clone(), vars.keys().cloned().collect());
                    }
                }
            }
        }
        self.all_data_keys = keys;
    }

    pub fn collect_inv_data(&self, key: &PhaseSet, phase: &str, expr: &str) -> GridResult<FieldData> {
        let parsed = Expr::parse(expr)?;
        let mut out = FieldData::default();
        for id in self.invs_from_edges(self.edges_of(key)?) {
            let Some(inv) = self.section.invpoint(id) else {
                continue;
            };
            if inv.manual {
                continue;
            }
            if let Some(block) = inv.results.first()
                && let Some(v) = eval_block(block, phase, &parsed, expr)?
            {
                out.push(inv.point(), v);
            }
        }
        Ok(out)
    }

    pub fn collect_edges_data(&self, key: &PhaseSet, phase: &str, expr: &str) -> GridResult<FieldData> {
        let parsed = Expr::parse(expr)?;
        let mut out = FieldData::default();
        for id in self.edges_of(key)? {
            let Some(uni) = self.section.uniline(*id) else {
                continue;
            };
            let has_phase = uni.data(None).is_some_and(|d| d.contains_key(phase));
            if uni.manual || !has_phase || !uni.has_sample_results() {
                continue;
            }
            for ix in uni.used() {
                if let Some(v) = eval_block(&uni.results[ix], phase, &parsed, expr)? {
                    out.push(uni.raw()[ix], v);
                }
            }
        }
        Ok(out)
    }

    pub fn collect_grid_data(&self, key: &PhaseSet, phase: &str, expr: &str) -> GridResult<FieldData> {
        let parsed = Expr::parse(expr)?;
        let mut out = FieldData::default();
        let Some(grid) = &self.grid else {
            return Ok(out);
        };
        let Some(mask) = grid.masks.get(key) else {
            return Ok(out);
        };
        for ((_, _, p, cell), inside) in grid.nodes().zip(mask) {
            if !*inside || cell.status != CellStatus::Solved {
                continue;
            }
            if let Some(block) = &cell.result
                && let Some(v) = eval_block(block, phase, &parsed, expr)?
            {
                out.push(p, v);
            }
        }
        Ok(out)
    }

    /// Samples of `expr` for `phase` inside one field, from the chosen
    /// sources. Empty when the phase is not part of the field.
    pub fn collect_data(
        &self,
        key: &PhaseSet,
        phase: &str,
        expr: &str,
        which: Sources,
    ) -> GridResult<FieldData> {
        let mut out = FieldData::default();
        if !key.contains(base_phase(phase)) {
            return Ok(out);
        }
        if which.contains(Sources::INV) {
            out.extend(self.collect_inv_data(key, phase, expr)?);
        }
        if which.contains(Sources::EDGES) {
            out.extend(self.collect_edges_data(key, phase, expr)?);
        }
        if which.contains(Sources::GRID) {
            out.extend(self.collect_grid_data(key, phase, expr)?);
        }
        Ok(out)
    }

    /// Field data for every field carrying the phase, with the overall
    /// value range.
    pub fn merge_data(&self, phase: &str, expr: &str, which: Sources) -> GridResult<MergedData> {
        let mut merged = MergedData::default();
        for key in self.keys() {
            let data = self.collect_data(key, phase, expr, which)?;
            if let Some((lo, hi)) = data.range() {
                merged.min = merged.min.min(lo);
                merged.max = merged.max.max(hi);
                merged.fields.insert(key.clone(), data);
            }
        }
        Ok(merged)
    }
}

/// Data of several fields with the range over all of them.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedData {
    pub fields: BTreeMap<PhaseSet, FieldData>,
    pub min: Real,
    pub max: Real,
}

impl Default for MergedData {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            min: Real::MAX,
            max: Real::MIN,
        }
    }
}

impl MergedData {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Explorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.section)?;
        write!(f, "Areas: {}", self.report.len())?;
        if let Some(grid) = &self.grid {
            write!(f, "\n{grid}")?;
        }
        Ok(())
    }
}
