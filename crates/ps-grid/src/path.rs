//! Stable assemblages and their properties along a user-drawn path.

use ps_core::{PhaseSet, Point2, Real};
use ps_solver::{Solver, SolverSession};
use ps_topology::ResultBlock;
use tracing::{debug, info};

use crate::error::{GridError, GridResult};
use crate::explorer::Explorer;
use crate::expr::Expr;
use crate::grid::CellStatus;

/// `n` points along the polyline through `path`, evenly spaced in the
/// vertex-index parameter.
pub fn sample_path(path: &[Point2], n: usize) -> Vec<Point2> {
    match (path.len(), n) {
        (0, _) | (_, 0) => Vec::new(),
        (1, _) => vec![path[0]; n],
        (len, 1) => vec![path[0].lerp(path[len - 1], 0.5)],
        (len, _) => {
            let span = (len - 1) as Real;
            (0..n)
                .map(|i| {
                    let t = span * i as Real / (n - 1) as Real;
                    let seg = (t.floor() as usize).min(len - 2);
                    path[seg].lerp(path[seg + 1], t - seg as Real)
                })
                .collect()
        }
    }
}

/// Results collected along a path. `results[i]` is `None` where the point
/// is outside every field or the calculation failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathData {
    pub points: Vec<Point2>,
    pub fields: Vec<Option<PhaseSet>>,
    pub results: Vec<Option<ResultBlock>>,
    /// How many points ended without a result.
    pub missed: usize,
}

impl PathData {
    /// Values of `expr` on `phase` along the path.
    pub fn values(&self, phase: &str, expr: &str) -> GridResult<Vec<Option<Real>>> {
        let parsed = Expr::parse(expr)?;
        self.results
            .iter()
            .map(|block| {
                let Some(vars) = block.as_ref().and_then(|b| b.data.as_ref()).and_then(|d| d.get(phase))
                else {
                    return Ok(None);
                };
                parsed.eval(vars).map(Some).map_err(|what| GridError::Expr {
                    expr: expr.to_string(),
                    what,
                })
            })
            .collect()
    }
}

impl Explorer {
    /// Solve the stable assemblage at `n` points along `path`, seeding each
    /// calculation from the closest solved grid node of the same field.
    pub fn path_data<S: Solver>(
        &self,
        path: &[Point2],
        n: usize,
        solver: &mut S,
        session: &mut SolverSession,
    ) -> GridResult<PathData> {
        let grid = self.grid().ok_or(GridError::NotGridded)?;
        let ratio = self.section().ratio();
        let mut data = PathData::default();
        for p in sample_path(path, n) {
            let key = self.identify(p).cloned();
            let mut result = None;
            if let Some(key) = &key {
                let seed = grid
                    .masks
                    .get(key)
                    .and_then(|mask| grid.nearest_in_mask(p, mask, ratio))
                    .and_then(|(r, c)| {
                        let cell = grid.cell(r, c);
                        if cell.status == CellStatus::Solved {
                            return cell.result.clone();
                        }
                        grid.neighbours(r, c).into_iter().find_map(|(rn, cn)| {
                            let cell = grid.cell(rn, cn);
                            (cell.status == CellStatus::Solved).then(|| cell.result.clone()).flatten()
                        })
                    });
                if let Some(g) = seed.and_then(|b| b.guess) {
                    session.guesses = g;
                }
                let phases = key.difference(&self.section().excess);
                let run = solver.calc_assemblage(session, &phases, p)?;
                if run.is_ok() && run.samples.len() == 1 {
                    result = run.samples.into_iter().next().map(|s| s.result);
                } else {
                    debug!(x = p.x, y = p.y, "path point failed");
                }
            }
            if result.is_none() {
                data.missed += 1;
            }
            data.points.push(p);
            data.fields.push(key);
            data.results.push(result);
        }
        info!(points = data.points.len(), missed = data.missed, "path done");
        Ok(data)
    }
}
