//! Cell-centred calculation grid over a section window.

use std::collections::BTreeMap;
use std::fmt;

use ps_core::{PhaseSet, Point2, Real, Window};
use ps_topology::ResultBlock;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Outcome of the calculation at one grid node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    /// Outside every field, or not attempted yet.
    #[default]
    Unsolved,
    Failed,
    Solved,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub status: CellStatus,
    pub result: Option<ResultBlock>,
    /// Wall time of the successful calculation, seconds.
    pub delta: Option<Real>,
}

/// `ny` rows by `nx` columns of nodes at the cell centres of the window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridData {
    xs: Vec<Real>,
    ys: Vec<Real>,
    cells: Vec<GridCell>,
    /// Per-field membership of every node, row-major. Rebuilt from the
    /// field polygons rather than stored.
    #[serde(skip)]
    pub masks: BTreeMap<PhaseSet, Vec<bool>>,
}

fn centres(lo: Real, hi: Real, n: usize) -> Vec<Real> {
    let d = (hi - lo) / n as Real;
    (0..n).map(|i| lo + d * (i as Real + 0.5)).collect()
}

impl GridData {
    pub fn new(window: Window, nx: usize, ny: usize) -> GridResult<Self> {
        if nx < 2 || ny < 2 {
            return Err(GridError::InvalidGrid {
                what: format!("grid needs at least 2x2 nodes, got {nx}x{ny}"),
            });
        }
        Ok(Self {
            xs: centres(window.xmin, window.xmax, nx),
            ys: centres(window.ymin, window.ymax, ny),
            cells: vec![GridCell::default(); nx * ny],
            masks: BTreeMap::new(),
        })
    }

    pub fn nx(&self) -> usize {
        self.xs.len()
    }

    pub fn ny(&self) -> usize {
        self.ys.len()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn flat(&self, r: usize, c: usize) -> usize {
        r * self.nx() + c
    }

    /// Row and column of a flat index.
    pub fn row_col(&self, i: usize) -> (usize, usize) {
        (i / self.nx(), i % self.nx())
    }

    pub fn point(&self, r: usize, c: usize) -> Point2 {
        Point2::new(self.xs[c], self.ys[r])
    }

    pub fn cell(&self, r: usize, c: usize) -> &GridCell {
        &self.cells[self.flat(r, c)]
    }

    pub fn cell_mut(&mut self, r: usize, c: usize) -> &mut GridCell {
        let i = self.flat(r, c);
        &mut self.cells[i]
    }

    /// All nodes row by row as `(row, col, point, cell)`.
    pub fn nodes(&self) -> impl Iterator<Item = (usize, usize, Point2, &GridCell)> + '_ {
        self.cells.iter().enumerate().map(|(i, cell)| {
            let (r, c) = self.row_col(i);
            (r, c, self.point(r, c), cell)
        })
    }

    /// The up to eight surrounding nodes, row by row.
    pub fn neighbours(&self, r: usize, c: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(8);
        for dr in [-1i64, 0, 1] {
            for dc in [-1i64, 0, 1] {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (rn, cn) = (r as i64 + dr, c as i64 + dc);
                if rn >= 0 && cn >= 0 && (rn as usize) < self.ny() && (cn as usize) < self.nx() {
                    out.push((rn as usize, cn as usize));
                }
            }
        }
        out
    }

    pub fn x_step(&self) -> Real {
        self.xs[1] - self.xs[0]
    }

    pub fn y_step(&self) -> Real {
        self.ys[1] - self.ys[0]
    }

    /// Window covered by the cells (not just their centres).
    pub fn extent(&self) -> Window {
        let (hx, hy) = (self.x_step() / 2.0, self.y_step() / 2.0);
        Window::new(
            (self.xs[0] - hx, self.xs[self.nx() - 1] + hx),
            (self.ys[0] - hy, self.ys[self.ny() - 1] + hy),
        )
    }

    pub fn count(&self, status: CellStatus) -> usize {
        self.cells.iter().filter(|c| c.status == status).count()
    }

    /// Node closest to `p` among those flagged in `mask`, distances
    /// taken with y scaled by `ratio`.
    pub fn nearest_in_mask(&self, p: Point2, mask: &[bool], ratio: Real) -> Option<(usize, usize)> {
        let q = p.scaled(ratio);
        self.nodes()
            .filter(|(r, c, _, _)| mask.get(self.flat(*r, *c)).copied().unwrap_or(false))
            .map(|(r, c, pt, _)| ((r, c), pt.scaled(ratio).distance(q)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(rc, _)| rc)
    }
}

impl fmt::Display for GridData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Grid {}x{} with ok/failed/none solutions {}/{}/{}",
            self.nx(),
            self.ny(),
            self.count(CellStatus::Solved),
            self.count(CellStatus::Failed),
            self.count(CellStatus::Unsolved)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridData {
        GridData::new(Window::new((0.0, 10.0), (0.0, 4.0)), 5, 4).unwrap()
    }

    #[test]
    fn nodes_sit_at_cell_centres() {
        let g = grid();
        assert_eq!(g.point(0, 0), Point2::new(1.0, 0.5));
        assert_eq!(g.point(3, 4), Point2::new(9.0, 3.5));
        assert_eq!(g.x_step(), 2.0);
        assert_eq!(g.extent(), Window::new((0.0, 10.0), (0.0, 4.0)));
    }

    #[test]
    fn neighbours_clip_at_edges() {
        let g = grid();
        assert_eq!(g.neighbours(0, 0), vec![(0, 1), (1, 0), (1, 1)]);
        assert_eq!(g.neighbours(1, 1).len(), 8);
        assert_eq!(g.neighbours(3, 4).len(), 3);
    }

    #[test]
    fn summary_counts_statuses() {
        let mut g = grid();
        g.cell_mut(0, 0).status = CellStatus::Solved;
        g.cell_mut(0, 1).status = CellStatus::Failed;
        assert_eq!(g.to_string(), "Grid 5x4 with ok/failed/none solutions 1/1/18");
    }

    #[test]
    fn too_small_grid_is_rejected() {
        assert!(GridData::new(Window::new((0.0, 1.0), (0.0, 1.0)), 1, 5).is_err());
    }
}
