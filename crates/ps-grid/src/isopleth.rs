//! Isopleths: interpolated surfaces of a derived quantity over each field,
//! with contour levels shared across fields.

use std::collections::BTreeMap;

use geo::{BoundingRect, Contains};
use ps_core::{PhaseSet, Point2, Real, UniId};
use tracing::{info, warn};

use crate::data::Sources;
use crate::error::{GridError, GridResult};
use crate::explorer::Explorer;
use crate::rbf::Rbf;

/// How an isopleth set is built.
#[derive(Clone, Debug, PartialEq)]
pub struct IsoplethOptions {
    pub which: Sources,
    /// Relaxation of the interpolant; 0 passes through every sample.
    pub smooth: Real,
    /// Fixed contour spacing. Without it `n` evenly spaced levels span the
    /// data range.
    pub step: Option<Real>,
    pub n: usize,
    /// Surface nodes per grid step.
    pub refine: usize,
    /// Restrict to a single field.
    pub only: Option<PhaseSet>,
}

impl Default for IsoplethOptions {
    fn default() -> Self {
        Self {
            which: Sources::ALL,
            smooth: 0.0,
            step: None,
            n: 10,
            refine: 1,
            only: None,
        }
    }
}

/// Contour levels for values in `[mn, mx]`.
pub fn contour_levels(mn: Real, mx: Real, step: Option<Real>, n: usize) -> Vec<Real> {
    match step {
        Some(step) if step > 0.0 => {
            let count = ((mx + step) / step).ceil().max(0.0) as usize;
            (0..count)
                .map(|i| i as Real * step)
                .filter(|v| *v >= mn - step)
                .collect()
        }
        _ => {
            let dm = (mx - mn) / 25.0;
            let (lo, hi) = (mn - dm, mx + dm);
            match n {
                0 => Vec::new(),
                1 => vec![lo],
                _ => (0..n)
                    .map(|i| lo + (hi - lo) * i as Real / (n - 1) as Real)
                    .collect(),
            }
        }
    }
}

/// Interpolated values of one field on a regular mesh. Nodes outside the
/// field are `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSurface {
    pub xs: Vec<Real>,
    pub ys: Vec<Real>,
    /// Row-major, `ys.len()` rows.
    pub values: Vec<Option<Real>>,
}

impl FieldSurface {
    pub fn value(&self, r: usize, c: usize) -> Option<Real> {
        self.values.get(r * self.xs.len() + c).copied().flatten()
    }

    pub fn range(&self) -> Option<(Real, Real)> {
        self.values.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Contour segments at `level` by marching squares. Cells touching a
    /// node outside the field are skipped.
    pub fn contour(&self, level: Real) -> Vec<(Point2, Point2)> {
        let mut segments = Vec::new();
        let (nx, ny) = (self.xs.len(), self.ys.len());
        for r in 0..ny.saturating_sub(1) {
            for c in 0..nx.saturating_sub(1) {
                let corners = [(r, c), (r, c + 1), (r + 1, c + 1), (r + 1, c)];
                let mut vals = [0.0; 4];
                let mut complete = true;
                for (k, &(rr, cc)) in corners.iter().enumerate() {
                    match self.value(rr, cc) {
                        Some(v) => vals[k] = v,
                        None => complete = false,
                    }
                }
                if !complete {
                    continue;
                }
                let pts: Vec<Point2> = corners
                    .iter()
                    .map(|&(rr, cc)| Point2::new(self.xs[cc], self.ys[rr]))
                    .collect();
                let mut crossings = Vec::with_capacity(4);
                for k in 0..4 {
                    let (va, vb) = (vals[k], vals[(k + 1) % 4]);
                    if (va < level) != (vb < level) {
                        let t = (level - va) / (vb - va);
                        crossings.push(pts[k].lerp(pts[(k + 1) % 4], t));
                    }
                }
                // saddles resolve by pairing consecutive crossings
                for pair in crossings.chunks_exact(2) {
                    segments.push((pair[0], pair[1]));
                }
            }
        }
        segments
    }
}

/// Isopleths of one quantity across the fields of a section.
#[derive(Clone, Debug, PartialEq)]
pub struct IsoplethSet {
    pub phase: String,
    pub expr: String,
    pub levels: Vec<Real>,
    pub fields: BTreeMap<PhaseSet, FieldSurface>,
    /// Lines along which the phase has zero mode.
    pub zero_mode: Vec<UniId>,
    /// Fields with data that could not be interpolated.
    pub failed: Vec<PhaseSet>,
}

impl IsoplethSet {
    pub fn contours(&self, key: &PhaseSet) -> Vec<(Real, Vec<(Point2, Point2)>)> {
        let Some(surface) = self.fields.get(key) else {
            return Vec::new();
        };
        self.levels
            .iter()
            .map(|&level| (level, surface.contour(level)))
            .filter(|(_, segs)| !segs.is_empty())
            .collect()
    }
}

fn mesh(lo: Real, hi: Real, step: Real) -> GridResult<Vec<Real>> {
    let count = ((hi - lo) / step).floor();
    if step.is_nan() || step <= 0.0 || !count.is_finite() {
        return Err(GridError::Interpolation {
            what: format!("mesh step {step} over {lo}..{hi}"),
        });
    }
    let n = count.max(0.0) as usize + 1;
    Ok((0..n).map(|i| lo + step * i as Real).collect())
}

impl Explorer {
    /// Build isopleths of `expr` evaluated on `phase`.
    pub fn isopleths(&self, phase: &str, expr: &str, opts: &IsoplethOptions) -> GridResult<IsoplethSet> {
        let merged = self.merge_data(phase, expr, opts.which)?;
        if merged.is_empty() {
            return Err(GridError::NoData {
                phase: phase.to_string(),
                expr: expr.to_string(),
            });
        }
        let levels = contour_levels(merged.min, merged.max, opts.step, opts.n);
        let refine = opts.refine.max(1) as Real;
        let window = self.section().window();
        let (dx, dy) = match self.grid() {
            Some(grid) => (grid.x_step() / refine, grid.y_step() / refine),
            None => (window.width() / 50.0, window.height() / 50.0),
        };
        let ratio = self.section().ratio();

        let mut fields = BTreeMap::new();
        let mut failed = Vec::new();
        for (key, data) in &merged.fields {
            if opts.only.as_ref().is_some_and(|only| only != key) {
                continue;
            }
            let Some(shape) = self.report().shapes.get(key) else {
                continue;
            };
            let Some(rect) = shape.bounding_rect() else {
                continue;
            };
            let rbf = match Rbf::fit(&data.points, &data.values, ratio, opts.smooth) {
                Ok(rbf) => rbf,
                Err(err) => {
                    warn!(field = %key, error = %err, "isopleth interpolation failed");
                    failed.push(key.clone());
                    continue;
                }
            };
            let xs = mesh(rect.min().x - dx, rect.max().x + dx, dx)?;
            let ys = mesh(rect.min().y - dy, rect.max().y + dy, dy)?;
            let mut values = Vec::with_capacity(xs.len() * ys.len());
            for &y in &ys {
                for &x in &xs {
                    let inside = shape.contains(&geo::Point::new(x, y));
                    values.push(inside.then(|| rbf.eval(Point2::new(x, y))));
                }
            }
            fields.insert(key.clone(), FieldSurface { xs, ys, values });
        }
        info!(
            phase,
            expr,
            fields = fields.len(),
            failed = failed.len(),
            "isopleths done"
        );
        Ok(IsoplethSet {
            phase: phase.to_string(),
            expr: expr.to_string(),
            levels,
            fields,
            zero_mode: self.section().lines_with_zero_mode(crate::explorer::base_phase(phase)),
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_levels_start_below_minimum() {
        let levels = contour_levels(0.23, 0.61, Some(0.1), 10);
        assert_eq!(levels.len(), 6);
        assert!((levels[0] - 0.2).abs() < 1e-12);
        assert!((levels[5] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn mesh_rejects_degenerate_step() {
        assert_eq!(mesh(0.0, 1.0, 0.5).unwrap(), vec![0.0, 0.5, 1.0]);
        assert!(matches!(mesh(0.0, 1.0, 0.0), Err(GridError::Interpolation { .. })));
        assert!(mesh(0.0, 1.0, Real::NAN).is_err());
        assert!(mesh(0.0, 1.0, -0.1).is_err());
    }

    #[test]
    fn even_levels_pad_the_range() {
        let levels = contour_levels(0.0, 25.0, None, 3);
        assert_eq!(levels, vec![-1.0, 12.5, 26.0]);
    }

    #[test]
    fn contour_of_linear_surface_is_straight() {
        let surface = FieldSurface {
            xs: vec![0.0, 1.0, 2.0],
            ys: vec![0.0, 1.0],
            values: vec![Some(0.0), Some(1.0), Some(2.0), Some(0.0), Some(1.0), Some(2.0)],
        };
        let segs = surface.contour(0.5);
        assert_eq!(segs.len(), 1);
        let (a, b) = segs[0];
        assert!((a.x - 0.5).abs() < 1e-12 && (b.x - 0.5).abs() < 1e-12);
        assert!(surface.contour(5.0).is_empty());
    }

    #[test]
    fn holes_are_skipped() {
        let surface = FieldSurface {
            xs: vec![0.0, 1.0],
            ys: vec![0.0, 1.0],
            values: vec![Some(0.0), None, Some(0.0), Some(1.0)],
        };
        assert!(surface.contour(0.5).is_empty());
        assert_eq!(surface.range(), Some((0.0, 1.0)));
    }
}
