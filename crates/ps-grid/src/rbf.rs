//! Thin-plate radial basis function interpolation.

use nalgebra::{DMatrix, DVector};
use ps_core::{Point2, Real};

use crate::error::{GridError, GridResult};

fn thin_plate(r: Real) -> Real {
    if r == 0.0 { 0.0 } else { r * r * r.ln() }
}

/// Interpolant through scattered values.
///
/// The y coordinate is multiplied by `ratio` before distances are taken so
/// both axes carry comparable weight.
#[derive(Clone, Debug)]
pub struct Rbf {
    nodes: Vec<Point2>,
    weights: DVector<Real>,
    ratio: Real,
}

impl Rbf {
    /// Fit through `values` at `points`. A positive `smooth` relaxes the fit
    /// from exact interpolation.
    pub fn fit(points: &[Point2], values: &[Real], ratio: Real, smooth: Real) -> GridResult<Self> {
        if points.len() != values.len() {
            return Err(GridError::Interpolation {
                what: format!("{} points but {} values", points.len(), values.len()),
            });
        }
        if points.is_empty() {
            return Err(GridError::Interpolation {
                what: "no data points".to_string(),
            });
        }
        let nodes: Vec<Point2> = points.iter().map(|p| p.scaled(ratio)).collect();
        let n = nodes.len();
        let a = DMatrix::from_fn(n, n, |i, j| {
            let phi = thin_plate(nodes[i].distance(nodes[j]));
            if i == j { phi - smooth } else { phi }
        });
        let b = DVector::from_column_slice(values);
        let weights = a.lu().solve(&b).ok_or_else(|| GridError::Interpolation {
            what: "singular interpolation matrix (duplicate points?)".to_string(),
        })?;
        Ok(Self {
            nodes,
            weights,
            ratio,
        })
    }

    pub fn eval(&self, p: Point2) -> Real {
        let q = p.scaled(self.ratio);
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .map(|(n, w)| w * thin_plate(n.distance(q)))
            .sum()
    }
}
