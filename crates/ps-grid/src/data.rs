//! Values of a derived quantity gathered from points, lines and grid nodes.

use std::ops::BitOr;

use ps_core::{Point2, Real};

/// Which stored calculations feed a data collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sources(u8);

impl Sources {
    pub const INV: Sources = Sources(1);
    pub const EDGES: Sources = Sources(2);
    pub const GRID: Sources = Sources(4);
    pub const ALL: Sources = Sources(7);

    /// From the numeric bitmask (1 points, 2 lines, 4 grid).
    pub fn from_bits(bits: u8) -> Self {
        Sources(bits & 7)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Sources) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for Sources {
    fn default() -> Self {
        Sources::ALL
    }
}

impl BitOr for Sources {
    type Output = Sources;

    fn bitor(self, rhs: Sources) -> Sources {
        Sources(self.0 | rhs.0)
    }
}

/// Scattered samples of one quantity inside one field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldData {
    pub points: Vec<Point2>,
    pub values: Vec<Real>,
}

impl FieldData {
    pub fn push(&mut self, p: Point2, v: Real) {
        self.points.push(p);
        self.values.push(v);
    }

    pub fn extend(&mut self, other: FieldData) {
        self.points.extend(other.points);
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Smallest and largest value.
    pub fn range(&self) -> Option<(Real, Real)> {
        let mut it = self.values.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}
