//! Planar helpers shared by trimming, area reconstruction and manual point
//! placement.
//!
//! Polylines are plain `&[Point2]` slices. Arclength positions ("projections")
//! follow the usual linear-referencing convention: the distance along the
//! polyline to the closest point on it.

use crate::{PsError, PsResult, Real};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinate pair in section units (e.g. temperature, pressure).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2 {
    pub x: Real,
    pub y: Real,
}

impl Point2 {
    pub const fn new(x: Real, y: Real) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2) -> Real {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Same point with `y` multiplied by the section aspect ratio.
    pub fn scaled(self, ratio: Real) -> Point2 {
        Point2::new(self.x, self.y * ratio)
    }

    /// Inverse of [`Point2::scaled`].
    pub fn unscaled(self, ratio: Real) -> Point2 {
        Point2::new(self.x, self.y / ratio)
    }

    pub fn lerp(self, other: Point2, t: Real) -> Point2 {
        Point2::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
        )
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(Real, Real)> for Point2 {
    fn from((x, y): (Real, Real)) -> Self {
        Point2::new(x, y)
    }
}

impl From<Point2> for (Real, Real) {
    fn from(p: Point2) -> Self {
        (p.x, p.y)
    }
}

/// One of the four sides of a [`Window`], counter-clockwise from the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Bottom,
    Right,
    Top,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Bottom, Side::Right, Side::Top, Side::Left];

    pub fn index(self) -> usize {
        match self {
            Side::Bottom => 0,
            Side::Right => 1,
            Side::Top => 2,
            Side::Left => 3,
        }
    }

    pub fn opposite(self) -> Side {
        Side::ALL[(self.index() + 2) % 4]
    }

    pub fn is_adjacent(self, other: Side) -> bool {
        self != other && self.opposite() != other
    }
}

/// Axis-aligned rectangle in section coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Window {
    pub xmin: Real,
    pub xmax: Real,
    pub ymin: Real,
    pub ymax: Real,
}

impl Window {
    /// Window spanning the two ranges; bounds are sorted.
    pub fn new(x: (Real, Real), y: (Real, Real)) -> Self {
        Self {
            xmin: x.0.min(x.1),
            xmax: x.0.max(x.1),
            ymin: y.0.min(y.1),
            ymax: y.0.max(y.1),
        }
    }

    pub fn width(&self) -> Real {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> Real {
        self.ymax - self.ymin
    }

    /// x-span over y-span.
    pub fn ratio(&self) -> Real {
        self.width() / self.height()
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            0.5 * (self.xmin + self.xmax),
            0.5 * (self.ymin + self.ymax),
        )
    }

    /// Closed containment test.
    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    /// Strictly beyond one of the sides.
    pub fn is_outside(&self, p: Point2) -> bool {
        p.x < self.xmin || p.x > self.xmax || p.y < self.ymin || p.y > self.ymax
    }

    /// Window moved inwards by `d` on every side.
    pub fn shrunk(&self, d: Real) -> Window {
        Window {
            xmin: self.xmin + d,
            xmax: self.xmax - d,
            ymin: self.ymin + d,
            ymax: self.ymax - d,
        }
    }

    /// Window grown by `percent` of its span on every side.
    pub fn extended(&self, percent: Real) -> Window {
        let dx = percent * self.width() / 100.0;
        let dy = percent * self.height() / 100.0;
        Window {
            xmin: self.xmin - dx,
            xmax: self.xmax + dx,
            ymin: self.ymin - dy,
            ymax: self.ymax + dy,
        }
    }

    /// Corners counter-clockwise from `(xmin, ymin)`.
    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.xmin, self.ymin),
            Point2::new(self.xmax, self.ymin),
            Point2::new(self.xmax, self.ymax),
            Point2::new(self.xmin, self.ymax),
        ]
    }

    /// Start and end corner of a side, walking counter-clockwise.
    pub fn side(&self, side: Side) -> (Point2, Point2) {
        let c = self.corners();
        let i = side.index();
        (c[i], c[(i + 1) % 4])
    }

    /// Corner shared by two adjacent sides.
    pub fn shared_corner(&self, a: Side, b: Side) -> Option<Point2> {
        if !a.is_adjacent(b) {
            return None;
        }
        let c = self.corners();
        let (i, j) = (a.index(), b.index());
        // side i runs from corner i to corner i+1
        if (i + 1) % 4 == j {
            Some(c[j])
        } else {
            Some(c[i])
        }
    }
}

/// Reject the first non-finite point of `pts`.
pub fn ensure_finite(pts: &[Point2], what: &str) -> PsResult<()> {
    match pts.iter().find(|p| !p.is_finite()) {
        Some(p) => Err(PsError::NonFinite {
            what: what.to_string(),
            x: p.x,
            y: p.y,
        }),
        None => Ok(()),
    }
}

/// Cumulative arclength at every vertex, starting at zero.
pub fn cumulative_length(pts: &[Point2]) -> Vec<Real> {
    let mut out = Vec::with_capacity(pts.len());
    let mut acc = 0.0;
    for (i, p) in pts.iter().enumerate() {
        if i > 0 {
            acc += pts[i - 1].distance(*p);
        }
        out.push(acc);
    }
    out
}

pub fn polyline_length(pts: &[Point2]) -> Real {
    pts.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Closest point on segment `a-b` to `p`, with its parameter in `[0, 1]`.
pub fn nearest_on_segment(a: Point2, b: Point2, p: Point2) -> (Point2, Real) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return (a, 0.0);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    (a.lerp(b, t), t)
}

/// Arclength position of the point of `pts` closest to `p`.
///
/// Ties resolve to the earliest segment. Empty and single-vertex polylines
/// project everything to zero.
pub fn project(pts: &[Point2], p: Point2) -> Real {
    let mut best = Real::INFINITY;
    let mut pos = 0.0;
    let mut acc = 0.0;
    for w in pts.windows(2) {
        let seg = w[0].distance(w[1]);
        let (q, t) = nearest_on_segment(w[0], w[1], p);
        let d = q.distance(p);
        if d < best {
            best = d;
            pos = acc + t * seg;
        }
        acc += seg;
    }
    pos
}

/// Point at arclength `d` along `pts`, clamped to the ends.
pub fn interpolate(pts: &[Point2], d: Real) -> Option<Point2> {
    let first = *pts.first()?;
    if d <= 0.0 {
        return Some(first);
    }
    let mut acc = 0.0;
    for w in pts.windows(2) {
        let seg = w[0].distance(w[1]);
        if seg > 0.0 && acc + seg >= d {
            return Some(w[0].lerp(w[1], (d - acc) / seg));
        }
        acc += seg;
    }
    pts.last().copied()
}

/// Closest point on the polyline.
pub fn nearest_point(pts: &[Point2], p: Point2) -> Option<Point2> {
    match pts {
        [] => None,
        [only] => Some(*only),
        _ => interpolate(pts, project(pts, p)),
    }
}

/// Intersection of two closed segments; parallel segments never intersect.
pub fn segment_intersection(a1: Point2, a2: Point2, b1: Point2, b2: Point2) -> Option<Point2> {
    segment_intersection_params(a1, a2, b1, b2).map(|(t, _)| a1.lerp(a2, t))
}

/// Parameters `(t, u)` along both segments of their crossing.
pub fn segment_intersection_params(
    a1: Point2,
    a2: Point2,
    b1: Point2,
    b2: Point2,
) -> Option<(Real, Real)> {
    let r = (a2.x - a1.x, a2.y - a1.y);
    let s = (b2.x - b1.x, b2.y - b1.y);
    let denom = r.0 * s.1 - r.1 * s.0;
    if denom.abs() < Real::EPSILON * (r.0.hypot(r.1) * s.0.hypot(s.1)).max(Real::MIN_POSITIVE) {
        return None;
    }
    let q = (b1.x - a1.x, b1.y - a1.y);
    let t = (q.0 * s.1 - q.1 * s.0) / denom;
    let u = (q.0 * r.1 - q.1 * r.0) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

/// Polyline prolonged at both ends along its terminal segments by
/// `fraction` of its total length.
pub fn extend_polyline(pts: &[Point2], fraction: Real) -> Vec<Point2> {
    let mut out = pts.to_vec();
    let total = polyline_length(pts);
    if pts.len() < 2 || total == 0.0 || fraction <= 0.0 {
        return out;
    }
    let extra = fraction * total;
    let push_out = |from: Point2, to: Point2| {
        let seg = from.distance(to);
        if seg == 0.0 {
            to
        } else {
            to.lerp(from, -extra / seg)
        }
    };
    let head = push_out(pts[1], pts[0]);
    let tail = push_out(pts[pts.len() - 2], pts[pts.len() - 1]);
    out.insert(0, head);
    out.push(tail);
    out
}

/// Every crossing of two polylines, ordered along the first.
///
/// Both polylines are first scaled by `ratio` and prolonged by `extra` of
/// their length, so curves that stop just short of each other still meet.
/// Returned points are in unscaled coordinates.
pub fn polyline_intersections(a: &[Point2], b: &[Point2], ratio: Real, extra: Real) -> Vec<Point2> {
    let sa: Vec<Point2> = a.iter().map(|p| p.scaled(ratio)).collect();
    let sb: Vec<Point2> = b.iter().map(|p| p.scaled(ratio)).collect();
    let ea = extend_polyline(&sa, extra);
    let eb = extend_polyline(&sb, extra);
    let mut hits = Vec::new();
    for wa in ea.windows(2) {
        let mut local: Vec<(Real, Point2)> = eb
            .windows(2)
            .filter_map(|wb| segment_intersection_params(wa[0], wa[1], wb[0], wb[1]))
            .map(|(t, _)| (t, wa[0].lerp(wa[1], t)))
            .collect();
        local.sort_by(|x, y| x.0.total_cmp(&y.0));
        for (_, p) in local {
            let p = p.unscaled(ratio);
            if hits.last().is_none_or(|q: &Point2| q.distance(p) > 1e-12) {
                hits.push(p);
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pts: &[(Real, Real)]) -> Vec<Point2> {
        pts.iter().copied().map(Point2::from).collect()
    }

    #[test]
    fn non_finite_points_are_named() {
        assert!(ensure_finite(&line(&[(1.0, 2.0), (3.0, 4.0)]), "line").is_ok());
        let err = ensure_finite(&line(&[(1.0, 2.0), (Real::NAN, 4.0)]), "line 3").unwrap_err();
        assert!(err.to_string().starts_with("Non-finite coordinate for line 3"));
    }

    #[test]
    fn project_prefers_first_minimum() {
        let pl = line(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        assert_eq!(project(&pl, Point2::new(0.5, 1.0)), 0.5);
        assert_eq!(project(&pl, Point2::new(2.0, 0.0)), 1.0);
        assert_eq!(project(&[], Point2::new(2.0, 0.0)), 0.0);
    }

    #[test]
    fn interpolate_midpoint() {
        let pl = line(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]);
        assert_eq!(interpolate(&pl, 3.0), Some(Point2::new(2.0, 1.0)));
        assert_eq!(interpolate(&pl, 10.0), Some(Point2::new(2.0, 2.0)));
        assert_eq!(nearest_point(&pl, Point2::new(3.0, 1.5)), Some(Point2::new(2.0, 1.5)));
    }

    #[test]
    fn crossing_segments() {
        let p = segment_intersection(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
            Point2::new(2.0, 0.0),
        );
        assert_eq!(p, Some(Point2::new(1.0, 1.0)));
        let parallel = segment_intersection(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
        );
        assert_eq!(parallel, None);
    }

    #[test]
    fn short_curves_meet_after_extension() {
        let a = line(&[(0.0, 0.0), (0.9, 0.0)]);
        let b = line(&[(1.0, -1.0), (1.0, -0.1)]);
        assert!(polyline_intersections(&a, &b, 1.0, 0.0).is_empty());
        let hits = polyline_intersections(&a, &b, 1.0, 0.2);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].x - 1.0).abs() < 1e-12 && hits[0].y.abs() < 1e-12);
    }

    #[test]
    fn window_sides_and_corners() {
        let w = Window::new((200.0, 1000.0), (0.1, 20.0));
        assert!(w.is_outside(Point2::new(199.0, 5.0)));
        assert!(!w.is_outside(Point2::new(200.0, 5.0)));
        assert_eq!(
            w.shared_corner(Side::Bottom, Side::Right),
            Some(Point2::new(1000.0, 0.1))
        );
        assert_eq!(
            w.shared_corner(Side::Bottom, Side::Left),
            Some(Point2::new(200.0, 0.1))
        );
        assert_eq!(w.shared_corner(Side::Top, Side::Bottom), None);
        assert!(w.shrunk(0.01).is_outside(Point2::new(200.0, 5.0)));
    }
}
