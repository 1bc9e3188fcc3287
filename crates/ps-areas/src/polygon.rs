//! Turning ordered boundaries into clipped polygons.

use geo::{Area, BooleanOps, Coord, Intersects, LineString, MapCoords, MultiPolygon, Polygon, Rect};
use ps_core::geometry::{segment_intersection, segment_intersection_params};
use ps_core::{Point2, Real, Side, UniId, Window};
use ps_topology::Section;

/// Relative area below which a polygon counts as empty.
const AREA_EPS: Real = 1e-12;

pub fn window_polygon(window: Window) -> MultiPolygon<Real> {
    let rect = Rect::new(
        Coord {
            x: window.xmin,
            y: window.ymin,
        },
        Coord {
            x: window.xmax,
            y: window.ymax,
        },
    );
    MultiPolygon::new(vec![rect.to_polygon()])
}

pub fn ring_polygon(ring: &[Point2]) -> MultiPolygon<Real> {
    let coords: Vec<Coord<Real>> = ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    MultiPolygon::new(vec![Polygon::new(LineString::new(coords), Vec::new())])
}

/// Whether `shape` has no meaningful area compared to `reference`.
pub fn is_empty(shape: &MultiPolygon<Real>, reference: Real) -> bool {
    shape.unsigned_area() <= AREA_EPS * reference.max(1.0)
}

/// Drop sliver parts left over by clipping.
pub fn without_slivers(shape: MultiPolygon<Real>, reference: Real) -> MultiPolygon<Real> {
    let min = AREA_EPS * reference.max(1.0);
    MultiPolygon::new(
        shape
            .0
            .into_iter()
            .filter(|p| p.unsigned_area() > min)
            .collect(),
    )
}

/// Boolean operations on field shapes, run with the section window mapped
/// onto the unit square.
///
/// The boolean engine snaps to a grid sized by the largest extent, so a
/// pressure or composition axis next to a temperature axis would lose most
/// of its precision in raw coordinates.
#[derive(Clone, Copy, Debug)]
pub struct UnitFrame {
    window: Window,
    sx: Real,
    sy: Real,
}

impl UnitFrame {
    pub fn new(window: Window) -> Self {
        let scale = |d: Real| if d > 0.0 { d } else { 1.0 };
        Self {
            window,
            sx: scale(window.width()),
            sy: scale(window.height()),
        }
    }

    fn to_unit(&self, shape: &MultiPolygon<Real>) -> MultiPolygon<Real> {
        shape.map_coords(|c| Coord {
            x: (c.x - self.window.xmin) / self.sx,
            y: (c.y - self.window.ymin) / self.sy,
        })
    }

    fn from_unit(&self, shape: MultiPolygon<Real>) -> MultiPolygon<Real> {
        shape.map_coords(|c| Coord {
            x: self.window.xmin + c.x * self.sx,
            y: self.window.ymin + c.y * self.sy,
        })
    }

    pub fn intersection(
        &self,
        a: &MultiPolygon<Real>,
        b: &MultiPolygon<Real>,
    ) -> MultiPolygon<Real> {
        self.from_unit(self.to_unit(a).intersection(&self.to_unit(b)))
    }

    pub fn union(&self, a: &MultiPolygon<Real>, b: &MultiPolygon<Real>) -> MultiPolygon<Real> {
        self.from_unit(self.to_unit(a).union(&self.to_unit(b)))
    }

    pub fn difference(
        &self,
        a: &MultiPolygon<Real>,
        b: &MultiPolygon<Real>,
    ) -> MultiPolygon<Real> {
        self.from_unit(self.to_unit(a).difference(&self.to_unit(b)))
    }

    /// `inner` lies inside `outer` up to numerical noise. Empty shapes are
    /// within nothing.
    pub fn within(&self, inner: &MultiPolygon<Real>, outer: &MultiPolygon<Real>) -> bool {
        let inner = self.to_unit(inner);
        let area = inner.unsigned_area();
        area > 0.0 && inner.difference(&self.to_unit(outer)).unsigned_area() <= 1e-9 * area
    }

    /// `outer` without `inner`, where `inner` is known to lie inside it.
    /// An inner shape clear of the outer boundary becomes a hole, keeping
    /// both outlines exact.
    pub fn cut_out(
        &self,
        outer: &MultiPolygon<Real>,
        inner: &MultiPolygon<Real>,
    ) -> MultiPolygon<Real> {
        if let [poly] = outer.0.as_slice() {
            let clear = inner.0.iter().all(|part| {
                part.interiors().is_empty()
                    && std::iter::once(poly.exterior())
                        .chain(poly.interiors())
                        .all(|ring| !ring.intersects(part.exterior()))
            });
            if clear {
                let mut holes = poly.interiors().to_vec();
                holes.extend(inner.0.iter().map(|part| part.exterior().clone()));
                return MultiPolygon::new(vec![Polygon::new(poly.exterior().clone(), holes)]);
            }
        }
        self.difference(outer, inner)
    }

    /// Polygon of `ring` restricted to the window. A simple ring already
    /// inside the window keeps its vertices untouched.
    pub fn clip(&self, ring: &[Point2]) -> MultiPolygon<Real> {
        let reference = self.window.width() * self.window.height();
        let shape = ring_polygon(ring);
        if ring.iter().all(|p| self.window.contains(*p)) && !self_intersects(ring) {
            return without_slivers(shape, reference);
        }
        without_slivers(
            self.intersection(&window_polygon(self.window), &shape),
            reference,
        )
    }
}

fn push_dedup(ring: &mut Vec<Point2>, p: Point2) {
    if ring.last().is_none_or(|q| q.distance(p) > 1e-12 * (1.0 + q.x.abs() + q.y.abs())) {
        ring.push(p);
    }
}

/// Trimmed coordinates of `edges` joined into one polyline, each line turned
/// to start at the matching vertex.
pub fn chain_coords(section: &Section, edges: &[UniId], vertices: &[Point2]) -> Vec<Point2> {
    let mut out = Vec::new();
    for (i, id) in edges.iter().enumerate() {
        let Some(uni) = section.uniline(*id) else {
            continue;
        };
        let pts = uni.trimmed();
        let (Some(&first), Some(&last)) = (pts.first(), pts.last()) else {
            continue;
        };
        let start = vertices.get(i).copied().or(out.last().copied()).unwrap_or(first);
        if first.distance(start) <= last.distance(start) {
            pts.iter().for_each(|p| push_dedup(&mut out, *p));
        } else {
            pts.iter().rev().for_each(|p| push_dedup(&mut out, *p));
        }
    }
    out
}

/// Closed ring of a full boundary, without the repeated first point.
pub fn cycle_ring(section: &Section, edges: &[UniId], vertices: &[Point2]) -> Vec<Point2> {
    let mut ring = chain_coords(section, edges, vertices);
    if ring.len() > 1 && ring[0].distance(ring[ring.len() - 1]) <= 1e-12 * (1.0 + ring[0].x.abs()) {
        ring.pop();
    }
    ring
}

/// Whether any two non-neighbouring ring segments cross.
pub fn self_intersects(ring: &[Point2]) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }
    let seg = |i: usize| (ring[i], ring[(i + 1) % n]);
    for i in 0..n {
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a1, a2) = seg(i);
            let (b1, b2) = seg(j);
            if segment_intersection(a1, a2, b1, b2).is_some() {
                return true;
            }
        }
    }
    false
}

/// Crossings of two polylines away from their end points.
pub fn lines_cross(a: &[Point2], b: &[Point2]) -> bool {
    let ends: Vec<Point2> = [a.first(), a.last(), b.first(), b.last()]
        .into_iter()
        .flatten()
        .copied()
        .collect();
    let near_end = |p: Point2| ends.iter().any(|e| e.distance(p) <= 1e-9 * (1.0 + e.x.abs() + e.y.abs()));
    a.windows(2).any(|wa| {
        b.windows(2).any(|wb| {
            segment_intersection(wa[0], wa[1], wb[0], wb[1]).is_some_and(|p| !near_end(p))
        })
    })
}

/// First place `pts` meets the window boundary, with the segment index and
/// the side hit.
fn first_crossing(pts: &[Point2], window: Window) -> Option<(usize, Point2, Side)> {
    for (i, w) in pts.windows(2).enumerate() {
        let hit = Side::ALL
            .into_iter()
            .filter_map(|side| {
                let (c1, c2) = window.side(side);
                segment_intersection_params(w[0], w[1], c1, c2).map(|(t, _)| (t, side))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((t, side)) = hit {
            return Some((i, w[0].lerp(w[1], t), side));
        }
    }
    None
}

/// Close an open chain against the window sides it crosses.
///
/// The part of the chain between its first and last boundary crossing is
/// closed along the boundary: directly when both crossings are on one side,
/// through the shared corner when the sides are adjacent. Chains crossing
/// opposite sides split the window in two and are not closed.
pub fn close_chain(chain: &[Point2], window: Window) -> Option<Vec<Point2>> {
    let (i, p_in, s_in) = first_crossing(chain, window)?;
    let reversed: Vec<Point2> = chain.iter().rev().copied().collect();
    let (k, p_out, s_out) = first_crossing(&reversed, window)?;
    let j = chain.len() - 2 - k;
    if j < i || (j == i && p_in.distance(p_out) == 0.0) {
        return None;
    }

    let mut ring = vec![p_in];
    ring.extend_from_slice(&chain[i + 1..=j]);
    ring.push(p_out);
    if s_in != s_out {
        ring.push(window.shared_corner(s_out, s_in)?);
    }
    Some(ring)
}
