//! Field reconstruction over a whole section.

use std::collections::{BTreeMap, BTreeSet};

use geo::{Area, BoundingRect, Contains, MultiPolygon};
use ps_core::{PhaseSet, Point2, Real, UniId, Window};
use ps_topology::Section;
use tracing::{debug, info, warn};

use crate::faces::face_table;
use crate::polygon::{
    UnitFrame, chain_coords, close_chain, cycle_ring, is_empty, lines_cross, self_intersects,
};
use crate::search::{Boundaries, Found, VertexTable, format_path, search_face};

fn fmt_ids(ids: &[UniId]) -> String {
    let names: Vec<String> = ids.iter().map(UniId::to_string).collect();
    format!("[{}]", names.join(", "))
}

fn fmt_gaps(ids: &[Option<UniId>]) -> String {
    let names: Vec<String> = ids
        .iter()
        .map(|id| id.map_or_else(|| "None".to_string(), |id| id.to_string()))
        .collect();
    format!("[{}]", names.join(", "))
}

/// Search every field group for its boundary.
pub fn construct_areas(section: &Section) -> Boundaries {
    let bounds = section.window().shrunk(section.kind().boundary_shrink());
    let mut table = VertexTable::new(section);
    let mut out = Boundaries::default();
    for (key, ids) in face_table(section) {
        match search_face(section, &mut table, &key, &ids, bounds) {
            Found::Cycle(b) => out.full.push(b),
            Found::Chain(b) => out.partial.push(b),
            Found::Broken { path, edges } => {
                let msg = format!(
                    "Topology error in path {}. Edges {}",
                    format_path(section, &path),
                    fmt_gaps(&edges)
                );
                warn!(field = %key, "{msg}");
                out.log.push(msg);
                out.broken.insert(key, edges.into_iter().flatten().collect());
            }
            Found::Nothing => {}
        }
    }
    out
}

/// Divariant fields of a section with their diagnostics.
#[derive(Clone, Debug, Default)]
pub struct AreaReport {
    /// Field polygons clipped to the section window.
    pub shapes: BTreeMap<PhaseSet, MultiPolygon<Real>>,
    /// Lines each field was built from.
    pub edges: BTreeMap<PhaseSet, Vec<UniId>>,
    /// Fields with a boundary that could not be turned into a polygon.
    pub bad: BTreeMap<PhaseSet, Vec<UniId>>,
    /// Open chains that could not be closed against the window.
    pub ignored: BTreeMap<PhaseSet, Vec<UniId>>,
    pub log: Vec<String>,
}

impl AreaReport {
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn area(&self, key: &PhaseSet) -> Option<Real> {
        self.shapes.get(key).map(|s| s.unsigned_area())
    }

    /// Bounding window of one field.
    pub fn bounds(&self, key: &PhaseSet) -> Option<Window> {
        let rect = self.shapes.get(key)?.bounding_rect()?;
        Some(Window::new(
            (rect.min().x, rect.max().x),
            (rect.min().y, rect.max().y),
        ))
    }

    /// Field containing `p`.
    pub fn field_at(&self, p: Point2) -> Option<&PhaseSet> {
        let pt = geo::Point::new(p.x, p.y);
        self.shapes
            .iter()
            .find(|(_, shape)| shape.contains(&pt))
            .map(|(key, _)| key)
    }

    fn add_shape(
        &mut self,
        frame: &UnitFrame,
        key: &PhaseSet,
        shape: MultiPolygon<Real>,
        edges: &[UniId],
    ) {
        let merged = match self.shapes.remove(key) {
            Some(existing) => frame.union(&existing, &shape),
            None => shape,
        };
        self.shapes.insert(key.clone(), merged);
        self.edges.insert(key.clone(), edges.to_vec());
    }

    /// Subtract every field lying inside another one from its container.
    fn resolve_overlaps(&mut self, frame: &UnitFrame, reference: Real) {
        let keys: Vec<PhaseSet> = self.shapes.keys().cloned().collect();
        let mut emptied = BTreeSet::new();
        for (i, k1) in keys.iter().enumerate() {
            for k2 in &keys[i + 1..] {
                for (inner, outer) in [(k1, k2), (k2, k1)] {
                    let (Some(a), Some(b)) = (self.shapes.get(inner), self.shapes.get(outer)) else {
                        continue;
                    };
                    if frame.within(a, b) {
                        let rest = frame.cut_out(b, a);
                        if is_empty(&rest, reference) {
                            emptied.insert(outer.clone());
                        }
                        self.shapes.insert(outer.clone(), rest);
                    }
                }
            }
        }
        for key in emptied {
            debug!(field = %key, "field emptied by overlap removal");
            self.shapes.remove(&key);
            self.edges.remove(&key);
        }
    }
}

/// Reconstruct every divariant field of `section`.
pub fn create_shapes(section: &Section) -> AreaReport {
    let window = section.window().shrunk(section.kind().boundary_shrink());
    let reference = window.width() * window.height();
    let frame = UnitFrame::new(window);
    let boundaries = construct_areas(section);
    let mut report = AreaReport {
        bad: boundaries.broken,
        log: boundaries.log,
        ..AreaReport::default()
    };

    for b in &boundaries.full {
        let ring = cycle_ring(section, &b.edges, &b.vertices);
        if self_intersects(&ring) {
            report.log.push(format!(
                "WARNING: Area {} defined by edges {} is not valid. Trying to fix it....",
                b.key,
                fmt_ids(&b.edges)
            ));
        }
        let clipped = frame.clip(&ring);
        if clipped.0.len() == 1 {
            report.add_shape(&frame, &b.key, clipped, &b.edges);
            continue;
        }
        report
            .log
            .push(format!("ERROR: Area defined by edges {} is not valid.", fmt_ids(&b.edges)));
        for (i, e1) in b.edges.iter().enumerate() {
            for e2 in &b.edges[i + 1..] {
                if let (Some(l1), Some(l2)) = (section.uniline(*e1), section.uniline(*e2))
                    && lines_cross(l1.trimmed(), l2.trimmed())
                {
                    report
                        .log
                        .push(format!("   - Uniline {e1} crosses uniline {e2}"));
                }
            }
        }
        warn!(field = %b.key, edges = %fmt_ids(&b.edges), "field boundary is not a valid polygon");
        report.bad.insert(b.key.clone(), b.edges.clone());
    }

    for b in &boundaries.partial {
        let chain = chain_coords(section, &b.edges, &b.vertices);
        let clipped = close_chain(&chain, window)
            .map(|ring| frame.clip(&ring))
            .filter(|shape| !shape.0.is_empty());
        match clipped {
            Some(shape) => report.add_shape(&frame, &b.key, shape, &b.edges),
            None => {
                debug!(field = %b.key, "open chain ignored");
                report.ignored.insert(b.key.clone(), b.edges.clone());
            }
        }
    }

    report.resolve_overlaps(&frame, reference);
    info!(
        fields = report.len(),
        bad = report.bad.len(),
        ignored = report.ignored.len(),
        "divariant fields reconstructed"
    );
    report
}

/// Field reconstruction as a method of the store.
pub trait AreaReconstruction {
    fn create_shapes(&self) -> AreaReport;
}

impl AreaReconstruction for Section {
    fn create_shapes(&self) -> AreaReport {
        create_shapes(self)
    }
}
