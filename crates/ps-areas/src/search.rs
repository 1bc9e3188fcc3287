//! Boundary search inside one field group.
//!
//! Points are graph vertices and lines are edges. Open line ends get a fresh
//! vertex each, numbered above every stored point id, so a group made only of
//! open lines still forms a graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graphmap::UnGraphMap;
use ps_core::{InvId, PhaseSet, Point2, UniId, Window};
use ps_topology::Section;
use tracing::warn;

/// Ordered edges of one field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBoundary {
    pub key: PhaseSet,
    /// Lines in boundary order.
    pub edges: Vec<UniId>,
    /// Vertex coordinates; one more than `edges` for open chains.
    pub vertices: Vec<Point2>,
}

/// Output of the boundary search over a whole section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Boundaries {
    /// Closed boundaries.
    pub full: Vec<FieldBoundary>,
    /// Chains whose both ends leave the section window.
    pub partial: Vec<FieldBoundary>,
    /// Fields whose boundary has gaps, with the lines that were found.
    pub broken: BTreeMap<PhaseSet, Vec<UniId>>,
    pub log: Vec<String>,
}

/// Vertex coordinates and the endpoint-pair index shared by all groups.
pub(crate) struct VertexTable {
    coords: HashMap<u32, Point2>,
    index: HashMap<(u32, u32), UniId>,
    next: u32,
}

impl VertexTable {
    pub(crate) fn new(section: &Section) -> Self {
        let mut coords = HashMap::new();
        let mut top = 0;
        for (id, inv) in section.invpoints() {
            coords.insert(id.get(), inv.point());
            top = top.max(id.get());
        }
        let mut index = HashMap::new();
        for (id, uni) in section.unilines() {
            if let (Some(b), Some(e)) = (uni.begin, uni.end) {
                index.insert((b.get(), e.get()), id);
                index.insert((e.get(), b.get()), id);
            }
        }
        Self {
            coords,
            index,
            next: top + 1,
        }
    }

    fn synthesize(&mut self, at: Point2) -> u32 {
        let v = self.next;
        self.next += 1;
        self.coords.insert(v, at);
        v
    }

    fn link(&mut self, a: u32, b: u32, id: UniId) {
        self.index.insert((a, b), id);
        self.index.insert((b, a), id);
    }

    fn edge(&self, a: u32, b: u32) -> Option<UniId> {
        self.index.get(&(a, b)).copied()
    }

    fn coord(&self, v: u32) -> Point2 {
        self.coords.get(&v).copied().unwrap_or_default()
    }
}

/// What the search found for one group.
pub(crate) enum Found {
    Cycle(FieldBoundary),
    Chain(FieldBoundary),
    Broken { path: Vec<u32>, edges: Vec<Option<UniId>> },
    Nothing,
}

fn dfs(
    graph: &UnGraphMap<u32, UniId>,
    u: u32,
    pred: u32,
    marked: &mut HashSet<u32>,
    path: &mut Vec<u32>,
) -> bool {
    marked.insert(u);
    path.push(u);
    for v in graph.neighbors(u) {
        if marked.contains(&v) {
            if v != pred {
                return true;
            }
        } else if dfs(graph, v, u, marked, path) {
            return true;
        }
    }
    false
}

/// First ordering of `vertices` (in lexicographic order of positions) in
/// which every consecutive pair is joined by a line.
fn first_chain(table: &VertexTable, vertices: &[u32]) -> Option<Vec<u32>> {
    fn extend(
        table: &VertexTable,
        vertices: &[u32],
        used: &mut [bool],
        order: &mut Vec<u32>,
    ) -> bool {
        if order.len() == vertices.len() {
            return true;
        }
        for (i, &v) in vertices.iter().enumerate() {
            if used[i] {
                continue;
            }
            if let Some(&last) = order.last()
                && table.edge(last, v).is_none()
            {
                continue;
            }
            used[i] = true;
            order.push(v);
            if extend(table, vertices, used, order) {
                return true;
            }
            order.pop();
            used[i] = false;
        }
        false
    }

    let mut used = vec![false; vertices.len()];
    let mut order = Vec::with_capacity(vertices.len());
    extend(table, vertices, &mut used, &mut order).then_some(order)
}

/// Search one group for a closed boundary, falling back to an open chain
/// whose ends lie outside `bounds`.
pub(crate) fn search_face(
    section: &Section,
    table: &mut VertexTable,
    key: &PhaseSet,
    ids: &[UniId],
    bounds: Window,
) -> Found {
    let mut graph: UnGraphMap<u32, UniId> = UnGraphMap::new();
    for &id in ids {
        let Some(uni) = section.uniline(id) else {
            warn!(uni = %id, "line missing from section during area search");
            continue;
        };
        let (Some(&first), Some(&last)) = (uni.trimmed().first(), uni.trimmed().last()) else {
            continue;
        };
        let b = match uni.begin {
            Some(inv) => inv.get(),
            None => table.synthesize(first),
        };
        let e = match uni.end {
            Some(inv) => inv.get(),
            None => table.synthesize(last),
        };
        graph.add_edge(b, e, id);
        table.link(b, e, id);
    }

    let mut marked = HashSet::new();
    let mut path = Vec::new();
    let mut found = false;
    for u in graph.nodes() {
        if !marked.contains(&u) && dfs(&graph, u, u, &mut marked, &mut path) {
            found = true;
            break;
        }
    }

    if found && ids.len() >= 3 {
        let edges: Vec<Option<UniId>> = path
            .iter()
            .zip(path.iter().cycle().skip(1))
            .map(|(&b, &e)| table.edge(b, e))
            .collect();
        if edges.iter().any(Option::is_none) {
            return Found::Broken { path, edges };
        }
        return Found::Cycle(FieldBoundary {
            key: key.clone(),
            edges: edges.into_iter().flatten().collect(),
            vertices: path.iter().map(|&v| table.coord(v)).collect(),
        });
    }

    let vertices: Vec<u32> = if found { graph.nodes().collect() } else { path };
    let Some(order) = first_chain(table, &vertices) else {
        return Found::Nothing;
    };
    let coords: Vec<Point2> = order.iter().map(|&v| table.coord(v)).collect();
    let outside = |p: Option<&Point2>| p.is_some_and(|p| bounds.is_outside(*p));
    if !(outside(coords.first()) && outside(coords.last())) {
        return Found::Nothing;
    }
    let edges = order
        .windows(2)
        .filter_map(|w| table.edge(w[0], w[1]))
        .collect();
    Found::Chain(FieldBoundary {
        key: key.clone(),
        edges,
        vertices: coords,
    })
}

/// Vertex path formatted with stored point ids where they exist.
pub(crate) fn format_path(section: &Section, path: &[u32]) -> String {
    let names: Vec<String> = path
        .iter()
        .map(|&v| {
            match InvId::new(v).filter(|id| section.invpoint(*id).is_some()) {
                Some(id) => id.to_string(),
                // open line end
                None => format!("~{v}"),
            }
        })
        .collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_topology::{InvariantPoint, SectionKind, UnivariantLine};

    fn square() -> (Section, Vec<UniId>) {
        let mut ps = Section::new(SectionKind::Pt);
        let corners = [(500.0, 5.0), (700.0, 5.0), (700.0, 10.0), (500.0, 10.0)];
        let mut ids = Vec::new();
        let mut inv_ids = Vec::new();
        for (x, y) in corners {
            let id = ps.next_inv_id();
            let inv = InvariantPoint::new(PhaseSet::parse("a b c d e"), PhaseSet::parse("d e"))
                .unwrap()
                .at(x, y);
            ps.add_inv(id, inv);
            inv_ids.push(id);
        }
        for i in 0..4 {
            let (a, b) = (inv_ids[i], inv_ids[(i + 1) % 4]);
            let pa = ps.invpoint(a).unwrap().point();
            let pb = ps.invpoint(b).unwrap().point();
            let line = UnivariantLine::new(PhaseSet::parse("a b c d"), PhaseSet::parse("a"))
                .unwrap()
                .with_samples(vec![pa, pa.lerp(pb, 0.5), pb], Vec::new())
                .between(Some(a), Some(b));
            let id = ps.next_uni_id();
            ps.add_uni(id, line).unwrap();
            ids.push(id);
        }
        (ps, ids)
    }

    #[test]
    fn square_is_a_cycle() {
        let (ps, ids) = square();
        let mut table = VertexTable::new(&ps);
        let key = PhaseSet::parse("a b c d");
        match search_face(&ps, &mut table, &key, &ids, ps.window()) {
            Found::Cycle(b) => {
                assert_eq!(b.edges.len(), 4);
                assert_eq!(b.vertices.len(), 4);
                assert_eq!(b.vertices[0], Point2::new(500.0, 5.0));
            }
            _ => panic!("expected a closed boundary"),
        }
    }

    #[test]
    fn open_line_across_corner_is_a_chain() {
        let mut ps = Section::new(SectionKind::Pt);
        let line = UnivariantLine::new(PhaseSet::parse("a b c"), PhaseSet::parse("a"))
            .unwrap()
            .with_samples(vec![Point2::new(150.0, 10.0), Point2::new(400.0, 25.0)], Vec::new());
        ps.add_uni(UniId::FIRST, line).unwrap();
        let mut table = VertexTable::new(&ps);
        let found = search_face(&ps, &mut table, &PhaseSet::parse("a b c"), &[UniId::FIRST], ps.window());
        let Found::Chain(b) = found else {
            panic!("expected an open chain");
        };
        assert_eq!(b.edges, vec![UniId::FIRST]);
        assert_eq!(b.vertices.len(), 2);
    }

    #[test]
    fn chain_inside_window_is_nothing() {
        let (ps, ids) = square();
        let mut table = VertexTable::new(&ps);
        let found = search_face(&ps, &mut table, &PhaseSet::parse("a b c"), &ids[..1], ps.window());
        assert!(matches!(found, Found::Nothing));
        assert_eq!(table.next, 5);
    }
}
