//! Field reconstruction on small hand-built sections.

use proptest::prelude::*;
use ps_areas::{AreaReconstruction, construct_areas};
use ps_core::{InvId, PhaseSet, Point2, Real};
use ps_topology::{InvariantPoint, Section, SectionKind, UnivariantLine};

fn add_point(ps: &mut Section, x: Real, y: Real) -> InvId {
    let id = ps.next_inv_id();
    let inv = InvariantPoint::new(PhaseSet::parse("a b c d e"), PhaseSet::parse("d e"))
        .unwrap()
        .at(x, y);
    ps.add_inv(id, inv);
    id
}

fn add_line(ps: &mut Section, phases: &str, out: &str, a: InvId, b: InvId) {
    let pa = ps.invpoint(a).unwrap().point();
    let pb = ps.invpoint(b).unwrap().point();
    let samples = (0..=4).map(|i| pa.lerp(pb, i as Real / 4.0)).collect();
    let line = UnivariantLine::new(PhaseSet::parse(phases), PhaseSet::parse(out))
        .unwrap()
        .with_samples(samples, Vec::new())
        .between(Some(a), Some(b));
    let id = ps.next_uni_id();
    ps.add_uni(id, line).unwrap();
}

fn add_open_line(ps: &mut Section, phases: &str, out: &str, pts: &[(Real, Real)]) {
    let line = UnivariantLine::new(PhaseSet::parse(phases), PhaseSet::parse(out))
        .unwrap()
        .with_samples(pts.iter().copied().map(Point2::from).collect(), Vec::new());
    let id = ps.next_uni_id();
    ps.add_uni(id, line).unwrap();
}

/// Four lines of one assemblage around an axis-aligned rectangle.
fn rectangle(ps: &mut Section, phases: &str, x: (Real, Real), y: (Real, Real)) {
    let corners = [
        add_point(ps, x.0, y.0),
        add_point(ps, x.1, y.0),
        add_point(ps, x.1, y.1),
        add_point(ps, x.0, y.1),
    ];
    let outs: Vec<String> = PhaseSet::parse(phases).iter().map(str::to_string).collect();
    for i in 0..4 {
        add_line(ps, phases, &outs[i % outs.len()], corners[i], corners[(i + 1) % 4]);
    }
}

#[test]
fn four_line_cycle_gives_one_field() {
    let mut ps = Section::new(SectionKind::Pt);
    rectangle(&mut ps, "a b c d", (500.0, 700.0), (5.0, 10.0));
    let report = ps.create_shapes();

    let key = PhaseSet::parse("a b c d");
    assert_eq!(report.len(), 1);
    assert_eq!(report.edges[&key].len(), 4);
    assert!((report.area(&key).unwrap() - 1000.0).abs() < 1e-6);
    assert!(report.bad.is_empty());
    assert!(report.log.is_empty());
    assert_eq!(report.field_at(Point2::new(600.0, 7.0)), Some(&key));
    assert_eq!(report.field_at(Point2::new(300.0, 7.0)), None);

    let bounds = report.bounds(&key).unwrap();
    assert!((bounds.xmin - 500.0).abs() < 1e-9 && (bounds.ymax - 10.0).abs() < 1e-9);
}

#[test]
fn field_closes_through_polymorph_transition() {
    let mut ps = Section::new(SectionKind::Pt);
    let a = add_point(&mut ps, 500.0, 5.0);
    let b = add_point(&mut ps, 700.0, 5.0);
    let c = add_point(&mut ps, 700.0, 10.0);
    let d = add_point(&mut ps, 500.0, 10.0);
    add_line(&mut ps, "sill q mu g", "g", a, b);
    add_line(&mut ps, "sill q mu bi", "bi", b, c);
    add_line(&mut ps, "sill q mu st", "st", c, d);
    // sill = and: borders the sill field only through the switched key
    add_line(&mut ps, "sill and q mu", "sill", d, a);

    let report = ps.create_shapes();
    let key = PhaseSet::parse("sill q mu");
    assert_eq!(report.len(), 1);
    assert_eq!(report.edges[&key].len(), 4);
    assert!((report.area(&key).unwrap() - 1000.0).abs() < 1e-6);
    assert_eq!(report.field_at(Point2::new(600.0, 7.0)), Some(&key));
    assert!(!report.shapes.contains_key(&PhaseSet::parse("and q mu")));
}

#[test]
fn thin_composition_field_keeps_its_outline() {
    let mut ps = Section::new(SectionKind::Tx);
    rectangle(&mut ps, "a b c d", (500.0, 510.0), (0.3, 0.3005));
    let report = ps.create_shapes();
    let key = PhaseSet::parse("a b c d");
    let bounds = report.bounds(&key).unwrap();
    assert_eq!(bounds.ymin, 0.3);
    assert_eq!(bounds.ymax, 0.3005);
    assert!((report.area(&key).unwrap() - 0.005).abs() < 1e-12);
    assert_eq!(report.field_at(Point2::new(505.0, 0.30001)), Some(&key));
}

#[test]
fn open_line_cuts_off_window_corner() {
    let mut ps = Section::new(SectionKind::Pt);
    add_open_line(&mut ps, "a b c", "a", &[(150.0, 10.0), (275.0, 17.5), (400.0, 25.0)]);
    let boundaries = construct_areas(&ps);
    assert_eq!(boundaries.partial.len(), 2);
    assert!(boundaries.full.is_empty());

    let report = ps.create_shapes();
    // both sides of the line yield the same corner; the second is subtracted away
    assert_eq!(report.len(), 1);
    let area = report.area(&PhaseSet::parse("a b c")).unwrap();
    assert!((area - 0.5 * 7.0 * 350.0 / 3.0).abs() < 1e-6, "area {area}");
}

#[test]
fn line_crossing_opposite_sides_is_ignored() {
    let mut ps = Section::new(SectionKind::Pt);
    add_open_line(&mut ps, "a b c", "a", &[(150.0, 5.0), (1050.0, 6.0)]);
    let report = ps.create_shapes();
    assert!(report.is_empty());
    assert_eq!(report.ignored.len(), 2);
}

#[test]
fn gap_in_found_path_is_reported() {
    let mut ps = Section::new(SectionKind::Pt);
    let a = add_point(&mut ps, 400.0, 5.0);
    let b = add_point(&mut ps, 600.0, 5.0);
    let c = add_point(&mut ps, 500.0, 10.0);
    let d = add_point(&mut ps, 300.0, 12.0);
    add_line(&mut ps, "a b c d", "a", a, d);
    add_line(&mut ps, "a b c d", "b", a, b);
    add_line(&mut ps, "a b c d", "c", b, c);
    add_line(&mut ps, "a b c d", "d", c, a);

    let report = ps.create_shapes();
    let key = PhaseSet::parse("a b c d");
    assert!(!report.shapes.contains_key(&key));
    assert_eq!(report.bad[&key].len(), 3);
    assert_eq!(report.log.len(), 1);
    assert_eq!(report.log[0], "Topology error in path [1, 4, 2, 3]. Edges [1, None, 3, 4]");
}

#[test]
fn inner_field_is_cut_out_of_outer() {
    let mut ps = Section::new(SectionKind::Pt);
    rectangle(&mut ps, "a b c d", (300.0, 900.0), (2.0, 18.0));
    rectangle(&mut ps, "e f g h", (500.0, 700.0), (5.0, 10.0));
    let report = ps.create_shapes();
    assert_eq!(report.len(), 2);
    let outer = report.area(&PhaseSet::parse("a b c d")).unwrap();
    let inner = report.area(&PhaseSet::parse("e f g h")).unwrap();
    assert!((outer - (9600.0 - 1000.0)).abs() < 1e-6);
    assert!((inner - 1000.0).abs() < 1e-6);
    assert_eq!(
        report.field_at(Point2::new(600.0, 7.0)),
        Some(&PhaseSet::parse("e f g h"))
    );
}

#[test]
fn composition_section_boundary_is_shrunk() {
    let mut ps = Section::new(SectionKind::Tx);
    add_open_line(&mut ps, "a b c", "a", &[(500.0, 0.0), (500.0, 1.0)]);
    add_open_line(&mut ps, "a b c", "b", &[(300.0, 0.0), (300.0, 1.0)]);
    let boundaries = construct_areas(&ps);
    // lines ending exactly on the axis count as leaving the shrunk window
    assert!(!boundaries.partial.is_empty());
}

proptest! {
    #[test]
    fn rectangle_field_has_rectangle_area(
        x0 in 250.0f64..500.0,
        w in 10.0f64..400.0,
        y0 in 1.0f64..8.0,
        h in 0.5f64..10.0,
    ) {
        let mut ps = Section::new(SectionKind::Pt);
        rectangle(&mut ps, "a b c d", (x0, x0 + w), (y0, y0 + h));
        let report = ps.create_shapes();
        let area = report.area(&PhaseSet::parse("a b c d")).unwrap();
        prop_assert!((area - w * h).abs() <= 1e-6 * w * h);
    }
}
