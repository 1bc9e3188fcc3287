//! Builder workflows against a table-driven solver.

use std::collections::BTreeMap;

use ps_app::{AppError, Builder, CalcOptions, CalcStatus, Calculated, connection_warnings};
use ps_core::{DogminId, InvId, PhaseSet, Point2, Real, UniId, Window};
use ps_project::Project;
use ps_solver::{
    DogminRun, SolvedSample, Solver, SolverResult, SolverRun, SolverSession, Sweep,
};
use ps_topology::{
    ResultBlock, RecalcPolicy, SectionKind, StoreOutcome, TopologyError, UnivariantLine,
};

type Key = (PhaseSet, PhaseSet);

fn key(phases: &str, out: &str) -> Key {
    (PhaseSet::parse(phases), PhaseSet::parse(out))
}

fn sample(p: Point2, guess: &str) -> SolvedSample {
    SolvedSample {
        point: p,
        result: ResultBlock::new(BTreeMap::new(), vec![guess.to_string()]),
    }
}

/// Answers from fixed tables; every call is logged with the guesses in use.
#[derive(Default)]
struct TableSolver {
    lines: BTreeMap<Key, (Sweep, Vec<Point2>)>,
    points: BTreeMap<Key, Point2>,
    calls: Vec<(String, Vec<String>)>,
}

impl TableSolver {
    fn line(mut self, phases: &str, out: &str, sweep: Sweep, from: (Real, Real), to: (Real, Real)) -> Self {
        let (a, b) = (Point2::from(from), Point2::from(to));
        let pts = (0..=10).map(|i| a.lerp(b, i as Real / 10.0)).collect();
        self.lines.insert(key(phases, out), (sweep, pts));
        self
    }

    fn point(mut self, phases: &str, out: &str, at: (Real, Real)) -> Self {
        self.points.insert(key(phases, out), Point2::from(at));
        self
    }
}

impl Solver for TableSolver {
    fn calc_line(
        &mut self,
        session: &SolverSession,
        phases: &PhaseSet,
        out: &PhaseSet,
        sweep: Sweep,
        _: Window,
    ) -> SolverResult<SolverRun> {
        self.calls.push((format!("line {phases} - {out} {sweep:?}"), session.guesses.clone()));
        if out.contains("x") {
            return Ok(SolverRun::bombed("bombed"));
        }
        match self.lines.get(&(phases.clone(), out.clone())) {
            Some((s, pts)) if *s == sweep => {
                let samples = pts.iter().map(|p| sample(*p, "line guess")).collect();
                Ok(SolverRun::ok(samples, "line output").with_variance(2))
            }
            _ => Ok(SolverRun::nir("nothing")),
        }
    }

    fn calc_point(
        &mut self,
        session: &SolverSession,
        phases: &PhaseSet,
        out: &PhaseSet,
        _: Window,
    ) -> SolverResult<SolverRun> {
        self.calls.push((format!("point {phases} - {out}"), session.guesses.clone()));
        match self.points.get(&(phases.clone(), out.clone())) {
            Some(p) => Ok(SolverRun::ok(vec![sample(*p, &format!("guess {out}"))], "point output")),
            None => Ok(SolverRun::nir("nothing")),
        }
    }

    fn calc_assemblage(&mut self, _: &SolverSession, _: &PhaseSet, _: Point2) -> SolverResult<SolverRun> {
        Ok(SolverRun::nir(""))
    }

    fn dogmin(
        &mut self,
        _: &SolverSession,
        phases: &PhaseSet,
        _: Point2,
        variance: i32,
        level: u32,
    ) -> SolverResult<DogminRun> {
        self.calls.push((format!("dogmin {phases} {variance} {level}"), Vec::new()));
        Ok(DogminRun {
            phases: PhaseSet::parse("a b c"),
            output: "dogmin output".to_string(),
            resic: "resic".to_string(),
            guess: vec!["dogmin guess".to_string()],
        })
    }
}

fn solver() -> TableSolver {
    TableSolver::default()
        .point("a b c d", "b d", (500.0, 8.0))
        .point("a b c d e", "d e", (620.0, 8.7))
        .line("a b c d", "d", Sweep::AlongX, (450.0, 7.5), (650.0, 9.5))
        .line("a b c d", "b", Sweep::AlongY, (500.0, 8.0), (400.0, 14.0))
}

fn builder(solver: TableSolver) -> Builder<TableSolver> {
    let mut project = Project::new("test", SectionKind::Pt, std::env::temp_dir());
    project.selected = PhaseSet::parse("a b c d e H2O");
    project.section.excess = PhaseSet::parse("H2O");
    project.session.phases = ["a", "b", "c", "d", "e", "H2O"].map(String::from).to_vec();
    Builder::new(project, solver)
}

#[test]
fn line_connects_once_both_points_exist() {
    let mut b = builder(solver());
    let first = b.calc_inv(PhaseSet::parse("a b c d"), PhaseSet::parse("b d")).unwrap();
    assert_eq!(first, CalcStatus::Added(InvId::FIRST));

    let line = b
        .calc_uni(PhaseSet::parse("a b c d"), PhaseSet::parse("d"), Sweep::AlongX)
        .unwrap();
    assert_eq!(line, CalcStatus::Added(UniId::FIRST));
    assert_eq!(b.section().uniline(UniId::FIRST).unwrap().connected(), 0);

    let second = b.calc_inv(PhaseSet::parse("a b c d e"), PhaseSet::parse("d e")).unwrap();
    let end = InvId::FIRST.next();
    assert_eq!(second, CalcStatus::Added(end));
    let uni = b.section().uniline(UniId::FIRST).unwrap();
    assert_eq!(uni.connected(), 2);
    // begin is the earlier end along the sweep
    assert_eq!(uni.begin, Some(InvId::FIRST));
    assert_eq!(uni.end, Some(end));
    assert_eq!(uni.trimmed().first(), Some(&Point2::new(500.0, 8.0)));
}

#[test]
fn recalculation_follows_the_policy() {
    let mut b = builder(solver());
    b.calc_inv(PhaseSet::parse("a b c d"), PhaseSet::parse("b d")).unwrap();
    b.calc_inv(PhaseSet::parse("a b c d e"), PhaseSet::parse("d e")).unwrap();
    let phases = PhaseSet::parse("a b c d");
    let out = PhaseSet::parse("d");
    b.calc_uni(phases.clone(), out.clone(), Sweep::AlongX).unwrap();

    let again = b.calc_uni(phases.clone(), out.clone(), Sweep::AlongX).unwrap();
    assert_eq!(again, CalcStatus::Recalculated(UniId::FIRST));
    assert_eq!(b.section().uniline(UniId::FIRST).unwrap().connected(), 2);

    b.options.policy = RecalcPolicy::KeepExisting;
    let kept = b.calc_uni(phases, out, Sweep::AlongX).unwrap();
    assert_eq!(kept, CalcStatus::AlreadyExists(UniId::FIRST));
    assert_eq!(b.section().uni_count(), 1);
}

#[test]
fn solver_failures_are_statuses() {
    let mut b = builder(solver());
    let nir = b
        .calc_uni(PhaseSet::parse("a b c d"), PhaseSet::parse("d"), Sweep::AlongY)
        .unwrap();
    assert_eq!(nir, CalcStatus::NothingInRange);
    let bombed = b
        .calc_uni(PhaseSet::parse("a b x"), PhaseSet::parse("x"), Sweep::AlongX)
        .unwrap();
    assert_eq!(bombed, CalcStatus::Bombed);
    assert_eq!(bombed.to_string(), "Bombed.");
    assert_eq!(b.section().uni_count(), 0);

    let err = b
        .calc(PhaseSet::parse("a b c d"), PhaseSet::parse("b c d"), Sweep::AlongX)
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    let dispatched = b
        .calc(PhaseSet::parse("a b c d"), PhaseSet::parse("b d"), Sweep::AlongX)
        .unwrap();
    assert_eq!(dispatched, Calculated::Point(CalcStatus::Added(InvId::FIRST)));
}

#[test]
fn auto_calculation_tries_both_sweeps() {
    let mut b = builder(solver());
    b.calc_inv(PhaseSet::parse("a b c d"), PhaseSet::parse("b d")).unwrap();
    b.calc_uni(PhaseSet::parse("a b c d"), PhaseSet::parse("d"), Sweep::AlongX).unwrap();
    b.solver_mut().calls.clear();

    let report = b.auto_inv_calc(InvId::FIRST).unwrap();
    assert_eq!(report.len(), 4);
    let by_out: Vec<_> = report
        .iter()
        .map(|l| (l.phases.to_string(), l.out.to_string(), l.status))
        .collect();
    assert!(by_out.contains(&("a b c d".into(), "d".into(), None)));
    assert!(by_out.contains(&(
        "a b c d".into(),
        "b".into(),
        Some(CalcStatus::Added(UniId::FIRST.next()))
    )));
    assert!(by_out.contains(&("a c d".into(), "d".into(), Some(CalcStatus::NothingInRange))));

    let calls = &b.solver_mut().calls;
    // guesses come from the point
    assert_eq!(calls[0].1, vec!["guess b d".to_string()]);
    // three missing lines, each tried along x and then along y
    assert_eq!(calls.len(), 6);
}

#[test]
fn exploring_a_line_reports_points() {
    let mut b = builder(solver());
    b.calc_inv(PhaseSet::parse("a b c d"), PhaseSet::parse("b d")).unwrap();
    b.calc_uni(PhaseSet::parse("a b c d"), PhaseSet::parse("d"), Sweep::AlongX).unwrap();
    b.solver_mut().calls.clear();

    let found = b.explore_uni(UniId::FIRST).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].out, PhaseSet::parse("d e"));
    assert_eq!(found[0].existing, None);
    assert_eq!(found[1].out, PhaseSet::parse("b d"));
    assert_eq!(found[1].existing, Some(InvId::FIRST));
    // nothing is stored
    assert_eq!(b.section().inv_count(), 1);

    let calls = &b.solver_mut().calls;
    assert_eq!(calls.len(), 4);
    // an unbound line does not seed the search
    assert!(calls.iter().all(|(_, g)| g.is_empty()));
    assert!(b.session().guesses.is_empty());
}

#[test]
fn manual_line_needs_two_points() {
    let mut b = builder(solver());
    let phases = PhaseSet::parse("a b c d");
    let out = PhaseSet::parse("d");
    let err = b.add_manual_uni(phases.clone(), out.clone()).unwrap_err();
    assert!(matches!(
        err,
        AppError::Topology(TopologyError::NotEnoughCandidates { found: 0 })
    ));

    b.calc_inv(PhaseSet::parse("a b c d"), PhaseSet::parse("b d")).unwrap();
    b.calc_inv(PhaseSet::parse("a b c d e"), PhaseSet::parse("d e")).unwrap();
    let stored = b.add_manual_uni(phases, out).unwrap();
    assert_eq!(stored, StoreOutcome::Added(UniId::FIRST));
    let uni = b.section().uniline(UniId::FIRST).unwrap();
    assert!(uni.manual);
    assert_eq!(uni.trimmed(), &[Point2::new(500.0, 8.0), Point2::new(620.0, 8.7)]);
    assert!(b.remove_inv(InvId::FIRST).is_err());
}

#[test]
fn manual_point_at_crossing_of_lines() {
    let mut b = builder(TableSolver::default());
    for (out, from, to) in [("d", (400.0, 5.0), (600.0, 10.0)), ("b", (400.0, 10.0), (600.0, 5.0))] {
        let samples = vec![Point2::from(from), Point2::from(to)];
        let line = UnivariantLine::new(PhaseSet::parse("a b c d"), PhaseSet::parse(out))
            .unwrap()
            .with_samples(samples, Vec::new());
        let section = b.section_mut();
        let id = section.next_uni_id();
        section.add_uni(id, line).unwrap();
    }

    let phases = PhaseSet::parse("a b c d");
    let out = PhaseSet::parse("b d");
    let stored = b.add_manual_inv(phases, out, None).unwrap();
    let inv = b.section().invpoint(stored.id()).unwrap();
    assert!(inv.manual);
    assert!((inv.x - 500.0).abs() < 1e-6, "x {}", inv.x);
    assert!((inv.y - 7.5).abs() < 1e-6, "y {}", inv.y);

    let err = b
        .add_manual_inv(PhaseSet::parse("a b c e"), PhaseSet::parse("c e"), None)
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    let clicked = b
        .add_manual_inv(PhaseSet::parse("a b c e"), PhaseSet::parse("c e"), Some(Point2::new(700.0, 3.0)))
        .unwrap();
    assert!(matches!(clicked, StoreOutcome::Added(_)));
}

#[test]
fn dogmin_searches_selected_phases() {
    let mut b = builder(TableSolver::default());
    let id = b.dogmin(Point2::new(550.0, 6.0), 4, 1).unwrap();
    assert_eq!(id, Some(DogminId::FIRST));
    let dgm = b.section().dogmin(DogminId::FIRST).unwrap();
    assert_eq!(dgm.phases, PhaseSet::parse("a b c"));
    assert_eq!(b.solver_mut().calls[0].0, "dogmin a b c d e 4 1");

    b.use_dogmin_guesses(DogminId::FIRST).unwrap();
    assert_eq!(b.session().guesses, vec!["dogmin guess".to_string()]);
}

#[test]
fn window_follows_the_view() {
    let mut b = builder(TableSolver::default()).with_options(CalcOptions {
        overshoot_percent: Some(0.0),
        ..CalcOptions::default()
    });
    let view = Window::new((300.0, 700.0), (2.0, 12.0));
    b.set_view(view);
    assert_eq!(b.calc_window(), view);

    b.options.overshoot_percent = Some(10.0);
    b.set_view(Window::new((20.0, 120.0), (0.05, 1.05)));
    let w = b.calc_window();
    assert_eq!(w.xmin, 11.0);
    assert_eq!(w.ymin, 0.01);
    assert!((w.xmax - 130.0).abs() < 1e-9);
}

#[test]
fn wrong_binding_shows_up_as_warning() {
    let mut b = builder(solver());
    b.calc_inv(PhaseSet::parse("a b c d"), PhaseSet::parse("b d")).unwrap();
    assert!(connection_warnings(b.project()).is_empty());

    let stray = UnivariantLine::new(PhaseSet::parse("x y z"), PhaseSet::parse("x"))
        .unwrap()
        .with_samples(vec![Point2::new(450.0, 7.0), Point2::new(550.0, 9.0)], Vec::new())
        .between(Some(InvId::FIRST), None);
    b.section_mut().add_uni(UniId::FIRST, stray).unwrap();

    let warnings = connection_warnings(b.project());
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Univariant line 1 (x y z - x) cannot end at invariant point 1"));
}
