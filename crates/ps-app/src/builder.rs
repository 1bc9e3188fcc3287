//! Interactive construction of a section: calculating lines and points,
//! connecting them, user-defined entities and dogmin searches.

use std::fmt;

use ps_core::geometry::polyline_intersections;
use ps_core::{DogminId, InvId, PhaseSet, Point2, Real, UniId, Window, mean};
use ps_project::Project;
use ps_solver::{Solver, SolverSession, SolverStatus, Sweep};
use ps_topology::{
    Dogmin, InvariantPoint, RecalcPolicy, Section, StoreOutcome, TopologyError, UnivariantLine,
};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::options::CalcOptions;

/// Prolongation of lines, as a fraction of their length, when looking for
/// the crossing that places a user-defined point.
const CROSSING_EXTRA: Real = 0.2;

/// How one calculation request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalcStatus<I> {
    Bombed,
    NothingInRange,
    /// A line sweep produced a single sample.
    OnlyOnePoint,
    Added(I),
    Recalculated(I),
    AlreadyExists(I),
}

impl<I: Copy> CalcStatus<I> {
    pub fn id(&self) -> Option<I> {
        match *self {
            CalcStatus::Added(id) | CalcStatus::Recalculated(id) | CalcStatus::AlreadyExists(id) => {
                Some(id)
            }
            _ => None,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, CalcStatus::Added(_) | CalcStatus::Recalculated(_))
    }
}

impl<I> From<StoreOutcome<I>> for CalcStatus<I> {
    fn from(outcome: StoreOutcome<I>) -> Self {
        match outcome {
            StoreOutcome::Added(id) => CalcStatus::Added(id),
            StoreOutcome::Recalculated(id) => CalcStatus::Recalculated(id),
            StoreOutcome::AlreadyExists(id) => CalcStatus::AlreadyExists(id),
        }
    }
}

impl<I: fmt::Display> fmt::Display for CalcStatus<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcStatus::Bombed => write!(f, "Bombed."),
            CalcStatus::NothingInRange => write!(f, "Nothing in range."),
            CalcStatus::OnlyOnePoint => write!(f, "Only one point calculated. Change range."),
            CalcStatus::Added(id) => write!(f, "New entity {id} calculated."),
            CalcStatus::Recalculated(id) => write!(f, "Entity {id} re-calculated."),
            CalcStatus::AlreadyExists(id) => write!(f, "Entity {id} already exists."),
        }
    }
}

/// Either kind of calculation, picked by the number of zero-mode phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Calculated {
    Line(CalcStatus<UniId>),
    Point(CalcStatus<InvId>),
}

/// Invariant point found while exploring a line.
#[derive(Clone, Debug, PartialEq)]
pub struct ExploreCandidate {
    pub point: Point2,
    pub phases: PhaseSet,
    pub out: PhaseSet,
    /// Stored point this candidate is equivalent to.
    pub existing: Option<InvId>,
}

/// Outcome of one emanating line in [`Builder::auto_inv_calc`].
#[derive(Clone, Debug, PartialEq)]
pub struct AutoLine {
    pub phases: PhaseSet,
    pub out: PhaseSet,
    /// `None` when the line was already stored before the run.
    pub status: Option<CalcStatus<UniId>>,
}

/// A project being built with a solver at hand.
///
/// `view` is the currently displayed part of the section; calculation
/// windows are derived from it.
pub struct Builder<S> {
    project: Project,
    solver: S,
    pub options: CalcOptions,
    view: Window,
}

impl<S: Solver> Builder<S> {
    pub fn new(project: Project, solver: S) -> Self {
        let view = project.section.window();
        Self {
            project,
            solver,
            options: CalcOptions::default(),
            view,
        }
    }

    pub fn with_options(mut self, options: CalcOptions) -> Self {
        self.options = options;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn section(&self) -> &Section {
        &self.project.section
    }

    pub fn section_mut(&mut self) -> &mut Section {
        &mut self.project.section
    }

    pub fn session(&self) -> &SolverSession {
        &self.project.session
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    pub fn into_parts(self) -> (Project, S) {
        (self.project, self.solver)
    }

    pub fn view(&self) -> Window {
        self.view
    }

    pub fn set_view(&mut self, view: Window) {
        self.view = view;
    }

    /// Window handed to the solver: the view plus overshoot, clamped to the
    /// solver's lower limits.
    pub fn calc_window(&self) -> Window {
        self.options
            .apply(&self.project.session)
            .calc_window(self.project.section.kind(), self.view)
    }

    /// Calculate a line (one zero-mode phase) or a point (two).
    pub fn calc(&mut self, phases: PhaseSet, out: PhaseSet, sweep: Sweep) -> AppResult<Calculated> {
        match out.len() {
            1 => self.calc_uni(phases, out, sweep).map(Calculated::Line),
            2 => self.calc_inv(phases, out).map(Calculated::Point),
            n => Err(AppError::InvalidInput(format!(
                "{n} zero mode phases selected. Select one or two!"
            ))),
        }
    }

    pub fn calc_uni(
        &mut self,
        phases: PhaseSet,
        out: PhaseSet,
        sweep: Sweep,
    ) -> AppResult<CalcStatus<UniId>> {
        let mut wanted = UnivariantLine::new(phases, out)?;
        self.project.section.lookup_uni(Some(&mut wanted));
        let window = self.calc_window();
        let session = self.options.apply(&self.project.session);
        let run = self
            .solver
            .calc_line(&session, &wanted.phases, &wanted.out, sweep, window)?;
        match run.status {
            SolverStatus::Bombed => {
                warn!(label = %wanted.label(&self.project.section.excess), "calculation bombed");
                return Ok(CalcStatus::Bombed);
            }
            SolverStatus::Nir => {
                warn!(label = %wanted.label(&self.project.section.excess), "nothing in range");
                return Ok(CalcStatus::NothingInRange);
            }
            SolverStatus::Ok if run.samples.len() < 2 => return Ok(CalcStatus::OnlyOnePoint),
            SolverStatus::Ok => {}
        }
        let uni = run.into_uniline(wanted.phases, wanted.out)?;
        let section = &mut self.project.section;
        let outcome = section.store_uni_result(uni, self.options.policy)?;
        if self.options.autoconnect_uni && !matches!(outcome, StoreOutcome::AlreadyExists(_)) {
            section.autoconnect_uni(outcome.id())?;
        }
        info!(uni = %outcome.id(), ?outcome, "univariant line calculated");
        Ok(outcome.into())
    }

    pub fn calc_inv(&mut self, phases: PhaseSet, out: PhaseSet) -> AppResult<CalcStatus<InvId>> {
        let mut wanted = InvariantPoint::new(phases, out)?;
        self.project.section.lookup_inv(Some(&mut wanted));
        let window = self.calc_window();
        let session = self.options.apply(&self.project.session);
        let run = self
            .solver
            .calc_point(&session, &wanted.phases, &wanted.out, window)?;
        match run.status {
            SolverStatus::Bombed => return Ok(CalcStatus::Bombed),
            SolverStatus::Nir => return Ok(CalcStatus::NothingInRange),
            SolverStatus::Ok if run.samples.is_empty() => return Ok(CalcStatus::NothingInRange),
            SolverStatus::Ok => {}
        }
        let inv = run.into_invpoint(wanted.phases, wanted.out)?;
        let section = &mut self.project.section;
        let outcome = section.store_inv_result(inv, self.options.policy)?;
        if self.options.autoconnect_inv
            && let StoreOutcome::Added(id) = outcome
        {
            let connected = section.autoconnect_inv(id)?;
            debug!(inv = %id, lines = connected.len(), "autoconnected");
        }
        info!(inv = %outcome.id(), ?outcome, "invariant point calculated");
        Ok(outcome.into())
    }

    /// Calculate the emanating lines of a point that are not stored yet,
    /// sweeping along x first and along y when that fails.
    pub fn auto_inv_calc(&mut self, id: InvId) -> AppResult<Vec<AutoLine>> {
        let inv = self
            .project
            .section
            .invpoint(id)
            .ok_or(TopologyError::UnknownInv(id))?;
        if let Some(guess) = inv.guess(None) {
            self.project.session.guesses = guess.to_vec();
        }
        let lines = inv.all_unilines(self.project.section.polymorphs());
        let mut report = Vec::with_capacity(lines.len());
        for (phases, out) in lines {
            let mut status = None;
            for sweep in [Sweep::AlongX, Sweep::AlongY] {
                if !self.is_new_uni(&phases, &out)? {
                    break;
                }
                status = Some(self.calc_uni(phases.clone(), out.clone(), sweep)?);
            }
            report.push(AutoLine { phases, out, status });
        }
        info!(inv = %id, lines = report.len(), "auto calculations done");
        Ok(report)
    }

    fn is_new_uni(&self, phases: &PhaseSet, out: &PhaseSet) -> AppResult<bool> {
        let mut wanted = UnivariantLine::new(phases.clone(), out.clone())?;
        Ok(self.project.section.lookup_uni(Some(&mut wanted)).is_new)
    }

    /// Look for invariant points along a stored line: one more zero-mode
    /// phase from its assemblage, or one more phase from the dataset.
    ///
    /// Results are reported, not stored.
    pub fn explore_uni(&mut self, id: UniId) -> AppResult<Vec<ExploreCandidate>> {
        let uni = self
            .project
            .section
            .uniline(id)
            .ok_or(TopologyError::UnknownUni(id))?
            .clone();
        let excess = self.project.section.excess.clone();

        let mut requests = Vec::new();
        for phase in uni.phases.difference(&uni.out).difference(&excess).iter() {
            requests.push((uni.phases.clone(), uni.out.with(phase)));
        }
        let extra: Vec<String> = self
            .project
            .session
            .extra_phases(&uni.phases)
            .filter(|p| !excess.contains(p))
            .map(str::to_string)
            .collect();
        for phase in &extra {
            requests.push((uni.phases.with(phase), uni.out.with(phase)));
        }

        let seed = (self.options.use_inv_guess && uni.connected() == 1)
            .then(|| uni.begin.or(uni.end))
            .flatten()
            .and_then(|inv| self.project.section.invpoint(inv))
            .and_then(|inv| inv.guess(None))
            .map(<[String]>::to_vec);
        let restore = seed.map(|g| self.project.session.swap_guesses(g));

        let window = self.calc_window();
        let session = self.options.apply(&self.project.session);
        let mut found = Vec::new();
        let mut failure = None;
        for (phases, out) in requests {
            let run = match self.solver.calc_point(&session, &phases, &out, window) {
                Ok(run) => run,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            if !run.is_ok() || run.samples.is_empty() {
                continue;
            }
            let mut inv = run.into_invpoint(phases, out)?;
            let lookup = self.project.section.lookup_inv(Some(&mut inv));
            found.push(ExploreCandidate {
                point: inv.point(),
                phases: inv.phases,
                out: inv.out,
                existing: (!lookup.is_new).then_some(lookup.id),
            });
        }
        if let Some(old) = restore {
            self.project.session.guesses = old;
        }
        if let Some(err) = failure {
            return Err(err.into());
        }
        found.sort_by(|a, b| b.point.x.total_cmp(&a.point.x).then(b.point.y.total_cmp(&a.point.y)));
        info!(uni = %id, found = found.len(), "searching done");
        Ok(found)
    }

    /// Store a user-defined line between the only two points it fits.
    ///
    /// The line carries no samples of its own: it is drawn as the straight
    /// segment between its two points, never as an interpolated midpoint.
    /// A computed line of the same identity is replaced by the manual one.
    pub fn add_manual_uni(&mut self, phases: PhaseSet, out: PhaseSet) -> AppResult<StoreOutcome<UniId>> {
        let mut uni = UnivariantLine::manual(phases, out)?;
        let section = &mut self.project.section;
        let found = section.lookup_uni(Some(&mut uni));
        let candidates = section.autoconnect_candidates(&uni);
        let [a, b] = *candidates.as_slice() else {
            return Err(TopologyError::NotEnoughCandidates {
                found: candidates.len(),
            }
            .into());
        };
        section.add_uni(found.id, uni.between(Some(a), Some(b)))?;
        info!(uni = %found.id, "user-defined univariant line stored");
        Ok(if found.is_new {
            StoreOutcome::Added(found.id)
        } else {
            StoreOutcome::Recalculated(found.id)
        })
    }

    /// Where a point of this identity sits according to the stored lines:
    /// the mean of all pairwise crossings of lines it fits.
    pub fn crossing_of_lines(&self, phases: &PhaseSet, out: &PhaseSet) -> AppResult<Option<Point2>> {
        let target = InvariantPoint::new(phases.clone(), out.clone())?;
        let section = &self.project.section;
        let lines: Vec<&UnivariantLine> = section
            .unilines()
            .map(|(_, uni)| uni)
            .filter(|uni| uni.contains_inv(&target, section.polymorphs()))
            .collect();
        fn curve(uni: &UnivariantLine) -> &[Point2] {
            if uni.raw().is_empty() { uni.trimmed() } else { uni.raw() }
        }
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (i, a) in lines.iter().enumerate() {
            for b in &lines[i + 1..] {
                let hits = polyline_intersections(curve(a), curve(b), section.ratio(), CROSSING_EXTRA);
                if let Some(p) = hits.first() {
                    xs.push(p.x);
                    ys.push(p.y);
                }
            }
        }
        Ok(mean(&xs).zip(mean(&ys)).map(|(x, y)| Point2::new(x, y)))
    }

    /// Store a user-defined point at `at`, or at the crossing of the stored
    /// lines when no position is given.
    pub fn add_manual_inv(
        &mut self,
        phases: PhaseSet,
        out: PhaseSet,
        at: Option<Point2>,
    ) -> AppResult<StoreOutcome<InvId>> {
        let at = match at {
            Some(p) => p,
            None => self.crossing_of_lines(&phases, &out)?.ok_or_else(|| {
                AppError::InvalidInput("No crossing of univariant lines found, position needed".to_string())
            })?,
        };
        let inv = InvariantPoint::manual(phases, out)?.at(at.x, at.y);
        let section = &mut self.project.section;
        let outcome = section.store_inv_result(inv, RecalcPolicy::Replace)?;
        if self.options.autoconnect_inv
            && let StoreOutcome::Added(id) = outcome
        {
            section.autoconnect_inv(id)?;
        }
        info!(inv = %outcome.id(), "user-defined invariant point stored");
        Ok(outcome)
    }

    /// Search the stable assemblage at `at` among the selected phases.
    /// Returns the id of the stored result, `None` when the search failed.
    pub fn dogmin(&mut self, at: Point2, variance: i32, level: u32) -> AppResult<Option<DogminId>> {
        let which = self.project.selected.difference(&self.project.section.excess);
        let run = self
            .solver
            .dogmin(&self.project.session, &which, at, variance, level)?;
        if !run.found() {
            warn!(x = at.x, y = at.y, "dogmin failed");
            return Ok(None);
        }
        let mut dgm = Dogmin::new(run.phases, at.x, at.y);
        dgm.output = run.output;
        dgm.resic = run.resic;
        dgm.guess = run.guess;
        let section = &mut self.project.section;
        let id = section.next_dogmin_id();
        section.add_dogmin(id, dgm);
        info!(dogmin = %id, "dogmin finished");
        Ok(Some(id))
    }

    /// Use the guesses stored with a point for the next calculations.
    pub fn use_inv_guesses(&mut self, id: InvId) -> AppResult<()> {
        let inv = self
            .project
            .section
            .invpoint(id)
            .ok_or(TopologyError::UnknownInv(id))?;
        let guess = inv
            .guess(None)
            .ok_or_else(|| AppError::InvalidInput(format!("Invariant point {id} has no guesses")))?
            .to_vec();
        self.project.session.guesses = guess;
        Ok(())
    }

    /// Use the guesses of one sample of a line; `None` picks the middle one.
    pub fn use_uni_guesses(&mut self, id: UniId, sample: Option<usize>) -> AppResult<()> {
        let uni = self
            .project
            .section
            .uniline(id)
            .ok_or(TopologyError::UnknownUni(id))?;
        let guess = uni
            .guess(sample)
            .ok_or_else(|| AppError::InvalidInput(format!("Univariant line {id} has no guesses")))?
            .to_vec();
        self.project.session.guesses = guess;
        Ok(())
    }

    pub fn use_dogmin_guesses(&mut self, id: DogminId) -> AppResult<()> {
        let dgm = self
            .project
            .section
            .dogmin(id)
            .ok_or(TopologyError::UnknownDogmin(id))?;
        if dgm.guess.is_empty() {
            return Err(AppError::InvalidInput(format!("Dogmin {id} has no guesses")));
        }
        self.project.session.guesses = dgm.guess.clone();
        Ok(())
    }

    pub fn remove_inv(&mut self, id: InvId) -> AppResult<Vec<UniId>> {
        Ok(self.project.section.remove_inv(id)?)
    }

    pub fn remove_uni(&mut self, id: UniId) -> AppResult<()> {
        self.project.section.remove_uni(id)?;
        Ok(())
    }

    pub fn remove_dogmin(&mut self, id: DogminId) -> AppResult<()> {
        self.project.section.remove_dogmin(id)?;
        Ok(())
    }
}
