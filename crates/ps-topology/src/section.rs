//! The section store: every invariant point, univariant line and dogmin of
//! one diagram, plus the invariants tying them together.
//!
//! Ids are minted as "max ever used + 1" and are never handed out twice in
//! one store, even after the entity carrying them was deleted.

use std::collections::BTreeMap;
use std::fmt;

use ps_core::geometry::ensure_finite;
use ps_core::{
    DogminId, InvId, PhaseSet, Point2, PolymorphTable, Real, UniId, Window, raw_inv,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::{Dogmin, InvariantPoint, ResultBlock, UnivariantLine};
use crate::error::{TopologyError, TopologyResult};
use crate::trim::trim_line;

/// Axis layout of a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    /// Temperature against pressure.
    Pt,
    /// Temperature against composition.
    Tx,
    /// Pressure against composition.
    Px,
}

impl SectionKind {
    pub fn x_var(self) -> &'static str {
        match self {
            SectionKind::Pt | SectionKind::Tx => "T",
            SectionKind::Px => "p",
        }
    }

    pub fn y_var(self) -> &'static str {
        match self {
            SectionKind::Pt => "p",
            SectionKind::Tx | SectionKind::Px => "C",
        }
    }

    pub fn x_label(self) -> &'static str {
        match self {
            SectionKind::Pt | SectionKind::Tx => "Temperature [C]",
            SectionKind::Px => "Pressure [kbar]",
        }
    }

    pub fn y_label(self) -> &'static str {
        match self {
            SectionKind::Pt => "Pressure [kbar]",
            SectionKind::Tx | SectionKind::Px => "Composition",
        }
    }

    /// Display resolution of the x axis.
    pub fn x_res(self) -> Real {
        match self {
            SectionKind::Pt | SectionKind::Tx => 0.01,
            SectionKind::Px => 0.001,
        }
    }

    pub fn y_res(self) -> Real {
        0.001
    }

    pub fn default_window(self) -> Window {
        match self {
            SectionKind::Pt => Window::new((200.0, 1000.0), (0.1, 20.0)),
            SectionKind::Tx => Window::new((200.0, 1000.0), (0.0, 1.0)),
            SectionKind::Px => Window::new((0.1, 20.0), (0.0, 1.0)),
        }
    }

    /// Inset of the reconstruction boundary from the section window.
    ///
    /// Composition axes end exactly on the computed curves, so the boundary
    /// is pulled in slightly to keep crossings proper.
    pub fn boundary_shrink(self) -> Real {
        match self {
            SectionKind::Pt => 0.0,
            SectionKind::Tx | SectionKind::Px => 1e-4,
        }
    }
}

/// Outcome of an identity lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdLookup<I> {
    pub is_new: bool,
    pub id: I,
}

/// What to do when a recalculated entity already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecalcPolicy {
    /// Swap in the new result, keeping the stored connections.
    #[default]
    Replace,
    /// Join old and new samples into one sweep, keeping the connections.
    Merge,
    /// Leave the stored entity untouched.
    KeepExisting,
}

/// Result of storing a computed entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOutcome<I> {
    Added(I),
    Recalculated(I),
    AlreadyExists(I),
}

impl<I: Copy> StoreOutcome<I> {
    pub fn id(&self) -> I {
        match *self {
            StoreOutcome::Added(id)
            | StoreOutcome::Recalculated(id)
            | StoreOutcome::AlreadyExists(id) => id,
        }
    }
}

/// Collection of invariant points, univariant lines and dogmins of one
/// diagram.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    kind: SectionKind,
    window: Window,
    #[serde(default)]
    pub excess: PhaseSet,
    #[serde(default)]
    polymorphs: PolymorphTable,
    #[serde(default)]
    invpoints: BTreeMap<InvId, InvariantPoint>,
    #[serde(default)]
    unilines: BTreeMap<UniId, UnivariantLine>,
    #[serde(default)]
    dogmins: BTreeMap<DogminId, Dogmin>,
    // highest ids ever stored, so deleted ids are not minted again
    #[serde(default)]
    inv_watermark: u32,
    #[serde(default)]
    uni_watermark: u32,
    #[serde(default)]
    dogmin_watermark: u32,
}

impl Section {
    pub fn new(kind: SectionKind) -> Self {
        Self::with_window(kind, kind.default_window())
    }

    pub fn with_window(kind: SectionKind, window: Window) -> Self {
        Self {
            kind,
            window,
            excess: PhaseSet::new(),
            polymorphs: PolymorphTable::default(),
            invpoints: BTreeMap::new(),
            unilines: BTreeMap::new(),
            dogmins: BTreeMap::new(),
            inv_watermark: 0,
            uni_watermark: 0,
            dogmin_watermark: 0,
        }
    }

    pub fn with_excess(mut self, excess: PhaseSet) -> Self {
        self.excess = excess;
        self
    }

    pub fn with_polymorphs(mut self, polymorphs: PolymorphTable) -> Self {
        self.polymorphs = polymorphs;
        self
    }

    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Changing the window changes the scaling used for trimming, so every
    /// line is retrimmed.
    pub fn set_window(&mut self, window: Window) {
        self.window = window;
        self.trim_all();
    }

    pub fn polymorphs(&self) -> &PolymorphTable {
        &self.polymorphs
    }

    /// x-span over y-span of the section window.
    pub fn ratio(&self) -> Real {
        self.window.ratio()
    }

    // ---- access ---------------------------------------------------------

    pub fn invpoint(&self, id: InvId) -> Option<&InvariantPoint> {
        self.invpoints.get(&id)
    }

    pub fn uniline(&self, id: UniId) -> Option<&UnivariantLine> {
        self.unilines.get(&id)
    }

    pub fn dogmin(&self, id: DogminId) -> Option<&Dogmin> {
        self.dogmins.get(&id)
    }

    pub fn invpoints(&self) -> impl Iterator<Item = (InvId, &InvariantPoint)> + '_ {
        self.invpoints.iter().map(|(id, inv)| (*id, inv))
    }

    pub fn unilines(&self) -> impl Iterator<Item = (UniId, &UnivariantLine)> + '_ {
        self.unilines.iter().map(|(id, uni)| (*id, uni))
    }

    pub fn dogmins(&self) -> impl Iterator<Item = (DogminId, &Dogmin)> + '_ {
        self.dogmins.iter().map(|(id, dgm)| (*id, dgm))
    }

    pub fn inv_count(&self) -> usize {
        self.invpoints.len()
    }

    pub fn uni_count(&self) -> usize {
        self.unilines.len()
    }

    pub fn dogmin_count(&self) -> usize {
        self.dogmins.len()
    }

    fn inv_or_err(&self, id: InvId) -> TopologyResult<&InvariantPoint> {
        self.invpoints.get(&id).ok_or(TopologyError::UnknownInv(id))
    }

    fn uni_or_err(&self, id: UniId) -> TopologyResult<&UnivariantLine> {
        self.unilines.get(&id).ok_or(TopologyError::UnknownUni(id))
    }

    // ---- id minting -----------------------------------------------------

    pub fn next_inv_id(&self) -> InvId {
        let top = self.invpoints.keys().next_back().map_or(0, |id| id.get());
        InvId::new(top.max(self.inv_watermark)).map_or(InvId::FIRST, InvId::next)
    }

    pub fn next_uni_id(&self) -> UniId {
        let top = self.unilines.keys().next_back().map_or(0, |id| id.get());
        UniId::new(top.max(self.uni_watermark)).map_or(UniId::FIRST, UniId::next)
    }

    pub fn next_dogmin_id(&self) -> DogminId {
        let top = self.dogmins.keys().next_back().map_or(0, |id| id.get());
        DogminId::new(top.max(self.dogmin_watermark)).map_or(DogminId::FIRST, DogminId::next)
    }

    /// Id of the stored point equivalent to `candidate`, or the next free id.
    ///
    /// Equivalence is polymorph aware. On a match the candidate's `out` is
    /// rewritten to the stored spelling. `None` just returns the next id.
    pub fn lookup_inv(&self, candidate: Option<&mut InvariantPoint>) -> IdLookup<InvId> {
        if let Some(inv) = candidate {
            let outs = self.polymorphs.out_variants(&inv.phases, &inv.out);
            let hit = self
                .invpoints
                .iter()
                .find(|(_, stored)| stored.phases == inv.phases && outs.contains(&stored.out));
            if let Some((id, stored)) = hit {
                inv.out = stored.out.clone();
                return IdLookup {
                    is_new: false,
                    id: *id,
                };
            }
        }
        IdLookup {
            is_new: true,
            id: self.next_inv_id(),
        }
    }

    /// Line counterpart of [`Section::lookup_inv`].
    pub fn lookup_uni(&self, candidate: Option<&mut UnivariantLine>) -> IdLookup<UniId> {
        if let Some(uni) = candidate {
            let outs = self.polymorphs.out_variants(&uni.phases, &uni.out);
            let hit = self
                .unilines
                .iter()
                .find(|(_, stored)| stored.phases == uni.phases && outs.contains(&stored.out));
            if let Some((id, stored)) = hit {
                uni.out = stored.out.clone();
                return IdLookup {
                    is_new: false,
                    id: *id,
                };
            }
        }
        IdLookup {
            is_new: true,
            id: self.next_uni_id(),
        }
    }

    // ---- insertion ------------------------------------------------------

    /// Store `inv` under `id`, replacing any point already there.
    pub fn add_inv(&mut self, id: InvId, mut inv: InvariantPoint) {
        inv.id = Some(id);
        self.inv_watermark = self.inv_watermark.max(id.get());
        debug!(inv = %id, label = %inv.label(&self.excess), "invariant point stored");
        self.invpoints.insert(id, inv);
    }

    /// Store `uni` under `id` and trim it against its endpoints.
    pub fn add_uni(&mut self, id: UniId, mut uni: UnivariantLine) -> TopologyResult<()> {
        for inv in [uni.begin, uni.end].into_iter().flatten() {
            if !self.invpoints.contains_key(&inv) {
                return Err(TopologyError::DanglingEndpoint { uni: id, inv });
            }
        }
        uni.id = Some(id);
        self.uni_watermark = self.uni_watermark.max(id.get());
        debug!(uni = %id, label = %uni.label(&self.excess), "univariant line stored");
        self.unilines.insert(id, uni);
        self.trim_uni(id)
    }

    pub fn add_dogmin(&mut self, id: DogminId, mut dgm: Dogmin) {
        dgm.id = Some(id);
        self.dogmin_watermark = self.dogmin_watermark.max(id.get());
        self.dogmins.insert(id, dgm);
    }

    // ---- trimming -------------------------------------------------------

    /// Recompute the trimmed view of one line.
    pub fn trim_uni(&mut self, id: UniId) -> TopologyResult<()> {
        let ratio = self.ratio();
        let uni = self.uni_or_err(id)?;
        let p1 = match uni.begin {
            Some(inv) => Some(self.inv_or_err(inv)?.point()),
            None => None,
        };
        let p2 = match uni.end {
            Some(inv) => Some(self.inv_or_err(inv)?.point()),
            None => None,
        };
        let uni = self
            .unilines
            .get_mut(&id)
            .ok_or(TopologyError::UnknownUni(id))?;
        trim_line(uni, p1, p2, ratio);
        Ok(())
    }

    /// Retrim every line; lines with broken references are logged and
    /// skipped.
    pub fn trim_all(&mut self) {
        let ids: Vec<UniId> = self.unilines.keys().copied().collect();
        for id in ids {
            if let Err(err) = self.trim_uni(id) {
                warn!(uni = %id, %err, "cannot trim univariant line");
            }
        }
    }

    fn retrim_referencing(&mut self, inv: InvId) -> Vec<UniId> {
        let ids: Vec<UniId> = self
            .unilines
            .iter()
            .filter(|(_, uni)| uni.begin == Some(inv) || uni.end == Some(inv))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Err(err) = self.trim_uni(*id) {
                warn!(uni = %id, %err, "cannot trim univariant line");
            }
        }
        ids
    }

    // ---- removal --------------------------------------------------------

    /// Delete a point, unbinding and retrimming every line that ends at it.
    ///
    /// Refused without any change when a user-defined line ends at the point.
    /// Returns the lines that were unbound.
    pub fn remove_inv(&mut self, id: InvId) -> TopologyResult<Vec<UniId>> {
        self.inv_or_err(id)?;
        let manual: Vec<UniId> = self
            .unilines
            .iter()
            .filter(|(_, uni)| uni.manual && (uni.begin == Some(id) || uni.end == Some(id)))
            .map(|(uid, _)| *uid)
            .collect();
        if !manual.is_empty() {
            warn!(inv = %id, lines = ?manual, "invariant point defines user-defined lines");
            return Err(TopologyError::DeleteRefused { inv: id, lines: manual });
        }
        let mut touched = Vec::new();
        for (uid, uni) in self.unilines.iter_mut() {
            let mut hit = false;
            if uni.begin == Some(id) {
                uni.begin = None;
                hit = true;
            }
            if uni.end == Some(id) {
                uni.end = None;
                hit = true;
            }
            if hit {
                touched.push(*uid);
            }
        }
        self.invpoints.remove(&id);
        for uid in &touched {
            self.trim_uni(*uid)?;
        }
        debug!(inv = %id, unbound = touched.len(), "invariant point removed");
        Ok(touched)
    }

    pub fn remove_uni(&mut self, id: UniId) -> TopologyResult<UnivariantLine> {
        let uni = self
            .unilines
            .remove(&id)
            .ok_or(TopologyError::UnknownUni(id))?;
        debug!(uni = %id, "univariant line removed");
        Ok(uni)
    }

    pub fn remove_dogmin(&mut self, id: DogminId) -> TopologyResult<Dogmin> {
        self.dogmins
            .remove(&id)
            .ok_or(TopologyError::UnknownDogmin(id))
    }

    /// Drop raw samples (and their result blocks) inside `window`.
    ///
    /// Returns how many samples were removed.
    pub fn remove_samples_in_window(&mut self, id: UniId, window: Window) -> TopologyResult<usize> {
        let uni = self
            .unilines
            .get_mut(&id)
            .ok_or(TopologyError::UnknownUni(id))?;
        let per_sample = uni.has_sample_results();
        let mut samples = Vec::with_capacity(uni.raw.len());
        let mut results = Vec::with_capacity(uni.raw.len());
        for (i, p) in uni.raw.iter().enumerate() {
            if window.contains(*p) {
                continue;
            }
            samples.push(*p);
            if per_sample {
                results.push(uni.results[i].clone());
            }
        }
        let removed = uni.raw.len() - samples.len();
        if removed > 0 {
            if !per_sample {
                results = uni.results.clone();
            }
            uni.set_samples(samples, results);
            self.trim_uni(id)?;
        }
        Ok(removed)
    }

    // ---- connection -----------------------------------------------------

    /// Bind both ends of a line and retrim.
    pub fn connect_uni(&mut self, id: UniId, begin: InvId, end: InvId) -> TopologyResult<()> {
        self.inv_or_err(begin)?;
        self.inv_or_err(end)?;
        let uni = self
            .unilines
            .get_mut(&id)
            .ok_or(TopologyError::UnknownUni(id))?;
        uni.begin = Some(begin);
        uni.end = Some(end);
        debug!(uni = %id, begin = %begin, end = %end, "univariant line connected");
        self.trim_uni(id)
    }

    /// Stored points `uni` may terminate at.
    pub fn autoconnect_candidates(&self, uni: &UnivariantLine) -> Vec<InvId> {
        self.invpoints
            .iter()
            .filter(|(_, inv)| uni.contains_inv(inv, &self.polymorphs))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Connect a line when exactly two stored points qualify.
    pub fn autoconnect_uni(&mut self, id: UniId) -> TopologyResult<bool> {
        let candidates = self.autoconnect_candidates(self.uni_or_err(id)?);
        match candidates.as_slice() {
            [a, b] => {
                self.connect_uni(id, *a, *b)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Connect every line ending at point `id` whose only other qualifying
    /// point is unique. Returns the connected lines.
    pub fn autoconnect_inv(&mut self, id: InvId) -> TopologyResult<Vec<UniId>> {
        let inv = self.inv_or_err(id)?;
        let mut plan = Vec::new();
        for (uid, uni) in &self.unilines {
            if !uni.contains_inv(inv, &self.polymorphs) {
                continue;
            }
            let others: Vec<InvId> = self
                .invpoints
                .iter()
                .filter(|(oid, other)| **oid != id && uni.contains_inv(other, &self.polymorphs))
                .map(|(oid, _)| *oid)
                .collect();
            if let [other] = others.as_slice() {
                plan.push((*uid, *other));
            }
        }
        let mut connected = Vec::with_capacity(plan.len());
        for (uid, other) in plan {
            self.connect_uni(uid, id, other)?;
            connected.push(uid);
        }
        Ok(connected)
    }

    // ---- recalculation --------------------------------------------------

    /// Store a freshly computed line, resolving its identity first.
    pub fn store_uni_result(
        &mut self,
        mut uni: UnivariantLine,
        policy: RecalcPolicy,
    ) -> TopologyResult<StoreOutcome<UniId>> {
        ensure_finite(uni.raw(), &format!("univariant line {}", uni.label(&self.excess)))?;
        let found = self.lookup_uni(Some(&mut uni));
        if found.is_new {
            self.add_uni(found.id, uni)?;
            return Ok(StoreOutcome::Added(found.id));
        }
        let id = found.id;
        let ratio = self.ratio();
        let stored = self.uni_or_err(id)?;
        match policy {
            RecalcPolicy::KeepExisting => return Ok(StoreOutcome::AlreadyExists(id)),
            RecalcPolicy::Replace => {
                uni.begin = stored.begin;
                uni.end = stored.end;
            }
            RecalcPolicy::Merge => {
                let (samples, results) = merge_samples(stored, &uni, ratio);
                uni.begin = stored.begin;
                uni.end = stored.end;
                uni.set_samples(samples, results);
            }
        }
        self.add_uni(id, uni)?;
        debug!(uni = %id, ?policy, "univariant line recalculated");
        Ok(StoreOutcome::Recalculated(id))
    }

    /// Store a freshly computed point; replacing one retrims the lines
    /// ending at it.
    ///
    /// A point has a single coordinate, so `Merge` behaves like `Replace`.
    pub fn store_inv_result(
        &mut self,
        mut inv: InvariantPoint,
        policy: RecalcPolicy,
    ) -> TopologyResult<StoreOutcome<InvId>> {
        ensure_finite(&[inv.point()], &format!("invariant point {}", inv.label(&self.excess)))?;
        let found = self.lookup_inv(Some(&mut inv));
        if found.is_new {
            self.add_inv(found.id, inv);
            return Ok(StoreOutcome::Added(found.id));
        }
        if policy == RecalcPolicy::KeepExisting {
            return Ok(StoreOutcome::AlreadyExists(found.id));
        }
        self.add_inv(found.id, inv);
        self.retrim_referencing(found.id);
        Ok(StoreOutcome::Recalculated(found.id))
    }

    // ---- queries --------------------------------------------------------

    /// Lines along which `phase` vanishes, directly or via a polymorph.
    pub fn lines_with_zero_mode(&self, phase: &str) -> Vec<UniId> {
        self.unilines
            .iter()
            .filter(|(_, uni)| self.polymorphs.zero_mode_of(&uni.phases, &uni.out, phase))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Stored lines ending at `inv`.
    pub fn lines_at(&self, inv: InvId) -> Vec<UniId> {
        self.unilines
            .iter()
            .filter(|(_, uni)| uni.begin == Some(inv) || uni.end == Some(inv))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Bulk composition block echoed in the first computed point's output.
    ///
    /// PT sections yield two rows (oxides, amounts); composition sections
    /// three (oxides, start, end).
    pub fn bulk_composition(&self) -> Option<Vec<Vec<String>>> {
        let inv = self.invpoints.values().find(|inv| !inv.manual)?;
        let split = |s: &str| s.split_whitespace().map(str::to_string).collect::<Vec<_>>();
        match self.kind {
            SectionKind::Pt => {
                let block = ["composition (from script)\n", "composition (from setbulk script)\n"]
                    .into_iter()
                    .find_map(|marker| inv.output.split_once(marker).map(|(_, rest)| rest))?;
                let mut lines = block.lines();
                Some(vec![split(lines.next()?), split(lines.next()?)])
            }
            SectionKind::Tx | SectionKind::Px => {
                let (_, rest) = inv.output.split_once("composition (from script)\n")?;
                let table = rest.split('<').next().unwrap_or(rest);
                let rows: Vec<Vec<String>> = table
                    .lines()
                    .skip(2)
                    .map(split)
                    .filter(|r| r.len() >= 2)
                    .collect();
                Some(vec![
                    rows.iter().map(|r| r[0].clone()).collect(),
                    rows.iter().map(|r| r[1].clone()).collect(),
                    rows.iter().filter_map(|r| r.last().cloned()).collect(),
                ])
            }
        }
    }
}

/// Union of two sweeps of the same line, ordered along the axis with the
/// larger scaled extent; samples closer than a tiny tolerance collapse to the
/// newer one.
fn merge_samples(
    old: &UnivariantLine,
    new: &UnivariantLine,
    ratio: Real,
) -> (Vec<Point2>, Vec<ResultBlock>) {
    let tagged = |uni: &UnivariantLine| -> Vec<(Point2, ResultBlock)> {
        let per_sample = uni.has_sample_results();
        uni.raw
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let block = if per_sample {
                    uni.results[i].clone()
                } else {
                    ResultBlock::default()
                };
                (*p, block)
            })
            .collect()
    };
    let mut all = tagged(new);
    all.extend(tagged(old));
    if all.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let (mut xmin, mut xmax, mut ymin, mut ymax) = (Real::MAX, Real::MIN, Real::MAX, Real::MIN);
    for (p, _) in &all {
        let s = p.scaled(ratio);
        xmin = xmin.min(s.x);
        xmax = xmax.max(s.x);
        ymin = ymin.min(s.y);
        ymax = ymax.max(s.y);
    }
    let along_x = xmax - xmin >= ymax - ymin;
    let key = |p: &Point2| if along_x { p.x } else { p.y * ratio };
    // stable sort keeps the newer sample first among equal keys
    all.sort_by(|a, b| key(&a.0).total_cmp(&key(&b.0)));

    let tol = 1e-9 * (1.0 + (xmax - xmin).max(ymax - ymin));
    let mut samples: Vec<Point2> = Vec::with_capacity(all.len());
    let mut results = Vec::with_capacity(all.len());
    for (p, block) in all {
        if let Some(last) = samples.last()
            && last.scaled(ratio).distance(p.scaled(ratio)) <= tol
        {
            continue;
        }
        samples.push(p);
        results.push(block);
    }
    (samples, results)
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            SectionKind::Pt => "PTsection",
            SectionKind::Tx => "TXsection",
            SectionKind::Px => "PXsection",
        };
        writeln!(f, "{name}")?;
        writeln!(f, "Univariant lines: {}", self.unilines.len())?;
        writeln!(f, "Invariant points: {}", self.invpoints.len())?;
        writeln!(
            f,
            "{} range: {} {}",
            self.kind.x_var(),
            self.window.xmin,
            self.window.xmax
        )?;
        write!(
            f,
            "{} range: {} {}",
            self.kind.y_var(),
            self.window.ymin,
            self.window.ymax
        )
    }
}

/// Compact `begin-end` tag used in log lines.
pub fn endpoint_tag(uni: &UnivariantLine) -> String {
    format!("{}-{}", raw_inv(uni.begin), raw_inv(uni.end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(phases: &str, out: &str, x: Real, y: Real) -> InvariantPoint {
        InvariantPoint::new(PhaseSet::parse(phases), PhaseSet::parse(out))
            .unwrap()
            .at(x, y)
    }

    fn uni(phases: &str, out: &str, pts: &[(Real, Real)]) -> UnivariantLine {
        let samples: Vec<Point2> = pts.iter().copied().map(Point2::from).collect();
        let results = vec![ResultBlock::default(); samples.len()];
        UnivariantLine::new(PhaseSet::parse(phases), PhaseSet::parse(out))
            .unwrap()
            .with_samples(samples, results)
    }

    #[test]
    fn ids_start_at_one_and_are_not_reused() {
        let mut ps = Section::new(SectionKind::Pt);
        assert_eq!(ps.next_inv_id().get(), 1);
        let id = ps.lookup_inv(None).id;
        ps.add_inv(id, inv("a b c", "a b", 500.0, 5.0));
        let id2 = ps.next_inv_id();
        assert_eq!(id2.get(), 2);
        ps.add_inv(id2, inv("a b c d", "a b", 510.0, 5.0));
        ps.remove_inv(id2).unwrap();
        assert_eq!(ps.next_inv_id().get(), 3);
    }

    #[test]
    fn lookup_canonicalises_out() {
        let mut ps = Section::new(SectionKind::Pt);
        ps.add_inv(InvId::FIRST, inv("sill and q mu", "and q", 600.0, 4.0));
        let mut other = inv("sill and q mu", "sill q", 600.0, 4.0);
        let found = ps.lookup_inv(Some(&mut other));
        assert!(!found.is_new);
        assert_eq!(found.id, InvId::FIRST);
        assert_eq!(other.out, PhaseSet::parse("and q"));
    }

    #[test]
    fn add_uni_rejects_dangling_endpoint() {
        let mut ps = Section::new(SectionKind::Pt);
        let line = uni("a b c", "a", &[(300.0, 1.0), (400.0, 2.0)]).between(InvId::new(9), None);
        let err = ps.add_uni(UniId::FIRST, line).unwrap_err();
        assert!(matches!(err, TopologyError::DanglingEndpoint { .. }));
        assert_eq!(ps.uni_count(), 0);
    }

    #[test]
    fn keep_existing_leaves_line_alone() {
        let mut ps = Section::new(SectionKind::Pt);
        let first = uni("a b c", "a", &[(300.0, 1.0), (400.0, 2.0)]);
        ps.store_uni_result(first, RecalcPolicy::Replace).unwrap();
        let again = uni("a b c", "a", &[(300.0, 1.5), (400.0, 2.5), (500.0, 3.0)]);
        let outcome = ps.store_uni_result(again, RecalcPolicy::KeepExisting).unwrap();
        assert_eq!(outcome, StoreOutcome::AlreadyExists(UniId::FIRST));
        assert_eq!(ps.uniline(UniId::FIRST).unwrap().raw().len(), 2);
    }

    #[test]
    fn merge_joins_sweeps_in_order() {
        let mut ps = Section::new(SectionKind::Pt);
        let first = uni("a b c", "a", &[(300.0, 1.0), (500.0, 3.0)]);
        ps.store_uni_result(first, RecalcPolicy::Replace).unwrap();
        let second = uni("a b c", "a", &[(400.0, 2.0), (500.0, 3.0), (600.0, 4.0)]);
        let outcome = ps.store_uni_result(second, RecalcPolicy::Merge).unwrap();
        assert_eq!(outcome, StoreOutcome::Recalculated(UniId::FIRST));
        let xs: Vec<Real> = ps.uniline(UniId::FIRST).unwrap().raw().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![300.0, 400.0, 500.0, 600.0]);
        assert_eq!(ps.uniline(UniId::FIRST).unwrap().results.len(), 4);
    }

    #[test]
    fn replacing_point_retrims_its_lines() {
        let mut ps = Section::new(SectionKind::Pt);
        ps.add_inv(InvId::FIRST, inv("a b c d", "b d", 350.0, 1.5));
        let line = uni("a b c d", "d", &[(300.0, 1.0), (400.0, 2.0), (500.0, 3.0)])
            .between(Some(InvId::FIRST), None);
        ps.add_uni(UniId::FIRST, line).unwrap();
        assert_eq!(ps.uniline(UniId::FIRST).unwrap().trimmed()[0], Point2::new(350.0, 1.5));

        let moved = inv("a b c d", "b d", 450.0, 2.5);
        let outcome = ps.store_inv_result(moved, RecalcPolicy::Replace).unwrap();
        assert_eq!(outcome, StoreOutcome::Recalculated(InvId::FIRST));
        let trimmed = ps.uniline(UniId::FIRST).unwrap().trimmed().to_vec();
        assert_eq!(trimmed, vec![Point2::new(450.0, 2.5), Point2::new(500.0, 3.0)]);
    }

    #[test]
    fn window_removal_drops_samples_and_results() {
        let mut ps = Section::new(SectionKind::Pt);
        let line = uni("a b c", "a", &[(300.0, 1.0), (400.0, 2.0), (500.0, 3.0), (600.0, 4.0)]);
        ps.add_uni(UniId::FIRST, line).unwrap();
        let removed = ps
            .remove_samples_in_window(UniId::FIRST, Window::new((350.0, 450.0), (0.0, 20.0)))
            .unwrap();
        assert_eq!(removed, 1);
        let line = ps.uniline(UniId::FIRST).unwrap();
        assert_eq!(line.raw().len(), 3);
        assert_eq!(line.results.len(), 3);
        assert_eq!(line.trimmed().len(), 3);
    }

    #[test]
    fn zero_mode_lines_include_polymorphs() {
        let mut ps = Section::new(SectionKind::Pt);
        ps.add_uni(UniId::FIRST, uni("ky and mu", "ky", &[(300.0, 1.0), (400.0, 2.0)]))
            .unwrap();
        ps.add_uni(UniId::new(2).unwrap(), uni("g mu", "g", &[(300.0, 1.0), (400.0, 2.0)]))
            .unwrap();
        assert_eq!(ps.lines_with_zero_mode("and"), vec![UniId::FIRST]);
        assert_eq!(ps.lines_with_zero_mode("g"), vec![UniId::new(2).unwrap()]);
    }

    #[test]
    fn bulk_composition_from_output() {
        let mut ps = Section::new(SectionKind::Pt);
        let mut manual = inv("a b c", "a b", 1.0, 1.0);
        manual.manual = true;
        ps.add_inv(InvId::FIRST, manual);
        let computed = inv("a b c d", "a b", 1.0, 1.0)
            .with_output("header\ncomposition (from script)\n  SiO2 Al2O3\n  64.5 13.2\nrest");
        ps.add_inv(InvId::new(2).unwrap(), computed);
        let bc = ps.bulk_composition().unwrap();
        assert_eq!(bc[0], vec!["SiO2", "Al2O3"]);
        assert_eq!(bc[1], vec!["64.5", "13.2"]);
    }

    #[test]
    fn non_finite_results_are_not_stored() {
        let mut ps = Section::new(SectionKind::Pt);
        let bad = uni("a b c", "a", &[(400.0, 2.0), (Real::NAN, 3.0)]);
        let err = ps.store_uni_result(bad, RecalcPolicy::Replace).unwrap_err();
        assert!(matches!(err, TopologyError::Core(_)));
        assert_eq!(ps.unilines().count(), 0);

        let err = ps
            .store_inv_result(inv("a b c d", "a b", Real::INFINITY, 3.0), RecalcPolicy::Replace)
            .unwrap_err();
        assert!(err.to_string().contains("Non-finite coordinate for invariant point"));
        assert_eq!(ps.invpoints().count(), 0);
    }

    #[test]
    fn display_summarises_counts() {
        let ps = Section::new(SectionKind::Tx);
        let text = ps.to_string();
        assert!(text.starts_with("TXsection"));
        assert!(text.contains("C range: 0 1"));
    }
}
