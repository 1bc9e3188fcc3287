//! Phase-set algebra and polymorph equivalence.
//!
//! The solver treats polymorphs (e.g. `sill`/`and`/`ky`) as distinct phase
//! labels, so two curves computed by removing either member of a polymorph
//! pair can describe the same boundary. [`PolymorphTable`] holds the groups
//! and answers "is this the same zero-mode set" questions for identity lookup
//! and connectivity.

use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unordered set of phase names without duplicates.
///
/// Backed by a `BTreeSet`, so iteration and `Display` are sorted and the set
/// can key ordered maps (divariant-field assemblages).
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct PhaseSet(BTreeSet<String>);

impl PhaseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse whitespace separated phase names, e.g. `"g bi q H2O"`.
    pub fn parse(text: &str) -> Self {
        text.split_whitespace().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, phase: &str) -> bool {
        self.0.contains(phase)
    }

    pub fn insert(&mut self, phase: impl Into<String>) -> bool {
        self.0.insert(phase.into())
    }

    pub fn remove(&mut self, phase: &str) -> bool {
        self.0.remove(phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn is_subset(&self, other: &PhaseSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &PhaseSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn union(&self, other: &PhaseSet) -> PhaseSet {
        PhaseSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn difference(&self, other: &PhaseSet) -> PhaseSet {
        PhaseSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn intersection(&self, other: &PhaseSet) -> PhaseSet {
        PhaseSet(self.0.intersection(&other.0).cloned().collect())
    }

    /// Elements in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &PhaseSet) -> PhaseSet {
        PhaseSet(self.0.symmetric_difference(&other.0).cloned().collect())
    }

    /// Copy of the set with `phase` removed.
    pub fn without(&self, phase: &str) -> PhaseSet {
        let mut set = self.clone();
        set.0.remove(phase);
        set
    }

    /// Copy of the set with `phase` added.
    pub fn with(&self, phase: &str) -> PhaseSet {
        let mut set = self.clone();
        set.0.insert(phase.to_string());
        set
    }

    /// The only member of a one-element set.
    pub fn single(&self) -> Option<&str> {
        if self.0.len() == 1 {
            self.0.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Space separated, sorted names.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for PhaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl fmt::Debug for PhaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl FromIterator<String> for PhaseSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        PhaseSet(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for PhaseSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        PhaseSet(iter.into_iter().map(str::to_string).collect())
    }
}

impl<'a, const N: usize> From<[&'a str; N]> for PhaseSet {
    fn from(names: [&'a str; N]) -> Self {
        names.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a PhaseSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Groups of mutually exclusive crystalline forms of one substance.
///
/// Kept as data rather than control flow so new groups can be added without
/// touching the identity and connectivity rules that consult it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolymorphTable {
    groups: Vec<PhaseSet>,
}

impl Default for PolymorphTable {
    fn default() -> Self {
        Self::new([
            PhaseSet::from(["sill", "and"]),
            PhaseSet::from(["ky", "and"]),
            PhaseSet::from(["sill", "ky"]),
            PhaseSet::from(["q", "coe"]),
            PhaseSet::from(["diam", "gph"]),
        ])
    }
}

impl PolymorphTable {
    pub fn new(groups: impl IntoIterator<Item = PhaseSet>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
        }
    }

    /// Table without any polymorph groups: plain set equality everywhere.
    pub fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn groups(&self) -> &[PhaseSet] {
        &self.groups
    }

    pub fn push(&mut self, group: PhaseSet) {
        self.groups.push(group);
    }

    /// Groups fully present in an assemblage, in table order.
    pub fn contained_in<'a>(
        &'a self,
        phases: &'a PhaseSet,
    ) -> impl Iterator<Item = &'a PhaseSet> + 'a {
        self.groups.iter().filter(move |g| g.is_subset(phases))
    }

    /// `out` switched through `group`: members of the group present in `out`
    /// are dropped and the absent ones added.
    pub fn switch(out: &PhaseSet, group: &PhaseSet) -> PhaseSet {
        out.symmetric_difference(group)
    }

    /// `out` followed by every valid polymorph-switched spelling of it.
    ///
    /// A switched set is valid when the group sits inside `phases`, differs
    /// from `out`, and the result keeps the cardinality of `out`.
    pub fn out_variants(&self, phases: &PhaseSet, out: &PhaseSet) -> Vec<PhaseSet> {
        let mut variants = vec![out.clone()];
        for group in self.contained_in(phases) {
            if group == out {
                continue;
            }
            let switched = Self::switch(out, group);
            if switched.len() == out.len() && !variants.contains(&switched) {
                variants.push(switched);
            }
        }
        variants
    }

    /// Polymorph-aware identity of two `(phases, out)` pairs.
    ///
    /// Symmetric; the assemblages must match exactly and the zero-mode sets
    /// either match or are one group switch apart.
    pub fn equivalent_out(
        &self,
        phases_a: &PhaseSet,
        out_a: &PhaseSet,
        phases_b: &PhaseSet,
        out_b: &PhaseSet,
    ) -> bool {
        if phases_a != phases_b {
            return false;
        }
        if out_a == out_b {
            return true;
        }
        self.out_variants(phases_a, out_a).contains(out_b)
            || self.out_variants(phases_b, out_b).contains(out_a)
    }

    /// Whether `phase` vanishes along a curve with zero-mode set `out`,
    /// directly or through a polymorph of it.
    pub fn zero_mode_of(&self, phases: &PhaseSet, out: &PhaseSet, phase: &str) -> bool {
        if out.contains(phase) {
            return true;
        }
        self.contained_in(phases)
            .any(|g| g.contains(phase) && g.without(phase).is_subset(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_algebra() {
        let a = PhaseSet::parse("g bi q");
        let b = PhaseSet::from(["q", "mu"]);
        assert_eq!(a.union(&b), PhaseSet::parse("bi g mu q"));
        assert_eq!(a.difference(&b), PhaseSet::parse("g bi"));
        assert_eq!(a.symmetric_difference(&b), PhaseSet::parse("g bi mu"));
        assert_eq!(a.to_string(), "bi g q");
        assert_eq!(PhaseSet::from(["q"]).single(), Some("q"));
        assert_eq!(a.single(), None);
    }

    #[test]
    fn switched_out_of_invariant_point() {
        let table = PolymorphTable::default();
        let phases = PhaseSet::parse("sill and q mu bi");
        let out = PhaseSet::from(["and", "q"]);
        let variants = table.out_variants(&phases, &out);
        assert_eq!(variants[0], out);
        assert!(variants.contains(&PhaseSet::from(["sill", "q"])));
    }

    #[test]
    fn group_equal_to_out_is_not_switched() {
        let table = PolymorphTable::default();
        let phases = PhaseSet::parse("sill and q");
        let out = PhaseSet::from(["sill", "and"]);
        assert_eq!(table.out_variants(&phases, &out), vec![out]);
    }

    #[test]
    fn equivalence_requires_same_assemblage() {
        let table = PolymorphTable::default();
        let p1 = PhaseSet::parse("sill and q");
        let p2 = PhaseSet::parse("sill and q mu");
        let o1 = PhaseSet::from(["sill"]);
        let o2 = PhaseSet::from(["and"]);
        assert!(table.equivalent_out(&p1, &o1, &p1, &o2));
        assert!(!table.equivalent_out(&p1, &o1, &p2, &o2));
        assert!(!PolymorphTable::empty().equivalent_out(&p1, &o1, &p1, &o2));
    }

    #[test]
    fn zero_mode_through_polymorph() {
        let table = PolymorphTable::default();
        let phases = PhaseSet::parse("ky and mu q");
        assert!(table.zero_mode_of(&phases, &PhaseSet::from(["ky"]), "ky"));
        assert!(table.zero_mode_of(&phases, &PhaseSet::from(["ky"]), "and"));
        assert!(!table.zero_mode_of(&phases, &PhaseSet::from(["mu"]), "and"));
    }
}
