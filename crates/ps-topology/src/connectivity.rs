//! Which invariant points a univariant line may terminate at, and which
//! lines emanate from a point.

use ps_core::{PhaseSet, PolymorphTable};

use crate::entity::{InvariantPoint, UnivariantLine};

/// Plain containment rule for one spelling of both zero-mode sets.
fn terminates(uphases: &PhaseSet, uout: &PhaseSet, iphases: &PhaseSet, iout: &PhaseSet) -> bool {
    let mut it = iout.iter();
    let (Some(a), Some(b), None) = (it.next(), it.next(), it.next()) else {
        return false;
    };
    if iphases == uphases && iout.difference(uout).len() == 1 {
        return true;
    }
    let aphases = iphases.without(a);
    let bphases = iphases.without(b);
    (&bphases == uphases && uout.single() == Some(a))
        || (&aphases == uphases && uout.single() == Some(b))
}

impl UnivariantLine {
    /// Whether this line may end at `inv`.
    ///
    /// Polymorph groups inside the point's assemblage are tried on the
    /// point's zero-mode pair, and groups inside the line's assemblage on the
    /// line's zero-mode phase, each side independently.
    pub fn contains_inv(&self, inv: &InvariantPoint, polymorphs: &PolymorphTable) -> bool {
        if terminates(&self.phases, &self.out, &inv.phases, &inv.out) {
            return true;
        }
        for group in polymorphs.contained_in(&inv.phases) {
            if group != &inv.out && !group.is_disjoint(&inv.out) {
                let switched = PolymorphTable::switch(&inv.out, group);
                if terminates(&self.phases, &self.out, &inv.phases, &switched) {
                    return true;
                }
            }
        }
        for group in polymorphs.contained_in(&self.phases) {
            if !group.is_disjoint(&self.out) {
                let switched = group.difference(&self.out);
                if switched.len() == 1
                    && terminates(&self.phases, &switched, &inv.phases, &inv.out)
                {
                    return true;
                }
            }
        }
        false
    }
}

impl InvariantPoint {
    /// The four `(phases, out)` univariant lines that can leave this point.
    ///
    /// When a polymorph group sits in the assemblage and straddles the
    /// zero-mode pair, the point lies on the polymorph boundary and the
    /// candidates are built from the group instead of single-phase removal.
    pub fn all_unilines(&self, polymorphs: &PolymorphTable) -> Vec<(PhaseSet, PhaseSet)> {
        let mut it = self.out.iter();
        let (Some(a), Some(b)) = (it.next(), it.next()) else {
            return Vec::new();
        };
        let aset = PhaseSet::from([a]);
        let bset = PhaseSet::from([b]);

        let boundary = polymorphs
            .contained_in(&self.phases)
            .find(|g| *g != &self.out && !g.is_disjoint(&self.out));
        if let Some(group) = boundary {
            let yespoly = group.intersection(&self.out);
            let nopoly = self.out.difference(&yespoly);
            if yespoly.len() == 1 && nopoly.len() == 1 {
                return vec![
                    (self.phases.difference(&yespoly), nopoly.clone()),
                    (
                        self.phases.difference(&group.difference(&self.out)),
                        nopoly.clone(),
                    ),
                    (self.phases.clone(), yespoly.clone()),
                    (self.phases.difference(&nopoly), yespoly),
                ];
            }
        }
        vec![
            (self.phases.clone(), aset.clone()),
            (self.phases.clone(), bset.clone()),
            (self.phases.without(b), aset),
            (self.phases.without(a), bset),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(phases: &str, out: &str) -> InvariantPoint {
        InvariantPoint::new(PhaseSet::parse(phases), PhaseSet::parse(out)).unwrap()
    }

    fn uni(phases: &str, out: &str) -> UnivariantLine {
        UnivariantLine::new(PhaseSet::parse(phases), PhaseSet::parse(out)).unwrap()
    }

    #[test]
    fn line_in_same_assemblage_terminates() {
        let table = PolymorphTable::default();
        let p = inv("a b c d", "b d");
        assert!(uni("a b c d", "d").contains_inv(&p, &table));
        assert!(uni("a b c d", "b").contains_inv(&p, &table));
        assert!(!uni("a b c d", "a").contains_inv(&p, &table));
    }

    #[test]
    fn line_with_other_phase_removed_terminates() {
        let table = PolymorphTable::default();
        let p = inv("a b c d", "b d");
        // b absent as a stable phase, d vanishing along the line
        assert!(uni("a c d", "d").contains_inv(&p, &table));
        assert!(uni("a b c", "b").contains_inv(&p, &table));
        assert!(!uni("a c d", "c").contains_inv(&p, &table));
    }

    #[test]
    fn polymorph_switched_point_terminates() {
        let table = PolymorphTable::default();
        // point stored with the sill spelling, line computed with and
        let p = inv("sill and q mu bi", "sill q");
        let line = uni("sill mu bi q", "q");
        assert!(line.contains_inv(&p, &table));
        assert!(!line.contains_inv(&p, &PolymorphTable::empty()));
    }

    #[test]
    fn emanating_lines_of_plain_point() {
        let p = inv("a b c d", "b d");
        let lines = p.all_unilines(&PolymorphTable::default());
        assert_eq!(lines.len(), 4);
        for (phases, out) in &lines {
            let line = UnivariantLine::new(phases.clone(), out.clone()).unwrap();
            assert!(line.contains_inv(&p, &PolymorphTable::default()));
        }
        assert!(lines.contains(&(PhaseSet::parse("a c d"), PhaseSet::parse("d"))));
    }

    #[test]
    fn emanating_lines_on_polymorph_boundary() {
        let p = inv("sill and mu q", "and q");
        let lines = p.all_unilines(&PolymorphTable::default());
        assert_eq!(
            lines,
            vec![
                (PhaseSet::parse("sill mu q"), PhaseSet::parse("q")),
                (PhaseSet::parse("and mu q"), PhaseSet::parse("q")),
                (PhaseSet::parse("sill and mu q"), PhaseSet::parse("and")),
                (PhaseSet::parse("sill and mu"), PhaseSet::parse("and")),
            ]
        );
    }
}
