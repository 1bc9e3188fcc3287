//! Grouping of lines by the fields they border.

use std::collections::BTreeMap;

use ps_core::{PhaseSet, UniId};
use ps_topology::Section;

fn register(faces: &mut BTreeMap<PhaseSet, Vec<UniId>>, key: PhaseSet, id: UniId) {
    let ids = faces.entry(key).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// Candidate boundary lines of every field key.
///
/// A line goes under its full assemblage, under the assemblage without its
/// zero-mode phase and, for each polymorph group inside the assemblage, under
/// the assemblage without the group's other members.
pub fn face_table(section: &Section) -> BTreeMap<PhaseSet, Vec<UniId>> {
    let mut faces = BTreeMap::new();
    for (id, uni) in section.unilines() {
        register(&mut faces, uni.phases.clone(), id);
        register(&mut faces, uni.phases.difference(&uni.out), id);
        for group in section.polymorphs().contained_in(&uni.phases) {
            let key = uni.phases.difference(&group.difference(&uni.out));
            register(&mut faces, key, id);
        }
    }
    faces
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_core::Point2;
    use ps_topology::{SectionKind, UnivariantLine};

    #[test]
    fn line_borders_both_sides() {
        let mut ps = Section::new(SectionKind::Pt);
        let line = UnivariantLine::new(PhaseSet::parse("g bi q"), PhaseSet::parse("g"))
            .unwrap()
            .with_samples(vec![Point2::new(500.0, 4.0), Point2::new(600.0, 5.0)], Vec::new());
        ps.add_uni(UniId::FIRST, line).unwrap();
        let faces = face_table(&ps);
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[&PhaseSet::parse("g bi q")], vec![UniId::FIRST]);
        assert_eq!(faces[&PhaseSet::parse("bi q")], vec![UniId::FIRST]);
    }

    #[test]
    fn polymorph_key_is_registered() {
        let mut ps = Section::new(SectionKind::Pt);
        let line = UnivariantLine::new(PhaseSet::parse("sill and mu"), PhaseSet::parse("mu"))
            .unwrap()
            .with_samples(vec![Point2::new(500.0, 4.0), Point2::new(600.0, 5.0)], Vec::new());
        ps.add_uni(UniId::FIRST, line).unwrap();
        let faces = face_table(&ps);
        // group {sill, and} without the zero-mode phase leaves both spellings
        assert!(faces.contains_key(&PhaseSet::parse("mu")));
        assert!(faces.contains_key(&PhaseSet::parse("sill and")));
    }
}
