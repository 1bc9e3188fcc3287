//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Project;

pub const LATEST_VERSION: u32 = 2;

pub fn migrate_to_latest(mut project: Project) -> Result<Project, ProjectError> {
    while project.version < LATEST_VERSION {
        project = migrate_one_version(project)?;
    }
    Ok(project)
}

fn migrate_one_version(project: Project) -> Result<Project, ProjectError> {
    match project.version {
        0 => migrate_v0_to_v1(project),
        1 => migrate_v1_to_v2(project),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 stored lines without their trimmed curves.
fn migrate_v0_to_v1(mut project: Project) -> Result<Project, ProjectError> {
    project.section.trim_all();
    project.version = 1;
    Ok(project)
}

/// Version 1 kept excess phases among the selected phases and allowed
/// unselected zero-mode phases.
fn migrate_v1_to_v2(mut project: Project) -> Result<Project, ProjectError> {
    let excess = project.section.excess.clone();
    project.selected = project.selected.difference(&excess);
    project.out = project.out.intersection(&project.selected);
    project.version = 2;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_core::PhaseSet;
    use ps_topology::{Section, SectionKind};

    #[test]
    fn migrate_latest_is_noop() {
        let project = Project::new("test", SectionKind::Pt, "/tmp/ps");
        let migrated = migrate_to_latest(project.clone()).unwrap();
        assert_eq!(migrated, project);
    }

    #[test]
    fn migrate_v1_drops_excess_from_selection() {
        let mut project = Project::new("old", SectionKind::Pt, "/tmp/ps");
        project.version = 1;
        project.section = Section::new(SectionKind::Pt).with_excess(PhaseSet::parse("q H2O"));
        project.selected = PhaseSet::parse("g bi mu q H2O");
        project.out = PhaseSet::parse("g q");

        let migrated = migrate_to_latest(project).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
        assert_eq!(migrated.selected, PhaseSet::parse("g bi mu"));
        assert_eq!(migrated.out, PhaseSet::parse("g"));
    }
}
