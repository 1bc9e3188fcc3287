//! Project validation logic.

use ps_topology::{TopologyError, validate_section};

use crate::schema::Project;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Inconsistent section: {0}")]
    Topology(#[from] TopologyError),
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    if !project.out.is_subset(&project.selected) {
        return Err(ValidationError::InvalidValue {
            field: "out".to_string(),
            value: project.out.to_string(),
            reason: "zero mode phases must be selected".to_string(),
        });
    }

    if let Err(err) = project.session.validate() {
        return Err(ValidationError::InvalidValue {
            field: "session".to_string(),
            value: project.session.workdir.display().to_string(),
            reason: err.to_string(),
        });
    }

    if let Some(saved) = &project.saved
        && let Err(err) = chrono::DateTime::parse_from_rfc3339(saved)
    {
        return Err(ValidationError::InvalidValue {
            field: "saved".to_string(),
            value: saved.clone(),
            reason: err.to_string(),
        });
    }

    if let Some(grid) = &project.grid {
        let window = project.section.window();
        let extent = grid.extent();
        let tol = 1e-9 * (window.width() + window.height());
        let inside = extent.xmin >= window.xmin - tol
            && extent.xmax <= window.xmax + tol
            && extent.ymin >= window.ymin - tol
            && extent.ymax <= window.ymax + tol;
        if !inside {
            return Err(ValidationError::InvalidValue {
                field: "grid".to_string(),
                value: grid.to_string(),
                reason: "grid extends beyond the section window".to_string(),
            });
        }
    }

    validate_section(&project.section)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_core::PhaseSet;
    use ps_topology::SectionKind;

    fn project() -> Project {
        let mut project = Project::new("test", SectionKind::Pt, "/tmp/ps");
        project.selected = PhaseSet::parse("g bi mu q");
        project.out = PhaseSet::parse("g");
        project
    }

    #[test]
    fn accepts_consistent_project() {
        assert!(validate_project(&project()).is_ok());
    }

    #[test]
    fn rejects_unselected_out_phase() {
        let mut p = project();
        p.out.insert("st");
        let err = validate_project(&p).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "out"));
    }

    #[test]
    fn rejects_future_version() {
        let mut p = project();
        p.version = crate::migrate::LATEST_VERSION + 1;
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn rejects_garbled_timestamp() {
        let mut p = project();
        p.saved = Some("yesterday".to_string());
        assert!(validate_project(&p).is_err());
        p.saved = Some("2024-03-01T10:00:00+00:00".to_string());
        assert!(validate_project(&p).is_ok());
    }
}
