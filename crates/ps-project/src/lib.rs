//! ps-project: persisted project file format and validation.

use std::path::Path;

use tracing::info;

pub mod migrate;
pub mod schema;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::Project;
pub use validate::{ValidationError, validate_project};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Common tail of loading: migrate, follow a moved project folder, retrim
/// and validate.
fn finish_load(path: &Path, project: Project) -> ProjectResult<Project> {
    let mut project = migrate_to_latest(project)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty())
        && dir != project.session.workdir
    {
        info!(from = %project.session.workdir.display(), to = %dir.display(), "project folder moved");
        project.session.workdir = dir.to_path_buf();
    }
    project.section.trim_all();
    validate_project(&project)?;
    Ok(project)
}

fn stamp(project: &Project) -> Project {
    let mut stamped = project.clone();
    stamped.saved = Some(chrono::Utc::now().to_rfc3339());
    stamped
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    let content = std::fs::read_to_string(path)?;
    let project: Project = serde_yaml::from_str(&content)?;
    finish_load(path, project)
}

/// Write the project with a fresh save timestamp, which is returned.
pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<String> {
    validate_project(project)?;
    let stamped = stamp(project);
    let content = serde_yaml::to_string(&stamped)?;
    std::fs::write(path, content)?;
    Ok(stamped.saved.unwrap_or_default())
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    let content = std::fs::read_to_string(path)?;
    let project: Project = serde_json::from_str(&content)?;
    finish_load(path, project)
}

/// Write the project with a fresh save timestamp, which is returned.
pub fn save_json(path: &Path, project: &Project) -> ProjectResult<String> {
    validate_project(project)?;
    let stamped = stamp(project);
    let content = serde_json::to_string_pretty(&stamped)?;
    std::fs::write(path, content)?;
    Ok(stamped.saved.unwrap_or_default())
}

/// Load by file extension: `.yaml`/`.yml` or JSON otherwise.
pub fn load(path: &Path) -> ProjectResult<Project> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => load_yaml(path),
        _ => load_json(path),
    }
}

pub fn save(path: &Path, project: &Project) -> ProjectResult<String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => save_yaml(path, project),
        _ => save_json(path, project),
    }
}
