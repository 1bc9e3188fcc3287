//! Project loading, saving, validation and introspection.

use std::path::Path;

use ps_areas::AreaReconstruction;
use ps_core::{PhaseSet, Real, UniId, Window};
use ps_grid::Explorer;
use ps_project::Project;
use ps_solver::{Solver, SolverSession};
use ps_topology::{SectionKind, inconsistent_connections};
use ps_topology::section::endpoint_tag;
use tracing::info;

use crate::error::{AppError, AppResult};

/// Load a project, JSON or YAML by extension.
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }
    Ok(ps_project::load(path)?)
}

/// Save a project, JSON or YAML by extension. Returns the save timestamp.
pub fn save_project(path: &Path, project: &mut Project) -> AppResult<String> {
    project.refresh_bulk();
    let saved = ps_project::save(path, project)?;
    project.saved = Some(saved.clone());
    Ok(saved)
}

pub fn validate_project(project: &Project) -> AppResult<()> {
    ps_project::validate_project(project).map_err(|e| AppError::Validation(e.to_string()))
}

/// Lines bound to a point they cannot terminate at. These pass structural
/// validation but usually mean a connection was made by hand to the wrong
/// point.
pub fn connection_warnings(project: &Project) -> Vec<String> {
    let section = &project.section;
    inconsistent_connections(section)
        .into_iter()
        .map(|(uni, inv)| {
            let line = section.uniline(uni).map(|u| u.label(&section.excess));
            let point = section.invpoint(inv).map(|i| i.label(&section.excess));
            format!(
                "Univariant line {uni} ({}) cannot end at invariant point {inv} ({})",
                line.unwrap_or_default(),
                point.unwrap_or_default()
            )
        })
        .collect()
}

/// Summary of a project for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub name: String,
    pub kind: SectionKind,
    pub window: Window,
    pub excess: PhaseSet,
    pub inv_count: usize,
    pub uni_count: usize,
    pub dogmin_count: usize,
    pub saved: Option<String>,
    pub gridded: bool,
}

pub fn summarize(project: &Project) -> ProjectSummary {
    let section = &project.section;
    ProjectSummary {
        name: project.name.clone(),
        kind: section.kind(),
        window: section.window(),
        excess: section.excess.clone(),
        inv_count: section.inv_count(),
        uni_count: section.uni_count(),
        dogmin_count: section.dogmin_count(),
        saved: project.saved.clone(),
        gridded: project.grid.is_some(),
    }
}

/// One reconstructed field.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaSummary {
    pub key: PhaseSet,
    pub edges: Vec<UniId>,
    pub area: Real,
}

/// Fields of the project with the reconstruction log.
pub fn list_areas(project: &Project) -> (Vec<AreaSummary>, Vec<String>) {
    let report = project.section.create_shapes();
    let areas = report
        .edges
        .iter()
        .map(|(key, edges)| AreaSummary {
            key: key.clone(),
            edges: edges.clone(),
            area: report.area(key).unwrap_or(0.0),
        })
        .collect();
    (areas, report.log)
}

/// One line of a topology listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyRow {
    pub id: UniId,
    pub label: String,
    pub ends: String,
    pub manual: bool,
    pub samples: usize,
}

pub fn list_topology(project: &Project) -> Vec<TopologyRow> {
    let section = &project.section;
    section
        .unilines()
        .map(|(id, uni)| TopologyRow {
            id,
            label: uni.label(&section.excess),
            ends: endpoint_tag(uni),
            manual: uni.manual,
            samples: uni.used().len(),
        })
        .collect()
}

/// Retrim every line. Returns how many lines are bound at both ends.
pub fn trim_project(project: &mut Project) -> usize {
    project.section.trim_all();
    let bound = project
        .section
        .unilines()
        .filter(|(_, uni)| uni.connected() == 2)
        .count();
    info!(lines = project.section.uni_count(), bound, "section retrimmed");
    bound
}

/// Solve the stable assemblages of every field on an `nx x ny` grid and
/// keep the grid with the project.
pub fn calculate_grid<S: Solver>(
    project: &mut Project,
    solver: &mut S,
    nx: usize,
    ny: usize,
) -> AppResult<Explorer> {
    let mut session: SolverSession = project.session.clone();
    let mut explorer = Explorer::new(project.section.clone());
    explorer.calculate_composition(solver, &mut session, nx, ny)?;
    project.grid = explorer.grid().cloned();
    info!("{}", explorer);
    Ok(explorer)
}

/// Explorer over the project, with its stored grid when there is one.
pub fn explorer(project: &Project) -> Explorer {
    let explorer = Explorer::new(project.section.clone());
    match &project.grid {
        Some(grid) => explorer.with_grid(grid.clone()),
        None => explorer,
    }
}
