//! Shared application service layer for the pseudosection builder.
//!
//! Gives command-line and graphical front ends one interface to project
//! management, the builder workflows and gridded postprocessing.

pub mod builder;
pub mod error;
pub mod options;
pub mod project_service;

// Re-export key types for convenience
pub use builder::{AutoLine, Builder, CalcStatus, Calculated, ExploreCandidate};
pub use error::{AppError, AppResult};
pub use options::CalcOptions;
pub use project_service::{
    AreaSummary, ProjectSummary, TopologyRow, calculate_grid, connection_warnings, explorer,
    list_areas, list_topology, load_project, save_project, summarize, trim_project,
    validate_project,
};
