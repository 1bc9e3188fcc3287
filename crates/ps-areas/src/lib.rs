//! ps-areas: divariant fields recovered from the lines and points of a
//! section.
//!
//! Every univariant line borders two fields: the full assemblage on one side
//! and the assemblage without its zero-mode phase on the other. Lines are
//! grouped by those keys, each group is searched for a closed boundary (or a
//! chain that leaves the section window), and the resulting rings become
//! polygons clipped to the window.
//!
//! Reconstruction never fails. Groups that cannot be closed are kept in the
//! report's diagnostics and skipped.

pub mod faces;
pub mod polygon;
pub mod report;
pub mod search;

pub use faces::face_table;
pub use report::{AreaReconstruction, AreaReport, construct_areas, create_shapes};
pub use search::{Boundaries, FieldBoundary};
