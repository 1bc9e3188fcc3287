//! Gridded calculations over a finished section: stable assemblages on a
//! regular grid, derived quantities per field, isopleths and paths.

pub mod data;
pub mod error;
pub mod explorer;
pub mod expr;
pub mod grid;
pub mod isopleth;
pub mod path;
pub mod rbf;

pub use data::{FieldData, Sources};
pub use error::{GridError, GridResult};
pub use explorer::{Explorer, MergedData, base_phase};
pub use expr::{Expr, eval_expr};
pub use grid::{CellStatus, GridCell, GridData};
pub use isopleth::{FieldSurface, IsoplethOptions, IsoplethSet, contour_levels};
pub use path::{PathData, sample_path};
pub use rbf::Rbf;
