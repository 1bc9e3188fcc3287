//! ps-core: shared foundation for the pseudosection builder.
//!
//! Contains:
//! - numeric (the Real alias and small float helpers)
//! - ids (typed, non-zero ids for invariant points, univariant lines, dogmins)
//! - phases (phase-set algebra and the polymorph equivalence table)
//! - geometry (2-D points, windows, polyline projection and intersection)
//! - error (coordinate errors)

pub mod error;
pub mod geometry;
pub mod ids;
pub mod numeric;
pub mod phases;

pub use error::{PsError, PsResult};
pub use geometry::{Point2, Side, Window};
pub use ids::*;
pub use numeric::*;
pub use phases::{PhaseSet, PolymorphTable};
