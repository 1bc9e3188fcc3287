//! ps-topology: invariant points, univariant lines and the section store.
//!
//! Provides:
//! - Entity records (InvariantPoint, UnivariantLine, Dogmin)
//! - The line-terminates-at-point test and emanating-line enumeration
//! - `Section`: identity lookup, trimming, connection and recalculation
//! - Structural validation and a petgraph view of the topology
//!
//! # Example
//!
//! ```
//! use ps_core::PhaseSet;
//! use ps_topology::{InvariantPoint, Section, SectionKind, UnivariantLine};
//!
//! let mut section = Section::new(SectionKind::Pt);
//! let mut inv = InvariantPoint::new(PhaseSet::parse("a b c d"), PhaseSet::parse("b d"))
//!     .unwrap()
//!     .at(500.0, 8.0);
//! let found = section.lookup_inv(Some(&mut inv));
//! assert!(found.is_new);
//! section.add_inv(found.id, inv);
//!
//! let line = UnivariantLine::new(PhaseSet::parse("a b c d"), PhaseSet::parse("d")).unwrap();
//! assert!(line.contains_inv(section.invpoint(found.id).unwrap(), section.polymorphs()));
//! ```

pub mod connectivity;
pub mod entity;
pub mod error;
pub mod graph;
pub mod section;
mod trim;
pub mod validate;

pub use entity::{Dogmin, InvariantPoint, ResultBlock, SolverData, UnivariantLine};
pub use error::{TopologyError, TopologyResult};
pub use graph::{TopologyEdge, TopologyGraph};
pub use section::{IdLookup, RecalcPolicy, Section, SectionKind, StoreOutcome};
pub use validate::{inconsistent_connections, validate_section};
