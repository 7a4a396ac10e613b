//! Reference data subsystem.
//!
//! Loads country polygons, optional subdivision polygons and the GeoNames
//! tables, reconciles country names to ISO codes, and answers hierarchical
//! country → subdivision → city queries.

pub mod admin;
pub mod boundary;
pub mod cache;
pub mod cities;
pub mod country_codes;
pub mod geometry;
pub mod names;
pub mod resolver;
pub mod source;
pub mod subdivision;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cache::ReferenceCache;
pub use names::{MatchSource, OverrideTable, ResolvedNameMap};
pub use resolver::{GeoResolver, LoadReport, ReferenceParts};
pub use types::{BBox, Dataset, GeoError, GeoFilter, Resolution, ResolveLevel, SelectionState, Warning};
