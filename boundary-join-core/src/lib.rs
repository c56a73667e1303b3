//! Point-in-polygon spatial join for the boundary-join engine.
//!
//! Responsibilities:
//! - Normalise boundary features into addressable regions
//!   ([`GeometryStore`]).
//! - Index region bounding boxes for fast candidate lookup
//!   ([`BoundaryIndex`]).
//! - Assign each point record to at most one region
//!   ([`SpatialJoinEngine`]).
//! - Group outcomes into per-region, matched and unmatched sets
//!   ([`ResultPartitioner`], [`JoinResults`]).
//!
//! Boundaries:
//! - No I/O. Boundaries, records and result storage are reached through the
//!   [`BoundarySource`], [`PointSource`] and [`ResultSink`] traits; concrete
//!   adapters live in `boundary-join-data`.
//! - Planar containment on WGS84 coordinates with `x = longitude` and
//!   `y = latitude`; no reprojection.
//!
//! Invariants:
//! - Every input record appears in exactly one of the overall matched set and
//!   the unmatched set.
//! - When regions overlap, the region inserted first wins.
//! - Regions and the index are immutable once built.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

mod index;
mod join;
mod partition;
mod record;
mod region;
mod sink;
mod source;
mod store;

#[doc(hidden)]
pub mod test_support;

pub use index::BoundaryIndex;
pub use join::{
    DEFAULT_LATITUDE_FIELD, DEFAULT_LONGITUDE_FIELD, DEFAULT_REGION_ATTRIBUTE, JoinOptions,
    JoinOutcome, SpatialJoinEngine, UnmatchedReason,
};
pub use partition::{JoinResults, RegionMatches, ResultPartitioner, UnmatchedRecord};
pub use record::{Attributes, CoordinateError, PointRecord};
pub use region::{ContainmentError, Region, RegionId};
pub use sink::{ResultSetName, ResultSink};
pub use source::{BoundarySource, PointSource};
pub use store::{FeatureError, GeometryStore, RawFeature, SkippedFeature};
