//! Facade crate for the boundary-join spatial join engine.
//!
//! This crate re-exports the core join types and exposes the file and HTTP
//! collaborators behind the `data` feature flag.

#![forbid(unsafe_code)]

pub use boundary_join_core::{
    Attributes, BoundaryIndex, BoundarySource, ContainmentError, CoordinateError, FeatureError,
    GeometryStore, JoinOptions, JoinOutcome, JoinResults, PointRecord, PointSource, RawFeature,
    Region, RegionId, RegionMatches, ResultPartitioner, ResultSetName, ResultSink,
    SkippedFeature, SpatialJoinEngine, UnmatchedReason, UnmatchedRecord,
};

#[cfg(feature = "data")]
pub use boundary_join_data::{
    BoundaryLoadError, FetchError, GeoJsonBoundarySource, HttpRecordSource, HttpSourceConfig,
    JsonLinesSink, JsonRecordSource, PagedRecordSource, RecordLoadError, SinkError,
};
