//! Adapters connecting the spatial join to files and HTTP services.
//!
//! Responsibilities:
//! - Load boundary polygons from GeoJSON files, strings or URLs
//!   ([`GeoJsonBoundarySource`]).
//! - Stream point records from local JSON files ([`JsonRecordSource`]) or
//!   offset/limit paginated APIs ([`HttpRecordSource`]).
//! - Persist result sets as JSON-lines files ([`JsonLinesSink`]).
//!
//! Boundaries:
//! - Implements the collaborator traits from `boundary-join-core`; the join
//!   itself never performs I/O.
//! - HTTP access blocks on an owned Tokio runtime so callers stay synchronous.
//!
//! Invariants:
//! - A malformed boundary feature never fails the whole document; it is
//!   handed to the geometry store, which records why it was skipped.
//! - Pagination stops at the first empty page.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

mod boundaries;
pub mod fs;
mod http;
mod records;
mod sink;

#[doc(hidden)]
pub mod test_support;

pub use boundaries::{BoundaryLoadError, GeoJsonBoundarySource, parse_features};
pub use http::{
    DEFAULT_PAGE_SIZE, DEFAULT_USER_AGENT, FetchError, HttpBuildError, HttpSourceConfig,
};
pub use records::{
    HttpPageFetcher, HttpRecordSource, JsonRecordSource, PageFetcher, PagedRecordSource,
    RecordFormat, RecordLoadError, parse_records,
};
pub use sink::{JOIN_ERROR_ATTRIBUTE, JsonLinesSink, SinkError, file_stem};
