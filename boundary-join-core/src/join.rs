//! Point-in-polygon resolution producing one outcome per record.
//!
//! [`SpatialJoinEngine`] owns the frozen [`GeometryStore`] and the
//! [`BoundaryIndex`] built from it. For each record it shortlists candidates
//! through the index and then runs the exact containment test on them in
//! insertion order; the first region that covers the point wins.

use geo::Coord;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    BoundaryIndex, ContainmentError, CoordinateError, GeometryStore, JoinResults, PointRecord,
    PointSource, Region, RegionId, ResultPartitioner,
};

/// Default attribute holding a record's longitude.
pub const DEFAULT_LONGITUDE_FIELD: &str = "longitude";
/// Default attribute holding a record's latitude.
pub const DEFAULT_LATITUDE_FIELD: &str = "latitude";
/// Default attribute appended to matched records.
pub const DEFAULT_REGION_ATTRIBUTE: &str = "region";

/// Field names used while joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    /// Attribute holding the longitude (`x`).
    pub longitude_field: String,
    /// Attribute holding the latitude (`y`).
    pub latitude_field: String,
    /// Attribute set to the region identifier on matched records.
    pub region_attribute: String,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            longitude_field: DEFAULT_LONGITUDE_FIELD.to_owned(),
            latitude_field: DEFAULT_LATITUDE_FIELD.to_owned(),
            region_attribute: DEFAULT_REGION_ATTRIBUTE.to_owned(),
        }
    }
}

impl JoinOptions {
    /// Set the longitude attribute.
    #[must_use]
    pub fn with_longitude_field(mut self, field: impl Into<String>) -> Self {
        self.longitude_field = field.into();
        self
    }

    /// Set the latitude attribute.
    #[must_use]
    pub fn with_latitude_field(mut self, field: impl Into<String>) -> Self {
        self.latitude_field = field.into();
        self
    }

    /// Set the attribute that receives the assigned region identifier.
    #[must_use]
    pub fn with_region_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.region_attribute = attribute.into();
        self
    }
}

/// Why a record was not assigned to any region.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnmatchedReason {
    /// The record's coordinates are unusable.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(#[source] CoordinateError),
    /// The point lies outside every region.
    #[error("point lies outside all regions")]
    OutsideAllRegions,
}

impl UnmatchedReason {
    /// Short machine-readable code for sinks and diagnostics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCoordinates(error) => error.code(),
            Self::OutsideAllRegions => "outside_all_regions",
        }
    }
}

/// Result of joining a single record. Exactly one per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The record lies in the given region.
    Matched {
        /// Identifier of the assigned region.
        region: RegionId,
        /// Insertion position of the assigned region.
        position: usize,
    },
    /// The record could not be assigned.
    Unmatched(UnmatchedReason),
}

impl JoinOutcome {
    fn matched(region: &Region) -> Self {
        Self::Matched {
            region: region.id().clone(),
            position: region.position(),
        }
    }

    /// Identifier of the assigned region, if any.
    #[must_use]
    pub const fn region(&self) -> Option<&RegionId> {
        match self {
            Self::Matched { region, .. } => Some(region),
            Self::Unmatched(_) => None,
        }
    }

    /// Whether the record was assigned to a region.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Assigns records to the regions of a frozen [`GeometryStore`].
///
/// The engine is immutable once built and [`join`](Self::join) is a pure
/// function of the engine and one record, so a single engine may be shared
/// across threads.
///
/// # Examples
/// ```
/// use boundary_join_core::{GeometryStore, JoinOptions, JoinOutcome, SpatialJoinEngine};
/// use boundary_join_core::test_support::{record, square_feature};
///
/// let store = GeometryStore::from_features([square_feature("A", 0.0, 0.0, 10.0, 10.0)], "id");
/// let engine = SpatialJoinEngine::new(store, JoinOptions::default());
///
/// assert_eq!(engine.join(&record(5.0, 5.0)).region().map(|id| id.as_str()), Some("A"));
/// assert!(!engine.join(&record(20.0, 20.0)).is_matched());
/// ```
#[derive(Debug, Clone)]
pub struct SpatialJoinEngine {
    store: GeometryStore,
    index: BoundaryIndex,
    options: JoinOptions,
}

impl SpatialJoinEngine {
    /// Freeze `store` and build its bounding-box index.
    #[must_use]
    pub fn new(store: GeometryStore, options: JoinOptions) -> Self {
        let index = BoundaryIndex::build(&store);
        info!("Built boundary index over {} regions", index.len());
        Self {
            store,
            index,
            options,
        }
    }

    /// The regions being joined against.
    #[must_use]
    pub const fn store(&self) -> &GeometryStore {
        &self.store
    }

    /// The bounding-box index over [`store`](Self::store).
    #[must_use]
    pub const fn index(&self) -> &BoundaryIndex {
        &self.index
    }

    /// Field names in use.
    #[must_use]
    pub const fn options(&self) -> &JoinOptions {
        &self.options
    }

    /// Resolve the region containing `record`.
    #[must_use]
    pub fn join(&self, record: &PointRecord) -> JoinOutcome {
        match record.coordinate(&self.options.longitude_field, &self.options.latitude_field) {
            Ok(point) => self.resolve(point),
            Err(error) => {
                debug!("Record routed to unmatched set: {error}");
                JoinOutcome::Unmatched(UnmatchedReason::InvalidCoordinates(error))
            }
        }
    }

    /// Resolve the region containing an already validated point.
    ///
    /// A candidate whose containment test fails is logged and treated as not
    /// containing the point; the remaining candidates are still tested.
    #[must_use]
    pub fn resolve(&self, point: Coord<f64>) -> JoinOutcome {
        for position in self.index.query(point) {
            match self.test_candidate(position, point) {
                Ok(Some(region)) => return JoinOutcome::matched(region),
                Ok(None) => {}
                Err(error) => warn!(
                    "Containment test failed for point ({}, {}): {error}",
                    point.x, point.y
                ),
            }
        }
        JoinOutcome::Unmatched(UnmatchedReason::OutsideAllRegions)
    }

    fn test_candidate(
        &self,
        position: usize,
        point: Coord<f64>,
    ) -> Result<Option<&Region>, ContainmentError> {
        let region = self
            .store
            .get(position)
            .ok_or(ContainmentError::UnknownRegion { position })?;
        Ok(region.covers(point)?.then_some(region))
    }

    /// An empty partitioner configured with this engine's region attribute.
    #[must_use]
    pub fn partitioner(&self) -> ResultPartitioner {
        ResultPartitioner::new(self.options.region_attribute.as_str())
    }

    /// Join every record in order and partition the outcomes.
    pub fn join_all<I>(&self, records: I) -> JoinResults
    where
        I: IntoIterator<Item = PointRecord>,
    {
        let mut partitioner = self.partitioner();
        self.join_into(records, &mut partitioner);
        partitioner.finish()
    }

    /// Drain `source` batch by batch, joining each record as it arrives.
    ///
    /// # Errors
    /// Returns the source's error if fetching a batch fails; records already
    /// joined are discarded with the partial results.
    pub fn join_source<S>(&self, source: &mut S) -> Result<JoinResults, S::Error>
    where
        S: PointSource + ?Sized,
    {
        let mut partitioner = self.partitioner();
        while let Some(batch) = source.next_batch()? {
            debug!("Joining batch of {} records", batch.len());
            self.join_into(batch, &mut partitioner);
        }
        Ok(partitioner.finish())
    }

    fn join_into<I>(&self, records: I, partitioner: &mut ResultPartitioner)
    where
        I: IntoIterator<Item = PointRecord>,
    {
        for record in records {
            let outcome = self.join(&record);
            partitioner.record(record, outcome);
        }
    }

    /// Join a materialised batch on the rayon thread pool.
    ///
    /// Each worker fills its own partitioner shard; shards are merged at the
    /// end. Outcomes match [`join_all`](Self::join_all) record for record.
    #[cfg(feature = "parallel")]
    #[must_use]
    pub fn par_join_all(&self, records: Vec<PointRecord>) -> JoinResults {
        use rayon::prelude::*;

        records
            .into_par_iter()
            .fold(
                || self.partitioner(),
                |mut shard, record| {
                    let outcome = self.join(&record);
                    shard.record(record, outcome);
                    shard
                },
            )
            .reduce(|| self.partitioner(), ResultPartitioner::merge)
            .finish()
    }
}
