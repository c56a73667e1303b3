//! Upstream collaborators supplying boundaries and point records.

use log::info;

use crate::{GeometryStore, PointRecord, RawFeature};

/// Supplies the boundary features for one join.
pub trait BoundarySource {
    /// Error raised when the boundary data cannot be read at all.
    type Error;

    /// Load every feature, in the order they should be indexed.
    ///
    /// Individual malformed features are returned as-is and rejected later
    /// by [`GeometryStore::from_features`].
    ///
    /// # Errors
    /// Implementation-specific; fatal to the join.
    fn load_features(&mut self) -> Result<Vec<RawFeature>, Self::Error>;
}

/// Supplies point records, possibly in several batches.
pub trait PointSource {
    /// Error raised when a batch cannot be fetched.
    type Error;

    /// Fetch the next batch; `None` marks the end of the stream.
    ///
    /// # Errors
    /// Implementation-specific.
    fn next_batch(&mut self) -> Result<Option<Vec<PointRecord>>, Self::Error>;
}

impl GeometryStore {
    /// Load all features from `source` and normalise them.
    ///
    /// # Errors
    /// Returns the source's error when loading fails.
    pub fn load<S>(source: &mut S, id_field: &str) -> Result<Self, S::Error>
    where
        S: BoundarySource + ?Sized,
    {
        let features = source.load_features()?;
        info!("Loaded {} boundary features", features.len());
        Ok(Self::from_features(features, id_field))
    }
}
