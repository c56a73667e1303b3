//! Destination for partitioned join results.

use std::fmt;

use crate::{PointRecord, RegionId, UnmatchedRecord};

/// Name of one published result set.
///
/// The [`Display`](fmt::Display) form is the set's canonical name:
/// `matched_region_<position>_<id>`, `matched_overall` or `unmatched`.
/// The position keeps names unique when identifiers repeat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultSetName {
    /// Records assigned to one region.
    Region {
        /// Insertion position of the region.
        position: usize,
        /// Identifier of the region.
        id: RegionId,
    },
    /// Every matched record.
    MatchedOverall,
    /// Every record that was not assigned.
    Unmatched,
}

impl fmt::Display for ResultSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region { position, id } => write!(f, "matched_region_{position}_{id}"),
            Self::MatchedOverall => f.write_str("matched_overall"),
            Self::Unmatched => f.write_str("unmatched"),
        }
    }
}

/// Receives the named result sets of a join.
///
/// Implementations decide how sets are stored: files, a database, an
/// in-memory map. Sets are delivered once each, in the order documented on
/// [`JoinResults::publish`](crate::JoinResults::publish).
pub trait ResultSink {
    /// Error raised when a set cannot be written.
    type Error;

    /// Store a region set or the overall matched set.
    ///
    /// # Errors
    /// Implementation-specific.
    fn write_set(
        &mut self,
        name: &ResultSetName,
        records: &[&PointRecord],
    ) -> Result<(), Self::Error>;

    /// Store the unmatched set together with each record's reason.
    ///
    /// # Errors
    /// Implementation-specific.
    fn write_unmatched(&mut self, records: &[UnmatchedRecord]) -> Result<(), Self::Error>;
}
