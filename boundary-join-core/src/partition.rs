//! Grouping of join outcomes into named result sets.

use std::collections::BTreeMap;

use crate::{JoinOutcome, PointRecord, RegionId, ResultSetName, ResultSink, UnmatchedReason};

/// A record that could not be assigned, kept with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmatchedRecord {
    /// The record exactly as it was supplied.
    pub record: PointRecord,
    /// Why no region was assigned.
    pub reason: UnmatchedReason,
}

/// Members of one region's result set.
///
/// Members are indices into [`JoinResults::matched`]; the region sets are
/// therefore views over the overall matched set rather than copies of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMatches {
    id: RegionId,
    position: usize,
    members: Vec<usize>,
}

impl RegionMatches {
    const fn new(id: RegionId, position: usize) -> Self {
        Self {
            id,
            position,
            members: Vec::new(),
        }
    }

    /// Identifier of the region.
    #[must_use]
    pub const fn id(&self) -> &RegionId {
        &self.id
    }

    /// Insertion position of the region.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Indices into [`JoinResults::matched`], in arrival order.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Number of records assigned to the region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no record was assigned to the region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Accumulates join outcomes into per-region, matched and unmatched sets.
///
/// Every record handed to [`record`](Self::record) lands in exactly one
/// place: a region set (and therefore the overall matched set) or the
/// unmatched set.
#[derive(Debug, Clone)]
pub struct ResultPartitioner {
    region_attribute: String,
    matched: Vec<PointRecord>,
    regions: BTreeMap<usize, RegionMatches>,
    unmatched: Vec<UnmatchedRecord>,
}

impl ResultPartitioner {
    /// An empty partitioner writing assigned identifiers to `region_attribute`.
    pub fn new(region_attribute: impl Into<String>) -> Self {
        Self {
            region_attribute: region_attribute.into(),
            matched: Vec::new(),
            regions: BTreeMap::new(),
            unmatched: Vec::new(),
        }
    }

    /// Route one record according to its outcome.
    ///
    /// Matched records gain the region attribute, replacing any existing
    /// value of the same name.
    pub fn record(&mut self, mut record: PointRecord, outcome: JoinOutcome) {
        match outcome {
            JoinOutcome::Matched { region, position } => {
                record.insert(self.region_attribute.as_str(), region.as_str());
                let index = self.matched.len();
                self.matched.push(record);
                self.regions
                    .entry(position)
                    .or_insert_with(|| RegionMatches::new(region, position))
                    .members
                    .push(index);
            }
            JoinOutcome::Unmatched(reason) => {
                self.unmatched.push(UnmatchedRecord { record, reason });
            }
        }
    }

    /// Append `other`'s records after this partitioner's records.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        let offset = self.matched.len();
        self.matched.extend(other.matched);
        for (position, theirs) in other.regions {
            let ours = self
                .regions
                .entry(position)
                .or_insert_with(|| RegionMatches::new(theirs.id.clone(), position));
            ours.members
                .extend(theirs.members.into_iter().map(|index| index + offset));
        }
        self.unmatched.extend(other.unmatched);
        self
    }

    /// Number of records partitioned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }

    /// Whether no record has been partitioned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seal the partition.
    #[must_use]
    pub fn finish(self) -> JoinResults {
        JoinResults {
            matched: self.matched,
            regions: self.regions.into_values().collect(),
            unmatched: self.unmatched,
        }
    }
}

/// The sealed output of a join.
///
/// # Examples
/// ```
/// use boundary_join_core::{GeometryStore, JoinOptions, RegionId, SpatialJoinEngine};
/// use boundary_join_core::test_support::{record, square_feature};
///
/// let store = GeometryStore::from_features([square_feature("A", 0.0, 0.0, 1.0, 1.0)], "id");
/// let engine = SpatialJoinEngine::new(store, JoinOptions::default());
/// let results = engine.join_all([record(0.5, 0.5), record(3.0, 3.0)]);
///
/// assert_eq!(results.records_for(&RegionId::from("A")).len(), 1);
/// assert_eq!(results.matched()[0].get("region"), Some(&serde_json::json!("A")));
/// assert_eq!(results.unmatched().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JoinResults {
    matched: Vec<PointRecord>,
    regions: Vec<RegionMatches>,
    unmatched: Vec<UnmatchedRecord>,
}

impl JoinResults {
    /// Every matched record, annotated with its region, in arrival order.
    #[must_use]
    pub fn matched(&self) -> &[PointRecord] {
        &self.matched
    }

    /// Records that were not assigned, in arrival order.
    #[must_use]
    pub fn unmatched(&self) -> &[UnmatchedRecord] {
        &self.unmatched
    }

    /// Non-empty region sets in region insertion order.
    #[must_use]
    pub fn regions(&self) -> &[RegionMatches] {
        &self.regions
    }

    /// Set of the first region carrying `id`, if any record matched it.
    #[must_use]
    pub fn region(&self, id: &RegionId) -> Option<&RegionMatches> {
        self.regions.iter().find(|set| set.id() == id)
    }

    /// Records belonging to `set`.
    pub fn records_in<'a>(
        &'a self,
        set: &'a RegionMatches,
    ) -> impl Iterator<Item = &'a PointRecord> + 'a {
        set.members
            .iter()
            .filter_map(|&index| self.matched.get(index))
    }

    /// Records assigned to any region carrying `id`.
    #[must_use]
    pub fn records_for(&self, id: &RegionId) -> Vec<&PointRecord> {
        self.regions
            .iter()
            .filter(|set| set.id() == id)
            .flat_map(|set| self.records_in(set))
            .collect()
    }

    /// Total number of records joined.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }

    /// Hand every result set to `sink`.
    ///
    /// Region sets come first in region insertion order, followed by the
    /// overall matched set and finally the unmatched set. Regions without
    /// matches produce no set; the matched and unmatched sets are always
    /// written, even when empty.
    ///
    /// # Errors
    /// Stops at and returns the first sink error.
    pub fn publish<S>(&self, sink: &mut S) -> Result<(), S::Error>
    where
        S: ResultSink + ?Sized,
    {
        for set in &self.regions {
            let name = ResultSetName::Region {
                position: set.position,
                id: set.id.clone(),
            };
            let records: Vec<&PointRecord> = self.records_in(set).collect();
            sink.write_set(&name, &records)?;
        }
        let matched: Vec<&PointRecord> = self.matched.iter().collect();
        sink.write_set(&ResultSetName::MatchedOverall, &matched)?;
        sink.write_unmatched(&self.unmatched)
    }
}
