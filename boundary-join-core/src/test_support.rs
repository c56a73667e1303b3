//! In-memory collaborators and fixture builders shared by unit tests,
//! behaviour tests, doctests and benchmarks.

use std::collections::VecDeque;
use std::convert::Infallible;

use geojson::{Geometry, Value as GeoJsonValue};
use serde_json::{Value, json};

use crate::{
    Attributes, BoundarySource, GeometryStore, JoinResults, PointRecord, PointSource, RawFeature,
    ResultSetName, ResultSink, UnmatchedRecord,
};

/// Identifier field used by every builder in this module.
pub const ID_FIELD: &str = "id";

/// Feature with identifier `id` and the given geometry.
pub fn feature(id: &str, geometry: Option<Geometry>) -> RawFeature {
    let mut properties = Attributes::new();
    properties.insert(ID_FIELD.to_owned(), json!(id));
    RawFeature::new(geometry, properties)
}

/// Closed axis-aligned rectangle as a GeoJSON polygon.
pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry {
    Geometry::new(GeoJsonValue::Polygon(vec![vec![
        vec![min_x, min_y],
        vec![max_x, min_y],
        vec![max_x, max_y],
        vec![min_x, max_y],
        vec![min_x, min_y],
    ]]))
}

/// Rectangular feature with identifier `id`.
pub fn square_feature(id: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> RawFeature {
    feature(id, Some(rectangle(min_x, min_y, max_x, max_y)))
}

/// Gap-free grid of `columns * rows` square cells of side `cell` anchored at
/// the origin. Cells are named `r<index>` in row-major order.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "grid indices are small and cell corners are offsets"
)]
pub fn tiling(columns: usize, rows: usize, cell: f64) -> Vec<RawFeature> {
    (0..rows)
        .flat_map(|row| (0..columns).map(move |column| (row, column)))
        .enumerate()
        .map(|(index, (row, column))| {
            let min_x = column as f64 * cell;
            let min_y = row as f64 * cell;
            square_feature(&format!("r{index}"), min_x, min_y, min_x + cell, min_y + cell)
        })
        .collect()
}

/// Normalise `features` using [`ID_FIELD`].
pub fn store_of<I>(features: I) -> GeometryStore
where
    I: IntoIterator<Item = RawFeature>,
{
    GeometryStore::from_features(features, ID_FIELD)
}

/// Record with numeric `longitude` and `latitude` attributes.
pub fn record(longitude: f64, latitude: f64) -> PointRecord {
    record_with(json!(longitude), json!(latitude))
}

/// Record with arbitrary JSON coordinate values.
pub fn record_with(longitude: Value, latitude: Value) -> PointRecord {
    let mut attributes = Attributes::new();
    attributes.insert("longitude".to_owned(), longitude);
    attributes.insert("latitude".to_owned(), latitude);
    PointRecord::new(attributes)
}

/// Identifiers of the non-empty region sets, in publication order.
pub fn region_ids(results: &JoinResults) -> Vec<String> {
    results
        .regions()
        .iter()
        .map(|set| set.id().to_string())
        .collect()
}

/// Boundary source serving a fixed feature list once.
#[derive(Debug, Default, Clone)]
pub struct VecBoundarySource {
    features: Vec<RawFeature>,
}

impl VecBoundarySource {
    /// Serve `features`.
    pub const fn new(features: Vec<RawFeature>) -> Self {
        Self { features }
    }
}

impl BoundarySource for VecBoundarySource {
    type Error = Infallible;

    fn load_features(&mut self) -> Result<Vec<RawFeature>, Self::Error> {
        Ok(std::mem::take(&mut self.features))
    }
}

/// Point source replaying pre-built batches.
#[derive(Debug, Default, Clone)]
pub struct VecPointSource {
    batches: VecDeque<Vec<PointRecord>>,
}

impl VecPointSource {
    /// Replay `batches` in order.
    pub fn new(batches: Vec<Vec<PointRecord>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

impl PointSource for VecPointSource {
    type Error = Infallible;

    fn next_batch(&mut self) -> Result<Option<Vec<PointRecord>>, Self::Error> {
        Ok(self.batches.pop_front())
    }
}

/// Sink collecting published sets in memory, preserving delivery order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    sets: Vec<(String, Vec<PointRecord>)>,
    unmatched: Vec<UnmatchedRecord>,
}

impl MemorySink {
    /// Names of every set received, in delivery order.
    pub fn set_names(&self) -> Vec<String> {
        self.sets.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Records delivered under `name`.
    pub fn set(&self, name: &str) -> Option<&Vec<PointRecord>> {
        self.sets
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, records)| records)
    }

    /// Unmatched records delivered.
    pub fn unmatched(&self) -> &[UnmatchedRecord] {
        &self.unmatched
    }
}

impl ResultSink for MemorySink {
    type Error = Infallible;

    fn write_set(
        &mut self,
        name: &ResultSetName,
        records: &[&PointRecord],
    ) -> Result<(), Self::Error> {
        let owned = records.iter().map(|record| (*record).clone()).collect();
        self.sets.push((name.to_string(), owned));
        Ok(())
    }

    fn write_unmatched(&mut self, records: &[UnmatchedRecord]) -> Result<(), Self::Error> {
        self.sets.push((
            ResultSetName::Unmatched.to_string(),
            records.iter().map(|entry| entry.record.clone()).collect(),
        ));
        self.unmatched = records.to_vec();
        Ok(())
    }
}
