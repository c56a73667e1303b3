//! Normalisation of raw boundary features into queryable regions.
//!
//! [`GeometryStore`] owns every [`Region`] for the lifetime of a join. It is
//! built once from the boundary source and never mutated afterwards. A
//! feature that cannot be normalised is skipped and reported; one bad
//! boundary never prevents the rest from being indexed.

use geo::{BoundingRect, Coord, CoordsIter, LineString, MultiPolygon, Polygon};
use geojson::{Feature, Geometry, Value as GeoJsonValue};
use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::{Attributes, Region, RegionId, region::MIN_RING_LEN};

/// A boundary feature as delivered by a boundary source.
///
/// The geometry uses the GeoJSON ring encoding. Only `Polygon` and
/// `MultiPolygon` geometries can become regions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawFeature {
    /// Geometry description, if the source supplied one.
    pub geometry: Option<Geometry>,
    /// Decoder diagnostic when the source geometry could not be read.
    /// Takes precedence over `geometry`.
    pub geometry_error: Option<String>,
    /// Attribute map expected to contain the region identifier field.
    pub properties: Attributes,
}

impl RawFeature {
    /// Build a feature from its parts.
    #[must_use]
    pub const fn new(geometry: Option<Geometry>, properties: Attributes) -> Self {
        Self {
            geometry,
            geometry_error: None,
            properties,
        }
    }

    /// A feature whose geometry a source failed to decode.
    pub fn with_invalid_geometry(message: impl Into<String>, properties: Attributes) -> Self {
        Self {
            geometry: None,
            geometry_error: Some(message.into()),
            properties,
        }
    }
}

impl From<Feature> for RawFeature {
    fn from(feature: Feature) -> Self {
        Self::new(feature.geometry, feature.properties.unwrap_or_default())
    }
}

/// Reasons a boundary feature is rejected during normalisation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeatureError {
    /// The feature carries no geometry.
    #[error("feature has no geometry")]
    MissingGeometry,
    /// The geometry is structurally invalid.
    #[error("geometry cannot be parsed: {message}")]
    UnparsableGeometry {
        /// Description of the structural problem.
        message: String,
    },
    /// The geometry is not polygonal.
    #[error("unsupported geometry type {kind}; expected Polygon or MultiPolygon")]
    UnsupportedGeometry {
        /// GeoJSON type name of the rejected geometry.
        kind: &'static str,
    },
    /// A ring has too few positions to enclose an area.
    #[error("ring has {len} positions; at least {min} are required", min = MIN_RING_LEN)]
    DegenerateRing {
        /// Number of positions in the ring.
        len: usize,
    },
    /// The geometry contains no coordinates.
    #[error("geometry is empty")]
    EmptyGeometry,
    /// A coordinate is NaN or infinite.
    #[error("geometry contains a non-finite coordinate")]
    NonFiniteCoordinate,
    /// The identifier field is absent or `null`.
    #[error("identifier field `{field}` is missing")]
    MissingIdentifier {
        /// Name of the identifier field.
        field: String,
    },
    /// The identifier field holds an unusable value.
    #[error("identifier field `{field}` has unusable value {value}")]
    InvalidIdentifier {
        /// Name of the identifier field.
        field: String,
        /// JSON rendering of the offending value.
        value: String,
    },
}

/// A feature rejected while building the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFeature {
    /// Zero-based position of the feature in the source sequence.
    pub ordinal: usize,
    /// Why the feature was rejected.
    pub error: FeatureError,
}

/// Addressable collection of normalised regions.
///
/// Regions keep the order in which their features were presented; a
/// region's [`position`](Region::position) is its index in
/// [`regions`](Self::regions).
///
/// # Examples
/// ```
/// use boundary_join_core::{Attributes, GeometryStore, RawFeature};
/// use geojson::{Geometry, Value};
/// use serde_json::json;
///
/// let square = Geometry::new(Value::Polygon(vec![vec![
///     vec![0.0, 0.0],
///     vec![10.0, 0.0],
///     vec![10.0, 10.0],
///     vec![0.0, 10.0],
///     vec![0.0, 0.0],
/// ]]));
/// let mut properties = Attributes::new();
/// properties.insert("district".into(), json!(7));
///
/// let store = GeometryStore::from_features(
///     [
///         RawFeature::new(Some(square), properties),
///         RawFeature::default(),
///     ],
///     "district",
/// );
///
/// assert_eq!(store.len(), 1);
/// assert_eq!(store.regions()[0].id().as_str(), "7");
/// assert_eq!(store.skipped().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    regions: Vec<Region>,
    skipped: Vec<SkippedFeature>,
}

impl GeometryStore {
    /// Normalise `features`, reading region identifiers from `id_field`.
    pub fn from_features<I>(features: I, id_field: &str) -> Self
    where
        I: IntoIterator<Item = RawFeature>,
    {
        let mut store = Self::default();
        for (ordinal, feature) in features.into_iter().enumerate() {
            match normalise(feature, id_field, store.regions.len()) {
                Ok(region) => store.regions.push(region),
                Err(error) => {
                    warn!("Skipping boundary feature {ordinal}: {error}");
                    store.skipped.push(SkippedFeature { ordinal, error });
                }
            }
        }
        info!(
            "Normalised {} regions ({} features skipped)",
            store.regions.len(),
            store.skipped.len()
        );
        store
    }

    /// Regions in insertion order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Region at insertion `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Region> {
        self.regions.get(position)
    }

    /// First region carrying `id`.
    #[must_use]
    pub fn find(&self, id: &RegionId) -> Option<&Region> {
        self.regions.iter().find(|region| region.id() == id)
    }

    /// Features rejected during normalisation.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedFeature] {
        &self.skipped
    }

    /// Number of regions held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the store holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[cfg(test)]
    pub(crate) const fn from_regions(regions: Vec<Region>) -> Self {
        Self {
            regions,
            skipped: Vec::new(),
        }
    }
}

fn normalise(feature: RawFeature, id_field: &str, position: usize) -> Result<Region, FeatureError> {
    if let Some(message) = feature.geometry_error {
        return Err(FeatureError::UnparsableGeometry { message });
    }
    let geometry = feature.geometry.ok_or(FeatureError::MissingGeometry)?;
    let multi_polygon = to_multi_polygon(&geometry.value)?;
    if multi_polygon
        .coords_iter()
        .any(|coord| !coord.x.is_finite() || !coord.y.is_finite())
    {
        return Err(FeatureError::NonFiniteCoordinate);
    }
    let bounds = multi_polygon
        .bounding_rect()
        .ok_or(FeatureError::EmptyGeometry)?;
    let id = region_id(&feature.properties, id_field)?;
    Ok(Region::from_parts(
        id,
        position,
        multi_polygon,
        bounds,
        feature.properties,
    ))
}

fn region_id(properties: &Attributes, field: &str) -> Result<RegionId, FeatureError> {
    match properties.get(field) {
        None | Some(Value::Null) => Err(FeatureError::MissingIdentifier {
            field: field.to_owned(),
        }),
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(RegionId::new(text.as_str())),
        Some(Value::Number(number)) => Ok(RegionId::new(number.to_string())),
        Some(other) => Err(FeatureError::InvalidIdentifier {
            field: field.to_owned(),
            value: other.to_string(),
        }),
    }
}

fn to_multi_polygon(value: &GeoJsonValue) -> Result<MultiPolygon<f64>, FeatureError> {
    match value {
        GeoJsonValue::Polygon(rings) => Ok(MultiPolygon(vec![polygon(rings)?])),
        GeoJsonValue::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| polygon(rings))
            .collect::<Result<Vec<_>, _>>()
            .map(MultiPolygon),
        GeoJsonValue::Point(_) => unsupported("Point"),
        GeoJsonValue::MultiPoint(_) => unsupported("MultiPoint"),
        GeoJsonValue::LineString(_) => unsupported("LineString"),
        GeoJsonValue::MultiLineString(_) => unsupported("MultiLineString"),
        GeoJsonValue::GeometryCollection(_) => unsupported("GeometryCollection"),
    }
}

fn unsupported(kind: &'static str) -> Result<MultiPolygon<f64>, FeatureError> {
    Err(FeatureError::UnsupportedGeometry { kind })
}

fn polygon(encoded: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, FeatureError> {
    let mut rings = encoded
        .iter()
        .map(|positions| ring(positions))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();
    let exterior = rings.next().ok_or(FeatureError::EmptyGeometry)?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn ring(positions: &[Vec<f64>]) -> Result<LineString<f64>, FeatureError> {
    if positions.len() < MIN_RING_LEN {
        return Err(FeatureError::DegenerateRing {
            len: positions.len(),
        });
    }
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(FeatureError::UnparsableGeometry {
                message: format!("position {position:?} has fewer than two ordinates"),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn square(min: f64, max: f64) -> Geometry {
        Geometry::new(GeoJsonValue::Polygon(vec![vec![
            vec![min, min],
            vec![max, min],
            vec![max, max],
            vec![min, max],
            vec![min, min],
        ]]))
    }

    fn properties(id: Value) -> Attributes {
        let mut properties = Attributes::new();
        properties.insert("id".into(), id);
        properties
    }

    #[fixture]
    fn valid() -> RawFeature {
        RawFeature::new(Some(square(0.0, 10.0)), properties(json!("A")))
    }

    #[rstest]
    fn preserves_order_and_assigns_positions(valid: RawFeature) {
        let second = RawFeature::new(Some(square(20.0, 30.0)), properties(json!("B")));
        let store = GeometryStore::from_features([valid, second], "id");
        let ids: Vec<_> = store.regions().iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(store.get(1).map(Region::position), Some(1));
    }

    #[rstest]
    fn bounds_enclose_geometry(valid: RawFeature) {
        let store = GeometryStore::from_features([valid], "id");
        let region = store.get(0).expect("region stored");
        assert_eq!(region.bounds().min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(region.bounds().max(), Coord { x: 10.0, y: 10.0 });
    }

    #[rstest]
    fn numeric_identifiers_are_stringified() {
        let feature = RawFeature::new(Some(square(0.0, 1.0)), properties(json!(12)));
        let store = GeometryStore::from_features([feature], "id");
        assert_eq!(store.find(&RegionId::from("12")).map(Region::position), Some(0));
    }

    #[rstest]
    fn multipolygon_is_kept_whole() {
        let geometry = Geometry::new(GeoJsonValue::MultiPolygon(vec![
            vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ]],
            vec![vec![
                vec![5.0, 5.0],
                vec![6.0, 5.0],
                vec![6.0, 6.0],
                vec![5.0, 5.0],
            ]],
        ]));
        let feature = RawFeature::new(Some(geometry), properties(json!("M")));
        let store = GeometryStore::from_features([feature], "id");
        let region = store.get(0).expect("multipolygon stored");
        assert_eq!(region.geometry().0.len(), 2);
        assert_eq!(region.bounds().max(), Coord { x: 6.0, y: 6.0 });
    }

    #[rstest]
    #[case::no_geometry(
        RawFeature::new(None, properties(json!("A"))),
        FeatureError::MissingGeometry
    )]
    #[case::point(
        RawFeature::new(
            Some(Geometry::new(GeoJsonValue::Point(vec![1.0, 1.0]))),
            properties(json!("A"))
        ),
        FeatureError::UnsupportedGeometry { kind: "Point" }
    )]
    #[case::empty_polygon(
        RawFeature::new(
            Some(Geometry::new(GeoJsonValue::Polygon(Vec::new()))),
            properties(json!("A"))
        ),
        FeatureError::EmptyGeometry
    )]
    #[case::missing_id(
        RawFeature::new(Some(square(0.0, 1.0)), Attributes::new()),
        FeatureError::MissingIdentifier { field: "id".into() }
    )]
    #[case::null_id(
        RawFeature::new(Some(square(0.0, 1.0)), properties(Value::Null)),
        FeatureError::MissingIdentifier { field: "id".into() }
    )]
    #[case::blank_id(
        RawFeature::new(Some(square(0.0, 1.0)), properties(json!("  "))),
        FeatureError::InvalidIdentifier { field: "id".into(), value: "\"  \"".into() }
    )]
    #[case::boolean_id(
        RawFeature::new(Some(square(0.0, 1.0)), properties(json!(true))),
        FeatureError::InvalidIdentifier { field: "id".into(), value: "true".into() }
    )]
    fn rejects_invalid_features(#[case] feature: RawFeature, #[case] expected: FeatureError) {
        let store = GeometryStore::from_features([feature], "id");
        assert!(store.is_empty());
        assert_eq!(
            store.skipped(),
            &[SkippedFeature {
                ordinal: 0,
                error: expected
            }]
        );
    }

    #[rstest]
    fn short_positions_are_unparsable() {
        let geometry = Geometry::new(GeoJsonValue::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![1.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]]));
        let feature = RawFeature::new(Some(geometry), properties(json!("A")));
        let store = GeometryStore::from_features([feature], "id");
        assert!(matches!(
            store.skipped().first().map(|s| &s.error),
            Some(FeatureError::UnparsableGeometry { .. })
        ));
    }

    #[rstest]
    #[case::short_exterior(vec![vec![
        vec![0.0, 0.0],
        vec![10.0, 10.0],
        vec![0.0, 0.0],
    ]])]
    #[case::short_hole(vec![
        vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![10.0, 10.0],
            vec![0.0, 10.0],
            vec![0.0, 0.0],
        ],
        vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![1.0, 1.0]],
    ])]
    fn short_rings_are_skipped(#[case] rings: Vec<Vec<Vec<f64>>>) {
        let geometry = Geometry::new(GeoJsonValue::Polygon(rings));
        let feature = RawFeature::new(Some(geometry), properties(json!("A")));
        let store = GeometryStore::from_features([feature], "id");
        assert_eq!(store.len(), 0);
        assert_eq!(
            store.skipped(),
            &[SkippedFeature {
                ordinal: 0,
                error: FeatureError::DegenerateRing { len: 3 }
            }]
        );
    }

    #[rstest]
    fn decoder_failures_are_unparsable() {
        let feature = RawFeature::with_invalid_geometry("bad coordinates", properties(json!("A")));
        let store = GeometryStore::from_features([feature], "id");
        assert_eq!(
            store.skipped().first().map(|s| &s.error),
            Some(&FeatureError::UnparsableGeometry {
                message: "bad coordinates".into()
            })
        );
    }

    #[rstest]
    fn bad_feature_does_not_block_the_rest(valid: RawFeature) {
        let broken = RawFeature::new(None, properties(json!("broken")));
        let store = GeometryStore::from_features([broken, valid], "id");
        assert_eq!(store.len(), 1);
        let region = store.get(0).expect("valid region kept");
        assert_eq!(region.id().as_str(), "A");
        assert_eq!(region.position(), 0);
        assert_eq!(store.skipped().first().map(|s| s.ordinal), Some(0));
    }

    #[rstest]
    fn converts_geojson_feature() {
        let feature = Feature {
            bbox: None,
            geometry: Some(square(0.0, 1.0)),
            id: None,
            properties: Some(properties(json!("F"))),
            foreign_members: None,
        };
        let raw = RawFeature::from(feature);
        assert_eq!(raw.properties.get("id"), Some(&json!("F")));
        assert!(raw.geometry.is_some());
    }
}
