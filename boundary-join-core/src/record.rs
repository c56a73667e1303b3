//! Point-located records supplied by the upstream data source.
//!
//! A [`PointRecord`] is an opaque attribute map. The engine only ever reads
//! the two coordinate fields named in [`JoinOptions`](crate::JoinOptions) and,
//! once a record is matched, appends the assigned region identifier.

use geo::Coord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Free-form key/value attributes carried by records and regions.
pub type Attributes = Map<String, Value>;

/// A single record to be assigned to a region.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. They are
/// read lazily so that a record with missing or malformed coordinates can
/// still flow through the join and land in the unmatched set.
///
/// # Examples
/// ```
/// use boundary_join_core::{Attributes, PointRecord};
/// use serde_json::json;
///
/// let mut attributes = Attributes::new();
/// attributes.insert("longitude".into(), json!("-73.98"));
/// attributes.insert("latitude".into(), json!(40.75));
/// let record = PointRecord::new(attributes);
///
/// let coord = record.coordinate("longitude", "latitude").unwrap();
/// assert_eq!(coord.x, -73.98);
/// assert_eq!(coord.y, 40.75);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointRecord {
    attributes: Attributes,
}

impl PointRecord {
    /// Wrap an attribute map as a record.
    #[must_use]
    pub const fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Borrow the record's attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Look up a single attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set an attribute, returning the previous value if one was present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Consume the record and return its attributes.
    #[must_use]
    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    /// Read the record's position from the named coordinate fields.
    ///
    /// Fields may hold JSON numbers or numeric strings; open data APIs
    /// commonly serialise coordinates as strings.
    ///
    /// # Errors
    /// Returns [`CoordinateError`] when either field is absent, `null`, not
    /// numeric, or not finite.
    pub fn coordinate(
        &self,
        longitude_field: &str,
        latitude_field: &str,
    ) -> Result<Coord<f64>, CoordinateError> {
        let x = numeric_field(longitude_field, self.attributes.get(longitude_field))?;
        let y = numeric_field(latitude_field, self.attributes.get(latitude_field))?;
        Ok(Coord { x, y })
    }
}

impl From<Attributes> for PointRecord {
    fn from(attributes: Attributes) -> Self {
        Self::new(attributes)
    }
}

/// Reasons a record's coordinates cannot be used for a join.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinateError {
    /// The field is absent or `null`.
    #[error("coordinate field `{field}` is missing")]
    Missing {
        /// Name of the coordinate field.
        field: String,
    },
    /// The field holds something other than a number or numeric string.
    #[error("coordinate field `{field}` is not numeric: {value}")]
    NotNumeric {
        /// Name of the coordinate field.
        field: String,
        /// JSON rendering of the offending value.
        value: String,
    },
    /// The field parsed to NaN or an infinity.
    #[error("coordinate field `{field}` is not finite: {value}")]
    NonFinite {
        /// Name of the coordinate field.
        field: String,
        /// JSON rendering of the offending value.
        value: String,
    },
}

impl CoordinateError {
    /// Short machine-readable code for diagnostics and sinks.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "missing_coordinate",
            Self::NotNumeric { .. } => "non_numeric_coordinate",
            Self::NonFinite { .. } => "non_finite_coordinate",
        }
    }
}

fn numeric_field(field: &str, value: Option<&Value>) -> Result<f64, CoordinateError> {
    let parsed = match value {
        None | Some(Value::Null) => {
            return Err(CoordinateError::Missing {
                field: field.to_owned(),
            });
        }
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let rendered = || value.map_or_else(String::new, Value::to_string);
    let Some(number) = parsed else {
        return Err(CoordinateError::NotNumeric {
            field: field.to_owned(),
            value: rendered(),
        });
    };
    if number.is_finite() {
        Ok(number)
    } else {
        Err(CoordinateError::NonFinite {
            field: field.to_owned(),
            value: rendered(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record(longitude: Value, latitude: Value) -> PointRecord {
        let mut attributes = Attributes::new();
        attributes.insert("longitude".into(), longitude);
        attributes.insert("latitude".into(), latitude);
        PointRecord::new(attributes)
    }

    #[rstest]
    #[case(json!(5.0), json!(6.5), 5.0, 6.5)]
    #[case(json!("5"), json!(" 6.5 "), 5.0, 6.5)]
    #[case(json!(-73), json!("40.7"), -73.0, 40.7)]
    fn reads_numbers_and_numeric_strings(
        #[case] longitude: Value,
        #[case] latitude: Value,
        #[case] x: f64,
        #[case] y: f64,
    ) {
        let coord = record(longitude, latitude)
            .coordinate("longitude", "latitude")
            .expect("valid coordinates");
        assert_eq!(coord, Coord { x, y });
    }

    #[rstest]
    fn missing_field_is_reported() {
        let mut attributes = Attributes::new();
        attributes.insert("latitude".into(), json!(1.0));
        let err = PointRecord::new(attributes)
            .coordinate("longitude", "latitude")
            .expect_err("longitude absent");
        assert_eq!(
            err,
            CoordinateError::Missing {
                field: "longitude".into()
            }
        );
    }

    #[rstest]
    fn null_is_treated_as_missing() {
        let err = record(json!(1.0), Value::Null)
            .coordinate("longitude", "latitude")
            .expect_err("latitude null");
        assert!(matches!(err, CoordinateError::Missing { field } if field == "latitude"));
    }

    #[rstest]
    #[case(json!("not-a-number"))]
    #[case(json!(true))]
    #[case(json!([1.0]))]
    #[case(json!({"value": 1.0}))]
    #[case(json!(""))]
    fn non_numeric_values_are_rejected(#[case] longitude: Value) {
        let err = record(longitude, json!(1.0))
            .coordinate("longitude", "latitude")
            .expect_err("non-numeric longitude");
        assert_eq!(err.code(), "non_numeric_coordinate");
    }

    #[rstest]
    #[case(json!("NaN"))]
    #[case(json!("inf"))]
    #[case(json!("-infinity"))]
    fn non_finite_strings_are_rejected(#[case] latitude: Value) {
        let err = record(json!(1.0), latitude)
            .coordinate("longitude", "latitude")
            .expect_err("non-finite latitude");
        assert!(matches!(err, CoordinateError::NonFinite { .. }));
    }

    #[rstest]
    fn insert_appends_attribute() {
        let mut rec = record(json!(1.0), json!(2.0));
        assert_eq!(rec.insert("region", "A"), None);
        assert_eq!(rec.get("region"), Some(&json!("A")));
    }

    #[rstest]
    fn serialises_as_plain_object() {
        let rec = record(json!(1.0), json!(2.0));
        let encoded = serde_json::to_value(&rec).expect("serialise record");
        assert_eq!(encoded, json!({"longitude": 1.0, "latitude": 2.0}));
    }
}
