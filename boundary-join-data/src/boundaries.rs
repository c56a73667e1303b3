//! GeoJSON boundary loading from files, strings and HTTP endpoints.

use std::io;

use boundary_join_core::{Attributes, BoundarySource, RawFeature};
use camino::{Utf8Path, Utf8PathBuf};
use geojson::Geometry;
use log::debug;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::fs::read_to_string;
use crate::http::{FetchError, HttpBuildError, HttpClient, HttpSourceConfig};

/// Errors that prevent any boundary feature from being read.
///
/// Problems with individual features are not errors here; they are passed
/// through and rejected by the geometry store.
#[derive(Debug, Error)]
pub enum BoundaryLoadError {
    /// The boundary file could not be read.
    #[error("failed to read boundary file {path}")]
    Read {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The boundary document is not valid JSON.
    #[error("boundary document from {origin} is not valid JSON")]
    Json {
        /// File path or URL of the document.
        origin: String,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// The document is JSON but not a `Feature` or `FeatureCollection`.
    #[error("boundary document from {origin} is a {kind}, expected a Feature or FeatureCollection")]
    NotFeatures {
        /// File path or URL of the document.
        origin: String,
        /// Value of the document's `type` member.
        kind: String,
    },
    /// The boundary document could not be downloaded.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug)]
enum Origin {
    File(Utf8PathBuf),
    Inline(String),
    Http { url: Url, client: HttpClient },
}

/// [`BoundarySource`] reading a GeoJSON `FeatureCollection` or single
/// `Feature`.
///
/// # Examples
/// ```
/// use boundary_join_core::{BoundarySource, GeometryStore};
/// use boundary_join_data::GeoJsonBoundarySource;
///
/// let document = r#"{
///   "type": "FeatureCollection",
///   "features": [{
///     "type": "Feature",
///     "properties": {"district": "A"},
///     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}
///   }]
/// }"#;
/// let mut source = GeoJsonBoundarySource::from_geojson_str(document);
/// let store = GeometryStore::load(&mut source, "district")?;
/// assert_eq!(store.len(), 1);
/// # Ok::<(), boundary_join_data::BoundaryLoadError>(())
/// ```
#[derive(Debug)]
pub struct GeoJsonBoundarySource {
    origin: Origin,
}

impl GeoJsonBoundarySource {
    /// Read boundaries from a GeoJSON file.
    pub fn from_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
        }
    }

    /// Read boundaries from an in-memory GeoJSON document.
    pub fn from_geojson_str(document: impl Into<String>) -> Self {
        Self {
            origin: Origin::Inline(document.into()),
        }
    }

    /// Download boundaries from `url`.
    ///
    /// # Errors
    /// Returns [`HttpBuildError`] when the HTTP client cannot be created.
    pub fn from_url(url: Url, config: &HttpSourceConfig) -> Result<Self, HttpBuildError> {
        let client = HttpClient::new(config)?;
        Ok(Self {
            origin: Origin::Http { url, client },
        })
    }

    fn read_document(&self) -> Result<(String, String), BoundaryLoadError> {
        match &self.origin {
            Origin::File(path) => read_file(path).map(|text| (path.to_string(), text)),
            Origin::Inline(document) => Ok(("inline document".to_owned(), document.clone())),
            Origin::Http { url, client } => Ok((url.to_string(), client.get_text(url)?)),
        }
    }
}

impl BoundarySource for GeoJsonBoundarySource {
    type Error = BoundaryLoadError;

    fn load_features(&mut self) -> Result<Vec<RawFeature>, Self::Error> {
        let (origin, text) = self.read_document()?;
        let features = parse_features(&text, &origin)?;
        debug!("Read {} boundary features from {origin}", features.len());
        Ok(features)
    }
}

fn read_file(path: &Utf8Path) -> Result<String, BoundaryLoadError> {
    read_to_string(path).map_err(|source| BoundaryLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Split a GeoJSON document into raw features.
///
/// Each feature's geometry is decoded on its own so that one malformed
/// geometry does not reject the whole document.
///
/// # Errors
/// Returns [`BoundaryLoadError`] when the document is not JSON or is not a
/// `Feature`/`FeatureCollection`.
pub fn parse_features(text: &str, origin: &str) -> Result<Vec<RawFeature>, BoundaryLoadError> {
    let mut document: Value =
        serde_json::from_str(text).map_err(|source| BoundaryLoadError::Json {
            origin: origin.to_owned(),
            source,
        })?;
    let not_features = |kind: &str| BoundaryLoadError::NotFeatures {
        origin: origin.to_owned(),
        kind: kind.to_owned(),
    };
    let kind = document
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned);
    match kind.as_deref() {
        Some("FeatureCollection") => match document.get_mut("features").map(Value::take) {
            Some(Value::Array(features)) => Ok(features.into_iter().map(raw_feature).collect()),
            _ => Err(not_features("FeatureCollection without a features array")),
        },
        Some("Feature") => Ok(vec![raw_feature(document)]),
        Some(other) => Err(not_features(other)),
        None => Err(not_features("document without a type")),
    }
}

fn raw_feature(value: Value) -> RawFeature {
    let Value::Object(mut object) = value else {
        return RawFeature::with_invalid_geometry("feature is not a JSON object", Attributes::new());
    };
    let properties = match object.remove("properties") {
        Some(Value::Object(properties)) => properties,
        _ => Attributes::new(),
    };
    match object.remove("geometry") {
        None | Some(Value::Null) => RawFeature::new(None, properties),
        Some(geometry) => match serde_json::from_value::<Geometry>(geometry) {
            Ok(geometry) => RawFeature::new(Some(geometry), properties),
            Err(err) => RawFeature::with_invalid_geometry(err.to_string(), properties),
        },
    }
}
