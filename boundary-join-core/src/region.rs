//! Normalised boundary regions.

use std::fmt;

use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, LineString, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Attributes;

/// Smallest number of coordinates in a closed ring enclosing any area.
pub(crate) const MIN_RING_LEN: usize = 4;

/// Opaque, stable identifier of a region, such as a district code.
///
/// Identifiers read from numeric attributes are stored in their decimal
/// string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RegionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A named polygonal boundary used to partition records.
///
/// Regions are created once by [`GeometryStore`](crate::GeometryStore) and
/// are immutable afterwards. `position` is the region's insertion order,
/// which doubles as the tie-break when a point falls in several regions.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    id: RegionId,
    position: usize,
    geometry: MultiPolygon<f64>,
    bounds: Rect<f64>,
    attributes: Attributes,
}

impl Region {
    pub(crate) const fn from_parts(
        id: RegionId,
        position: usize,
        geometry: MultiPolygon<f64>,
        bounds: Rect<f64>,
        attributes: Attributes,
    ) -> Self {
        Self {
            id,
            position,
            geometry,
            bounds,
            attributes,
        }
    }

    /// Region identifier.
    #[must_use]
    pub const fn id(&self) -> &RegionId {
        &self.id
    }

    /// Insertion position within the owning store.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Exact boundary geometry.
    #[must_use]
    pub const fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Axis-aligned bounding box enclosing the whole geometry.
    #[must_use]
    pub const fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Attributes carried by the source feature.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Classify `coord` relative to the region's geometry.
    ///
    /// # Errors
    /// Returns [`ContainmentError::DegenerateRing`] when a ring of the
    /// geometry cannot enclose any area, which makes the answer meaningless.
    pub fn locate(&self, coord: Coord<f64>) -> Result<CoordPos, ContainmentError> {
        for polygon in &self.geometry {
            let mut rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
            if let Some(ring) = rings.find(|ring| is_degenerate(ring)) {
                return Err(ContainmentError::DegenerateRing {
                    region: self.id.clone(),
                    len: ring.0.len(),
                });
            }
        }
        Ok(self.geometry.coordinate_position(&coord))
    }

    /// Whether `coord` lies inside the region or on its boundary.
    ///
    /// # Errors
    /// Propagates failures from [`Region::locate`].
    pub fn covers(&self, coord: Coord<f64>) -> Result<bool, ContainmentError> {
        self.locate(coord)
            .map(|position| matches!(position, CoordPos::Inside | CoordPos::OnBoundary))
    }
}

fn is_degenerate(ring: &LineString<f64>) -> bool {
    ring.0.len() < MIN_RING_LEN
}

/// Failure of an exact containment test for one point/region pair.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContainmentError {
    /// The index referred to a position the store does not hold.
    #[error("no region at index position {position}")]
    UnknownRegion {
        /// Position returned by the index.
        position: usize,
    },
    /// A ring has too few coordinates to enclose an area.
    #[error("region {region} has a degenerate ring with {len} coordinates")]
    DegenerateRing {
        /// Affected region.
        region: RegionId,
        /// Number of coordinates in the ring.
        len: usize,
    },
}
