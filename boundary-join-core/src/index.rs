//! Bounding-box R\*-tree over the regions of a [`GeometryStore`].
//!
//! The index stores only derived envelopes keyed by region position; the
//! geometry itself stays in the store. Queries return a superset of the
//! regions that truly contain a point and never miss one.

use geo::{Coord, Rect};
use rstar::{AABB, RTree, RTreeObject};

use crate::GeometryStore;

/// Envelope entry stored in the R\*-tree.
#[derive(Debug, Clone, Copy)]
struct IndexedBounds {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Read-only spatial index answering "which regions could contain this point".
///
/// Built once with [`BoundaryIndex::build`] and never mutated, so it can be
/// shared freely between join workers. Candidate positions are always
/// returned in ascending insertion order.
///
/// # Examples
/// ```
/// use boundary_join_core::{BoundaryIndex, GeometryStore};
/// use geo::Coord;
///
/// let index = BoundaryIndex::build(&GeometryStore::default());
/// assert!(index.is_empty());
/// assert!(index.query(Coord { x: 1.0, y: 1.0 }).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BoundaryIndex {
    tree: RTree<IndexedBounds>,
}

impl BoundaryIndex {
    /// Bulk-load the bounding boxes of every region in `store`.
    #[must_use]
    pub fn build(store: &GeometryStore) -> Self {
        let entries = store
            .regions()
            .iter()
            .map(|region| IndexedBounds {
                position: region.position(),
                envelope: envelope_of(region.bounds()),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Positions of regions whose bounding box contains `point`.
    ///
    /// Boxes are closed: a point on a box edge is a candidate.
    #[must_use]
    pub fn query(&self, point: Coord<f64>) -> Vec<usize> {
        self.collect_sorted(&AABB::from_point([point.x, point.y]))
    }

    /// Positions of regions whose bounding box intersects `bbox`.
    #[must_use]
    pub fn query_box(&self, bbox: Rect<f64>) -> Vec<usize> {
        self.collect_sorted(&envelope_of(bbox))
    }

    fn collect_sorted(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(envelope)
            .map(|entry| entry.position)
            .collect();
        // R*-tree traversal order depends on node layout; callers rely on
        // insertion order for the tie-break.
        positions.sort_unstable();
        positions
    }

    /// Number of indexed regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
