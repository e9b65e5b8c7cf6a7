use rstar::{RTree, RTreeObject, AABB};

use crate::component::Component;
use crate::geometry::{BBox, Point};

/// An entry in the R-tree spatial index, referencing a primitive by its index.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    /// Index into the component's primitive list.
    pub primitive_index: usize,
    /// Bounding box of the primitive.
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Region lookup over the primitives of a flat component.
///
/// Only the component's own primitives are indexed, so build it from the
/// output of a flatten to cover the whole hierarchy.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn from_component(component: &Component) -> Self {
        if !component.is_flat() {
            log::warn!(
                "indexing '{}' without flattening; sub-components are not covered",
                component.name
            );
        }
        let entries = component
            .primitives
            .iter()
            .enumerate()
            .filter_map(|(primitive_index, p)| {
                p.bbox().map(|bbox| SpatialEntry {
                    primitive_index,
                    bbox,
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Primitives whose bounding box contains the given point.
    pub fn query_point(&self, point: &Point) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
            .map(|e| e.primitive_index)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Primitives whose bounding box intersects `region`.
    pub fn query_region(&self, region: &BBox) -> Vec<usize> {
        let envelope = AABB::from_corners(
            [region.min.x, region.min.y],
            [region.max.x, region.max.y],
        );
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.primitive_index)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
