use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LayoutError, Result};
use crate::geometry::{BBox, GeomPrimitive};
use crate::port::Port;
use crate::transform::Transform;
use crate::LayerId;

/// Unique component identifier.
///
/// Components built through the factory cache get an id derived from their
/// cache key, so the same parameters always produce the same id.
pub type ComponentId = Uuid;

/// A placement of one component inside another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub component: ComponentId,
    pub transform: Transform,
}

impl Instance {
    pub fn new(component: ComponentId, transform: Transform) -> Self {
        Self {
            component,
            transform,
        }
    }
}

/// A placement whose rotation is unrestricted.
///
/// Virtual instances are never part of the regular instance tree; they are
/// baked into plain geometry when their owner is flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualInstance {
    pub component: ComponentId,
    pub transform: Transform,
}

impl VirtualInstance {
    pub fn new(component: ComponentId) -> Self {
        Self {
            component,
            transform: Transform::identity(),
        }
    }
}

/// A layout component: geometry, placed sub-components, and ports.
///
/// Components are shared as `Arc<Component>` once added to a
/// [`Library`](crate::Library) and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    pub primitives: Vec<GeomPrimitive>,
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub virtual_instances: Vec<VirtualInstance>,
    pub ports: BTreeMap<String, Port>,
}

impl Component {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            primitives: Vec::new(),
            instances: Vec::new(),
            virtual_instances: Vec::new(),
            ports: BTreeMap::new(),
        }
    }

    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports.get(name).ok_or_else(|| LayoutError::PortNotFound {
            component: self.name.clone(),
            port: name.to_string(),
        })
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn primitives(&self) -> &[GeomPrimitive] {
        &self.primitives
    }

    /// True when there is nothing left to flatten.
    pub fn is_flat(&self) -> bool {
        self.instances.is_empty() && self.virtual_instances.is_empty()
    }

    /// Compute the bounding box of the geometry in this component (not including subcomponents).
    pub fn local_bbox(&self) -> Option<BBox> {
        self.primitives
            .iter()
            .filter_map(|g| g.bbox())
            .reduce(|a, b| a.union(&b))
    }

    pub fn primitives_on_layer(&self, layer_id: LayerId) -> Vec<&GeomPrimitive> {
        self.primitives
            .iter()
            .filter(|g| g.layer_id() == layer_id)
            .collect()
    }

    /// Ids of every component placed directly in this one, virtual placements included.
    pub fn children(&self) -> impl Iterator<Item = (ComponentId, &Transform)> {
        self.instances
            .iter()
            .map(|i| (i.component, &i.transform))
            .chain(
                self.virtual_instances
                    .iter()
                    .map(|v| (v.component, &v.transform)),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};

    #[test]
    fn test_component_bbox() {
        let mut c = Component::new("test_cell");
        c.primitives
            .push(GeomPrimitive::Rect(Rect::new(0, 0.0, 0.0, 100.0, 50.0)));
        c.primitives
            .push(GeomPrimitive::Rect(Rect::new(1, 50.0, 25.0, 200.0, 75.0)));
        let bb = c.local_bbox().unwrap();
        assert!((bb.min.x - 0.0).abs() < 1e-10);
        assert!((bb.min.y - 0.0).abs() < 1e-10);
        assert!((bb.max.x - 200.0).abs() < 1e-10);
        assert!((bb.max.y - 75.0).abs() < 1e-10);
        assert_eq!(c.primitives_on_layer(1).len(), 1);
    }

    #[test]
    fn test_missing_port() {
        let mut c = Component::new("wg");
        c.ports.insert(
            "o1".to_string(),
            Port::new("o1", Point::origin(), 180.0, 0.5),
        );
        assert!(c.port("o1").is_ok());
        let err = c.port("o3").unwrap_err();
        assert!(matches!(err, LayoutError::PortNotFound { ref port, .. } if port == "o3"));
    }

    #[test]
    fn test_children_include_virtual() {
        let mut c = Component::new("top");
        let child = Uuid::new_v4();
        c.instances.push(Instance::new(child, Transform::identity()));
        c.virtual_instances.push(VirtualInstance::new(child));
        assert_eq!(c.children().count(), 2);
        assert!(!c.is_flat());
    }
}
