//! Hierarchy flattening.
//!
//! Walks a component's instance tree depth-first and emits every primitive
//! in the root frame. Virtual instances are baked in the same way, which is
//! the only point where they turn into concrete geometry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::{Component, ComponentId, VirtualInstance};
use crate::error::{LayoutError, Result};
use crate::geometry::GeomPrimitive;
use crate::transform::Transform;

/// Read access to components by id.
pub trait ComponentLookup {
    fn lookup(&self, id: &ComponentId) -> Result<Arc<Component>>;
}

impl ComponentLookup for HashMap<ComponentId, Arc<Component>> {
    fn lookup(&self, id: &ComponentId) -> Result<Arc<Component>> {
        self.get(id)
            .cloned()
            .ok_or(LayoutError::UnknownComponent(*id))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Re-declare the root's ports on the flat result.
    pub propagate_ports: bool,
}

impl FlattenOptions {
    pub fn with_ports() -> Self {
        Self {
            propagate_ports: true,
        }
    }
}

/// Flatten `root` into a component holding only primitives.
pub fn flatten(
    lookup: &impl ComponentLookup,
    root: &Component,
    options: FlattenOptions,
) -> Result<Component> {
    let mut out = Component::new(&root.name);
    let mut path = vec![(root.id, root.name.clone())];
    collect(lookup, root, &Transform::identity(), &mut path, &mut out.primitives)?;
    if options.propagate_ports {
        out.ports = root.ports.clone();
    }
    log::info!(
        "flattened '{}' into {} primitives",
        root.name,
        out.primitives.len()
    );
    Ok(out)
}

/// Flatten a free-floating set of virtual placements.
pub fn flatten_virtual(
    lookup: &impl ComponentLookup,
    name: &str,
    placements: &[VirtualInstance],
) -> Result<Component> {
    let mut root = Component::new(name);
    root.virtual_instances = placements.to_vec();
    flatten(lookup, &root, FlattenOptions::default())
}

fn collect(
    lookup: &impl ComponentLookup,
    component: &Component,
    transform: &Transform,
    path: &mut Vec<(ComponentId, String)>,
    out: &mut Vec<GeomPrimitive>,
) -> Result<()> {
    out.extend(component.primitives.iter().map(|p| p.transformed(transform)));

    for (child_id, child_transform) in component.children() {
        if path.iter().any(|(id, _)| *id == child_id) {
            let mut names: Vec<String> = path.iter().map(|(_, n)| n.clone()).collect();
            let child = lookup
                .lookup(&child_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|_| child_id.to_string());
            names.push(child);
            return Err(LayoutError::CyclicHierarchy { path: names });
        }
        let child = lookup.lookup(&child_id)?;
        log::trace!("descending into '{}' at depth {}", child.name, path.len());
        let composed = Transform::compose(transform, child_transform);
        path.push((child_id, child.name.clone()));
        collect(lookup, &child, &composed, path, out)?;
        path.pop();
    }
    Ok(())
}
