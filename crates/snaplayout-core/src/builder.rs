//! Component construction and port-driven placement.

use std::sync::Arc;

use crate::component::{Component, ComponentId, Instance, VirtualInstance};
use crate::config::RotationPolicy;
use crate::error::{LayoutError, Result};
use crate::geometry::{GeomPrimitive, Point};
use crate::library::Library;
use crate::port::Port;
use crate::resolver::{self, ConnectOptions};
use crate::transform::{angle_difference, snap_to_grid_angle, Transform};

/// Index of an ordinary instance in the component being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(usize);

/// Index of a virtual instance in the component being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualHandle(usize);

/// Either kind of placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Instance(InstanceHandle),
    Virtual(VirtualHandle),
}

impl From<InstanceHandle> for Placement {
    fn from(h: InstanceHandle) -> Self {
        Placement::Instance(h)
    }
}

impl From<VirtualHandle> for Placement {
    fn from(h: VirtualHandle) -> Self {
        Placement::Virtual(h)
    }
}

/// Builds one component against a library.
///
/// Placements are declared first and then refined: each `connect` call is
/// a one-shot alignment that overwrites the moving placement's transform.
/// Later calls never revisit earlier ones. A failed call leaves the builder
/// exactly as it was.
pub struct ComponentBuilder<'a> {
    library: &'a Library,
    component: Component,
}

impl<'a> ComponentBuilder<'a> {
    pub fn new(library: &'a Library, name: &str) -> Self {
        Self {
            library,
            component: Component::new(name),
        }
    }

    pub fn library(&self) -> &'a Library {
        self.library
    }

    pub fn name(&self) -> &str {
        &self.component.name
    }

    pub fn add_primitive(&mut self, primitive: impl Into<GeomPrimitive>) {
        self.component.primitives.push(primitive.into());
    }

    // ── Placements ───────────────────────────────────────────────────

    /// Place `component` with `transform` on the grid path.
    pub fn add_instance(&mut self, component: &Component, transform: Transform) -> Result<InstanceHandle> {
        self.require_known(&component.id)?;
        let transform = self.grid_transform(transform)?;
        self.component
            .instances
            .push(Instance::new(component.id, transform));
        Ok(InstanceHandle(self.component.instances.len() - 1))
    }

    /// Place `component` at the origin.
    pub fn add_ref(&mut self, component: &Component) -> Result<InstanceHandle> {
        self.add_instance(component, Transform::identity())
    }

    /// Place `component` as a virtual instance, free to take any rotation.
    pub fn create_virtual(&mut self, component: &Component) -> Result<VirtualHandle> {
        self.require_known(&component.id)?;
        self.component
            .virtual_instances
            .push(VirtualInstance::new(component.id));
        Ok(VirtualHandle(self.component.virtual_instances.len() - 1))
    }

    pub fn transform(&self, placement: impl Into<Placement>) -> Result<Transform> {
        Ok(self.placement(placement.into())?.1)
    }

    /// Overwrite a placement's transform. Instances go through the rotation policy.
    pub fn set_transform(&mut self, placement: impl Into<Placement>, transform: Transform) -> Result<()> {
        let placement = placement.into();
        self.placement(placement)?;
        match placement {
            Placement::Instance(InstanceHandle(i)) => {
                let transform = self.grid_transform(transform)?;
                self.component.instances[i].transform = transform;
            }
            Placement::Virtual(VirtualHandle(i)) => {
                self.component.virtual_instances[i].transform = transform;
            }
        }
        Ok(())
    }

    pub fn move_by(&mut self, placement: impl Into<Placement>, dx: f64, dy: f64) -> Result<()> {
        let placement = placement.into();
        let current = self.transform(placement)?;
        self.set_transform(placement, current.then(&Transform::translate(dx, dy)))
    }

    /// Rotate a placement about the parent origin.
    pub fn rotate(&mut self, placement: impl Into<Placement>, angle: f64) -> Result<()> {
        let placement = placement.into();
        let current = self.transform(placement)?;
        self.set_transform(placement, current.then(&Transform::rotation(angle)))
    }

    /// Mirror a placement about the parent x axis.
    pub fn mirror(&mut self, placement: impl Into<Placement>) -> Result<()> {
        let placement = placement.into();
        let current = self.transform(placement)?;
        self.set_transform(placement, current.then(&Transform::mirror()))
    }

    /// A placement's port in the frame of the component being built.
    pub fn port(&self, placement: impl Into<Placement>, name: &str) -> Result<Port> {
        let (id, transform) = self.placement(placement.into())?;
        let component = self.library.get(&id)?;
        Ok(component.port(name)?.transformed(&transform))
    }

    // ── Connections ──────────────────────────────────────────────────

    /// Move `moving` so its `port` meets `fixed_port` of `fixed`.
    pub fn connect(
        &mut self,
        moving: impl Into<Placement>,
        port: &str,
        fixed: impl Into<Placement>,
        fixed_port: &str,
    ) -> Result<()> {
        self.connect_with(moving, port, fixed, fixed_port, ConnectOptions::default())
    }

    pub fn connect_with(
        &mut self,
        moving: impl Into<Placement>,
        port: &str,
        fixed: impl Into<Placement>,
        fixed_port: &str,
        options: ConnectOptions,
    ) -> Result<()> {
        let target = self.port(fixed, fixed_port)?;
        self.connect_to_port_with(moving, port, &target, options)
    }

    /// Move `moving` so its `port` meets `target`, given in this component's frame.
    pub fn connect_to_port(
        &mut self,
        moving: impl Into<Placement>,
        port: &str,
        target: &Port,
    ) -> Result<()> {
        self.connect_to_port_with(moving, port, target, ConnectOptions::default())
    }

    pub fn connect_to_port_with(
        &mut self,
        moving: impl Into<Placement>,
        port: &str,
        target: &Port,
        options: ConnectOptions,
    ) -> Result<()> {
        let moving = moving.into();
        let (id, _) = self.placement(moving)?;
        let component = self.library.get(&id)?;
        let local = component.port(port)?;
        let resolved = resolver::resolve_with(
            local,
            target,
            self.library.config().width_tolerance,
            options,
        )?;
        let transform = match moving {
            Placement::Instance(_) => self.grid_transform(resolved)?,
            Placement::Virtual(_) => resolved,
        };
        // a snapped rotation no longer meets the target
        if !self.mated(&local.transformed(&transform), target) {
            return Err(LayoutError::OffGridRotation {
                angle: resolved.rotation,
            });
        }
        self.set_transform(moving, transform)?;
        log::debug!(
            "{}: connected {}.{} to {}",
            self.component.name,
            component.name,
            port,
            target.name
        );
        Ok(())
    }

    /// Whether two placements' ports meet face to face, within the
    /// library's position tolerance.
    pub fn ports_mated(
        &self,
        a: impl Into<Placement>,
        a_port: &str,
        b: impl Into<Placement>,
        b_port: &str,
    ) -> Result<bool> {
        let a = self.port(a, a_port)?;
        let b = self.port(b, b_port)?;
        Ok(self.mated(&a, &b))
    }

    // ── Ports ────────────────────────────────────────────────────────

    pub fn declare_port(&mut self, name: &str, position: Point, orientation: f64, width: f64) -> Result<()> {
        self.add_port(Port::new(name, position, orientation, width))
    }

    pub fn add_port(&mut self, port: Port) -> Result<()> {
        if self.component.ports.contains_key(&port.name) {
            return Err(LayoutError::DuplicatePort {
                component: self.component.name.clone(),
                port: port.name,
            });
        }
        self.component.ports.insert(port.name.clone(), port);
        Ok(())
    }

    /// Re-declare a placement's port on the component being built.
    pub fn expose_port(&mut self, placement: impl Into<Placement>, port: &str, as_name: &str) -> Result<()> {
        let exposed = self.port(placement, port)?.renamed(as_name);
        self.add_port(exposed)
    }

    // ── Finish ───────────────────────────────────────────────────────

    /// The finished component, not yet added to the library.
    pub fn build(self) -> Component {
        self.component
    }

    /// Build and add to the library.
    pub fn finish(self) -> Arc<Component> {
        let library = self.library;
        library.add(self.build())
    }

    fn require_known(&self, id: &ComponentId) -> Result<()> {
        if self.library.contains(id) {
            Ok(())
        } else {
            Err(LayoutError::UnknownComponent(*id))
        }
    }

    fn placement(&self, placement: Placement) -> Result<(ComponentId, Transform)> {
        match placement {
            Placement::Instance(InstanceHandle(i)) => self
                .component
                .instances
                .get(i)
                .map(|inst| (inst.component, inst.transform))
                .ok_or(LayoutError::InvalidHandle(i)),
            Placement::Virtual(VirtualHandle(i)) => self
                .component
                .virtual_instances
                .get(i)
                .map(|v| (v.component, v.transform))
                .ok_or(LayoutError::InvalidHandle(i)),
        }
    }

    fn mated(&self, a: &Port, b: &Port) -> bool {
        let eps = self.library.config().position_tolerance;
        a.position.approx_eq(&b.position, eps)
            && angle_difference(a.orientation, b.orientation + 180.0) <= eps
    }

    fn grid_transform(&self, transform: Transform) -> Result<Transform> {
        if transform.is_manhattan() {
            return Ok(Transform {
                rotation: snap_to_grid_angle(transform.rotation),
                ..transform
            });
        }
        match self.library.config().rotation_policy {
            RotationPolicy::Reject => Err(LayoutError::OffGridRotation {
                angle: transform.rotation,
            }),
            RotationPolicy::Snap => {
                let snapped = snap_to_grid_angle(transform.rotation);
                log::warn!(
                    "{}: snapping rotation {} to {}",
                    self.component.name,
                    transform.rotation,
                    snapped
                );
                Ok(Transform {
                    rotation: snapped,
                    ..transform
                })
            }
            RotationPolicy::Free => Ok(transform),
        }
    }
}
