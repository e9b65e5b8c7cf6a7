use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::builder::ComponentBuilder;
use crate::component::{Component, ComponentId, VirtualInstance};
use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::factory::{FactoryCache, FactoryRegistry};
use crate::flatten::{self, ComponentLookup, FlattenOptions};
use crate::geometry::BBox;
use crate::params::{ComponentSpec, Params};

/// The component arena plus the factories and cache that fill it.
///
/// Every component that can be instanced lives here as an `Arc<Component>`
/// keyed by id; instances refer to components by id only. All methods take
/// `&self`, so one library can be shared across threads.
pub struct Library {
    config: LayoutConfig,
    registry: FactoryRegistry,
    cache: FactoryCache,
    components: RwLock<HashMap<ComponentId, Arc<Component>>>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    components: Vec<Component>,
}

impl Default for Library {
    fn default() -> Self {
        Self::new(FactoryRegistry::new())
    }
}

impl Library {
    pub fn new(registry: FactoryRegistry) -> Self {
        Self::with_config(registry, LayoutConfig::default())
    }

    pub fn with_config(registry: FactoryRegistry, config: LayoutConfig) -> Self {
        Self {
            config,
            registry,
            cache: FactoryCache::new(),
            components: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ComponentId, Arc<Component>>> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ComponentId, Arc<Component>>> {
        self.components
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Component arena ──────────────────────────────────────────────

    /// Start building a new component placed against this library.
    pub fn new_component(&self, name: &str) -> ComponentBuilder<'_> {
        ComponentBuilder::new(self, name)
    }

    /// Freeze `component` and make it available for instancing.
    pub fn add(&self, component: Component) -> Arc<Component> {
        let component = Arc::new(component);
        self.write().insert(component.id, component.clone());
        component
    }

    pub fn get(&self, id: &ComponentId) -> Result<Arc<Component>> {
        self.read()
            .get(id)
            .cloned()
            .ok_or(LayoutError::UnknownComponent(*id))
    }

    pub fn contains(&self, id: &ComponentId) -> bool {
        self.read().contains_key(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Component>> {
        self.read().values().find(|c| c.name == name).cloned()
    }

    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().values().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // ── Factories ────────────────────────────────────────────────────

    /// Build (or fetch the cached) component for `factory` called with `params`.
    pub fn build_component(&self, factory: &str, params: &Params) -> Result<Arc<Component>> {
        self.get_component(&ComponentSpec {
            factory: factory.to_string(),
            params: params.clone(),
        })
    }

    /// Build (or fetch the cached) component a spec describes.
    ///
    /// Equal specs return the same `Arc`, and at most one build runs per
    /// distinct key even when called from several threads at once.
    pub fn get_component(&self, spec: &ComponentSpec) -> Result<Arc<Component>> {
        let key = self.registry.key_for(spec)?;
        let factory = self.registry.get(&spec.factory)?;
        self.cache.get_or_build(&key, || {
            let params = self.registry.resolve_params(spec)?;
            let mut component = factory.build(self, &params)?;
            component.id = key.component_id();
            component.name = key.component_name();
            log::info!(
                "built '{}': {} primitives, {} instances, {} ports",
                component.name,
                component.primitives.len(),
                component.instances.len(),
                component.ports.len()
            );
            Ok(self.add(component))
        })
    }

    /// Forget every cached build. Components stay in the arena, so existing
    /// instances remain valid; the next request for a key rebuilds it.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &FactoryCache {
        &self.cache
    }

    // ── Flattening ───────────────────────────────────────────────────

    pub fn flatten(&self, component: &Component, options: FlattenOptions) -> Result<Component> {
        flatten::flatten(self, component, options)
    }

    pub fn flatten_id(&self, id: &ComponentId, options: FlattenOptions) -> Result<Component> {
        let component = self.get(id)?;
        self.flatten(&component, options)
    }

    pub fn flatten_virtual(&self, name: &str, placements: &[VirtualInstance]) -> Result<Component> {
        flatten::flatten_virtual(self, name, placements)
    }

    /// Bounding box of everything `component` draws, sub-components included.
    pub fn bbox(&self, component: &Component) -> Result<Option<BBox>> {
        Ok(self
            .flatten(component, FlattenOptions::default())?
            .local_bbox())
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String> {
        let mut components: Vec<Component> =
            self.read().values().map(|c| c.as_ref().clone()).collect();
        components.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(serde_json::to_string_pretty(&Snapshot { components })?)
    }

    /// Add every component in a snapshot to the arena. Returns how many were loaded.
    ///
    /// References are not validated here; flattening reports missing or
    /// cyclic ones.
    pub fn load_json(&self, json: &str) -> Result<usize> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let count = snapshot.components.len();
        let mut components = self.write();
        for component in snapshot.components {
            components.insert(component.id, Arc::new(component));
        }
        log::info!("loaded {} components", count);
        Ok(count)
    }
}

impl ComponentLookup for Library {
    fn lookup(&self, id: &ComponentId) -> Result<Arc<Component>> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Instance;
    use crate::geometry::{GeomPrimitive, Point, Rect};
    use crate::port::Port;
    use crate::transform::Transform;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn straight_registry(builds: Arc<AtomicUsize>) -> FactoryRegistry {
        let mut reg = FactoryRegistry::new();
        reg.register(
            "straight",
            Params::new().with("length", 10.0).with("width", 0.5),
            move |_, p| {
                builds.fetch_add(1, Ordering::SeqCst);
                let (length, width) = (p.f64("length")?, p.f64("width")?);
                let mut c = Component::new("straight");
                c.primitives.push(GeomPrimitive::Rect(Rect::new(
                    1,
                    0.0,
                    -width / 2.0,
                    length,
                    width / 2.0,
                )));
                c.ports.insert(
                    "o1".into(),
                    Port::new("o1", Point::origin(), 180.0, width),
                );
                c.ports.insert(
                    "o2".into(),
                    Port::new("o2", Point::new(length, 0.0), 0.0, width),
                );
                Ok(c)
            },
        )
        .unwrap();
        reg
    }

    #[test]
    fn test_library_create() {
        let lib = Library::default();
        assert_eq!(lib.len(), 0);
        assert!(lib.registry().is_empty());
    }

    #[test]
    fn test_add_and_find_component() {
        let lib = Library::default();
        let c = lib.add(Component::new("inverter"));
        assert_eq!(lib.len(), 1);
        assert!(lib.contains(&c.id));
        assert_eq!(lib.find_by_name("inverter").unwrap().id, c.id);
    }

    #[test]
    fn test_same_params_same_component() {
        let builds = Arc::new(AtomicUsize::new(0));
        let lib = Library::new(straight_registry(builds.clone()));
        let params = Params::new().with("length", 4.0).with("width", 4.0);
        let a = lib.build_component("straight", &params).unwrap();
        let b = lib.build_component("straight", &params).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(a.name.starts_with("straight_"));

        let c = lib
            .build_component("straight", &Params::new().with("length", 5.0))
            .unwrap();
        assert_ne!(a.id, c.id);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_clear_rebuilds_with_same_id() {
        let builds = Arc::new(AtomicUsize::new(0));
        let lib = Library::new(straight_registry(builds.clone()));
        let a = lib.build_component("straight", &Params::new()).unwrap();
        lib.clear_cache();
        let b = lib.build_component("straight", &Params::new()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.id, b.id);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_nan_parameter_fails() {
        let lib = Library::new(straight_registry(Arc::new(AtomicUsize::new(0))));
        let err = lib
            .build_component("straight", &Params::new().with("length", f64::NAN))
            .unwrap_err();
        assert!(matches!(err, LayoutError::NonCacheableParameter { .. }));
        assert!(lib.is_empty());
    }

    #[test]
    fn test_self_nesting_factory_fails_instead_of_recursing() {
        let mut reg = FactoryRegistry::new();
        reg.register(
            "spiral",
            Params::new().with("inner", ComponentSpec::new("spiral")),
            |lib, p| {
                let inner = lib.get_component(&p.spec("inner")?)?;
                let mut b = lib.new_component("spiral");
                b.add_ref(&inner)?;
                Ok(b.build())
            },
        )
        .unwrap();
        let lib = Library::new(reg);
        assert!(matches!(
            lib.build_component("spiral", &Params::new()),
            Err(LayoutError::CyclicHierarchy { .. })
        ));
        assert!(lib.cache().is_empty());
        assert!(lib.is_empty());
    }

    #[test]
    fn test_bbox_includes_children() {
        let lib = Library::new(straight_registry(Arc::new(AtomicUsize::new(0))));
        let wg = lib.build_component("straight", &Params::new()).unwrap();
        let mut top = Component::new("top");
        top.instances
            .push(Instance::new(wg.id, Transform::translate(0.0, 10.0)));
        let bb = lib.bbox(&top).unwrap().unwrap();
        assert!((bb.max.x - 10.0).abs() < 1e-12);
        assert!((bb.min.y - 9.75).abs() < 1e-12);
    }

    #[test]
    fn test_json_round_trip_and_cycle() {
        let lib = Library::default();
        let mut a = Component::new("a");
        let mut b = Component::new("b");
        a.instances.push(Instance::new(b.id, Transform::identity()));
        b.instances.push(Instance::new(a.id, Transform::identity()));
        let a_id = a.id;
        lib.add(a);
        lib.add(b);
        let json = lib.to_json().unwrap();

        let restored = Library::default();
        assert_eq!(restored.load_json(&json).unwrap(), 2);
        assert_eq!(restored.component_names(), vec!["a", "b"]);
        let err = restored
            .flatten_id(&a_id, FlattenOptions::default())
            .unwrap_err();
        assert!(matches!(err, LayoutError::CyclicHierarchy { .. }));
    }
}
