//! Factory registry and the memoizing component cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::component::Component;
use crate::error::{LayoutError, Result};
use crate::library::Library;
use crate::params::{canonicalize, CacheKey, ComponentSpec, ParamValue, Params};

/// Builds a component from a complete parameter set.
///
/// The library is passed in so a factory can request the sub-components it
/// places; there is no ambient "current library".
pub type FactoryFn = Arc<dyn Fn(&Library, &Params) -> Result<Component> + Send + Sync>;

/// A registered factory and the parameters it accepts.
#[derive(Clone)]
pub struct Factory {
    pub id: String,
    /// Every parameter the factory accepts, with its default value.
    pub defaults: Params,
    build: FactoryFn,
}

impl Factory {
    pub fn build(&self, library: &Library, params: &Params) -> Result<Component> {
        (self.build)(library, params)
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("id", &self.id)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// The closed set of factories a library can build from.
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Factory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `id`.
    ///
    /// Defaults must be cacheable; nested spec defaults are checked when the
    /// factory is first called, since they may name factories registered later.
    pub fn register<F>(&mut self, id: &str, defaults: Params, build: F) -> Result<()>
    where
        F: Fn(&Library, &Params) -> Result<Component> + Send + Sync + 'static,
    {
        if self.factories.contains_key(id) {
            return Err(LayoutError::DuplicateFactory(id.to_string()));
        }
        canonicalize(id, &defaults, &|spec: &ComponentSpec| -> Result<CacheKey> {
            Ok(CacheKey {
                factory: spec.factory.clone(),
                canonical: String::new(),
            })
        })?;
        log::debug!("registered factory '{}' ({} parameters)", id, defaults.len());
        self.factories.insert(
            id.to_string(),
            Factory {
                id: id.to_string(),
                defaults,
                build: Arc::new(build),
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Factory> {
        self.factories
            .get(id)
            .ok_or_else(|| LayoutError::UnknownFactory(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// The full parameter set a spec resolves to: its overrides on top of
    /// the factory defaults.
    ///
    /// A bare factory name given for a parameter whose default is a spec is
    /// read as that spec, so both spellings produce one key.
    pub fn resolve_params(&self, spec: &ComponentSpec) -> Result<Params> {
        let factory = self.get(&spec.factory)?;
        if let Some((name, _)) = spec
            .params
            .iter()
            .find(|(name, _)| !factory.defaults.contains(name))
        {
            return Err(LayoutError::UnknownParameter {
                factory: spec.factory.clone(),
                parameter: name.clone(),
            });
        }
        let mut params = factory.defaults.merged(&spec.params);
        let respelled: Vec<(String, ComponentSpec)> = factory
            .defaults
            .iter()
            .filter(|(_, default)| matches!(default, ParamValue::Spec(_)))
            .filter_map(|(name, _)| match params.get(name) {
                Some(ParamValue::Str(id)) => Some((name.clone(), ComponentSpec::new(id))),
                _ => None,
            })
            .collect();
        for (name, nested) in respelled {
            params.set(&name, nested);
        }
        Ok(params)
    }

    /// Cache key of a spec, with nested specs resolved to their own keys.
    ///
    /// A spec that nests itself, directly or through other factories, is
    /// reported as `CyclicHierarchy`.
    pub fn key_for(&self, spec: &ComponentSpec) -> Result<CacheKey> {
        self.key_within(spec, &[])
    }

    fn key_within(&self, spec: &ComponentSpec, outer: &[(String, Params)]) -> Result<CacheKey> {
        let params = self.resolve_params(spec)?;
        if outer
            .iter()
            .any(|(factory, p)| *factory == spec.factory && *p == params)
        {
            let mut path: Vec<String> = outer.iter().map(|(factory, _)| factory.clone()).collect();
            path.push(spec.factory.clone());
            return Err(LayoutError::CyclicHierarchy { path });
        }
        let mut chain = outer.to_vec();
        chain.push((spec.factory.clone(), params.clone()));
        canonicalize(&spec.factory, &params, &|nested: &ComponentSpec| {
            self.key_within(nested, &chain)
        })
    }
}

/// Which thread is building which keys, and which key each blocked thread
/// is waiting for.
#[derive(Debug, Default)]
struct InFlight {
    building: HashMap<ThreadId, Vec<CacheKey>>,
    waiting: HashMap<ThreadId, CacheKey>,
}

impl InFlight {
    fn owner(&self, key: &CacheKey) -> Option<ThreadId> {
        self.building
            .iter()
            .find(|(_, keys)| keys.contains(key))
            .map(|(thread, _)| *thread)
    }

    /// The factories on the wait chain from `me` through `key`, if waiting
    /// for `key` would block `me` on itself.
    fn cycle(&self, me: ThreadId, key: &CacheKey) -> Option<Vec<String>> {
        let mut path: Vec<String> = self
            .building
            .get(&me)
            .map(|keys| keys.iter().map(|k| k.factory.clone()).collect())
            .unwrap_or_default();
        path.push(key.factory.clone());

        let mut next = key;
        for _ in 0..=self.waiting.len() {
            let owner = self.owner(next)?;
            if owner == me {
                return Some(path);
            }
            next = self.waiting.get(&owner)?;
            path.push(next.factory.clone());
        }
        None
    }
}

/// Marks `key` as being built by the current thread until dropped.
struct Building<'a> {
    in_flight: &'a Mutex<InFlight>,
    thread: ThreadId,
}

impl<'a> Building<'a> {
    fn enter(in_flight: &'a Mutex<InFlight>, thread: ThreadId, key: &CacheKey) -> Self {
        let mut flight = lock(in_flight);
        flight.waiting.remove(&thread);
        flight.building.entry(thread).or_default().push(key.clone());
        Self { in_flight, thread }
    }
}

impl Drop for Building<'_> {
    fn drop(&mut self) {
        let mut flight = lock(self.in_flight);
        if let Some(keys) = flight.building.get_mut(&self.thread) {
            keys.pop();
            if keys.is_empty() {
                flight.building.remove(&self.thread);
            }
        }
    }
}

type Slot = Arc<Mutex<Option<Arc<Component>>>>;

/// Memoizes built components by cache key.
///
/// Each key has its own lock, held for the duration of its build: a second
/// caller for the same key waits and then receives the first caller's
/// result, while builds of different keys proceed independently. A failed
/// build leaves the slot empty.
///
/// Before blocking on a key, a caller checks whether the key's builder is
/// itself waiting, directly or transitively, on the caller. Such a request
/// fails with `CyclicHierarchy` on whichever thread closes the loop.
#[derive(Debug, Default)]
pub struct FactoryCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    in_flight: Mutex<InFlight>,
    builds: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FactoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build<F>(&self, key: &CacheKey, build: F) -> Result<Arc<Component>>
    where
        F: FnOnce() -> Result<Arc<Component>>,
    {
        let me = thread::current().id();
        {
            let mut flight = lock(&self.in_flight);
            if let Some(path) = flight.cycle(me, key) {
                return Err(LayoutError::CyclicHierarchy { path });
            }
            flight.waiting.insert(me, key.clone());
        }
        let slot = lock(&self.slots).entry(key.clone()).or_default().clone();

        let mut entry = lock(&slot);
        let _building = Building::enter(&self.in_flight, me, key);
        if let Some(component) = entry.as_ref() {
            log::debug!("cache hit: {}", key);
            return Ok(component.clone());
        }

        log::debug!("cache miss: {}", key);
        let component = build()?;
        self.builds.fetch_add(1, Ordering::SeqCst);
        *entry = Some(component.clone());
        Ok(component)
    }

    /// The cached component for `key`, if one has been built.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Component>> {
        let slot = lock(&self.slots).get(key).cloned()?;
        let entry = lock(&slot);
        entry.clone()
    }

    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of builds that have run, across all keys.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }
}
