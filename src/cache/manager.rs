//! Cache Manager Module
//!
//! Owns the state of every cache namespace in the process. Consumers get
//! typed [`Namespace`] handles from [`CacheManager::create`].

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::cache::namespace::{Namespace, NamespaceState};
use crate::error::CacheError;

// == Registry ==
/// Namespace states keyed by name. Values are `NamespaceState<V>` behind `Any`.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) namespaces: HashMap<String, Box<dyn Any + Send>>,
    /// Incremented per created namespace so stale handles never reach a
    /// namespace recreated under the same name.
    next_instance: u64,
}

/// Locks the registry, recovering the guard if a holder panicked.
pub(crate) fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Cache Manager ==
/// Process-wide owner of all cache namespaces.
///
/// Cheap to clone; clones share the same namespaces.
#[derive(Clone, Default)]
pub struct CacheManager {
    registry: Arc<Mutex<Registry>>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    // == Create ==
    /// Creates an empty namespace named `name` holding values of type `V`.
    ///
    /// Fails if a namespace with the same name already exists.
    pub fn create<V>(&self, name: &str) -> Result<Namespace<V>, CacheError>
    where
        V: Clone + PartialEq + Send + 'static,
    {
        let mut registry = lock(&self.registry);

        if registry.namespaces.contains_key(name) {
            return Err(CacheError::NamespaceExists(name.to_string()));
        }

        let instance = registry.next_instance;
        registry.next_instance += 1;
        registry
            .namespaces
            .insert(name.to_string(), Box::new(NamespaceState::<V>::new(instance)));

        debug!("Cache namespace {} created", name);
        Ok(Namespace::new(name, instance, self.registry.clone()))
    }

    // == Remove ==
    /// Drops the namespace `name` with all of its entries and expiry timers.
    pub fn remove(&self, name: &str) -> bool {
        let removed = lock(&self.registry).namespaces.remove(name);
        removed.is_some()
    }

    // == Flush All ==
    /// Drops every namespace. Returns how many existed.
    pub fn flush_all(&self) -> usize {
        let drained: Vec<_> = lock(&self.registry).namespaces.drain().collect();
        drained.len()
    }

    // == Contains ==
    pub fn contains(&self, name: &str) -> bool {
        lock(&self.registry).namespaces.contains_key(name)
    }

    /// Number of live namespaces.
    pub fn len(&self) -> usize {
        lock(&self.registry).namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.registry);
        let mut names: Vec<&String> = registry.namespaces.keys().collect();
        names.sort();
        f.debug_struct("CacheManager")
            .field("namespaces", &names)
            .finish()
    }
}
