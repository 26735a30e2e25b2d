//! Cache Namespace Module
//!
//! A named partition of the cache with its own key space, insertion-ordered
//! key list and per-key expiry timers.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::manager::{lock, Registry};
use crate::cache::ArmedTimer;

// == Slot ==
#[derive(Debug)]
struct Slot<V> {
    value: V,
    /// Identifies this particular insertion of the key
    seq: u64,
}

// == Namespace State ==
/// Storage behind one namespace. Only reachable through a [`Namespace`] handle.
pub(crate) struct NamespaceState<V> {
    instance: u64,
    values: HashMap<String, Slot<V>>,
    timers: HashMap<String, ArmedTimer>,
    /// Live keys in insertion order
    keys: Vec<String>,
    total: usize,
    next_seq: u64,
}

impl<V> NamespaceState<V> {
    pub(crate) fn new(instance: u64) -> Self {
        Self {
            instance,
            values: HashMap::new(),
            timers: HashMap::new(),
            keys: Vec::new(),
            total: 0,
            next_seq: 0,
        }
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        let slot = self.values.remove(key)?;

        self.total -= 1;
        self.keys.retain(|k| k != key);

        if let Some(timer) = self.timers.remove(key) {
            timer.cancel();
        }

        Some(slot.value)
    }

    fn clear(&mut self) -> usize {
        let removed = self.values.len();

        self.values.clear();
        self.keys.clear();
        self.total = 0;

        for (_, timer) in self.timers.drain() {
            timer.cancel();
        }

        removed
    }
}

impl<V> Drop for NamespaceState<V> {
    fn drop(&mut self) {
        for timer in self.timers.values() {
            timer.cancel();
        }
    }
}

// == Namespace ==
/// Typed handle to a cache namespace owned by a [`CacheManager`].
///
/// Every operation on a freed namespace returns its empty default
/// (`false`, `None`, `0` or an empty list).
///
/// [`CacheManager`]: crate::cache::CacheManager
pub struct Namespace<V> {
    name: Arc<str>,
    instance: u64,
    registry: Arc<Mutex<Registry>>,
    _value: PhantomData<fn() -> V>,
}

impl<V> Clone for Namespace<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            instance: self.instance,
            registry: self.registry.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for Namespace<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("instance", &self.instance)
            .finish()
    }
}

impl<V> Namespace<V>
where
    V: Clone + PartialEq + Send + 'static,
{
    pub(crate) fn new(name: &str, instance: u64, registry: Arc<Mutex<Registry>>) -> Self {
        Self {
            name: Arc::from(name),
            instance,
            registry,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `op` against the live state, or returns `default` if the
    /// namespace no longer exists.
    fn with_state<R>(&self, default: R, op: impl FnOnce(&mut NamespaceState<V>) -> R) -> R {
        with_state(&self.registry, &self.name, self.instance, default, op)
    }

    // == Set ==
    /// Stores `value` under `key` unless the key already exists.
    ///
    /// A `ttl` of `None` or zero stores the entry without expiry. Setting
    /// a TTL requires a running tokio runtime.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        let key = key.into();
        let ttl = ttl.filter(|ttl| !ttl.is_zero());

        self.with_state(false, |state| {
            if state.values.contains_key(&key) {
                return false;
            }

            let seq = state.next_seq;
            state.next_seq += 1;

            if let Some(ttl) = ttl {
                let expiry = Expiry::<V> {
                    registry: Arc::downgrade(&self.registry),
                    name: self.name.clone(),
                    instance: self.instance,
                    key: key.clone(),
                    seq,
                    _value: PhantomData,
                };

                match ArmedTimer::try_spawn(ttl, async move { expiry.run() }) {
                    Some(timer) => {
                        state.timers.insert(key.clone(), timer);
                    }
                    None => {
                        warn!("Cannot arm expiry for {} in {}: no tokio runtime", key, self.name);
                        return false;
                    }
                }
            }

            state.values.insert(key.clone(), Slot { value, seq });
            state.keys.push(key);
            state.total += 1;
            true
        })
    }

    // == Set Force ==
    /// Replaces any entry under `key` with `value`, expiring after `ttl`.
    ///
    /// Returns false without touching the existing entry if `ttl` is zero.
    pub fn set_force(&self, key: impl Into<String>, value: V, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }

        let key = key.into();
        self.delete(&key);
        self.set(key, value, Some(ttl))
    }

    // == Get ==
    /// Returns an independent copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.with_state(None, |state| state.values.get(key).map(|slot| slot.value.clone()))
    }

    // == Has ==
    pub fn has(&self, key: &str) -> bool {
        self.with_state(false, |state| state.values.contains_key(key))
    }

    // == Delete ==
    /// Removes `key` and cancels its expiry timer. False if it was absent.
    pub fn delete(&self, key: &str) -> bool {
        self.with_state(false, |state| state.remove(key).is_some())
    }

    // == Take ==
    /// Removes `key` and returns its value in one step.
    pub fn take(&self, key: &str) -> Option<V> {
        self.with_state(None, |state| state.remove(key))
    }

    // == Equals ==
    /// Compares the stored value with `value`. False if `key` is absent.
    pub fn equals(&self, key: &str, value: &V) -> bool {
        self.with_state(false, |state| {
            state
                .values
                .get(key)
                .is_some_and(|slot| &slot.value == value)
        })
    }

    // == TTL ==
    /// Remaining time before `key` expires; `None` if absent or without expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.with_state(None, |state| state.timers.get(key).map(ArmedTimer::remaining))
    }

    // == Clear ==
    /// Removes every entry, keeping the namespace itself. Returns how many were removed.
    pub fn clear(&self) -> usize {
        self.with_state(0, NamespaceState::clear)
    }

    // == Free ==
    /// Removes the namespace from its manager. Safe to call repeatedly.
    pub fn free(&self) -> bool {
        let mut registry = lock(&self.registry);

        let owned = registry
            .namespaces
            .get(&*self.name)
            .and_then(|state| state.downcast_ref::<NamespaceState<V>>())
            .is_some_and(|state| state.instance == self.instance);

        if owned {
            let state = registry.namespaces.remove(&*self.name);
            drop(registry);
            drop(state);
            debug!("Cache namespace {} freed", self.name);
        }

        owned
    }

    // == Keys ==
    /// Live keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.with_state(Vec::new(), |state| state.keys.clone())
    }

    // == Total ==
    pub fn total(&self) -> usize {
        self.with_state(0, |state| state.total)
    }

    // == Values ==
    /// Copies of every live value, in key insertion order.
    pub fn values(&self) -> Vec<V> {
        self.with_state(Vec::new(), |state| {
            state
                .keys
                .iter()
                .filter_map(|key| state.values.get(key).map(|slot| slot.value.clone()))
                .collect()
        })
    }
}

fn with_state<V: 'static, R>(
    registry: &Mutex<Registry>,
    name: &str,
    instance: u64,
    default: R,
    op: impl FnOnce(&mut NamespaceState<V>) -> R,
) -> R {
    let mut registry = lock(registry);

    match registry
        .namespaces
        .get_mut(name)
        .and_then(|state| state.downcast_mut::<NamespaceState<V>>())
        .filter(|state| state.instance == instance)
    {
        Some(state) => op(state),
        None => default,
    }
}

// == Expiry ==
/// Deletes one key insertion when its TTL elapses.
struct Expiry<V> {
    registry: Weak<Mutex<Registry>>,
    name: Arc<str>,
    instance: u64,
    key: String,
    seq: u64,
    _value: PhantomData<fn() -> V>,
}

impl<V: 'static> Expiry<V> {
    fn run(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        let expire = |state: &mut NamespaceState<V>| {
            // The key may have been deleted and set again since this timer was armed
            let current = state
                .values
                .get(&self.key)
                .is_some_and(|slot| slot.seq == self.seq);
            if !current {
                return None;
            }
            // Drop our own entry first so remove() does not abort this running task
            state.timers.remove(&self.key);
            state.remove(&self.key)
        };
        let expired = with_state(&registry, &self.name, self.instance, None, expire);

        if expired.is_some() {
            debug!("Key {} expired in {}", self.key, self.name);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use crate::cache::CacheManager;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Profile {
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_set_and_get() {
        let ns = CacheManager::new().create::<String>("ns").unwrap();

        assert!(ns.set("key1", "value1".to_string(), None));
        assert_eq!(ns.get("key1"), Some("value1".to_string()));
        assert_eq!(ns.total(), 1);
        assert_eq!(ns.keys(), vec!["key1".to_string()]);
    }

    #[test]
    fn test_set_existing_key_fails() {
        let ns = CacheManager::new().create::<String>("ns").unwrap();

        assert!(ns.set("key1", "value1".to_string(), None));
        assert!(!ns.set("key1", "value2".to_string(), None));

        assert_eq!(ns.get("key1"), Some("value1".to_string()));
        assert_eq!(ns.total(), 1);
    }

    #[test]
    fn test_get_missing() {
        let ns = CacheManager::new().create::<String>("ns").unwrap();
        assert_eq!(ns.get("nope"), None);
        assert!(!ns.has("nope"));
    }

    #[test]
    fn test_get_returns_independent_copy() {
        let ns = CacheManager::new().create::<Profile>("profiles").unwrap();
        let profile = Profile {
            name: "ada".to_string(),
            tags: vec!["admin".to_string()],
        };
        ns.set("ada", profile.clone(), None);

        let mut copy = ns.get("ada").unwrap();
        copy.tags.push("mutated".to_string());

        assert_eq!(ns.get("ada"), Some(profile));
    }

    #[test]
    fn test_delete() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 1, None);
        ns.set("b", 2, None);

        assert!(ns.delete("a"));
        assert!(!ns.delete("a"));
        assert_eq!(ns.keys(), vec!["b".to_string()]);
        assert_eq!(ns.total(), 1);
    }

    #[test]
    fn test_take() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 7, None);

        assert_eq!(ns.take("a"), Some(7));
        assert_eq!(ns.take("a"), None);
        assert_eq!(ns.total(), 0);
    }

    #[test]
    fn test_equals() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 7, None);

        assert!(ns.equals("a", &7));
        assert!(!ns.equals("a", &8));
        assert!(!ns.equals("missing", &7));
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        for key in ["c", "a", "b"] {
            ns.set(key, 0, None);
        }
        ns.delete("a");
        ns.set("a", 1, None);

        assert_eq!(ns.keys(), vec!["c", "b", "a"]);
        assert_eq!(ns.values(), vec![0, 0, 1]);
    }

    #[test]
    fn test_clear() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 1, None);
        ns.set("b", 2, None);

        assert_eq!(ns.clear(), 2);
        assert_eq!(ns.total(), 0);
        assert!(ns.keys().is_empty());
        assert_eq!(ns.clear(), 0);

        // Namespace is still usable after clear
        assert!(ns.set("a", 3, None));
    }

    #[test]
    fn test_free_is_idempotent() {
        let manager = CacheManager::new();
        let ns = manager.create::<i32>("ns").unwrap();
        ns.set("a", 1, None);

        assert!(ns.free());
        assert!(!ns.free());
        assert!(!manager.contains("ns"));

        // Every operation falls back to its empty default
        assert!(!ns.set("b", 2, None));
        assert_eq!(ns.get("a"), None);
        assert!(!ns.has("a"));
        assert!(!ns.delete("a"));
        assert_eq!(ns.take("a"), None);
        assert!(!ns.equals("a", &1));
        assert_eq!(ns.ttl("a"), None);
        assert_eq!(ns.clear(), 0);
        assert!(ns.keys().is_empty());
        assert_eq!(ns.total(), 0);
    }

    #[test]
    fn test_set_with_ttl_outside_runtime_fails() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();

        assert!(!ns.set("a", 1, Some(Duration::from_secs(5))));
        assert!(!ns.has("a"));
        // Zero TTL means no expiry and needs no runtime
        assert!(ns.set("a", 1, Some(Duration::ZERO)));
        assert_eq!(ns.ttl("a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_deletes_entry() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("short", 1, Some(Duration::from_secs(1)));
        ns.set("long", 2, Some(Duration::from_secs(60)));
        ns.set("forever", 3, None);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(!ns.has("short"));
        assert!(ns.has("long"));
        assert!(ns.has("forever"));
        assert_eq!(ns.keys(), vec!["long", "forever"]);
        assert_eq!(ns.total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_remaining() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 1, Some(Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(ns.ttl("a"), Some(Duration::from_secs(7)));
        assert_eq!(ns.ttl("missing"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_cancels_expiry() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 1, Some(Duration::from_secs(2)));
        ns.delete("a");
        ns.set("a", 2, None);

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(ns.get("a"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_force_replaces_entry() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 1, None);

        assert!(!ns.set_force("a", 2, Duration::ZERO));
        assert_eq!(ns.get("a"), Some(1));

        assert!(ns.set_force("a", 2, Duration::from_secs(5)));
        assert_eq!(ns.get("a"), Some(2));
        assert_eq!(ns.total(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!ns.has("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_force_resets_previous_expiry() {
        let ns = CacheManager::new().create::<i32>("ns").unwrap();
        ns.set("a", 1, Some(Duration::from_secs(2)));
        ns.set_force("a", 2, Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(ns.get("a"), Some(2));
        assert_eq!(ns.ttl("a"), Some(Duration::from_secs(7)));
    }
}
