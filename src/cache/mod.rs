//! Bounded, recency-ordered reference cache.
//!
//! [`BoundedCache`] maps string identifiers to arbitrary values and keeps at most
//! `capacity` of them alive. Every [`get`](BoundedCache::get) or
//! [`set`](BoundedCache::set) moves the touched id to the most-recently-used end;
//! once a `set` pushes the entry count above capacity, the least-recently-used
//! entry is dropped and reported to the registered [`EvictionListener`].
//!
//! The template engine uses it to avoid re-reading template files, but nothing in
//! here knows about templates. Owners of expensive values (file handles, parsed
//! templates) subscribe to evictions to release whatever they hold.
//!
//! # Recency bookkeeping
//!
//! Each entry carries a monotonically increasing tick. The value store is a
//! `HashMap<String, (V, tick)>` and the recency index is a `BTreeMap<tick, id>`,
//! so promoting or evicting an entry is `O(log n)`. Both structures always hold
//! exactly the same set of ids.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use xhtpress::cache::BoundedCache;
//!
//! let evicted = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&evicted);
//!
//! let mut cache = BoundedCache::new(2)?;
//! cache.set_listener(move |id: &str, value: &u32| {
//!     sink.lock().unwrap().push((id.to_string(), *value));
//! });
//!
//! cache.set("a", 1);
//! cache.set("b", 2);
//! cache.get("a"); // "b" is now the oldest
//! cache.set("c", 3);
//!
//! assert_eq!(*evicted.lock().unwrap(), vec![("b".to_string(), 2)]);
//! # Ok::<(), xhtpress::cache::CacheError>(())
//! ```
//!
//! # Concurrency
//!
//! The cache does no locking of its own. Share it behind a `Mutex` when renders
//! run on real parallel workers, and never call back into the cache from a
//! listener: notifications are delivered synchronously inside `set`.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Errors raised when constructing a cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A cache must be able to hold at least one entry.
    #[error("cache capacity must be at least 1 (got {capacity})")]
    InvalidCapacity {
        capacity: usize,
    },
}

/// Receives `(id, value)` for every entry evicted by capacity pressure.
///
/// Explicit removals through [`BoundedCache::flush`] and [`BoundedCache::clear`]
/// are not evictions and are never reported.
pub trait EvictionListener<V>: Send + Sync {
    /// Called synchronously from within the `set` that caused the eviction.
    fn on_evict(&self, id: &str, value: &V);
}

impl<V, F> EvictionListener<V> for F
where
    F: Fn(&str, &V) + Send + Sync,
{
    fn on_evict(&self, id: &str, value: &V) {
        self(id, value)
    }
}

/// Forwards eviction records into an unbounded channel.
///
/// Sending never blocks, so the cache never waits for the consumer. Records are
/// silently dropped once the receiving half is gone.
pub struct ChannelListener<V> {
    sender: UnboundedSender<(String, V)>,
}

impl<V> ChannelListener<V> {
    pub fn new(sender: UnboundedSender<(String, V)>) -> Self {
        Self {
            sender,
        }
    }
}

impl<V> EvictionListener<V> for ChannelListener<V>
where
    V: Clone + Send + Sync,
{
    fn on_evict(&self, id: &str, value: &V) {
        let _ = self.sender.send((id.to_string(), value.clone()));
    }
}

/// Fixed-capacity least-recently-used store keyed by string ids.
pub struct BoundedCache<V> {
    capacity: usize,
    entries: HashMap<String, (V, u64)>,
    order: BTreeMap<u64, String>,
    tick: u64,
    listener: Option<Box<dyn EvictionListener<V>>>,
}

impl<V> fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl<V> BoundedCache<V> {
    /// Create an empty cache holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity {
                capacity,
            });
        }

        Ok(Self {
            capacity,
            entries: HashMap::with_capacity(capacity + 1),
            order: BTreeMap::new(),
            tick: 0,
            listener: None,
        })
    }

    /// Register the eviction listener, replacing any previous one.
    pub fn set_listener<L>(&mut self, listener: L)
    where
        L: EvictionListener<V> + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    /// Remove the eviction listener.
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Look up `id`, marking it most-recently-used when present.
    pub fn get(&mut self, id: &str) -> Option<&V> {
        self.tick += 1;
        let tick = self.tick;

        let (value, stamp) = self.entries.get_mut(id)?;
        let previous = std::mem::replace(stamp, tick);
        if let Some(key) = self.order.remove(&previous) {
            self.order.insert(tick, key);
        }
        Some(value)
    }

    /// Store `value` under `id` as the most-recently-used entry.
    ///
    /// Overwriting an existing id only refreshes its recency. Inserting a new id
    /// into a full cache evicts the least-recently-used entry first and reports
    /// it to the listener. Returns the stored value so calls can be chained.
    pub fn set(&mut self, id: impl Into<String>, value: V) -> &V {
        let id = id.into();
        self.tick += 1;
        let tick = self.tick;

        if let Some((_, previous)) = self.entries.get(&id) {
            self.order.remove(previous);
        } else {
            while self.entries.len() >= self.capacity {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        self.order.insert(tick, id.clone());
        match self.entries.entry(id) {
            Entry::Occupied(occupied) => {
                let slot = occupied.into_mut();
                *slot = (value, tick);
                &slot.0
            }
            Entry::Vacant(vacant) => &vacant.insert((value, tick)).0,
        }
    }

    /// Remove `id` without notifying the listener.
    pub fn flush(&mut self, id: &str) -> Option<V> {
        let (value, tick) = self.entries.remove(id)?;
        self.order.remove(&tick);
        Some(value)
    }

    /// Drop every entry without notifying the listener.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Whether `id` is present. Does not touch recency.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids from least- to most-recently-used.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, id)) = self.order.pop_first() else {
            return false;
        };
        if let Some((value, _)) = self.entries.remove(&id) {
            tracing::trace!("Evicting cache entry '{}'", id);
            if let Some(listener) = &self.listener {
                listener.on_evict(&id, &value);
            }
        }
        true
    }
}
