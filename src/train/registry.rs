use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::platform::ChannelId;
use crate::raids::Raid;
use crate::train::state::Train;

/// A keyed cache of canonical instances.
///
/// Two lookups with the same key always return the same `Arc`; the factory
/// runs at most once per key. Entries live for the lifetime of the process:
/// there is no eviction, which is acceptable while the working set (active
/// trains and raids per community) stays small.
pub struct InstanceCache<K, V> {
    entries: Mutex<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> InstanceCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.lock_entries().get(key).cloned()
    }

    /// Returns the canonical instance for `key`, constructing it with
    /// `factory` if it does not exist yet.
    pub fn get_or_create<F: FnOnce() -> V>(&self, key: K, factory: F) -> Arc<V> {
        self.lock_entries()
            .entry(key)
            .or_insert_with(|| Arc::new(factory()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<K, Arc<V>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<K: Eq + Hash, V> Default for InstanceCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide coordinator state: canonical train and raid instances plus
/// the channel-to-train index. Owned by `main` and passed down by reference;
/// nothing reaches for it as a global.
pub struct Registry {
    pub trains: InstanceCache<i64, Train>,
    pub raids: Arc<InstanceCache<String, Raid>>,
    by_channel: Mutex<HashMap<ChannelId, Arc<Train>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            trains: InstanceCache::new(),
            raids: Arc::new(InstanceCache::new()),
            by_channel: Mutex::new(HashMap::new()),
        }
    }

    /// Indexes a train under its dedicated channel. One train per channel,
    /// enforced by construction: channels are created fresh per train.
    pub fn register_channel(&self, channel: ChannelId, train: Arc<Train>) {
        self.lock_by_channel().insert(channel, train);
    }

    pub fn train_for_channel(&self, channel: &ChannelId) -> Option<Arc<Train>> {
        self.lock_by_channel().get(channel).cloned()
    }

    pub fn train_count(&self) -> usize {
        self.trains.len()
    }

    fn lock_by_channel(&self) -> MutexGuard<'_, HashMap<ChannelId, Arc<Train>>> {
        match self.by_channel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
