//! Class-keyed metadata cache
//!
//! A dual map that either strongly or weakly retains the value computed
//! for a type key, depending on whether the key's defining scope is
//! visible from the scope the map was created with. Strong entries live in
//! a concurrent map with atomic insert-if-absent publishing; weak entries
//! live behind a narrow lock, keyed by type-key id, and hold the key only
//! weakly so a type that becomes unreachable everywhere else takes its
//! entry with it.
//!
//! The compute function must be a pure function of the key and may run
//! more than once concurrently for the same key; whichever result is
//! published first wins and the losers are discarded, so computed values
//! must be interchangeable. Compute failures propagate to the calling
//! `get` uncached.

use crate::retention::RetentionMode;
use dashmap::DashMap;
use lariat_core::scope::LoaderScope;
use lariat_core::types::{TypeKey, WeakTypeKey};
use lariat_core::LinkResult;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

struct WeakSlot<T> {
    key: WeakTypeKey,
    value: Arc<T>,
}

/// Per-class cache of lazily computed, immutable metadata
pub struct ClassMap<T> {
    strong: DashMap<TypeKey, Arc<T>>,
    weak: Mutex<FxHashMap<u64, WeakSlot<T>>>,
    scope: LoaderScope,
    compute: Box<dyn Fn(&TypeKey) -> LinkResult<Arc<T>> + Send + Sync>,
}

impl<T> ClassMap<T> {
    /// Create a class map owned by `scope`; keys defined in `scope` or one
    /// of its ancestors are retained strongly, all others weakly
    pub fn new(
        scope: LoaderScope,
        compute: impl Fn(&TypeKey) -> LinkResult<Arc<T>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            strong: DashMap::new(),
            weak: Mutex::new(FxHashMap::default()),
            scope,
            compute: Box::new(compute),
        }
    }

    /// The scope that governs strong referenceability of this map
    pub fn scope(&self) -> &LoaderScope {
        &self.scope
    }

    /// Return the value for `key`, computing and publishing it on a miss
    pub fn get(&self, key: &TypeKey) -> LinkResult<Arc<T>> {
        // Check the fastest first: entries we are allowed to pin.
        if let Some(value) = self.strong.get(key) {
            return Ok(value.clone());
        }
        // Entries whose key we must not pin.
        {
            let weak = self.weak.lock();
            if let Some(slot) = weak.get(&key.id()) {
                if slot.key.upgrade().is_some() {
                    return Ok(slot.value.clone());
                }
            }
        }
        // Not found in either place; compute a new value. This may race
        // with another thread computing for the same key.
        let new_value = (self.compute)(key)?;
        match RetentionMode::for_scopes(&self.scope, key.scope()) {
            RetentionMode::Strong => {
                // Atomic insert-if-absent: the first published value wins,
                // a freshly computed loser is discarded.
                Ok(self
                    .strong
                    .entry(key.clone())
                    .or_insert(new_value)
                    .value()
                    .clone())
            }
            RetentionMode::Weak => {
                let mut weak = self.weak.lock();
                // Re-check under the lock: another thread may have
                // published while we were computing.
                if let Some(slot) = weak.get(&key.id()) {
                    if slot.key.upgrade().is_some() {
                        return Ok(slot.value.clone());
                    }
                }
                weak.retain(|_, slot| slot.key.upgrade().is_some());
                weak.insert(
                    key.id(),
                    WeakSlot {
                        key: key.downgrade(),
                        value: new_value.clone(),
                    },
                );
                Ok(new_value)
            }
        }
    }

    /// Drop weak entries whose key has been reclaimed
    pub fn sweep(&self) {
        self.weak.lock().retain(|_, slot| slot.key.upgrade().is_some());
    }

    /// Number of strongly retained entries
    pub fn strong_count(&self) -> usize {
        self.strong.len()
    }

    /// Number of weak slots currently present (dead slots included until
    /// the next sweep)
    pub fn weak_count(&self) -> usize {
        self.weak.lock().len()
    }
}
