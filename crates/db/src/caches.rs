// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The manager's runtime-object cache.
//!
//! Invalidation is driven by a reverse-dependency index: when an object's
//! resolved view is cached, every ancestor in its chain records it as a
//! dependent. A mutation then evicts the mutated id and exactly its
//! recorded dependents, never a whole-cache scan. Eviction is
//! conservative: evict and lazily reload, never patch in place.

use crate::manager::RuntimeObject;
use ahash::AHasher;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use wold_var::Obj;

lazy_static! {
    /// Global statistics for the runtime-object cache.
    pub static ref RUNTIME_CACHE_STATS: CacheStats = CacheStats::new();
}

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn evicted(&self, n: u64) {
        self.evictions.fetch_add(n, Ordering::Relaxed);
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

type ObjHash = BuildHasherDefault<AHasher>;

#[derive(Default)]
struct Inner {
    entries: HashMap<Obj, Arc<RuntimeObject>, ObjHash>,
    /// ancestor id → cached objects whose resolved chain passes through it
    /// (each entry also depends on itself).
    dependents: HashMap<Obj, HashSet<Obj, ObjHash>, ObjHash>,
}

pub(crate) struct RuntimeCache {
    inner: Mutex<Inner>,
    /// Bumped on every invalidation. A fill that observed an older value
    /// raced a mutation and is dropped; the next load re-reads the store.
    epoch: AtomicU64,
}

impl RuntimeCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn lookup(&self, id: &Obj) -> Option<Arc<RuntimeObject>> {
        let inner = self.inner.lock().unwrap();
        let result = inner.entries.get(id).cloned();
        if result.is_some() {
            RUNTIME_CACHE_STATS.hit();
        } else {
            RUNTIME_CACHE_STATS.miss();
        }
        result
    }

    /// Insert a freshly resolved view, registering it against every
    /// ancestor in its chain. Dropped if any invalidation happened since
    /// `observed_epoch` was read.
    pub fn fill(&self, ro: Arc<RuntimeObject>, observed_epoch: u64) {
        let mut inner = self.inner.lock().unwrap();
        if self.epoch.load(Ordering::Acquire) != observed_epoch {
            return;
        }
        let id = ro.id();
        for ancestor in ro.chain() {
            inner.dependents.entry(*ancestor).or_default().insert(id);
        }
        inner.entries.insert(id, ro);
    }

    /// Evict `id` and every cached object whose resolution depended on it.
    /// Returns how many entries went.
    pub fn invalidate(&self, id: &Obj) -> usize {
        let mut inner = self.inner.lock().unwrap();
        self.epoch.fetch_add(1, Ordering::AcqRel);

        let mut victims: HashSet<Obj, ObjHash> = HashSet::default();
        victims.insert(*id);
        if let Some(deps) = inner.dependents.get(id) {
            victims.extend(deps.iter().copied());
        }

        let mut evicted = 0;
        for victim in &victims {
            if let Some(ro) = inner.entries.remove(victim) {
                evicted += 1;
                // Unregister from every ancestor so the index doesn't
                // accrete stale entries.
                for ancestor in ro.chain() {
                    if let Some(deps) = inner.dependents.get_mut(ancestor) {
                        deps.remove(victim);
                    }
                }
            }
        }
        inner.dependents.remove(id);
        RUNTIME_CACHE_STATS.evicted(evicted);
        evicted as usize
    }

    #[cfg(test)]
    pub fn cached_ids(&self) -> Vec<Obj> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<_> = inner.entries.keys().copied().collect();
        ids.sort();
        ids
    }
}
