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

//! The object manager: the single authoritative in-process view of live
//! objects, and the `$` global that method bodies see.
//!
//! All reads and writes funnel through here so caching and persistence
//! never diverge. Mutations for a given id are serialized through a per-id
//! lock; every mutation hits the store before the cache is touched, and a
//! failed persist aborts without touching the cache at all.

use crate::caches::RuntimeCache;
use crate::config::{DatabaseConfig, RetryConfig};
use crate::fjall_store::FjallObjectStore;
use crate::resolver::{RecordSource, Resolver};
use crate::store::ObjectStore;
use crate::transient::TransientStore;
use ahash::AHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::BuildHasherDefault;
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};
use wold_common::model::{
    LoaderInterface, MethodDef, Methods, ObjectError, ObjectRecord, Properties,
};
use wold_var::{Obj, Symbol, Var};

/// A resolved, queryable view of one entity: its own record plus the
/// chain its lookups walk. Read-mostly; handed out by the manager and
/// discarded wholesale on invalidation. It never reaches into another
/// object's internals except through the manager.
#[derive(Debug)]
pub struct RuntimeObject {
    record: ObjectRecord,
    chain: Vec<Obj>,
    manager: Weak<ObjectManager>,
}

impl RuntimeObject {
    #[must_use]
    pub fn id(&self) -> Obj {
        self.record.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<Obj> {
        self.record.parent
    }

    /// The ancestor chain this view was resolved against, self-first.
    #[must_use]
    pub fn chain(&self) -> &[Obj] {
        &self.chain
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.record.name.as_deref()
    }

    #[must_use]
    pub fn record(&self) -> &ObjectRecord {
        &self.record
    }

    /// The methods defined directly on this object (not inherited).
    #[must_use]
    pub fn own_methods(&self) -> &Methods {
        &self.record.methods
    }

    #[must_use]
    pub fn own_properties(&self) -> &Properties {
        &self.record.properties
    }

    /// Resolve a property from this object's id, walking the live chain
    /// through the manager. Returns the value and the defining object.
    pub fn get_property(&self, name: Symbol) -> Result<(Var, Obj), ObjectError> {
        self.manager()?.resolve_property(&self.record.id, name)
    }

    /// Resolve a method from this object's id, walking the live chain
    /// through the manager.
    pub fn resolve_method(&self, name: Symbol) -> Result<(MethodDef, Obj), ObjectError> {
        self.manager()?.resolve_method(&self.record.id, name)
    }

    fn manager(&self) -> Result<Arc<ObjectManager>, ObjectError> {
        self.manager
            .upgrade()
            .ok_or_else(|| ObjectError::StoreUnavailable("object manager shut down".to_string()))
    }
}

type ObjHash = BuildHasherDefault<AHasher>;

pub struct ObjectManager {
    store: Arc<dyn ObjectStore>,
    resolver: Resolver,
    cache: RuntimeCache,
    write_locks: Mutex<HashMap<Obj, Arc<Mutex<()>>, ObjHash>>,
    retry: RetryConfig,
}

impl RecordSource for ObjectManager {
    fn record(&self, id: &Obj) -> Result<ObjectRecord, ObjectError> {
        if let Some(ro) = self.cache.lookup(id) {
            return Ok(ro.record.clone());
        }
        self.fetch_record(id)
    }
}

impl ObjectManager {
    pub fn new(store: Arc<dyn ObjectStore>, config: &DatabaseConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            resolver: Resolver::new(config),
            cache: RuntimeCache::new(),
            write_locks: Mutex::new(HashMap::default()),
            retry: config.retry.clone(),
        })
    }

    /// Open a durable world at `path`. The second return is whether the
    /// keyspace was freshly created (i.e. bootstrap content is needed).
    pub fn with_fjall(path: &Path, config: &DatabaseConfig) -> Result<(Arc<Self>, bool), ObjectError> {
        let (store, fresh) = FjallObjectStore::open(path)?;
        Ok((Self::new(Arc::new(store), config), fresh))
    }

    /// An ephemeral, in-memory world.
    pub fn transient(config: &DatabaseConfig) -> Arc<Self> {
        Self::new(Arc::new(TransientStore::new()), config)
    }

    /// Fetch a cached handle for `id`, or resolve one from the store.
    pub fn load(self: &Arc<Self>, id: &Obj) -> Result<Arc<RuntimeObject>, ObjectError> {
        if let Some(ro) = self.cache.lookup(id) {
            return Ok(ro);
        }
        // Epoch is read before the store; if any invalidation lands while
        // we resolve, the fill below is dropped and the next load retries.
        let epoch = self.cache.epoch();
        let record = self.fetch_record(id)?;
        let chain = self.resolver.chain(self.as_ref(), id)?;
        let ro = Arc::new(RuntimeObject {
            record,
            chain,
            manager: Arc::downgrade(self),
        });
        self.cache.fill(ro.clone(), epoch);
        Ok(ro)
    }

    /// Allocate a new id and persist a record under `parent` with the
    /// given initial own-properties.
    pub fn instantiate(
        self: &Arc<Self>,
        parent: Option<&Obj>,
        overrides: Properties,
    ) -> Result<Arc<RuntimeObject>, ObjectError> {
        if let Some(p) = parent {
            // Fail before burning an id on a dangling parent.
            self.fetch_record(p)?;
        }
        let id = self.with_retry("next_id", || self.store.next_id())?;
        let mut record = ObjectRecord::new(id, parent.copied());
        record.properties = overrides;
        self.put_with_retry(&record)?;
        debug!(%id, parent = ?parent, "instantiated object");
        self.load(&id)
    }

    /// Loader path: persist a record under a caller-assigned id.
    pub fn create_with_id(
        &self,
        id: &Obj,
        parent: Option<&Obj>,
        name: Option<String>,
        location: Option<Obj>,
    ) -> Result<(), ObjectError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap();
        if self.with_retry("get", || self.store.get(id))?.is_some() {
            return Err(ObjectError::ObjectAlreadyExists(*id));
        }
        if let Some(p) = parent {
            self.fetch_record(p)?;
        }
        let mut record = ObjectRecord::new(*id, parent.copied());
        record.name = name;
        record.location = location;
        self.put_with_retry(&record)?;
        self.cache.invalidate(id);
        Ok(())
    }

    pub fn resolve_property(&self, id: &Obj, name: Symbol) -> Result<(Var, Obj), ObjectError> {
        self.resolver.resolve_property(self, id, name)
    }

    pub fn resolve_method(&self, id: &Obj, name: Symbol) -> Result<(MethodDef, Obj), ObjectError> {
        self.resolver.resolve_method(self, id, name)
    }

    pub fn chain(&self, id: &Obj) -> Result<Vec<Obj>, ObjectError> {
        self.resolver.chain(self, id)
    }

    /// The read surface for live method-editing tooling.
    pub fn own_methods(&self, id: &Obj) -> Result<Methods, ObjectError> {
        Ok(self.fetch_record(id)?.methods)
    }

    pub fn valid(&self, id: &Obj) -> Result<bool, ObjectError> {
        Ok(self.with_retry("get", || self.store.get(id))?.is_some())
    }

    pub fn max_object(&self) -> Result<Option<Obj>, ObjectError> {
        self.with_retry("max_id", || self.store.max_id())
    }

    pub fn children_of(&self, id: &Obj) -> Result<Vec<Obj>, ObjectError> {
        self.with_retry("children_of", || self.store.children_of(id))
    }

    /// The full descendant tree below `id`, breadth-first. Bounded by a
    /// visited set so a corrupt store cannot loop it.
    pub fn descendants_of(&self, id: &Obj) -> Result<Vec<Obj>, ObjectError> {
        let mut out = Vec::new();
        let mut seen: HashSet<Obj, ObjHash> = HashSet::default();
        let mut queue = VecDeque::from([*id]);
        seen.insert(*id);
        while let Some(cur) = queue.pop_front() {
            for kid in self.children_of(&cur)? {
                if seen.insert(kid) {
                    out.push(kid);
                    queue.push_back(kid);
                }
            }
        }
        Ok(out)
    }

    /// Set one own-property. Persists before the cache is touched; the
    /// mutated object and every cached descendant are evicted.
    pub fn set_property(&self, id: &Obj, name: Symbol, value: Var) -> Result<(), ObjectError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap();
        let mut record = self.fetch_record(id)?;
        record.properties.insert(name, value);
        self.put_with_retry(&record)?;
        let evicted = self.cache.invalidate(id);
        debug!(%id, %name, evicted, "set property");
        Ok(())
    }

    /// Install or replace method source. The update is visible to the
    /// very next dispatch of that name, anywhere in the fan-out below
    /// this object.
    pub fn set_method(&self, id: &Obj, name: Symbol, def: MethodDef) -> Result<(), ObjectError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap();
        let mut record = self.fetch_record(id)?;
        record.methods.insert(name, def);
        self.put_with_retry(&record)?;
        let evicted = self.cache.invalidate(id);
        debug!(%id, %name, evicted, "set method");
        Ok(())
    }

    pub fn remove_method(&self, id: &Obj, name: Symbol) -> Result<(), ObjectError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap();
        let mut record = self.fetch_record(id)?;
        if record.methods.remove(&name).is_none() {
            return Err(ObjectError::MethodNotFound(*id, name));
        }
        self.put_with_retry(&record)?;
        self.cache.invalidate(id);
        Ok(())
    }

    /// Move `id` under a new parent (or re-root it with `None`). Validated
    /// against the proposed ancestor chain first; on success, resolution
    /// changes for `id` and all its descendants at once.
    pub fn reparent(&self, id: &Obj, new_parent: Option<&Obj>) -> Result<(), ObjectError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap();
        let mut record = self.fetch_record(id)?;
        self.resolver.validate_reparent(self, id, new_parent)?;
        record.parent = new_parent.copied();
        self.put_with_retry(&record)?;
        let evicted = self.cache.invalidate(id);
        debug!(%id, new_parent = ?new_parent, evicted, "reparented");
        Ok(())
    }

    /// Strict delete: refuses with `Conflict` while any child still
    /// references `id` as its parent.
    pub fn delete(&self, id: &Obj) -> Result<(), ObjectError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap();
        self.with_retry("delete", || self.store.delete(id))?;
        self.cache.invalidate(id);
        debug!(%id, "deleted object");
        Ok(())
    }

    /// Administrative delete: re-parents children to this object's own
    /// parent first, then removes the record. Not atomic across the
    /// family; each re-parent is individually durable.
    pub fn recycle(&self, id: &Obj) -> Result<(), ObjectError> {
        let record = self.fetch_record(id)?;
        let kids = self.children_of(id)?;
        for kid in &kids {
            self.reparent(kid, record.parent.as_ref())?;
        }
        self.delete(id)
    }

    fn fetch_record(&self, id: &Obj) -> Result<ObjectRecord, ObjectError> {
        self.with_retry("get", || self.store.get(id))?
            .ok_or(ObjectError::ObjectNotFound(*id))
    }

    fn put_with_retry(&self, record: &ObjectRecord) -> Result<(), ObjectError> {
        self.with_retry("put", || self.store.put(record))
    }

    fn lock_for(&self, id: &Obj) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap();
        locks.entry(*id).or_default().clone()
    }

    /// Bounded-backoff retry, for transient store failures only. Anything
    /// else returns immediately.
    fn with_retry<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, ObjectError>,
    ) -> Result<T, ObjectError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;
        loop {
            match op() {
                Err(ObjectError::StoreUnavailable(e)) if attempt < self.retry.max_attempts => {
                    warn!(what, attempt, "transient store failure, retrying: {e}");
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                    attempt += 1;
                }
                r => return r,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_ids(&self) -> Vec<Obj> {
        self.cache.cached_ids()
    }
}

impl LoaderInterface for ObjectManager {
    fn create_object(
        &self,
        id: Option<Obj>,
        parent: Option<Obj>,
        name: Option<String>,
        location: Option<Obj>,
    ) -> Result<Obj, ObjectError> {
        match id {
            Some(id) => {
                self.create_with_id(&id, parent.as_ref(), name, location)?;
                Ok(id)
            }
            None => {
                let id = self.with_retry("next_id", || self.store.next_id())?;
                let mut record = ObjectRecord::new(id, parent);
                record.name = name;
                record.location = location;
                self.put_with_retry(&record)?;
                Ok(id)
            }
        }
    }

    fn set_property(&self, obj: &Obj, name: Symbol, value: Var) -> Result<(), ObjectError> {
        ObjectManager::set_property(self, obj, name, value)
    }

    fn set_method(&self, obj: &Obj, name: Symbol, def: MethodDef) -> Result<(), ObjectError> {
        ObjectManager::set_method(self, obj, name, def)
    }

    fn exists(&self, obj: &Obj) -> Result<bool, ObjectError> {
        self.valid(obj)
    }

    fn max_object(&self) -> Result<Option<Obj>, ObjectError> {
        ObjectManager::max_object(self)
    }
}
