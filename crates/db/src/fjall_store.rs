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

//! Durable object store on a fjall keyspace.
//!
//! Three partitions: `objects` (id → JSON record), `children`
//! (parent‖child composite key → empty, for the reverse-parent index), and
//! `sequences` (the monotonic id sequence). A record write and its child
//! index maintenance commit as one batch.

use crate::store::ObjectStore;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use wold_common::model::{ObjectError, ObjectRecord};
use wold_var::Obj;

const SEQ_MAX_OBJECT: &[u8] = b"max_object";

pub struct FjallObjectStore {
    keyspace: Keyspace,
    objects: PartitionHandle,
    children: PartitionHandle,
    sequences: PartitionHandle,
    // Serializes sequence read-modify-write. Record writes themselves are
    // serialized per-id above us, in the manager.
    seq_lock: Mutex<()>,
}

fn store_err(e: impl std::fmt::Display) -> ObjectError {
    ObjectError::StoreUnavailable(e.to_string())
}

fn id_key(id: &Obj) -> [u8; 8] {
    (id.id() as u64).to_be_bytes()
}

fn child_key(parent: &Obj, child: &Obj) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&id_key(parent));
    key[8..].copy_from_slice(&id_key(child));
    key
}

fn key_id(bytes: &[u8]) -> Obj {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    Obj::mk_id(u64::from_be_bytes(buf) as i64)
}

impl FjallObjectStore {
    pub fn open(path: &Path) -> Result<(Self, bool), ObjectError> {
        let keyspace = fjall::Config::new(path).open().map_err(store_err)?;
        let fresh = !keyspace.partition_exists("objects");
        let objects = keyspace
            .open_partition("objects", PartitionCreateOptions::default())
            .map_err(store_err)?;
        let children = keyspace
            .open_partition("children", PartitionCreateOptions::default())
            .map_err(store_err)?;
        let sequences = keyspace
            .open_partition("sequences", PartitionCreateOptions::default())
            .map_err(store_err)?;
        Ok((
            Self {
                keyspace,
                objects,
                children,
                sequences,
                seq_lock: Mutex::new(()),
            },
            fresh,
        ))
    }

    fn last_issued(&self) -> Result<Option<i64>, ObjectError> {
        let Some(v) = self.sequences.get(SEQ_MAX_OBJECT).map_err(store_err)? else {
            return Ok(None);
        };
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&v[..8]);
        Ok(Some(i64::from_le_bytes(buf)))
    }

    fn persist(&self) -> Result<(), ObjectError> {
        self.keyspace
            .persist(PersistMode::SyncData)
            .map_err(store_err)
    }

    fn decode(bytes: &[u8]) -> Result<ObjectRecord, ObjectError> {
        serde_json::from_slice(bytes).map_err(store_err)
    }
}

impl ObjectStore for FjallObjectStore {
    fn get(&self, id: &Obj) -> Result<Option<ObjectRecord>, ObjectError> {
        let Some(bytes) = self.objects.get(id_key(id)).map_err(store_err)? else {
            return Ok(None);
        };
        Ok(Some(Self::decode(&bytes)?))
    }

    fn put(&self, record: &ObjectRecord) -> Result<(), ObjectError> {
        let encoded = serde_json::to_vec(record).map_err(store_err)?;
        let old_parent = self.get(&record.id)?.and_then(|r| r.parent);

        let _guard = self.seq_lock.lock().unwrap();
        let mut batch = self.keyspace.batch();
        batch.insert(&self.objects, id_key(&record.id).as_slice(), encoded);
        if old_parent != record.parent {
            if let Some(old) = old_parent {
                batch.remove(&self.children, child_key(&old, &record.id).as_slice());
            }
            if let Some(new) = record.parent {
                batch.insert(
                    &self.children,
                    child_key(&new, &record.id).as_slice(),
                    Vec::new(),
                );
            }
        }
        // A caller-assigned id beyond the sequence advances it, so ids
        // stay monotonic across bulk loads.
        let last = self.last_issued()?;
        if last.is_none_or(|l| record.id.id() > l) {
            batch.insert(
                &self.sequences,
                SEQ_MAX_OBJECT,
                record.id.id().to_le_bytes().to_vec(),
            );
        }
        batch.commit().map_err(store_err)?;
        self.persist()
    }

    fn delete(&self, id: &Obj) -> Result<(), ObjectError> {
        if self.has_children(id)? {
            return Err(ObjectError::Conflict(*id));
        }
        let Some(record) = self.get(id)? else {
            return Err(ObjectError::ObjectNotFound(*id));
        };
        let mut batch = self.keyspace.batch();
        batch.remove(&self.objects, id_key(id).as_slice());
        if let Some(parent) = record.parent {
            batch.remove(&self.children, child_key(&parent, id).as_slice());
        }
        batch.commit().map_err(store_err)?;
        self.persist()
    }

    fn has_children(&self, id: &Obj) -> Result<bool, ObjectError> {
        let mut iter = self.children.prefix(id_key(id));
        match iter.next() {
            None => Ok(false),
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(store_err(e)),
        }
    }

    fn children_of(&self, id: &Obj) -> Result<Vec<Obj>, ObjectError> {
        let mut kids = Vec::new();
        for entry in self.children.prefix(id_key(id)) {
            let (key, _) = entry.map_err(store_err)?;
            kids.push(key_id(&key[8..]));
        }
        Ok(kids)
    }

    fn next_id(&self) -> Result<Obj, ObjectError> {
        let _guard = self.seq_lock.lock().unwrap();
        let next = self.last_issued()?.map_or(0, |l| l + 1);
        self.sequences
            .insert(SEQ_MAX_OBJECT, next.to_le_bytes().to_vec())
            .map_err(store_err)?;
        self.persist()?;
        Ok(Obj::mk_id(next))
    }

    fn max_id(&self) -> Result<Option<Obj>, ObjectError> {
        Ok(self.last_issued()?.map(Obj::mk_id))
    }

    fn all_ids(&self) -> Result<Vec<Obj>, ObjectError> {
        let mut ids = Vec::new();
        for entry in self.objects.iter() {
            let (key, _) = entry.map_err(store_err)?;
            ids.push(key_id(&key));
        }
        Ok(ids)
    }
}

impl Drop for FjallObjectStore {
    fn drop(&mut self) {
        if let Err(e) = self.keyspace.persist(PersistMode::SyncAll) {
            warn!("failed to persist keyspace on close: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wold_var::{Symbol, v_int};

    fn test_store() -> (FjallObjectStore, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, fresh) = FjallObjectStore::open(dir.path()).unwrap();
        assert!(fresh);
        (store, dir)
    }

    #[test]
    fn test_put_get_round_trip() {
        let (store, _dir) = test_store();
        let rec = ObjectRecord::new(Obj::mk_id(0), None)
            .with_name("Root")
            .with_property(Symbol::mk("hp"), v_int(10));
        store.put(&rec).unwrap();
        assert_eq!(store.get(&rec.id).unwrap(), Some(rec));
        assert_eq!(store.get(&Obj::mk_id(99)).unwrap(), None);
    }

    #[test]
    fn test_child_index_follows_reparent() {
        let (store, _dir) = test_store();
        let root = ObjectRecord::new(Obj::mk_id(0), None);
        let other = ObjectRecord::new(Obj::mk_id(1), None);
        let kid = ObjectRecord::new(Obj::mk_id(2), Some(root.id));
        store.put(&root).unwrap();
        store.put(&other).unwrap();
        store.put(&kid).unwrap();
        assert_eq!(store.children_of(&root.id).unwrap(), vec![kid.id]);
        assert!(store.children_of(&other.id).unwrap().is_empty());

        let mut kid = kid;
        kid.parent = Some(other.id);
        store.put(&kid).unwrap();
        assert!(store.children_of(&root.id).unwrap().is_empty());
        assert_eq!(store.children_of(&other.id).unwrap(), vec![kid.id]);
    }

    #[test]
    fn test_delete_refuses_referenced_parent() {
        let (store, _dir) = test_store();
        let root = ObjectRecord::new(Obj::mk_id(0), None);
        let kid = ObjectRecord::new(Obj::mk_id(1), Some(root.id));
        store.put(&root).unwrap();
        store.put(&kid).unwrap();
        assert_eq!(
            store.delete(&root.id),
            Err(ObjectError::Conflict(root.id))
        );
        store.delete(&kid.id).unwrap();
        store.delete(&root.id).unwrap();
        assert_eq!(store.get(&root.id).unwrap(), None);
    }

    #[test]
    fn test_sequence_skips_past_fixed_ids() {
        let (store, _dir) = test_store();
        store.put(&ObjectRecord::new(Obj::mk_id(7), None)).unwrap();
        assert_eq!(store.next_id().unwrap(), Obj::mk_id(8));
        assert_eq!(store.max_id().unwrap(), Some(Obj::mk_id(8)));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let id = {
            let (store, _) = FjallObjectStore::open(dir.path()).unwrap();
            let id = store.next_id().unwrap();
            store
                .put(&ObjectRecord::new(id, None).with_name("persists"))
                .unwrap();
            id
        };
        let (store, fresh) = FjallObjectStore::open(dir.path()).unwrap();
        assert!(!fresh);
        let rec = store.get(&id).unwrap().unwrap();
        assert_eq!(rec.name.as_deref(), Some("persists"));
        assert_eq!(store.next_id().unwrap(), id.successor());
    }
}
