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

//! In-memory, non-durable twin of the fjall store. Same contract, no disk;
//! for tests and ephemeral worlds.

use crate::store::ObjectStore;
use ahash::AHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasherDefault;
use std::sync::Mutex;
use wold_common::model::{ObjectError, ObjectRecord};
use wold_var::Obj;

#[derive(Default)]
struct Inner {
    records: HashMap<Obj, ObjectRecord, BuildHasherDefault<AHasher>>,
    children: HashMap<Obj, BTreeSet<Obj>, BuildHasherDefault<AHasher>>,
    last_issued: Option<i64>,
}

#[derive(Default)]
pub struct TransientStore {
    inner: Mutex<Inner>,
}

impl TransientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for TransientStore {
    fn get(&self, id: &Obj) -> Result<Option<ObjectRecord>, ObjectError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.get(id).cloned())
    }

    fn put(&self, record: &ObjectRecord) -> Result<(), ObjectError> {
        let mut inner = self.inner.lock().unwrap();
        let old_parent = inner.records.get(&record.id).and_then(|r| r.parent);
        if old_parent != record.parent {
            if let Some(old) = old_parent {
                if let Some(kids) = inner.children.get_mut(&old) {
                    kids.remove(&record.id);
                }
            }
            if let Some(new) = record.parent {
                inner.children.entry(new).or_default().insert(record.id);
            }
        }
        if inner.last_issued.is_none_or(|l| record.id.id() > l) {
            inner.last_issued = Some(record.id.id());
        }
        inner.records.insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&self, id: &Obj) -> Result<(), ObjectError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.children.get(id).is_some_and(|kids| !kids.is_empty()) {
            return Err(ObjectError::Conflict(*id));
        }
        let Some(record) = inner.records.remove(id) else {
            return Err(ObjectError::ObjectNotFound(*id));
        };
        if let Some(parent) = record.parent {
            if let Some(kids) = inner.children.get_mut(&parent) {
                kids.remove(id);
            }
        }
        Ok(())
    }

    fn has_children(&self, id: &Obj) -> Result<bool, ObjectError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.children.get(id).is_some_and(|kids| !kids.is_empty()))
    }

    fn children_of(&self, id: &Obj) -> Result<Vec<Obj>, ObjectError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .children
            .get(id)
            .map(|kids| kids.iter().copied().collect())
            .unwrap_or_default())
    }

    fn next_id(&self) -> Result<Obj, ObjectError> {
        let mut inner = self.inner.lock().unwrap();
        let next = inner.last_issued.map_or(0, |l| l + 1);
        inner.last_issued = Some(next);
        Ok(Obj::mk_id(next))
    }

    fn max_id(&self) -> Result<Option<Obj>, ObjectError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.last_issued.map(Obj::mk_id))
    }

    fn all_ids(&self) -> Result<Vec<Obj>, ObjectError> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<_> = inner.records.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
