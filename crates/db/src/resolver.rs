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

//! Prototype-chain resolution: ancestor walks and nearest-definition-wins
//! lookup of properties and methods.
//!
//! Resolution is single-parent only. Multi-trait composition happens once,
//! at content-authoring time, by folding builder bundles into one record;
//! nothing here ever consults more than one parent per step.

use crate::config::DatabaseConfig;
use wold_common::model::{MethodDef, ObjectError, ObjectRecord};
use wold_var::{Obj, Symbol, Var};

/// Where the resolver reads records from. Implemented by the stores
/// directly, and by the manager (which interposes its cache).
pub trait RecordSource {
    fn record(&self, id: &Obj) -> Result<ObjectRecord, ObjectError>;
}

impl RecordSource for crate::transient::TransientStore {
    fn record(&self, id: &Obj) -> Result<ObjectRecord, ObjectError> {
        use crate::store::ObjectStore;
        self.get(id)?.ok_or(ObjectError::ObjectNotFound(*id))
    }
}

impl RecordSource for crate::fjall_store::FjallObjectStore {
    fn record(&self, id: &Obj) -> Result<ObjectRecord, ObjectError> {
        use crate::store::ObjectStore;
        self.get(id)?.ok_or(ObjectError::ObjectNotFound(*id))
    }
}

#[derive(Clone)]
pub struct Resolver {
    max_chain_depth: usize,
}

impl Resolver {
    #[must_use]
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            max_chain_depth: config.max_chain_depth,
        }
    }

    /// The ordered ancestor chain of `id`, self-first, root-last. The walk
    /// is bounded: a chain longer than the configured maximum is reported
    /// as `CycleDetected` rather than walked forever.
    pub fn chain(&self, src: &dyn RecordSource, id: &Obj) -> Result<Vec<Obj>, ObjectError> {
        let mut chain = Vec::new();
        let mut cursor = Some(*id);
        while let Some(cur) = cursor {
            if chain.len() >= self.max_chain_depth {
                return Err(ObjectError::CycleDetected(*id));
            }
            let record = src.record(&cur)?;
            chain.push(cur);
            cursor = record.parent;
        }
        Ok(chain)
    }

    /// Nearest-definition-wins property lookup. Returns the value and the
    /// id of the object that defines it.
    pub fn resolve_property(
        &self,
        src: &dyn RecordSource,
        id: &Obj,
        name: Symbol,
    ) -> Result<(Var, Obj), ObjectError> {
        self.walk(src, id, |record| {
            record.properties.get(&name).cloned()
        })?
        .ok_or(ObjectError::PropertyNotFound(*id, name))
    }

    /// Nearest-definition-wins method lookup. Returns the definition and
    /// the id of the object that defines it; the *receiver* of a dispatch
    /// stays the original object regardless of where the hit lands.
    pub fn resolve_method(
        &self,
        src: &dyn RecordSource,
        id: &Obj,
        name: Symbol,
    ) -> Result<(MethodDef, Obj), ObjectError> {
        self.walk(src, id, |record| record.methods.get(&name).cloned())?
            .ok_or(ObjectError::MethodNotFound(*id, name))
    }

    /// Confirm that re-parenting `obj` under `new_parent` keeps the graph
    /// acyclic: `obj` must not appear anywhere in the proposed ancestor's
    /// own chain.
    pub fn validate_reparent(
        &self,
        src: &dyn RecordSource,
        obj: &Obj,
        new_parent: Option<&Obj>,
    ) -> Result<(), ObjectError> {
        let Some(new_parent) = new_parent else {
            return Ok(());
        };
        if new_parent == obj {
            return Err(ObjectError::WouldCreateCycle(*obj, *new_parent));
        }
        let ancestors = self.chain(src, new_parent)?;
        if ancestors.contains(obj) {
            return Err(ObjectError::WouldCreateCycle(*obj, *new_parent));
        }
        Ok(())
    }

    fn walk<T>(
        &self,
        src: &dyn RecordSource,
        id: &Obj,
        mut test: impl FnMut(&ObjectRecord) -> Option<T>,
    ) -> Result<Option<(T, Obj)>, ObjectError> {
        let mut cursor = Some(*id);
        let mut depth = 0;
        while let Some(cur) = cursor {
            if depth >= self.max_chain_depth {
                return Err(ObjectError::CycleDetected(*id));
            }
            let record = src.record(&cur)?;
            if let Some(found) = test(&record) {
                return Ok(Some((found, cur)));
            }
            cursor = record.parent;
            depth += 1;
        }
        Ok(None)
    }
}
