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

use crate::model::{MethodDef, Methods};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wold_var::{Obj, Symbol, Var};

/// The set of properties defined directly on one object, keyed by name.
pub type Properties = BTreeMap<Symbol, Var>;

/// The durable unit: one entity in the world, exactly as the store
/// persists it. Inheritance semantics live above this in the resolver;
/// the record only knows its own parent link and its own definitions.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: Obj,
    /// `None` marks a root prototype.
    pub parent: Option<Obj>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub methods: Methods,

    // World/spatial attributes. Not part of the core resolution
    // invariants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Obj>,
}

impl ObjectRecord {
    #[must_use]
    pub fn new(id: Obj, parent: Option<Obj>) -> Self {
        Self {
            id,
            parent,
            properties: Properties::new(),
            methods: Methods::new(),
            name: None,
            location: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: Symbol, value: Var) -> Self {
        self.properties.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_method(mut self, name: Symbol, def: MethodDef) -> Self {
        self.methods.insert(name, def);
        self
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
