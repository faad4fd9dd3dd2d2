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

use wold_common::model::{MethodDef, Methods, Properties};
use wold_var::{Symbol, Var};

/// One reusable trait's worth of properties and methods: the output of a
/// builder function. Bundles are plain values; a builder is any pure
/// function that returns one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TraitBundle {
    pub properties: Properties,
    pub methods: Methods,
}

impl TraitBundle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn prop(mut self, name: &str, value: Var) -> Self {
        self.properties.insert(Symbol::mk(name), value);
        self
    }

    #[must_use]
    pub fn method(mut self, name: &str, def: MethodDef) -> Self {
        self.methods.insert(Symbol::mk(name), def);
        self
    }

    /// Overlay `later` on top of this bundle: on key collision, the later
    /// entry wins.
    #[must_use]
    pub fn merge(mut self, later: TraitBundle) -> Self {
        self.properties.extend(later.properties);
        self.methods.extend(later.methods);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.methods.is_empty()
    }
}

/// Fold several builders' bundles into one prototype's definition,
/// left to right; later bundles override earlier ones on collision.
#[must_use]
pub fn fold(bundles: impl IntoIterator<Item = TraitBundle>) -> TraitBundle {
    bundles
        .into_iter()
        .fold(TraitBundle::new(), TraitBundle::merge)
}
