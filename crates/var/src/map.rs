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

use crate::Var;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A string-keyed mapping of values. Clones share the backing tree;
/// mutation copies on write.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Map(Arc<BTreeMap<String, Var>>);

impl Map {
    #[must_use]
    pub fn mk_map() -> Self {
        Self(Arc::new(BTreeMap::new()))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Var> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Var)> {
        self.0.iter()
    }

    pub fn insert(&mut self, key: String, value: Var) {
        Arc::make_mut(&mut self.0).insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Var> {
        Arc::make_mut(&mut self.0).remove(key)
    }
}

impl From<BTreeMap<String, Var>> for Map {
    fn from(m: BTreeMap<String, Var>) -> Self {
        Self(Arc::new(m))
    }
}

impl FromIterator<(String, Var)> for Map {
    fn from_iter<T: IntoIterator<Item = (String, Var)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}
