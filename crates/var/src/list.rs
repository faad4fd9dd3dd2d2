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
use std::sync::Arc;

/// An ordered sequence of values. Clones share the backing vector;
/// mutation copies on write.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct List(Arc<Vec<Var>>);

impl List {
    #[must_use]
    pub fn mk_list(items: &[Var]) -> Self {
        Self(Arc::new(items.to_vec()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Var> {
        self.0.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Var> {
        self.0.iter()
    }

    pub fn push(&mut self, v: Var) {
        Arc::make_mut(&mut self.0).push(v);
    }
}

impl From<Vec<Var>> for List {
    fn from(items: Vec<Var>) -> Self {
        Self(Arc::new(items))
    }
}

impl FromIterator<Var> for List {
    fn from_iter<T: IntoIterator<Item = Var>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Var;
    type IntoIter = std::slice::Iter<'a, Var>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
