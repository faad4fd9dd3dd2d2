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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;
use wold_var::Symbol;

/// Method source is opaque text to the runtime. It is stored, inherited,
/// and handed to the executor at dispatch time; nothing here parses it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub source: String,
    #[serde(default)]
    pub meta: MethodMeta,
}

impl MethodDef {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            meta: MethodMeta::default(),
        }
    }

    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.meta.arity = Some(arity);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.meta.visibility = visibility;
        self
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MethodMeta {
    /// Advisory argument count. Dispatch does not enforce it; tooling and
    /// executors may.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<usize>,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// The set of methods defined directly on one object, keyed by name.
pub type Methods = BTreeMap<Symbol, MethodDef>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_defaults_on_decode() {
        let json = r#"{"source": "emit(self.description)"}"#;
        let def: MethodDef = serde_json::from_str(json).unwrap();
        assert_eq!(def.meta.arity, None);
        assert_eq!(def.meta.visibility, Visibility::Public);
    }

    #[test]
    fn test_round_trip_with_meta() {
        let def = MethodDef::new("decay(args)")
            .with_arity(1)
            .with_visibility(Visibility::Private);
        let json = serde_json::to_string(&def).unwrap();
        let back: MethodDef = serde_json::from_str(&json).unwrap();
        assert_eq!(def, back);
    }
}
