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

//! Interned identifiers for property and method names.
//!
//! Comparison is case-insensitive, but the original case of the first
//! interning is preserved for display. Two symbols differing only in case
//! intern to the same id.

use ahash::AHasher;
use arcstr::ArcStr;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::BuildHasherDefault;
use std::sync::RwLock;
use unicase::UniCase;

struct Interner {
    ids: HashMap<UniCase<String>, u32, BuildHasherDefault<AHasher>>,
    reprs: Vec<ArcStr>,
}

static INTERNER: Lazy<RwLock<Interner>> = Lazy::new(|| {
    RwLock::new(Interner {
        ids: HashMap::default(),
        reprs: Vec::new(),
    })
});

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn mk(s: &str) -> Self {
        let key = UniCase::new(s.to_string());
        {
            let interner = INTERNER.read().unwrap();
            if let Some(id) = interner.ids.get(&key) {
                return Self(*id);
            }
        }
        let mut interner = INTERNER.write().unwrap();
        // Racing interners may have gotten here first.
        if let Some(id) = interner.ids.get(&key) {
            return Self(*id);
        }
        let id = interner.reprs.len() as u32;
        interner.reprs.push(ArcStr::from(s));
        interner.ids.insert(key, id);
        Self(id)
    }

    #[must_use]
    pub fn as_arc_str(&self) -> ArcStr {
        let interner = INTERNER.read().unwrap();
        interner.reprs[self.0 as usize].clone()
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.0 == other.0 {
            return std::cmp::Ordering::Equal;
        }
        UniCase::new(self.as_arc_str().to_string()).cmp(&UniCase::new(other.as_arc_str().to_string()))
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_arc_str())
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.as_arc_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::mk(s)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_arc_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Symbol::mk(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_interning() {
        let a = Symbol::mk("Describe");
        let b = Symbol::mk("describe");
        let c = Symbol::mk("DESCRIBE");
        assert_eq!(a, b);
        assert_eq!(b, c);
        // First-seen representation wins.
        assert_eq!(a.as_arc_str(), "Describe");
    }

    #[test]
    fn test_distinct_names_distinct_ids() {
        let a = Symbol::mk("decay_rate");
        let b = Symbol::mk("decay_tick");
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_round_trip() {
        let a = Symbol::mk("look_self");
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"look_self\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
