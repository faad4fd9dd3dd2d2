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

use crate::{List, Map, Obj, Str};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};

/// Our series of types. This is the tagged union persisted in the record
/// schema; the wire tags are part of the store's portability contract.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Str),
    List(List),
    Map(Map),
    Obj(Obj),
}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Variant::None => 0.hash(state),
            Variant::Bool(b) => b.hash(state),
            Variant::Int(i) => i.hash(state),
            Variant::Float(f) => f.to_bits().hash(state),
            Variant::Str(s) => s.hash(state),
            Variant::List(l) => l.hash(state),
            Variant::Map(m) => m.hash(state),
            Variant::Obj(o) => o.hash(state),
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variant::None, Variant::None) => true,
            (Variant::Bool(l), Variant::Bool(r)) => l == r,
            (Variant::Int(l), Variant::Int(r)) => l == r,
            (Variant::Float(l), Variant::Float(r)) => l.total_cmp(r) == Ordering::Equal,
            (Variant::Str(l), Variant::Str(r)) => l == r,
            (Variant::List(l), Variant::List(r)) => l == r,
            (Variant::Map(l), Variant::Map(r)) => l == r,
            (Variant::Obj(l), Variant::Obj(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Variant {}

impl Ord for Variant {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Variant::None, Variant::None) => Ordering::Equal,
            (Variant::Bool(l), Variant::Bool(r)) => l.cmp(r),
            (Variant::Int(l), Variant::Int(r)) => l.cmp(r),
            (Variant::Float(l), Variant::Float(r)) => l.total_cmp(r),
            (Variant::Str(l), Variant::Str(r)) => l.cmp(r),
            (Variant::List(l), Variant::List(r)) => l.cmp(r),
            (Variant::Map(l), Variant::Map(r)) => l.cmp(r),
            (Variant::Obj(l), Variant::Obj(r)) => l.cmp(r),

            (Variant::None, _) => Ordering::Less,
            (_, Variant::None) => Ordering::Greater,
            (Variant::Bool(_), _) => Ordering::Less,
            (_, Variant::Bool(_)) => Ordering::Greater,
            (Variant::Int(_), _) => Ordering::Less,
            (_, Variant::Int(_)) => Ordering::Greater,
            (Variant::Float(_), _) => Ordering::Less,
            (_, Variant::Float(_)) => Ordering::Greater,
            (Variant::Str(_), _) => Ordering::Less,
            (_, Variant::Str(_)) => Ordering::Greater,
            (Variant::List(_), _) => Ordering::Less,
            (_, Variant::List(_)) => Ordering::Greater,
            (Variant::Map(_), _) => Ordering::Less,
            (_, Variant::Map(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::None => write!(f, "None"),
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Float(fl) => write!(f, "{fl}"),
            Variant::Str(s) => write!(f, "{s:?}"),
            Variant::List(l) => write!(f, "{l:?}"),
            Variant::Map(m) => write!(f, "{m:?}"),
            Variant::Obj(o) => write!(f, "{o}"),
        }
    }
}

/// A value in the world: a property value, a method argument, a method
/// result. Cheap to clone.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Var(Variant);

impl Default for Variant {
    fn default() -> Self {
        Variant::None
    }
}

impl Var {
    #[must_use]
    pub fn variant(&self) -> &Variant {
        &self.0
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self.0, Variant::None)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match &self.0 {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match &self.0 {
            Variant::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match &self.0 {
            Variant::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            Variant::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&List> {
        match &self.0 {
            Variant::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Map> {
        match &self.0 {
            Variant::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_obj(&self) -> Option<Obj> {
        match &self.0 {
            Variant::Obj(o) => Some(*o),
            _ => None,
        }
    }
}

impl Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Variant> for Var {
    fn from(v: Variant) -> Self {
        Self(v)
    }
}

#[must_use]
pub fn v_none() -> Var {
    Var(Variant::None)
}

#[must_use]
pub fn v_bool(b: bool) -> Var {
    Var(Variant::Bool(b))
}

#[must_use]
pub fn v_int(i: i64) -> Var {
    Var(Variant::Int(i))
}

#[must_use]
pub fn v_float(f: f64) -> Var {
    Var(Variant::Float(f))
}

#[must_use]
pub fn v_str(s: &str) -> Var {
    Var(Variant::Str(Str::mk_str(s)))
}

#[must_use]
pub fn v_string(s: String) -> Var {
    Var(Variant::Str(Str::from(s)))
}

#[must_use]
pub fn v_list(items: &[Var]) -> Var {
    Var(Variant::List(List::mk_list(items)))
}

#[must_use]
pub fn v_map(m: Map) -> Var {
    Var(Variant::Map(m))
}

#[must_use]
pub fn v_obj(o: Obj) -> Var {
    Var(Variant::Obj(o))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_tagging() {
        let v = v_obj(Obj::mk_id(3));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"obj","value":3}"#);
        let back: Var = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn test_nested_round_trip() {
        let v = v_list(&[
            v_int(1),
            v_str("two"),
            v_float(3.5),
            v_map(Map::from_iter([("k".to_string(), v_bool(true))])),
            v_none(),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Var = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn test_float_equality_is_total() {
        assert_eq!(v_float(f64::NAN), v_float(f64::NAN));
        assert_ne!(v_float(0.1), v_float(0.2));
    }

    #[test]
    fn test_cross_type_ordering_stable() {
        let mut vs = vec![v_str("a"), v_int(1), v_none(), v_bool(false)];
        vs.sort();
        assert_eq!(vs[0], v_none());
        assert_eq!(vs[1], v_bool(false));
        assert_eq!(vs[2], v_int(1));
        assert_eq!(vs[3], v_str("a"));
    }
}
