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

use crate::{SeedError, TraitBundle};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;
use tracing::{debug, info};
use wold_common::model::LoaderInterface;
use wold_var::Obj;

/// One composed record to be written at bootstrap: a fixed id, a parent
/// link, optional world attributes, and the folded trait bundle.
#[derive(Clone, Debug)]
pub struct SeedObject {
    pub id: Obj,
    pub parent: Option<Obj>,
    pub name: Option<String>,
    pub location: Option<Obj>,
    pub bundle: TraitBundle,
}

impl SeedObject {
    #[must_use]
    pub fn new(id: Obj, parent: Option<Obj>) -> Self {
        Self {
            id,
            parent,
            name: None,
            location: None,
            bundle: TraitBundle::new(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn at(mut self, location: Obj) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with(mut self, bundle: TraitBundle) -> Self {
        self.bundle = bundle;
        self
    }
}

#[derive(Debug, Default, Eq, PartialEq)]
pub struct LoadSummary {
    pub created: usize,
    pub skipped: usize,
}

/// Writes seed content through a `LoaderInterface` in dependency order
/// (parents strictly before children), idempotently: a seed id already
/// present in the store is skipped outright, so re-running bootstrap
/// against a populated store never duplicates or clobbers ids.
pub struct BootstrapLoader<'a> {
    loader: &'a dyn LoaderInterface,
}

impl<'a> BootstrapLoader<'a> {
    #[must_use]
    pub fn new(loader: &'a dyn LoaderInterface) -> Self {
        Self { loader }
    }

    pub fn load(&self, seeds: &[SeedObject]) -> Result<LoadSummary, SeedError> {
        let start = Instant::now();
        let ordered = dependency_order(seeds)?;

        let mut summary = LoadSummary::default();
        for seed in ordered {
            if self.loader.exists(&seed.id)? {
                debug!(id = %seed.id, "seed id already present, skipping");
                summary.skipped += 1;
                continue;
            }
            if let Some(parent) = &seed.parent {
                // In-set parents were created above; anything else must
                // already be in the store.
                if !self.loader.exists(parent)? {
                    return Err(SeedError::MissingParent(seed.id, *parent));
                }
            }
            self.loader.create_object(
                Some(seed.id),
                seed.parent,
                seed.name.clone(),
                seed.location,
            )?;
            for (name, value) in &seed.bundle.properties {
                self.loader.set_property(&seed.id, *name, value.clone())?;
            }
            for (name, def) in &seed.bundle.methods {
                self.loader.set_method(&seed.id, *name, def.clone())?;
            }
            summary.created += 1;
        }

        info!(
            created = summary.created,
            skipped = summary.skipped,
            duration = ?start.elapsed(),
            "bootstrap load complete"
        );
        Ok(summary)
    }
}

/// Kahn's ordering over the seed set: parents before children. Parents
/// outside the set impose no ordering (they are checked against the store
/// at write time). A leftover after the queue drains is a cycle.
fn dependency_order(seeds: &[SeedObject]) -> Result<Vec<&SeedObject>, SeedError> {
    let mut by_id: HashMap<Obj, &SeedObject> = HashMap::new();
    for seed in seeds {
        if by_id.insert(seed.id, seed).is_some() {
            return Err(SeedError::DuplicateSeedId(seed.id));
        }
    }

    let mut ready: VecDeque<&SeedObject> = seeds
        .iter()
        .filter(|s| s.parent.is_none_or(|p| !by_id.contains_key(&p)))
        .collect();
    let mut children_of: HashMap<Obj, Vec<&SeedObject>> = HashMap::new();
    for seed in seeds {
        if let Some(parent) = seed.parent {
            if by_id.contains_key(&parent) {
                children_of.entry(parent).or_default().push(seed);
            }
        }
    }

    let mut ordered = Vec::with_capacity(seeds.len());
    let mut placed: HashSet<Obj> = HashSet::new();
    while let Some(seed) = ready.pop_front() {
        ordered.push(seed);
        placed.insert(seed.id);
        if let Some(kids) = children_of.get(&seed.id) {
            ready.extend(kids.iter().copied());
        }
    }

    if ordered.len() < seeds.len() {
        let mut cycle: Vec<Obj> = seeds
            .iter()
            .map(|s| s.id)
            .filter(|id| !placed.contains(id))
            .collect();
        cycle.sort();
        return Err(SeedError::SeedCycle(cycle));
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fold;
    use pretty_assertions::assert_eq;
    use wold_common::model::MethodDef;
    use wold_db::{DatabaseConfig, ObjectManager};
    use wold_var::{Symbol, v_bool, v_float, v_str};

    fn decayable() -> TraitBundle {
        TraitBundle::new().prop("decay_rate", v_float(0.1))
    }

    fn edible() -> TraitBundle {
        TraitBundle::new().prop("edible", v_bool(true))
    }

    /// A small world, deliberately out of dependency order: rooms, a
    /// generic Item root, a composed trait prototype, and an instance.
    fn seeds() -> Vec<SeedObject> {
        vec![
            SeedObject::new(Obj::mk_id(3), Some(Obj::mk_id(2)))
                .named("mouldy bread")
                .at(Obj::mk_id(10)),
            SeedObject::new(Obj::mk_id(10), None).named("The Pantry").with(
                TraitBundle::new().prop("description", v_str("Shelves upon shelves.")),
            ),
            SeedObject::new(Obj::mk_id(2), Some(Obj::mk_id(1)))
                .named("Perishable")
                .with(fold([decayable(), edible()])),
            SeedObject::new(Obj::mk_id(1), None)
                .named("Item")
                .with(TraitBundle::new().method("describe", MethodDef::new("emit description"))),
        ]
    }

    #[test]
    fn test_parents_load_before_children() {
        let seeds = seeds();
        let order = dependency_order(&seeds).unwrap();
        let ids: Vec<_> = order.iter().map(|s| s.id).collect();
        let pos = |id: i64| ids.iter().position(|o| *o == Obj::mk_id(id)).unwrap();
        assert!(pos(1) < pos(2));
        assert!(pos(2) < pos(3));
    }

    #[test]
    fn test_load_then_resolve_through_composed_prototype() {
        let mgr = ObjectManager::transient(&DatabaseConfig::default());
        let summary = BootstrapLoader::new(mgr.as_ref()).load(&seeds()).unwrap();
        assert_eq!(summary, LoadSummary { created: 4, skipped: 0 });

        // The instance inherits through the folded prototype.
        assert_eq!(
            mgr.resolve_property(&Obj::mk_id(3), Symbol::mk("decay_rate"))
                .unwrap(),
            (v_float(0.1), Obj::mk_id(2))
        );
        assert_eq!(
            mgr.resolve_method(&Obj::mk_id(3), Symbol::mk("describe"))
                .unwrap()
                .1,
            Obj::mk_id(1)
        );
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mgr = ObjectManager::transient(&DatabaseConfig::default());
        let loader = BootstrapLoader::new(mgr.as_ref());
        loader.load(&seeds()).unwrap();
        let max_before = mgr.max_object().unwrap();

        let summary = loader.load(&seeds()).unwrap();
        assert_eq!(summary, LoadSummary { created: 0, skipped: 4 });
        assert_eq!(mgr.max_object().unwrap(), max_before);
    }

    #[test]
    fn test_partial_overlap_only_fills_gaps() {
        let mgr = ObjectManager::transient(&DatabaseConfig::default());
        let loader = BootstrapLoader::new(mgr.as_ref());
        let all = seeds();
        loader.load(&all[1..]).unwrap();
        let summary = loader.load(&all).unwrap();
        assert_eq!(summary, LoadSummary { created: 1, skipped: 3 });
    }

    #[test]
    fn test_duplicate_seed_id_rejected() {
        let mut s = seeds();
        s.push(SeedObject::new(Obj::mk_id(2), None));
        assert_eq!(
            dependency_order(&s).unwrap_err(),
            SeedError::DuplicateSeedId(Obj::mk_id(2))
        );
    }

    #[test]
    fn test_seed_cycle_rejected() {
        let s = vec![
            SeedObject::new(Obj::mk_id(1), Some(Obj::mk_id(2))),
            SeedObject::new(Obj::mk_id(2), Some(Obj::mk_id(1))),
        ];
        assert_eq!(
            dependency_order(&s).unwrap_err(),
            SeedError::SeedCycle(vec![Obj::mk_id(1), Obj::mk_id(2)])
        );
    }

    #[test]
    fn test_missing_parent_rejected() {
        let mgr = ObjectManager::transient(&DatabaseConfig::default());
        let s = vec![SeedObject::new(Obj::mk_id(5), Some(Obj::mk_id(99)))];
        assert_eq!(
            BootstrapLoader::new(mgr.as_ref()).load(&s).unwrap_err(),
            SeedError::MissingParent(Obj::mk_id(5), Obj::mk_id(99))
        );
    }
}
