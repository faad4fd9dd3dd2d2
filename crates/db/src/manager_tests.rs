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

use crate::config::{DatabaseConfig, RetryConfig};
use crate::manager::ObjectManager;
use crate::store::ObjectStore;
use crate::transient::TransientStore;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::time::Duration;
use wold_common::model::{LoaderInterface, MethodDef, ObjectError, ObjectRecord, Properties};
use wold_var::{Obj, Symbol, v_float, v_int, v_str};

fn test_manager() -> Arc<ObjectManager> {
    ObjectManager::transient(&DatabaseConfig::default())
}

/// #1 Item (root) <- #2 Decayable <- #3 concrete item, as a seeded world.
fn decay_world(mgr: &Arc<ObjectManager>) {
    mgr.create_object(Some(Obj::mk_id(1)), None, Some("Item".to_string()), None)
        .unwrap();
    mgr.create_object(
        Some(Obj::mk_id(2)),
        Some(Obj::mk_id(1)),
        Some("Decayable".to_string()),
        None,
    )
    .unwrap();
    ObjectManager::set_property(mgr, &Obj::mk_id(2), Symbol::mk("decay_rate"), v_float(0.1))
        .unwrap();
    mgr.create_object(Some(Obj::mk_id(3)), Some(Obj::mk_id(2)), None, None)
        .unwrap();
}

#[test]
fn test_load_caches_and_serves_hits() {
    let mgr = test_manager();
    decay_world(&mgr);
    let a = mgr.load(&Obj::mk_id(3)).unwrap();
    let b = mgr.load(&Obj::mk_id(3)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.chain(), &[Obj::mk_id(3), Obj::mk_id(2), Obj::mk_id(1)]);

    assert_eq!(
        mgr.load(&Obj::mk_id(99)).unwrap_err(),
        ObjectError::ObjectNotFound(Obj::mk_id(99))
    );
}

#[test]
fn test_instantiate_allocates_fresh_ids() {
    let mgr = test_manager();
    decay_world(&mgr);
    let a = mgr
        .instantiate(Some(&Obj::mk_id(2)), Properties::new())
        .unwrap();
    let b = mgr
        .instantiate(Some(&Obj::mk_id(2)), Properties::new())
        .unwrap();
    assert!(b.id().id() > a.id().id());
    assert_eq!(a.parent(), Some(Obj::mk_id(2)));

    // A dangling parent fails before an id is burned.
    let err = mgr
        .instantiate(Some(&Obj::mk_id(1000)), Properties::new())
        .unwrap_err();
    assert_eq!(err, ObjectError::ObjectNotFound(Obj::mk_id(1000)));
}

#[test]
fn test_nearest_definition_wins_and_shadowing() {
    let mgr = test_manager();
    decay_world(&mgr);
    let decay = Symbol::mk("decay_rate");

    assert_eq!(
        mgr.resolve_property(&Obj::mk_id(3), decay).unwrap(),
        (v_float(0.1), Obj::mk_id(2))
    );

    mgr.set_property(&Obj::mk_id(3), decay, v_float(0.5)).unwrap();
    assert_eq!(
        mgr.resolve_property(&Obj::mk_id(3), decay).unwrap(),
        (v_float(0.5), Obj::mk_id(3))
    );
    // The ancestor's own definition is unaffected.
    assert_eq!(
        mgr.resolve_property(&Obj::mk_id(2), decay).unwrap(),
        (v_float(0.1), Obj::mk_id(2))
    );
}

#[test]
fn test_ancestor_mutation_evicts_cached_descendants() {
    let mgr = test_manager();
    decay_world(&mgr);
    mgr.load(&Obj::mk_id(3)).unwrap();
    mgr.load(&Obj::mk_id(2)).unwrap();
    assert_eq!(mgr.cached_ids(), vec![Obj::mk_id(2), Obj::mk_id(3)]);

    // A write to the root changes meaning for everything below it.
    mgr.set_property(&Obj::mk_id(1), Symbol::mk("description"), v_str("worn"))
        .unwrap();
    assert_eq!(mgr.cached_ids(), vec![]);

    // And the new value resolves through the chain on the next read.
    assert_eq!(
        mgr.resolve_property(&Obj::mk_id(3), Symbol::mk("description"))
            .unwrap(),
        (v_str("worn"), Obj::mk_id(1))
    );
}

#[test]
fn test_reparent_switches_resolution_for_descendants() {
    let mgr = test_manager();
    let x = Symbol::mk("x");
    mgr.create_object(Some(Obj::mk_id(1)), None, None, None).unwrap();
    mgr.set_property(&Obj::mk_id(1), x, v_int(1)).unwrap();
    mgr.create_object(Some(Obj::mk_id(2)), None, None, None).unwrap();
    mgr.set_property(&Obj::mk_id(2), x, v_int(2)).unwrap();
    mgr.create_object(Some(Obj::mk_id(3)), Some(Obj::mk_id(1)), None, None)
        .unwrap();
    mgr.create_object(Some(Obj::mk_id(4)), Some(Obj::mk_id(3)), None, None)
        .unwrap();

    // Warm the cache through the old chain first.
    let leaf = mgr.load(&Obj::mk_id(4)).unwrap();
    assert_eq!(mgr.resolve_property(&Obj::mk_id(4), x).unwrap().0, v_int(1));

    mgr.reparent(&Obj::mk_id(3), Some(&Obj::mk_id(2))).unwrap();
    assert_eq!(
        mgr.resolve_property(&Obj::mk_id(4), x).unwrap(),
        (v_int(2), Obj::mk_id(2))
    );
    // A previously handed-out view still resolves live, not stale.
    assert_eq!(leaf.get_property(x).unwrap().0, v_int(2));
}

#[test]
fn test_children_and_descendants() {
    let mgr = test_manager();
    decay_world(&mgr);
    let leaf = mgr
        .instantiate(Some(&Obj::mk_id(3)), Properties::new())
        .unwrap();
    assert_eq!(mgr.children_of(&Obj::mk_id(1)).unwrap(), vec![Obj::mk_id(2)]);
    assert_eq!(
        mgr.descendants_of(&Obj::mk_id(1)).unwrap(),
        vec![Obj::mk_id(2), Obj::mk_id(3), leaf.id()]
    );
    assert!(mgr.descendants_of(&leaf.id()).unwrap().is_empty());
}

#[test]
fn test_reparent_cycle_refused() {
    let mgr = test_manager();
    decay_world(&mgr);
    assert_eq!(
        mgr.reparent(&Obj::mk_id(1), Some(&Obj::mk_id(3))),
        Err(ObjectError::WouldCreateCycle(Obj::mk_id(1), Obj::mk_id(3)))
    );
    // Chain is untouched.
    assert_eq!(
        mgr.chain(&Obj::mk_id(3)).unwrap(),
        vec![Obj::mk_id(3), Obj::mk_id(2), Obj::mk_id(1)]
    );
}

#[test]
fn test_set_method_visible_to_next_resolution() {
    let mgr = test_manager();
    decay_world(&mgr);
    let describe = Symbol::mk("describe");
    mgr.set_method(&Obj::mk_id(1), describe, MethodDef::new("emit(\"v1\")"))
        .unwrap();

    // Warm resolution from the leaf, inherited from the root.
    let (def, definer) = mgr.resolve_method(&Obj::mk_id(3), describe).unwrap();
    assert_eq!((def.source.as_str(), definer), ("emit(\"v1\")", Obj::mk_id(1)));

    mgr.set_method(&Obj::mk_id(1), describe, MethodDef::new("emit(\"v2\")"))
        .unwrap();
    let (def, _) = mgr.resolve_method(&Obj::mk_id(3), describe).unwrap();
    assert_eq!(def.source, "emit(\"v2\")");
}

#[test]
fn test_remove_method_and_tooling_read_surface() {
    let mgr = test_manager();
    decay_world(&mgr);
    let decay = Symbol::mk("decay");
    mgr.set_method(&Obj::mk_id(2), decay, MethodDef::new("tick()")).unwrap();
    assert!(mgr.own_methods(&Obj::mk_id(2)).unwrap().contains_key(&decay));

    mgr.remove_method(&Obj::mk_id(2), decay).unwrap();
    assert_eq!(
        mgr.remove_method(&Obj::mk_id(2), decay),
        Err(ObjectError::MethodNotFound(Obj::mk_id(2), decay))
    );
    assert_eq!(
        mgr.resolve_method(&Obj::mk_id(3), decay).unwrap_err(),
        ObjectError::MethodNotFound(Obj::mk_id(3), decay)
    );
}

#[test]
fn test_delete_strict_vs_recycle() {
    let mgr = test_manager();
    decay_world(&mgr);
    assert_eq!(
        mgr.delete(&Obj::mk_id(2)),
        Err(ObjectError::Conflict(Obj::mk_id(2)))
    );

    // Recycle re-parents #3 up to #1 and then removes #2.
    mgr.recycle(&Obj::mk_id(2)).unwrap();
    assert!(!mgr.valid(&Obj::mk_id(2)).unwrap());
    assert_eq!(
        mgr.chain(&Obj::mk_id(3)).unwrap(),
        vec![Obj::mk_id(3), Obj::mk_id(1)]
    );
    // The trait's own property went with it.
    assert_eq!(
        mgr.resolve_property(&Obj::mk_id(3), Symbol::mk("decay_rate"))
            .unwrap_err(),
        ObjectError::PropertyNotFound(Obj::mk_id(3), Symbol::mk("decay_rate"))
    );
}

#[test]
fn test_concurrent_same_property_writes_single_winner() {
    let mgr = test_manager();
    decay_world(&mgr);
    let x = Symbol::mk("x");

    let m1 = mgr.clone();
    let m2 = mgr.clone();
    let t1 = std::thread::spawn(move || {
        m1.set_property(&Obj::mk_id(3), Symbol::mk("x"), v_int(1)).unwrap();
    });
    let t2 = std::thread::spawn(move || {
        m2.set_property(&Obj::mk_id(3), Symbol::mk("x"), v_int(2)).unwrap();
    });
    t1.join().unwrap();
    t2.join().unwrap();

    let (winner, definer) = mgr.resolve_property(&Obj::mk_id(3), x).unwrap();
    assert_eq!(definer, Obj::mk_id(3));
    assert!(winner == v_int(1) || winner == v_int(2), "got {winner:?}");
    // The store agrees with the resolved view.
    let reloaded = mgr.load(&Obj::mk_id(3)).unwrap();
    assert_eq!(reloaded.own_properties().get(&x), Some(&winner));
}

/// A store whose next `n` writes fail with a transient error, then it
/// behaves.
struct FlakyStore {
    inner: TransientStore,
    fails_remaining: AtomicIsize,
}

impl FlakyStore {
    fn new(fails: isize) -> Self {
        Self {
            inner: TransientStore::new(),
            fails_remaining: AtomicIsize::new(fails),
        }
    }

    fn fail_next(&self, n: isize) {
        self.fails_remaining.store(n, Ordering::SeqCst);
    }
}

impl ObjectStore for FlakyStore {
    fn get(&self, id: &Obj) -> Result<Option<ObjectRecord>, ObjectError> {
        self.inner.get(id)
    }

    fn put(&self, record: &ObjectRecord) -> Result<(), ObjectError> {
        if self.fails_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err(ObjectError::StoreUnavailable("disk went away".to_string()));
        }
        self.inner.put(record)
    }

    fn delete(&self, id: &Obj) -> Result<(), ObjectError> {
        self.inner.delete(id)
    }

    fn has_children(&self, id: &Obj) -> Result<bool, ObjectError> {
        self.inner.has_children(id)
    }

    fn children_of(&self, id: &Obj) -> Result<Vec<Obj>, ObjectError> {
        self.inner.children_of(id)
    }

    fn next_id(&self) -> Result<Obj, ObjectError> {
        self.inner.next_id()
    }

    fn max_id(&self) -> Result<Option<Obj>, ObjectError> {
        self.inner.max_id()
    }

    fn all_ids(&self) -> Result<Vec<Obj>, ObjectError> {
        self.inner.all_ids()
    }
}

fn fast_retry_config() -> DatabaseConfig {
    DatabaseConfig {
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        },
        ..DatabaseConfig::default()
    }
}

#[test]
fn test_transient_store_failure_is_retried() {
    let mgr = ObjectManager::new(Arc::new(FlakyStore::new(2)), &fast_retry_config());
    mgr.create_object(Some(Obj::mk_id(1)), None, None, None).unwrap();
    assert!(mgr.valid(&Obj::mk_id(1)).unwrap());
}

#[test]
fn test_persistent_store_failure_aborts_without_cache_damage() {
    let mgr = ObjectManager::new(Arc::new(FlakyStore::new(100)), &fast_retry_config());
    let err = mgr
        .create_object(Some(Obj::mk_id(1)), None, None, None)
        .unwrap_err();
    assert!(matches!(err, ObjectError::StoreUnavailable(_)));
    // Nothing was written, nothing is visible.
    assert!(!mgr.valid(&Obj::mk_id(1)).unwrap());
    assert!(mgr.cached_ids().is_empty());
}

#[test]
fn test_mutation_failure_leaves_prior_state_resolvable() {
    let store = Arc::new(FlakyStore::new(0));
    let mgr = ObjectManager::new(store.clone(), &fast_retry_config());
    mgr.create_object(Some(Obj::mk_id(1)), None, None, None).unwrap();
    let x = Symbol::mk("x");
    mgr.set_property(&Obj::mk_id(1), x, v_int(1)).unwrap();

    // Take the store down past the retry budget; the mutation must abort
    // without ever becoming visible.
    store.fail_next(1_000_000);
    let err = mgr.set_property(&Obj::mk_id(1), x, v_int(2)).unwrap_err();
    assert!(matches!(err, ObjectError::StoreUnavailable(_)));

    store.fail_next(0);
    assert_eq!(mgr.resolve_property(&Obj::mk_id(1), x).unwrap().0, v_int(1));
}
