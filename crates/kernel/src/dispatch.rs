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

//! The dispatch engine: the single entry point the connection layer sees.
//!
//! Resolution happens against the live manager state on every dispatch,
//! so a method update is visible to the very next invocation of that
//! name. Execution runs to completion, fault, or budget abort within the
//! call; there is no multi-tick suspension. Whatever happens inside the
//! executor (faults, panics, limit trips) comes back as a typed error;
//! nothing unwinds through the manager or leaves the cache half-updated.

use crate::budget::Budget;
use crate::config::DispatchConfig;
use crate::exec::{ExecContext, Executor};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, warn};
use wold_common::model::ObjectError;
use wold_common::tasks::{DispatchError, ExecutionFault};
use wold_db::{ObjectManager, RuntimeObject};
use wold_var::{List, Obj, Symbol, Var};

pub struct DispatchEngine {
    manager: Arc<ObjectManager>,
    executor: Arc<dyn Executor>,
    config: DispatchConfig,
}

impl DispatchEngine {
    pub fn new(
        manager: Arc<ObjectManager>,
        executor: Arc<dyn Executor>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            manager,
            executor,
            config,
        }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<ObjectManager> {
        &self.manager
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Resolve `method` against `id` and execute it with a fresh budget.
    /// One call per parsed command; this is the whole boundary contract
    /// with the connection layer.
    pub fn dispatch(
        &self,
        id: &Obj,
        method: Symbol,
        args: List,
    ) -> Result<Var, DispatchError> {
        let mut budget = Budget::new(&self.config);
        let result = self.dispatch_nested(id, method, args, 0, &mut budget);
        debug!(%id, %method, ticks = budget.ticks_used(), ok = result.is_ok(), "dispatch complete");
        result
    }

    /// Dispatch against an already-loaded runtime object.
    pub fn invoke(
        &self,
        obj: &RuntimeObject,
        method: Symbol,
        args: List,
    ) -> Result<Var, DispatchError> {
        self.dispatch(&obj.id(), method, args)
    }

    pub(crate) fn dispatch_nested(
        &self,
        id: &Obj,
        method: Symbol,
        args: List,
        depth: usize,
        budget: &mut Budget,
    ) -> Result<Var, DispatchError> {
        let (def, definer) = self.manager.resolve_method(id, method).map_err(|e| match e {
            ObjectError::MethodNotFound(_, _) => DispatchError::NoSuchMethod(*id, method),
            other => DispatchError::World(other),
        })?;
        // `self` binds to the original receiver, not the definer: the
        // nearest-wins, dynamic-receiver rule.
        let this = self.manager.load(id)?;

        let mut ctx = ExecContext {
            engine: self,
            this,
            definer,
            args,
            depth,
            budget: &mut *budget,
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| self.executor.execute(&def, &mut ctx)));
        drop(ctx);
        let outcome = match outcome {
            Ok(r) => r,
            Err(panic) => {
                let msg = panic_message(&panic);
                warn!(%id, %method, "executor panicked: {msg}");
                Err(ExecutionFault::msg(format!("executor panicked: {msg}")))
            }
        };

        // A recorded limit trip is terminal for the whole dispatch tree,
        // whatever the executor chose to return around it.
        if let Some(abort) = budget.abort() {
            return Err(abort.clone());
        }
        match outcome {
            Ok(v) => Ok(v),
            Err(fault) => Err(DispatchError::ExecutionError {
                object: *id,
                method,
                fault,
            }),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
