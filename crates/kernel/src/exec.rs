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

use crate::budget::Budget;
use crate::dispatch::DispatchEngine;
use std::sync::Arc;
use wold_common::model::MethodDef;
use wold_common::tasks::{DispatchError, ExecutionFault};
use wold_db::{ObjectManager, RuntimeObject};
use wold_var::{List, Obj, Symbol, Var};

/// What actually runs method source. The core is agnostic to the
/// scripting facility behind this; the contract is only that it spends
/// the budget through `ctx.checkpoint()` inside its loops, surfaces
/// runtime faults as `ExecutionFault`, and returns a value.
pub trait Executor: Send + Sync {
    fn execute(&self, method: &MethodDef, ctx: &mut ExecContext) -> Result<Var, ExecutionFault>;
}

/// The execution context for one activation. Carries exactly the three
/// bindings method code gets (`self`, the original receiver, not the
/// defining ancestor; `args`; and `$`, the manager) plus the shared
/// budget and the re-entrant call handle. Built per dispatch, discarded after;
/// nothing leaks across calls.
pub struct ExecContext<'a> {
    pub(crate) engine: &'a DispatchEngine,
    pub(crate) this: Arc<RuntimeObject>,
    pub(crate) definer: Obj,
    pub(crate) args: List,
    pub(crate) depth: usize,
    pub(crate) budget: &'a mut Budget,
}

impl ExecContext<'_> {
    /// The `self` binding: the original receiver of the dispatch. An
    /// inherited method still sees the descendant it was invoked on.
    #[must_use]
    pub fn this(&self) -> &Arc<RuntimeObject> {
        &self.this
    }

    /// The object the resolved method is actually defined on.
    #[must_use]
    pub fn definer(&self) -> Obj {
        self.definer
    }

    /// The `args` binding: the caller-supplied ordered argument list.
    #[must_use]
    pub fn args(&self) -> &List {
        &self.args
    }

    /// The `$` binding: the object manager, for cross-object reads,
    /// writes, and new-object creation from inside a method body.
    #[must_use]
    pub fn world(&self) -> &Arc<ObjectManager> {
        self.engine.manager()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Spend one tick of the shared budget. Execution loops call this;
    /// it is the cooperative cancellation point.
    pub fn checkpoint(&mut self) -> Result<(), ExecutionFault> {
        self.budget.checkpoint()
    }

    /// Re-entrant dispatch: invoke a method on another (or the same)
    /// object. The nested activation gets `target` as its own `self` and
    /// shares this dispatch's budget. Depth beyond the configured ceiling
    /// is rejected, and that rejection is terminal for the whole
    /// top-level dispatch.
    pub fn call(&mut self, target: &Obj, method: Symbol, args: List) -> Result<Var, ExecutionFault> {
        let ceiling = self.engine.config().max_dispatch_depth;
        if self.depth + 1 >= ceiling {
            let abort = DispatchError::DispatchTooDeep(ceiling);
            let fault = ExecutionFault::msg(abort.to_string());
            self.budget.record_abort(abort);
            return Err(fault);
        }
        self.engine
            .dispatch_nested(target, method, args, self.depth + 1, self.budget)
            .map_err(|e| ExecutionFault::msg(e.to_string()))
    }
}
