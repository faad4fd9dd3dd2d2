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

//! Test support: a scripted executor that binds registered source strings
//! to native closures. Method source stays opaque data, exactly as in
//! production; the stub just uses the text as a lookup key.

use crate::exec::{ExecContext, Executor};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wold_common::model::MethodDef;
use wold_common::tasks::ExecutionFault;
use wold_var::Var;

type Handler = dyn Fn(&mut ExecContext) -> Result<Var, ExecutionFault> + Send + Sync;

#[derive(Default)]
pub struct StubExecutor {
    handlers: Mutex<HashMap<String, Arc<Handler>>>,
}

impl StubExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a behavior to an exact source string.
    pub fn on(
        &self,
        source: &str,
        f: impl Fn(&mut ExecContext) -> Result<Var, ExecutionFault> + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .unwrap()
            .insert(source.to_string(), Arc::new(f));
    }
}

impl Executor for StubExecutor {
    fn execute(&self, method: &MethodDef, ctx: &mut ExecContext) -> Result<Var, ExecutionFault> {
        // Don't hold the registry lock across the handler; handlers
        // re-enter dispatch.
        let handler = self.handlers.lock().unwrap().get(&method.source).cloned();
        match handler {
            Some(h) => h(ctx),
            None => Err(ExecutionFault::msg(format!(
                "no behavior registered for source {:?}",
                method.source
            ))),
        }
    }
}
