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

use crate::model::ObjectError;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;
use wold_var::{Obj, Symbol, Var};

/// Reasons a dispatch might be aborted for a 'limit'.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AbortLimitReason {
    /// The dispatch hit its allotted tick limit.
    Ticks(usize),
    /// The dispatch hit its allotted wall-clock limit.
    Time(Duration),
}

/// A runtime fault raised by executing method source: the executor's
/// equivalent of an uncaught exception. Carried opaquely through the
/// dispatch boundary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionFault {
    pub message: String,
    /// An optional in-world value attached to the fault.
    pub value: Option<Var>,
}

impl ExecutionFault {
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: Var) -> Self {
        self.value = Some(value);
        self
    }
}

impl Display for ExecutionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExecutionFault {}

/// Everything a dispatch caller can get back instead of a result. These
/// are typed returns, never unwound panics; the cache and store are in a
/// consistent state whenever one of these surfaces.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("No such method: {0}:{1}")]
    NoSuchMethod(Obj, Symbol),
    #[error("Execution of {object}:{method} failed: {fault}")]
    ExecutionError {
        object: Obj,
        method: Symbol,
        #[source]
        fault: ExecutionFault,
    },
    #[error("Dispatch aborted due to limit: {0:?}")]
    ExecutionTimeout(AbortLimitReason),
    #[error("Dispatch depth exceeded ceiling of {0}")]
    DispatchTooDeep(usize),
    #[error("World state error during dispatch")]
    World(#[from] ObjectError),
}
