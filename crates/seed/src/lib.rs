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

//! World-bootstrap support: composing multi-trait prototypes out of
//! reusable builder bundles, and loading the composed records (plus the
//! static room/item content) into a store in dependency order.
//!
//! Composition happens here, once, at content-authoring time. The runtime
//! inheritance model stays strictly single-parent; a "decayable, edible,
//! describable" prototype is the *fold* of those three bundles persisted
//! as one record, not three parents.

mod builder;
mod load;

pub use builder::{TraitBundle, fold};
pub use load::{BootstrapLoader, LoadSummary, SeedObject};

use thiserror::Error;
use wold_common::model::ObjectError;
use wold_var::Obj;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeedError {
    #[error("Duplicate id in seed set: {0}")]
    DuplicateSeedId(Obj),
    #[error("Seed set contains a parent cycle among {0:?}")]
    SeedCycle(Vec<Obj>),
    #[error("Seed parent {1} of {0} is neither in the seed set nor the store")]
    MissingParent(Obj, Obj),
    #[error("World state error during bootstrap")]
    World(#[from] ObjectError),
}
