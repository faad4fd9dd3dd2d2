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

use wold_common::model::{ObjectError, ObjectRecord};
use wold_var::Obj;

/// Durable key/document persistence of object records. The store has no
/// knowledge of inheritance semantics; it maintains exactly two pieces of
/// derived state: the parent→children index and the id sequence.
///
/// All operations are atomic per record. Multi-record coordination is the
/// manager's job.
pub trait ObjectStore: Send + Sync {
    fn get(&self, id: &Obj) -> Result<Option<ObjectRecord>, ObjectError>;

    /// Insert or replace a record, keeping the child index in step with
    /// the record's parent link. Issuing a record whose id is beyond the
    /// sequence advances the sequence past it.
    fn put(&self, record: &ObjectRecord) -> Result<(), ObjectError>;

    /// Remove a record. Refuses with `Conflict` while any live record
    /// still names this id as its parent.
    fn delete(&self, id: &Obj) -> Result<(), ObjectError>;

    fn has_children(&self, id: &Obj) -> Result<bool, ObjectError>;

    fn children_of(&self, id: &Obj) -> Result<Vec<Obj>, ObjectError>;

    /// Issue the next unused object id. Ids are monotonic and never
    /// reused, even across deletes.
    fn next_id(&self) -> Result<Obj, ObjectError>;

    /// The highest id issued so far, if any.
    fn max_id(&self) -> Result<Option<Obj>, ObjectError>;

    fn all_ids(&self) -> Result<Vec<Obj>, ObjectError>;
}
