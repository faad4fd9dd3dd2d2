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

use crate::model::{MethodDef, ObjectError};
use wold_var::{Obj, Symbol, Var};

/// Interface exposed for bulk-loading world content into the store at
/// bootstrap. Overlaps with what the manager's normal write path provides,
/// but with different constraints: ids may be caller-assigned, and loads
/// must be idempotent across re-runs.
pub trait LoaderInterface: Send + Sync {
    /// Create a new object. When `id` is `None` the store assigns the next
    /// sequential id; a caller-assigned id that already exists is an
    /// `ObjectAlreadyExists` error.
    fn create_object(
        &self,
        id: Option<Obj>,
        parent: Option<Obj>,
        name: Option<String>,
        location: Option<Obj>,
    ) -> Result<Obj, ObjectError>;

    fn set_property(&self, obj: &Obj, name: Symbol, value: Var) -> Result<(), ObjectError>;

    fn set_method(&self, obj: &Obj, name: Symbol, def: MethodDef) -> Result<(), ObjectError>;

    /// Whether an object with this id exists in the store.
    fn exists(&self, obj: &Obj) -> Result<bool, ObjectError>;

    /// The highest object id the store has issued, if any.
    fn max_object(&self) -> Result<Option<Obj>, ObjectError>;
}
