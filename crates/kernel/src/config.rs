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

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Ceiling on re-entrant dispatch depth. Cooperating objects calling
    /// back and forth hit this instead of recursing forever.
    pub max_dispatch_depth: usize,
    /// Execution-step budget for one top-level dispatch, nested calls
    /// included.
    pub max_ticks: usize,
    /// Wall-clock budget for one top-level dispatch.
    pub max_time: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: 32,
            max_ticks: 30_000,
            max_time: Duration::from_secs(5),
        }
    }
}
