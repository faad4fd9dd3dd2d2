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

pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Upper bound on prototype-chain length during resolution walks.
    /// A walk that exceeds it is reported as a suspected cycle rather than
    /// looping forever.
    pub max_chain_depth: usize,
    pub retry: RetryConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded-backoff retry policy for transient store I/O failures. Only
/// `StoreUnavailable` is retried; structural errors surface immediately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(250),
        }
    }
}
