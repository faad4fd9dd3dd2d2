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

use crate::config::DispatchConfig;
use minstant::Instant;
use std::time::Duration;
use wold_common::tasks::{AbortLimitReason, DispatchError, ExecutionFault};

/// The resource budget for one top-level dispatch, shared by every nested
/// dispatch under it. Executors spend it cooperatively through
/// `checkpoint`; once a limit trips, the abort is terminal: every later
/// checkpoint fails, and method code cannot swallow it.
pub struct Budget {
    max_ticks: usize,
    ticks_used: usize,
    time_limit: Duration,
    deadline: Instant,
    abort: Option<DispatchError>,
}

impl Budget {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            max_ticks: config.max_ticks,
            ticks_used: 0,
            time_limit: config.max_time,
            deadline: Instant::now() + config.max_time,
            abort: None,
        }
    }

    /// Spend one tick. The cancellation point inside execution loops:
    /// returns an error once the tick or wall-clock budget is gone.
    pub fn checkpoint(&mut self) -> Result<(), ExecutionFault> {
        if let Some(abort) = &self.abort {
            return Err(ExecutionFault::msg(abort.to_string()));
        }
        self.ticks_used += 1;
        if self.ticks_used > self.max_ticks {
            return Err(self.trip(AbortLimitReason::Ticks(self.max_ticks)));
        }
        if Instant::now() >= self.deadline {
            return Err(self.trip(AbortLimitReason::Time(self.time_limit)));
        }
        Ok(())
    }

    #[must_use]
    pub fn ticks_used(&self) -> usize {
        self.ticks_used
    }

    /// The terminal abort recorded for this dispatch, if any.
    pub(crate) fn abort(&self) -> Option<&DispatchError> {
        self.abort.as_ref()
    }

    /// Record a terminal abort; the first one recorded wins.
    pub(crate) fn record_abort(&mut self, e: DispatchError) {
        if self.abort.is_none() {
            self.abort = Some(e);
        }
    }

    fn trip(&mut self, reason: AbortLimitReason) -> ExecutionFault {
        let abort = DispatchError::ExecutionTimeout(reason);
        let fault = ExecutionFault::msg(abort.to_string());
        self.record_abort(abort);
        fault
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_budget_trips_and_stays_tripped() {
        let config = DispatchConfig {
            max_ticks: 3,
            ..DispatchConfig::default()
        };
        let mut budget = Budget::new(&config);
        for _ in 0..3 {
            budget.checkpoint().unwrap();
        }
        assert!(budget.checkpoint().is_err());
        assert!(matches!(
            budget.abort(),
            Some(DispatchError::ExecutionTimeout(AbortLimitReason::Ticks(3)))
        ));
        // Once tripped, every later checkpoint fails too.
        assert!(budget.checkpoint().is_err());
        assert_eq!(budget.ticks_used(), 4);
    }

    #[test]
    fn test_wall_clock_trips() {
        let config = DispatchConfig {
            max_time: Duration::ZERO,
            ..DispatchConfig::default()
        };
        let mut budget = Budget::new(&config);
        assert!(budget.checkpoint().is_err());
        assert!(matches!(
            budget.abort(),
            Some(DispatchError::ExecutionTimeout(AbortLimitReason::Time(_)))
        ));
    }
}
