//! Goal dwell detection and best-time bookkeeping.
//!
//! The level is won when both nose particles sit inside the goal rectangle
//! for [`GOAL_DWELL_MS`] of simulated time without either leaving.  The check
//! runs on every other tick only.

use crate::config::GoalRect;
use crate::constants::GOAL_DWELL_MS;
use bevy::math::DVec2;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of one goal evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalOutcome {
    /// Not both inside, and no dwell in progress.
    Outside,
    /// Both nose particles just entered together.
    DwellStarted,
    Dwelling { remaining_ms: u64 },
    /// A nose particle left before the dwell completed.
    Abandoned,
    Reached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalTimer {
    goal: GoalRect,
    evaluate_next: bool,
    dwell_start_ms: Option<u64>,
    remaining_ms: Option<u64>,
}

impl GoalTimer {
    pub fn new(goal: GoalRect) -> Self {
        Self {
            goal,
            evaluate_next: false,
            dwell_start_ms: None,
            remaining_ms: None,
        }
    }

    /// Advance the every-other-tick toggle and, on evaluation ticks, check
    /// the nose particles.  `now_ms` is the simulated level clock.
    ///
    /// Returns `None` on ticks that are skipped.
    pub fn tick(&mut self, nose: [DVec2; 2], now_ms: u64) -> Option<GoalOutcome> {
        let evaluate = self.evaluate_next;
        self.evaluate_next = !self.evaluate_next;
        evaluate.then(|| self.evaluate(nose, now_ms))
    }

    fn evaluate(&mut self, nose: [DVec2; 2], now_ms: u64) -> GoalOutcome {
        let inside = nose
            .iter()
            .all(|p| self.goal.contains(p.x as i32, p.y as i32));

        let Some(start) = self.dwell_start_ms else {
            if !inside {
                return GoalOutcome::Outside;
            }
            self.dwell_start_ms = Some(now_ms);
            self.remaining_ms = Some(GOAL_DWELL_MS);
            return GoalOutcome::DwellStarted;
        };

        if !inside {
            self.dwell_start_ms = None;
            self.remaining_ms = None;
            return GoalOutcome::Abandoned;
        }

        let elapsed = now_ms.saturating_sub(start);
        if elapsed >= GOAL_DWELL_MS {
            self.remaining_ms = Some(0);
            return GoalOutcome::Reached;
        }
        let remaining_ms = GOAL_DWELL_MS - elapsed;
        self.remaining_ms = Some(remaining_ms);
        GoalOutcome::Dwelling { remaining_ms }
    }

    /// Countdown for the "stay inside the goal" prompt, while dwelling.
    pub fn remaining_ms(&self) -> Option<u64> {
        self.remaining_ms
    }
}

/// Fastest completion time per level, in whole seconds.
///
/// Keyed by level identity (the terrain image path).
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BestTimes {
    times: BTreeMap<String, u64>,
}

impl BestTimes {
    /// Store `seconds` if the level has no time yet or this one is strictly
    /// faster.  Returns whether it was stored.
    pub fn record(&mut self, level_key: &str, seconds: u64) -> bool {
        match self.times.get(level_key) {
            Some(&best) if best <= seconds => false,
            _ => {
                self.times.insert(level_key.to_string(), seconds);
                true
            }
        }
    }

    pub fn get(&self, level_key: &str) -> Option<u64> {
        self.times.get(level_key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.times.iter().map(|(key, &secs)| (key.as_str(), secs))
    }
}
