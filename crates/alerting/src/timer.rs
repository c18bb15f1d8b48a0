//! Per-category debounce / cooldown state

use crate::state::AlertCategory;
use chrono::{DateTime, TimeDelta, Utc};
use std::ops::{Index, IndexMut};

/// Timer state for one alert category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTimer {
    /// Whether the alert is currently firing
    pub active: bool,
    /// When the triggering condition started holding; `None` once it breaks
    pub condition_start: Option<DateTime<Utc>>,
    /// Last emission, for cooldowns
    pub last_trigger: Option<DateTime<Utc>>,
}

impl CategoryTimer {
    /// Note that the condition holds at `now`. Returns how long it has held,
    /// or `None` on the frame that starts it.
    pub fn hold(&mut self, now: DateTime<Utc>) -> Option<TimeDelta> {
        match self.condition_start {
            Some(start) => Some(now - start),
            None => {
                self.condition_start = Some(now);
                None
            }
        }
    }

    /// Condition broke; accumulated time is lost
    pub fn release(&mut self) {
        self.condition_start = None;
    }

    /// Whether more than `cooldown` has passed since the last emission
    pub fn cooled_down(&self, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
        self.last_trigger.map_or(true, |last| now - last > cooldown)
    }

    /// Set active; true only on the inactive -> active edge
    pub fn activate(&mut self) -> bool {
        !std::mem::replace(&mut self.active, true)
    }

    /// Clear active; true only on the active -> inactive edge
    pub fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    pub fn mark_triggered(&mut self, now: DateTime<Utc>) {
        self.last_trigger = Some(now);
    }
}

/// One timer per [`AlertCategory`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    timers: [CategoryTimer; AlertCategory::COUNT],
}

impl CategoryTable {
    pub fn iter(&self) -> impl Iterator<Item = (AlertCategory, &CategoryTimer)> {
        AlertCategory::ALL.into_iter().zip(self.timers.iter())
    }

    /// Categories currently firing
    pub fn active(&self) -> Vec<AlertCategory> {
        self.iter()
            .filter(|(_, timer)| timer.active)
            .map(|(category, _)| category)
            .collect()
    }
}

impl Index<AlertCategory> for CategoryTable {
    type Output = CategoryTimer;

    fn index(&self, category: AlertCategory) -> &CategoryTimer {
        &self.timers[category.index()]
    }
}

impl IndexMut<AlertCategory> for CategoryTable {
    fn index_mut(&mut self, category: AlertCategory) -> &mut CategoryTimer {
        &mut self.timers[category.index()]
    }
}
