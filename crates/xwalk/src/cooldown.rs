//! Reselection cooldowns for walks and categories.
//!
//! State lives in memory for the life of the process; a restart forgets
//! every cooldown.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

use crate::catalog::{Category, Walk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownSettings {
    /// Minimum spacing between two selections of the same walk.
    pub walk_cooldown: TimeDelta,
    /// Minimum spacing between two selections from the same
    /// cooldown-enabled category.
    pub category_cooldown: TimeDelta,
}

impl Default for CooldownSettings {
    fn default() -> Self {
        Self {
            walk_cooldown: TimeDelta::zero(),
            category_cooldown: TimeDelta::zero(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    settings: CooldownSettings,
    walks: HashMap<String, DateTime<Utc>>,
    categories: HashMap<String, DateTime<Utc>>,
    recorded: u64,
}

impl CooldownTracker {
    pub fn new(settings: CooldownSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> CooldownSettings {
        self.settings
    }

    pub fn is_walk_eligible(&self, walk: &Walk, now: DateTime<Utc>) -> bool {
        if walk.ignore_reselection {
            return true;
        }
        match self.walks.get(&walk.id) {
            Some(last) => now - *last >= self.settings.walk_cooldown,
            None => true,
        }
    }

    /// A category on cooldown removes all of its walks from consideration.
    pub fn is_category_eligible(&self, category: &Category, now: DateTime<Utc>) -> bool {
        if !category.cooldown_enabled {
            return true;
        }
        match self.categories.get(&category.id) {
            Some(last) => now - *last >= self.settings.category_cooldown,
            None => true,
        }
    }

    pub fn is_eligible(&self, walk: &Walk, category: &Category, now: DateTime<Utc>) -> bool {
        self.is_category_eligible(category, now) && self.is_walk_eligible(walk, now)
    }

    /// Note a selection. Category time is only kept for cooldown-enabled
    /// categories, since no other category is ever checked.
    pub fn record(&mut self, walk: &Walk, category: &Category, now: DateTime<Utc>) {
        self.walks.insert(walk.id.clone(), now);
        if category.cooldown_enabled {
            self.categories.insert(category.id.clone(), now);
        }
        self.recorded += 1;
    }

    pub fn last_walk_time(&self, walk_id: &str) -> Option<DateTime<Utc>> {
        self.walks.get(walk_id).copied()
    }

    pub fn last_category_time(&self, category_id: &str) -> Option<DateTime<Utc>> {
        self.categories.get(category_id).copied()
    }

    /// Number of selections recorded since start.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}
