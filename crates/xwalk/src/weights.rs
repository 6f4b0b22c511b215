//! Weight profiles and the schedule menu that picks between them.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Profile key that applies to every category not named explicitly.
pub const WILDCARD: &str = "_";

/// Profile used before the first menu entry starts, and as fallback for
/// categories another profile does not mention.
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightProfile {
    pub name: String,
    weights: HashMap<String, u32>,
}

impl WeightProfile {
    pub fn new(name: impl Into<String>, weights: HashMap<String, u32>) -> Self {
        Self {
            name: name.into(),
            weights,
        }
    }

    /// Weight set for exactly this category, if any.
    pub fn explicit(&self, category: &str) -> Option<u32> {
        self.weights.get(category).copied()
    }

    /// Weight for this category: explicit first, then the wildcard.
    pub fn lookup(&self, category: &str) -> Option<u32> {
        self.explicit(category)
            .or_else(|| self.weights.get(WILDCARD).copied())
    }

    /// Category keys named in this profile (wildcard excluded).
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.weights
            .keys()
            .map(String::as_str)
            .filter(|k| *k != WILDCARD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub start: DateTime<Utc>,
    pub profile: String,
}

/// Schedule entries sorted by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleMenu {
    entries: Vec<ScheduleEntry>,
}

impl ScheduleMenu {
    /// Sort entries; two entries starting at the same instant are rejected.
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Result<Self> {
        entries.sort_by_key(|e| e.start);
        if let Some(pair) = entries.windows(2).find(|w| w[0].start == w[1].start) {
            return Err(Error::config(format!(
                "menu has two entries starting at {} ({} and {})",
                pair[0].start, pair[0].profile, pair[1].profile
            )));
        }
        Ok(Self { entries })
    }

    /// The entry with the greatest start <= `now`.
    pub fn active_entry(&self, now: DateTime<Utc>) -> Option<&ScheduleEntry> {
        let after = self.entries.partition_point(|e| e.start <= now);
        after.checked_sub(1).map(|i| &self.entries[i])
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WeightResolver {
    profiles: HashMap<String, WeightProfile>,
    default: WeightProfile,
    menu: ScheduleMenu,
    global_default: u32,
}

impl WeightResolver {
    /// Requires a `default` profile, and every menu entry must name a
    /// known profile.
    pub fn new(
        profiles: impl IntoIterator<Item = WeightProfile>,
        menu: ScheduleMenu,
        global_default: u32,
    ) -> Result<Self> {
        let profiles: HashMap<_, _> = profiles
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        let default = profiles
            .get(DEFAULT_PROFILE)
            .cloned()
            .ok_or_else(|| Error::config("weights must define a `default` profile"))?;
        for entry in menu.entries() {
            if !profiles.contains_key(&entry.profile) {
                return Err(Error::config(format!(
                    "menu entry at {} names unknown weight profile {}",
                    entry.start, entry.profile
                )));
            }
        }

        Ok(Self {
            profiles,
            default,
            menu,
            global_default,
        })
    }

    pub fn default_profile(&self) -> &WeightProfile {
        &self.default
    }

    pub fn profile(&self, name: &str) -> Option<&WeightProfile> {
        self.profiles.get(name)
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn menu(&self) -> &ScheduleMenu {
        &self.menu
    }

    pub fn global_default(&self) -> u32 {
        self.global_default
    }

    /// Profile in effect at `now`; `default` before the first entry.
    pub fn active_profile(&self, now: DateTime<Utc>) -> &WeightProfile {
        self.menu
            .active_entry(now)
            .and_then(|entry| self.profiles.get(&entry.profile))
            .unwrap_or_else(|| self.default_profile())
    }

    /// Weight of `category` under `profile`. 0 means excluded.
    ///
    /// Lookup order: the profile (explicit, then `_`), the default profile
    /// (explicit, then `_`), then the global default.
    pub fn weight_for(&self, profile: &WeightProfile, category: &str) -> u32 {
        profile
            .lookup(category)
            .or_else(|| self.default_profile().lookup(category))
            .unwrap_or(self.global_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap() + TimeDelta::hours(hours)
    }

    fn profile(name: &str, weights: &[(&str, u32)]) -> WeightProfile {
        WeightProfile::new(
            name,
            weights
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }

    fn entry(hours: i64, profile: &str) -> ScheduleEntry {
        ScheduleEntry {
            start: t(hours),
            profile: profile.to_string(),
        }
    }

    fn resolver() -> WeightResolver {
        let menu = ScheduleMenu::new(vec![
            entry(18, "evening"),
            entry(9, "tuesday"),
            entry(12, "lunch"),
        ])
        .unwrap();
        WeightResolver::new(
            [
                profile("default", &[("_", 1), ("sleep", 0)]),
                profile("tuesday", &[("animals", 25)]),
                profile("lunch", &[("_", 3), ("animals", 0)]),
                profile("evening", &[]),
            ],
            menu,
            0,
        )
        .unwrap()
    }

    #[test]
    fn active_profile_follows_menu() {
        let r = resolver();
        assert_eq!(r.active_profile(t(8)).name, "default");
        assert_eq!(r.active_profile(t(9)).name, "tuesday");
        assert_eq!(r.active_profile(t(11)).name, "tuesday");
        assert_eq!(r.active_profile(t(12)).name, "lunch");
        assert_eq!(r.active_profile(t(17)).name, "lunch");
        assert_eq!(r.active_profile(t(18)).name, "evening");
        assert_eq!(r.active_profile(t(48)).name, "evening");
    }

    #[test]
    fn weight_fallback_chain() {
        let r = resolver();
        let tuesday = r.profile("tuesday").unwrap();
        let lunch = r.profile("lunch").unwrap();
        let evening = r.profile("evening").unwrap();

        // explicit
        assert_eq!(r.weight_for(tuesday, "animals"), 25);
        // default explicit
        assert_eq!(r.weight_for(tuesday, "sleep"), 0);
        // default wildcard
        assert_eq!(r.weight_for(tuesday, "plants"), 1);
        // own wildcard beats default
        assert_eq!(r.weight_for(lunch, "plants"), 3);
        assert_eq!(r.weight_for(lunch, "animals"), 0);
        assert_eq!(r.weight_for(evening, "plants"), 1);
    }

    #[test]
    fn global_default_applies_last() {
        let r = WeightResolver::new(
            [profile("default", &[("animals", 2)])],
            ScheduleMenu::default(),
            7,
        )
        .unwrap();
        let default = r.default_profile();
        assert_eq!(r.weight_for(default, "animals"), 2);
        assert_eq!(r.weight_for(default, "plants"), 7);
    }

    #[test]
    fn missing_default_profile_is_rejected() {
        let err = WeightResolver::new([profile("tuesday", &[])], ScheduleMenu::default(), 0)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn menu_must_name_known_profiles() {
        let menu = ScheduleMenu::new(vec![entry(1, "brunch")]).unwrap();
        let err = WeightResolver::new([profile("default", &[])], menu, 0).unwrap_err();
        assert!(err.to_string().contains("brunch"));
    }

    #[test]
    fn duplicate_start_times_are_rejected() {
        let err = ScheduleMenu::new(vec![entry(1, "a"), entry(1, "b")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
