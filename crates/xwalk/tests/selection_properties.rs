//! Property tests for weights, cooldowns, and schedule resolution.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use xwalk::{
    Catalog, Category, CooldownSettings, CooldownTracker, Error, ScheduleEntry, ScheduleMenu,
    Selector, Walk, WeightProfile, WeightResolver,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
}

/// `n` categories `c0..`, each with `walks` walks `c<i>-w<j>`.
fn catalog(n: usize, walks: usize, cooldown_every: usize) -> Catalog {
    let mut builder = Catalog::builder();
    for i in 0..n {
        let cooldown = cooldown_every > 0 && i % cooldown_every == 0;
        builder
            .category(Category::new(format!("c{i}")).cooldown(cooldown))
            .unwrap();
        for j in 0..walks {
            builder.walk(Walk::new(format!("c{i}-w{j}"), format!("c{i}"))).unwrap();
        }
    }
    builder.build()
}

fn default_only(weights: &[u32]) -> WeightResolver {
    let weights: HashMap<String, u32> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| (format!("c{i}"), *w))
        .collect();
    WeightResolver::new(
        [WeightProfile::new("default", weights)],
        ScheduleMenu::default(),
        0,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn zero_weight_categories_are_never_selected(
        weights in prop::collection::vec(0u32..4, 2..6),
        seed in any::<u64>(),
    ) {
        prop_assume!(weights.iter().any(|w| *w > 0));
        let catalog = catalog(weights.len(), 2, 0);
        let resolver = default_only(&weights);
        let selector = Selector::new(&catalog, &resolver);
        let mut tracker = CooldownTracker::new(CooldownSettings::default());
        let mut rng = StdRng::seed_from_u64(seed);

        for draw in 0..10_000i64 {
            let walk = selector
                .select(&mut tracker, t0() + TimeDelta::milliseconds(draw), &mut rng)
                .unwrap();
            let index: usize = walk.category[1..].parse().unwrap();
            prop_assert!(weights[index] > 0, "drew {} with weight 0", walk.id);
        }
    }
}

proptest! {
    #[test]
    fn weight_follows_profile_then_default_then_global(
        profile_weights in prop::collection::hash_map("c[0-4]", 0u32..100, 0..5),
        default_weights in prop::collection::hash_map("c[0-4]", 0u32..100, 0..5),
        profile_wildcard in prop::option::of(0u32..100),
        default_wildcard in prop::option::of(0u32..100),
        global in 0u32..10,
        category in "c[0-5]",
    ) {
        let mut profile = profile_weights.clone();
        if let Some(w) = profile_wildcard {
            profile.insert("_".to_string(), w);
        }
        let mut default = default_weights.clone();
        if let Some(w) = default_wildcard {
            default.insert("_".to_string(), w);
        }

        let resolver = WeightResolver::new(
            [
                WeightProfile::new("default", default),
                WeightProfile::new("evening", profile),
            ],
            ScheduleMenu::default(),
            global,
        )
        .unwrap();

        let expected = profile_weights
            .get(&category)
            .copied()
            .or(profile_wildcard)
            .or_else(|| default_weights.get(&category).copied())
            .or(default_wildcard)
            .unwrap_or(global);

        let evening = resolver.profile("evening").unwrap();
        prop_assert_eq!(resolver.weight_for(evening, &category), expected);
    }

    #[test]
    fn successive_selections_respect_cooldowns(
        steps in prop::collection::vec(0i64..8_000, 1..120),
        seed in any::<u64>(),
    ) {
        let catalog = catalog(4, 3, 2);
        let resolver = default_only(&[3, 1, 2, 1]);
        let selector = Selector::new(&catalog, &resolver);
        let settings = CooldownSettings {
            walk_cooldown: TimeDelta::seconds(10),
            category_cooldown: TimeDelta::seconds(4),
        };
        let mut tracker = CooldownTracker::new(settings);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut last_walk: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut last_category: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut now = t0();

        for step in steps {
            now += TimeDelta::milliseconds(step);
            match selector.select(&mut tracker, now, &mut rng) {
                Ok(walk) => {
                    if let Some(prev) = last_walk.insert(walk.id.clone(), now) {
                        prop_assert!(now - prev >= settings.walk_cooldown);
                    }
                    let category = catalog.category(&walk.category).unwrap();
                    if category.cooldown_enabled {
                        if let Some(prev) = last_category.insert(category.id.clone(), now) {
                            prop_assert!(now - prev >= settings.category_cooldown);
                        }
                    }
                }
                Err(Error::Exhausted) => {}
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }
    }

    #[test]
    fn active_profile_is_latest_entry_not_after_now(
        starts in prop::collection::btree_set(0i64..10_000, 1..12),
        probe in -100i64..10_100,
    ) {
        let starts: Vec<i64> = starts.into_iter().collect();
        let at = |minute: i64| t0() + TimeDelta::minutes(minute);

        let entries: Vec<ScheduleEntry> = starts
            .iter()
            .rev()
            .map(|m| ScheduleEntry { start: at(*m), profile: format!("p{m}") })
            .collect();
        let mut profiles: Vec<WeightProfile> = starts
            .iter()
            .map(|m| WeightProfile::new(format!("p{m}"), HashMap::new()))
            .collect();
        profiles.push(WeightProfile::new("default", HashMap::new()));
        let resolver =
            WeightResolver::new(profiles, ScheduleMenu::new(entries).unwrap(), 0).unwrap();

        let expected = starts
            .iter()
            .filter(|m| **m <= probe)
            .max()
            .map(|m| format!("p{m}"))
            .unwrap_or_else(|| "default".to_string());

        prop_assert_eq!(&resolver.active_profile(at(probe)).name, &expected);
    }
}

#[test]
fn three_entry_menu_boundaries() {
    let starts = [60, 120, 180];
    let entries = starts
        .iter()
        .map(|m| ScheduleEntry {
            start: t0() + TimeDelta::minutes(*m),
            profile: format!("p{m}"),
        })
        .collect();
    let mut profiles: Vec<_> = starts
        .iter()
        .map(|m| WeightProfile::new(format!("p{m}"), HashMap::new()))
        .collect();
    profiles.push(WeightProfile::new("default", HashMap::new()));
    let resolver = WeightResolver::new(profiles, ScheduleMenu::new(entries).unwrap(), 0).unwrap();

    let name = |minute: i64| {
        resolver
            .active_profile(t0() + TimeDelta::minutes(minute))
            .name
            .clone()
    };
    assert_eq!(name(59), "default");
    assert_eq!(name(60), "p60");
    assert_eq!(name(119), "p60");
    assert_eq!(name(120), "p120");
    assert_eq!(name(179), "p120");
    assert_eq!(name(180), "p180");

    let names: BTreeSet<&str> = resolver.profile_names().collect();
    assert_eq!(names.len(), 4);
}
