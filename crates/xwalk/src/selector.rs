//! Weighted, cooldown-aware walk selection.
//!
//! A draw picks a category with probability proportional to its weight
//! under the active profile, then a walk uniformly among that category's
//! eligible walks. A category with nothing eligible is dropped from the
//! pool and the draw repeats over what is left, so a dead category never
//! shifts probability onto one particular neighbour.

use chrono::{DateTime, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::catalog::{Catalog, Category, Walk};
use crate::cooldown::CooldownTracker;
use crate::error::{Error, Result};
use crate::weights::{WeightProfile, WeightResolver};

#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    catalog: &'a Catalog,
    resolver: &'a WeightResolver,
}

impl<'a> Selector<'a> {
    pub fn new(catalog: &'a Catalog, resolver: &'a WeightResolver) -> Self {
        Self { catalog, resolver }
    }

    /// Categories that can be drawn right now, with their weights.
    /// Zero-weight and cooling-down categories are left out.
    pub fn candidates(
        &self,
        profile: &WeightProfile,
        tracker: &CooldownTracker,
        now: DateTime<Utc>,
    ) -> Vec<(&'a Category, u32)> {
        self.catalog
            .categories()
            .iter()
            .map(|category| (category, self.resolver.weight_for(profile, &category.id)))
            .filter(|(category, weight)| {
                *weight > 0 && tracker.is_category_eligible(category, now)
            })
            .collect()
    }

    /// Draw a walk under the profile active at `now` and record it.
    pub fn select<R: Rng + ?Sized>(
        &self,
        tracker: &mut CooldownTracker,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<&'a Walk> {
        let profile = self.resolver.active_profile(now);
        self.select_with_profile(profile, tracker, now, rng)
    }

    /// Draw a walk under an explicit profile and record it.
    pub fn select_with_profile<R: Rng + ?Sized>(
        &self,
        profile: &WeightProfile,
        tracker: &mut CooldownTracker,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<&'a Walk> {
        let mut pool = self.candidates(profile, tracker, now);

        while !pool.is_empty() {
            // u64 total: several u32 weights can exceed u32::MAX
            let index = WeightedIndex::new(pool.iter().map(|(_, weight)| u64::from(*weight)))
                .map_err(|_| Error::Exhausted)?
                .sample(rng);
            let category = pool[index].0;

            let eligible: Vec<&'a Walk> = self
                .catalog
                .walks_in_category(&category.id)?
                .into_iter()
                .filter(|walk| tracker.is_walk_eligible(walk, now))
                .collect();

            match eligible.choose(rng) {
                Some(&walk) => {
                    tracker.record(walk, category, now);
                    return Ok(walk);
                }
                None => {
                    trace!(category = %category.id, "No eligible walks, dropping category from draw");
                    pool.swap_remove(index);
                }
            }
        }

        Err(Error::Exhausted)
    }

    /// Play a specific walk, bypassing weights and cooldown checks. The
    /// selection is still recorded.
    pub fn select_named(
        &self,
        tracker: &mut CooldownTracker,
        walk_id: &str,
        now: DateTime<Utc>,
    ) -> Result<&'a Walk> {
        let walk = self.catalog.resolve(walk_id)?;
        let category = self.catalog.category(&walk.category)?;
        tracker.record(walk, category, now);
        Ok(walk)
    }
}
