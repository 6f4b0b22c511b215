//! Intro, outro and audio resolution for a chosen walk.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{Category, Walk};

/// Walks named `walk-<x>` pair with an intro clip named `wait-<x>`.
const WALK_PREFIX: &str = "walk-";
const WAIT_PREFIX: &str = "wait-";

/// Shared intro and outro clips, drawn uniformly when nothing more specific
/// applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipPools {
    pub intros: Vec<String>,
    pub outros: Vec<String>,
}

/// Everything a station needs to play one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub walk: String,
    pub category: String,
    pub intro: Option<String>,
    pub outro: Option<String>,
    pub audio: String,
}

impl ClipPools {
    /// Walk override, then category default, then the matching `wait-`
    /// clip, then a uniform draw from the pool.
    pub fn intro_for<R: Rng + ?Sized>(
        &self,
        walk: &Walk,
        category: &Category,
        rng: &mut R,
    ) -> Option<String> {
        walk.intro
            .clone()
            .or_else(|| category.intro.clone())
            .or_else(|| {
                walk.id
                    .strip_prefix(WALK_PREFIX)
                    .map(|suffix| format!("{WAIT_PREFIX}{suffix}"))
            })
            .or_else(|| self.intros.choose(rng).cloned())
    }

    /// Walk override, then category default, then a uniform draw.
    pub fn outro_for<R: Rng + ?Sized>(
        &self,
        walk: &Walk,
        category: &Category,
        rng: &mut R,
    ) -> Option<String> {
        walk.outro
            .clone()
            .or_else(|| category.outro.clone())
            .or_else(|| self.outros.choose(rng).cloned())
    }

    pub fn sequence<R: Rng + ?Sized>(
        &self,
        walk: &Walk,
        category: &Category,
        rng: &mut R,
    ) -> Sequence {
        Sequence {
            walk: walk.id.clone(),
            category: category.id.clone(),
            intro: self.intro_for(walk, category, rng),
            outro: self.outro_for(walk, category, rng),
            audio: walk.audio().to_string(),
        }
    }
}
