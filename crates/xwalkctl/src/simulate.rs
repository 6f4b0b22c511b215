//! Offline selection simulation: draw many walks from a catalog and report
//! how often each category and walk came up.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use xwalk::{CooldownSettings, CooldownTracker, Error, WalkLibrary};

const TOP_WALKS: usize = 10;

pub struct Options {
    pub profile: Option<String>,
    pub trials: u32,
    pub seed: Option<u64>,
    /// Simulated time between draws; `None` ignores cooldowns.
    pub cooldown: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Report {
    pub profile: String,
    pub trials: u32,
    pub exhausted: u32,
    pub categories: BTreeMap<String, u32>,
    pub walks: HashMap<String, u32>,
}

impl Report {
    /// Walks by descending count, ties by id.
    pub fn top_walks(&self, limit: usize) -> Vec<(&str, u32)> {
        let mut walks: Vec<(&str, u32)> =
            self.walks.iter().map(|(id, n)| (id.as_str(), *n)).collect();
        walks.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        walks.truncate(limit);
        walks
    }

    fn pct(&self, count: u32) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            f64::from(count) * 100.0 / f64::from(self.trials)
        }
    }
}

pub fn simulate(library: &WalkLibrary, options: &Options, start: DateTime<Utc>) -> Result<Report> {
    let resolver = library.resolver();
    let profile = match &options.profile {
        Some(name) => resolver
            .profile(name)
            .ok_or_else(|| anyhow!("unknown weight profile: {}", name))?,
        None => resolver.active_profile(start),
    };

    let (settings, step) = match options.cooldown {
        Some(step) => (
            library.cooldown_settings(),
            TimeDelta::from_std(step).context("simulation step is out of range")?,
        ),
        None => (CooldownSettings::default(), TimeDelta::zero()),
    };
    let mut tracker = CooldownTracker::new(settings);
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let selector = library.selector();
    let mut report = Report {
        profile: profile.name.clone(),
        trials: options.trials,
        ..Default::default()
    };

    let mut now = start;
    for _ in 0..options.trials {
        match selector.select_with_profile(profile, &mut tracker, now, &mut rng) {
            Ok(walk) => {
                *report.categories.entry(walk.category.clone()).or_default() += 1;
                *report.walks.entry(walk.id.clone()).or_default() += 1;
            }
            Err(Error::Exhausted) => report.exhausted += 1,
            Err(e) => return Err(e.into()),
        }
        now += step;
    }

    Ok(report)
}

pub fn run(path: &Path, options: &Options) -> Result<()> {
    let library = WalkLibrary::load(path).context("Failed to load walk catalog")?;
    let report = simulate(&library, options, Utc::now())?;

    println!(
        "{} selections with profile {} from {}",
        report.trials,
        report.profile,
        path.display()
    );
    if let Some(step) = options.cooldown {
        println!(
            "cooldowns applied, {} between selections",
            xwalkconf::duration::format(step)
        );
    }

    println!("\ncategories:");
    for (category, count) in &report.categories {
        println!("  {:<20} {:>8} {:>6.2}%", category, count, report.pct(*count));
    }
    if report.exhausted > 0 {
        println!(
            "  {:<20} {:>8} {:>6.2}%",
            "(exhausted)",
            report.exhausted,
            report.pct(report.exhausted)
        );
    }

    println!("\ntop walks:");
    for (walk, count) in report.top_walks(TOP_WALKS) {
        println!("  {:<20} {:>8} {:>6.2}%", walk, count, report.pct(count));
    }
    Ok(())
}
