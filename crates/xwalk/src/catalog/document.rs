//! Loading the catalog document (YAML) into a validated [`WalkLibrary`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use super::{Catalog, Category, Walk};
use crate::cooldown::CooldownSettings;
use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::sequence::ClipPools;
use crate::weights::{ScheduleEntry, ScheduleMenu, WeightProfile, WeightResolver};

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    intros: Vec<String>,
    #[serde(default)]
    outros: Vec<String>,
    #[serde(default)]
    categories: Vec<CategoryDoc>,
    /// Flat `walk id -> {category, ...}` form.
    #[serde(default)]
    walks: BTreeMap<String, LegacyWalkDoc>,
    #[serde(default)]
    reselection: ReselectionDoc,
    #[serde(default)]
    default_weight: u32,
    #[serde(default)]
    weights: BTreeMap<String, BTreeMap<String, u32>>,
    #[serde(default)]
    menu: Vec<MenuDoc>,
}

#[derive(Debug, Deserialize)]
struct CategoryDoc {
    id: String,
    #[serde(default)]
    intro: Option<String>,
    #[serde(default)]
    outro: Option<String>,
    #[serde(default)]
    walks: Vec<WalkDoc>,
}

#[derive(Debug, Deserialize)]
struct WalkDoc {
    id: String,
    #[serde(default)]
    intro: Option<String>,
    #[serde(default)]
    outro: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    ignore_reselection: bool,
}

#[derive(Debug, Deserialize)]
struct LegacyWalkDoc {
    category: String,
    #[serde(default)]
    intro: Option<String>,
    #[serde(default)]
    outro: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    ignore_reselection: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ReselectionDoc {
    #[serde(default, deserialize_with = "cooldown_duration")]
    walk_cooldown: Duration,
    #[serde(default, deserialize_with = "cooldown_duration")]
    category_cooldown: Duration,
    #[serde(default)]
    cooldown_categories: Vec<String>,
    #[serde(default)]
    fallback_walk: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MenuDoc {
    start: String,
    weights: String,
}

/// Cooldowns are humantime strings ("10m") or bare seconds.
fn cooldown_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => xwalkconf::duration::parse(&text).map_err(serde::de::Error::custom),
    }
}

/// Menu start times: RFC3339, or a naive date-time in the controller's
/// local time zone.
fn parse_menu_start(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::config(format!("invalid menu start time: {raw}")))
}

fn to_delta(name: &str, duration: Duration) -> Result<TimeDelta> {
    TimeDelta::from_std(duration)
        .map_err(|_| Error::config(format!("{name} is out of range: {duration:?}")))
}

/// The loaded catalog document: walks, weights, menu, cooldown settings,
/// clip pools and the fallback walk.
#[derive(Debug, Clone)]
pub struct WalkLibrary {
    catalog: Catalog,
    resolver: WeightResolver,
    cooldown: CooldownSettings,
    clips: ClipPools,
    fallback_walk: Option<String>,
}

impl WalkLibrary {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read catalog {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid catalog document: {e}")))?;
        Self::from_document(doc)
    }

    fn from_document(doc: CatalogDocument) -> Result<Self> {
        let mut builder = Catalog::builder();

        for category_doc in doc.categories {
            let mut category = Category::new(&category_doc.id);
            category.intro = category_doc.intro;
            category.outro = category_doc.outro;
            builder.category(category)?;

            for walk_doc in category_doc.walks {
                builder.walk(Walk {
                    id: walk_doc.id,
                    category: category_doc.id.clone(),
                    intro: walk_doc.intro,
                    outro: walk_doc.outro,
                    audio: walk_doc.audio,
                    ignore_reselection: walk_doc.ignore_reselection,
                })?;
            }
        }

        // Flat walks land after the structured ones, sorted by id. A category
        // that only appears here is created on first mention.
        for (id, legacy) in doc.walks {
            if !builder.has_category(&legacy.category) {
                debug!(category = %legacy.category, "Creating category from flat walk list");
                builder.category(Category::new(&legacy.category))?;
            }
            builder.walk(Walk {
                id,
                category: legacy.category,
                intro: legacy.intro,
                outro: legacy.outro,
                audio: legacy.audio,
                ignore_reselection: legacy.ignore_reselection,
            })?;
        }

        for category_id in &doc.reselection.cooldown_categories {
            builder.set_cooldown(category_id, true).map_err(|_| {
                Error::config(format!(
                    "cooldown_categories names unknown category {category_id}"
                ))
            })?;
        }

        let catalog = builder.build();
        if catalog.walk_count() == 0 {
            return Err(Error::config("catalog defines no walks"));
        }
        for category in catalog.categories() {
            if category.walks.is_empty() {
                warn!(category = %category.id, "Category has no walks and will never be drawn");
            }
        }

        let mut profiles = Vec::with_capacity(doc.weights.len());
        for (name, weights) in doc.weights {
            let weights: HashMap<String, u32> = weights.into_iter().collect();
            let profile = WeightProfile::new(name, weights);
            if let Some(unknown) = profile
                .categories()
                .find(|c| !catalog.contains_category(c))
            {
                return Err(Error::config(format!(
                    "weight profile {} names unknown category {}",
                    profile.name, unknown
                )));
            }
            profiles.push(profile);
        }

        let mut entries = Vec::with_capacity(doc.menu.len());
        for item in doc.menu {
            entries.push(ScheduleEntry {
                start: parse_menu_start(&item.start)?,
                profile: item.weights,
            });
        }
        let resolver = WeightResolver::new(profiles, ScheduleMenu::new(entries)?, doc.default_weight)?;

        if let Some(fallback) = &doc.reselection.fallback_walk {
            catalog.resolve(fallback).map_err(|_| {
                Error::config(format!("fallback_walk names unknown walk {fallback}"))
            })?;
        }

        let cooldown = CooldownSettings {
            walk_cooldown: to_delta("walk_cooldown", doc.reselection.walk_cooldown)?,
            category_cooldown: to_delta("category_cooldown", doc.reselection.category_cooldown)?,
        };

        Ok(Self {
            catalog,
            resolver,
            cooldown,
            clips: ClipPools {
                intros: doc.intros,
                outros: doc.outros,
            },
            fallback_walk: doc.reselection.fallback_walk,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolver(&self) -> &WeightResolver {
        &self.resolver
    }

    pub fn cooldown_settings(&self) -> CooldownSettings {
        self.cooldown
    }

    pub fn clips(&self) -> &ClipPools {
        &self.clips
    }

    pub fn fallback_walk(&self) -> Option<&str> {
        self.fallback_walk.as_deref()
    }

    pub fn selector(&self) -> Selector<'_> {
        Selector::new(&self.catalog, &self.resolver)
    }

    /// Ids of categories that participate in category cooldown.
    pub fn cooldown_categories(&self) -> HashSet<&str> {
        self.catalog
            .categories()
            .iter()
            .filter(|c| c.cooldown_enabled)
            .map(|c| c.id.as_str())
            .collect()
    }
}
