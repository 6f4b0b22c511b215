//! The walk catalog: every selectable walk, grouped into categories.
//!
//! Built once at startup and immutable afterwards. Walk ids are unique
//! across the whole catalog so a walk can be looked up without knowing its
//! category.

mod document;

pub use document::WalkLibrary;

use std::collections::HashMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub id: String,
    pub category: String,
    /// Intro clip override.
    pub intro: Option<String>,
    /// Outro clip override.
    pub outro: Option<String>,
    /// Audio override; the walk id is used when absent.
    pub audio: Option<String>,
    /// Exempt from walk-level cooldown.
    pub ignore_reselection: bool,
}

impl Walk {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            intro: None,
            outro: None,
            audio: None,
            ignore_reselection: false,
        }
    }

    pub fn ignore_reselection(mut self, ignore: bool) -> Self {
        self.ignore_reselection = ignore;
        self
    }

    /// Audio clip to play alongside this walk.
    pub fn audio(&self) -> &str {
        self.audio.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    /// Walk ids in catalog order.
    pub walks: Vec<String>,
    /// Participates in category-level cooldown.
    pub cooldown_enabled: bool,
    /// Default intro for walks without their own.
    pub intro: Option<String>,
    /// Default outro for walks without their own.
    pub outro: Option<String>,
}

impl Category {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            walks: Vec::new(),
            cooldown_enabled: false,
            intro: None,
            outro: None,
        }
    }

    pub fn cooldown(mut self, enabled: bool) -> Self {
        self.cooldown_enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: Vec<Category>,
    category_index: HashMap<String, usize>,
    walks: HashMap<String, Walk>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn resolve(&self, walk_id: &str) -> Result<&Walk> {
        self.walks
            .get(walk_id)
            .ok_or_else(|| Error::walk_not_found(walk_id))
    }

    pub fn category(&self, category_id: &str) -> Result<&Category> {
        self.category_index
            .get(category_id)
            .map(|&i| &self.categories[i])
            .ok_or_else(|| Error::category_not_found(category_id))
    }

    /// Walks of a category, in catalog order.
    pub fn walks_in_category(&self, category_id: &str) -> Result<Vec<&Walk>> {
        let category = self.category(category_id)?;
        category.walks.iter().map(|id| self.resolve(id)).collect()
    }

    /// Categories in catalog order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn contains_category(&self, category_id: &str) -> bool {
        self.category_index.contains_key(category_id)
    }

    pub fn walk_count(&self) -> usize {
        self.walks.len()
    }
}

/// Assembles a [`Catalog`], rejecting duplicate ids.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    /// Add a category. Any walk ids already on it are ignored; walks are
    /// attached with [`CatalogBuilder::walk`].
    pub fn category(&mut self, mut category: Category) -> Result<&mut Self> {
        if self.catalog.category_index.contains_key(&category.id) {
            return Err(Error::config(format!("duplicate category id: {}", category.id)));
        }
        category.walks.clear();
        self.catalog
            .category_index
            .insert(category.id.clone(), self.catalog.categories.len());
        self.catalog.categories.push(category);
        Ok(self)
    }

    pub fn has_category(&self, category_id: &str) -> bool {
        self.catalog.contains_category(category_id)
    }

    /// Add a walk to its (already added) category.
    pub fn walk(&mut self, walk: Walk) -> Result<&mut Self> {
        if self.catalog.walks.contains_key(&walk.id) {
            return Err(Error::config(format!("duplicate walk id: {}", walk.id)));
        }
        let index = *self
            .catalog
            .category_index
            .get(&walk.category)
            .ok_or_else(|| {
                Error::config(format!(
                    "walk {} names undefined category {}",
                    walk.id, walk.category
                ))
            })?;
        self.catalog.categories[index].walks.push(walk.id.clone());
        self.catalog.walks.insert(walk.id.clone(), walk);
        Ok(self)
    }

    pub fn set_cooldown(&mut self, category_id: &str, enabled: bool) -> Result<()> {
        let index = *self
            .catalog
            .category_index
            .get(category_id)
            .ok_or_else(|| Error::category_not_found(category_id))?;
        self.catalog.categories[index].cooldown_enabled = enabled;
        Ok(())
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animals() -> Catalog {
        let mut builder = Catalog::builder();
        builder.category(Category::new("animals").cooldown(true)).unwrap();
        builder.category(Category::new("sleep")).unwrap();
        builder.walk(Walk::new("cat", "animals")).unwrap();
        builder.walk(Walk::new("dog", "animals")).unwrap();
        builder
            .walk(Walk::new("zzz", "sleep").ignore_reselection(true))
            .unwrap();
        builder.build()
    }

    #[test]
    fn resolve_and_lookup() {
        let catalog = animals();
        assert_eq!(catalog.resolve("dog").unwrap().category, "animals");
        assert!(matches!(
            catalog.resolve("cow"),
            Err(Error::NotFound { kind: "walk", .. })
        ));
        assert!(matches!(
            catalog.walks_in_category("plants"),
            Err(Error::NotFound { kind: "category", .. })
        ));
        assert_eq!(catalog.walk_count(), 3);
    }

    #[test]
    fn walks_keep_catalog_order() {
        let catalog = animals();
        let ids: Vec<_> = catalog
            .walks_in_category("animals")
            .unwrap()
            .into_iter()
            .map(|w| w.id.as_str())
            .collect();
        assert_eq!(ids, vec!["cat", "dog"]);

        let categories: Vec<_> = catalog.categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(categories, vec!["animals", "sleep"]);
    }

    #[test]
    fn duplicates_are_config_errors() {
        let mut builder = Catalog::builder();
        builder.category(Category::new("animals")).unwrap();
        assert!(matches!(
            builder.category(Category::new("animals")),
            Err(Error::Config(_))
        ));

        builder.walk(Walk::new("cat", "animals")).unwrap();
        assert!(matches!(
            builder.walk(Walk::new("cat", "animals")),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            builder.walk(Walk::new("fern", "plants")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn audio_defaults_to_walk_id() {
        let mut walk = Walk::new("walk-danish", "languages");
        assert_eq!(walk.audio(), "walk-danish");
        walk.audio = Some("danish-vo".to_string());
        assert_eq!(walk.audio(), "danish-vo");
    }
}
