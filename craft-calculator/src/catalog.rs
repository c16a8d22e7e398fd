//! Recipe catalog: the recipe list plus the item sets derived from it
//!
//! The catalog is constructed once and only changes through explicit
//! `add_recipe` / `delete_recipe` calls, which rebuild the derived sets.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CalculatorError, Result};
use crate::models::EPSILON;

/// A recipe: per-run inputs and outputs, in declared order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Position in the catalog. Assigned on load, not persisted.
    #[serde(skip)]
    pub index: usize,
    pub inputs: IndexMap<String, f64>,
    pub outputs: IndexMap<String, f64>,
}

impl Recipe {
    pub fn new<I, O, K>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        O: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            index: 0,
            inputs: inputs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            outputs: outputs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Per-run output of `item`, if this recipe produces it.
    pub fn output_of(&self, item: &str) -> Option<f64> {
        self.outputs.get(item).copied()
    }

    fn validate(&self) -> Result<()> {
        if self.outputs.is_empty() {
            return Err(CalculatorError::InvalidRecipe(
                "a recipe must have at least one output".to_string(),
            ));
        }
        for (item, qty) in self.inputs.iter().chain(self.outputs.iter()) {
            if item.trim().is_empty() {
                return Err(CalculatorError::InvalidRecipe(
                    "item names must not be empty".to_string(),
                ));
            }
            if !qty.is_finite() || *qty <= EPSILON {
                return Err(CalculatorError::InvalidRecipe(format!(
                    "quantity for '{}' must be positive, got {}",
                    item, qty
                )));
            }
        }
        Ok(())
    }
}

/// On-disk shape with sorted keys.
#[derive(Serialize)]
struct PersistedRecipe<'a> {
    inputs: BTreeMap<&'a str, f64>,
    outputs: BTreeMap<&'a str, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    recipes: Vec<Recipe>,
    all_items: Vec<String>,
    base_resources: BTreeSet<String>,
}

impl Catalog {
    /// Build a catalog, validating every recipe and deriving the item sets.
    pub fn new(recipes: Vec<Recipe>) -> Result<Self> {
        for recipe in &recipes {
            recipe.validate()?;
        }
        let mut catalog = Self {
            recipes,
            ..Self::default()
        };
        catalog.rebuild();
        Ok(catalog)
    }

    /// Load recipes from a JSON array of `{inputs, outputs}` objects.
    ///
    /// A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no recipe file at {}, starting with an empty catalog", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let recipes: Vec<Recipe> = serde_json::from_str(&content)?;
        info!("loaded {} recipes from {}", recipes.len(), path.display());
        Self::new(recipes)
    }

    /// Write recipes back as JSON with sorted keys.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data: Vec<PersistedRecipe<'_>> = self
            .recipes
            .iter()
            .map(|r| PersistedRecipe {
                inputs: r.inputs.iter().map(|(k, v)| (k.as_str(), *v)).collect(),
                outputs: r.outputs.iter().map(|(k, v)| (k.as_str(), *v)).collect(),
            })
            .collect();
        fs::write(path, serde_json::to_string_pretty(&data)?)?;
        info!("saved {} recipes to {}", self.recipes.len(), path.display());
        Ok(())
    }

    pub fn add_recipe(&mut self, recipe: Recipe) -> Result<usize> {
        recipe.validate()?;
        self.recipes.push(recipe);
        self.rebuild();
        Ok(self.recipes.len() - 1)
    }

    /// Delete by 0-based index. Later recipes shift down by one.
    pub fn delete_recipe(&mut self, index: usize) -> Result<Recipe> {
        if index >= self.recipes.len() {
            return Err(CalculatorError::RecipeIndexOutOfRange {
                index,
                len: self.recipes.len(),
            });
        }
        let removed = self.recipes.remove(index);
        self.rebuild();
        Ok(removed)
    }

    fn rebuild(&mut self) {
        let mut items = BTreeSet::new();
        let mut outputs = BTreeSet::new();
        for (index, recipe) in self.recipes.iter_mut().enumerate() {
            recipe.index = index;
            items.extend(recipe.inputs.keys().cloned());
            items.extend(recipe.outputs.keys().cloned());
            outputs.extend(recipe.outputs.keys().cloned());
        }
        self.base_resources = items.difference(&outputs).cloned().collect();
        self.all_items = items.into_iter().collect();
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Every item mentioned by any recipe, sorted.
    pub fn all_items(&self) -> &[String] {
        &self.all_items
    }

    /// Items that appear as inputs but never as outputs.
    pub fn base_resources(&self) -> &BTreeSet<String> {
        &self.base_resources
    }

    pub fn is_base(&self, item: &str) -> bool {
        self.base_resources.contains(item)
    }

    pub fn contains_item(&self, item: &str) -> bool {
        self.all_items.binary_search_by(|i| i.as_str().cmp(item)).is_ok()
    }

    /// Recipes producing `item`, in load order.
    pub fn recipes_producing(&self, item: &str) -> Vec<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.outputs.contains_key(item))
            .collect()
    }

    /// A small built-in recipe set.
    pub fn sample() -> Self {
        let recipes = vec![
            Recipe::new([("Rich Air", 2.0)], [("Mana Crystal", 1.0)]),
            Recipe::new(
                [("Mana Crystal", 3.0)],
                [("Mana Dust", 2.0), ("Liquid Curse", 1.0), ("Silica Powder", 1.0)],
            ),
            Recipe::new(
                [("Mana Dust", 2.0), ("Silica Powder", 1.0)],
                [("Weak Mana Gem", 1.0)],
            ),
            Recipe::new([("Weak Mana Gem", 5.0)], [("Pure Mana Gem", 1.0)]),
            Recipe::new(
                [("Copper Coin", 5.0), ("Silver Coin", 2.0)],
                [("Adamantine Bar", 1.0)],
            ),
            Recipe::new(
                [("Liquid Curse", 2.0), ("Gold Coin", 1.0)],
                [("Bright Shard", 1.0), ("Vial of Blood", 1.0)],
            ),
            Recipe::new(
                [
                    ("Pure Mana Gem", 1.0),
                    ("Adamantine Bar", 2.0),
                    ("Bright Shard", 1.0),
                ],
                [("Astral Sheet", 1.0)],
            ),
        ];
        // The literal set above is valid by construction.
        let mut catalog = Self {
            recipes,
            ..Self::default()
        };
        catalog.rebuild();
        catalog
    }
}
