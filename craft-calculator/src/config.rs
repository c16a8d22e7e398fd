use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::display::DEFAULT_PRECISION;
use crate::route::BASE_RESOURCE_COST_WEIGHT;

/// Calculator configuration, read from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Recipe file (JSON array of `{inputs, outputs}`)
    pub recipes: PathBuf,
    /// Inventory file (flat JSON object)
    pub inventory: PathBuf,
    /// Write the final pool back to the inventory after `calc`
    pub persist_inventory: bool,
    /// Weight of raw material against craft steps when scoring routes
    pub route_cost_weight: f64,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Decimal places for non-integral quantities
    pub precision: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            recipes: PathBuf::from("recipes.json"),
            inventory: PathBuf::from("inventory.json"),
            persist_inventory: true,
            route_cost_weight: BASE_RESOURCE_COST_WEIGHT,
            display: DisplayConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl CalculatorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        if !config.route_cost_weight.is_finite() || config.route_cost_weight <= 0.0 {
            anyhow::bail!("route_cost_weight must be a positive number");
        }
        Ok(config)
    }

    /// Read `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
