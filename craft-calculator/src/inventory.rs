//! Inventory persistence: a flat JSON object of item to quantity

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::models::{add_to, prune, Pool};

/// Load the inventory. A missing file is an empty inventory.
pub fn load_inventory(path: &Path) -> Result<Pool> {
    if !path.exists() {
        return Ok(Pool::new());
    }
    let content = fs::read_to_string(path)?;
    let pool: Pool = serde_json::from_str(&content)?;
    info!("loaded {} inventory entries from {}", pool.len(), path.display());
    Ok(prune(&pool))
}

/// Save the inventory with sorted keys, dropping near-zero entries.
pub fn save_inventory(path: &Path, pool: &Pool) -> Result<()> {
    let pruned = prune(pool);
    fs::write(path, serde_json::to_string_pretty(&pruned)?)?;
    info!("saved {} inventory entries to {}", pruned.len(), path.display());
    Ok(())
}

pub fn add_to_inventory(pool: &mut Pool, item: &str, quantity: f64) {
    add_to(pool, item, quantity);
}

/// Remove one item, or everything when `item` is `None`. Returns whether anything changed.
pub fn clear_inventory(pool: &mut Pool, item: Option<&str>) -> bool {
    match item {
        Some(item) => pool.remove(item).is_some(),
        None => {
            let had_items = !pool.is_empty();
            pool.clear();
            had_items
        }
    }
}
