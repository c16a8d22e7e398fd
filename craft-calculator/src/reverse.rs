//! Reverse capacity: how much of each item the current pool could make
//!
//! Each route of an item is evaluated as if it had the whole pool to itself,
//! and the per-route amounts are summed. This is an upper bound when two
//! routes compete for the same input.

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::Catalog;
use crate::models::{add_to, prune, Pool, EPSILON};

/// Best known `(max quantity, shortages)` per item.
pub type Memo = HashMap<String, (f64, Pool)>;

/// Maximum obtainable quantity of `item` (on hand plus craftable) and the
/// base material missing for routes that cannot complete a single run.
pub fn max_producible(item: &str, inventory: &Pool, catalog: &Catalog, memo: &mut Memo) -> (f64, Pool) {
    if let Some(known) = memo.get(item) {
        return known.clone();
    }

    let on_hand = inventory.get(item).copied().unwrap_or(0.0);
    if catalog.is_base(item) {
        memo.insert(item.to_string(), (on_hand, Pool::new()));
        return (on_hand, Pool::new());
    }

    // An item is never assumed to feed itself while it is being evaluated.
    memo.insert(item.to_string(), (on_hand, Pool::new()));

    let routes = catalog.recipes_producing(item);
    if routes.is_empty() {
        let mut missing = Pool::new();
        add_to(&mut missing, item, 1.0);
        memo.insert(item.to_string(), (on_hand, missing.clone()));
        return (on_hand, missing);
    }

    let mut producible = 0.0;
    let mut missing = Pool::new();

    for recipe in routes {
        let mut route_missing = Pool::new();
        let mut runs = f64::INFINITY;

        for (input, per_run) in &recipe.inputs {
            let (available, input_missing) = max_producible(input, inventory, catalog, memo);
            if available < *per_run {
                let shortage = per_run - available;
                if input_missing.is_empty() {
                    add_to(&mut route_missing, input, shortage);
                }
                for (nested, qty) in &input_missing {
                    add_to(&mut route_missing, nested, qty * shortage);
                }
            }
            runs = runs.min(available / per_run);
        }

        if runs.is_infinite() {
            runs = 0.0;
        }
        if runs < 1.0 {
            for (short, qty) in &route_missing {
                add_to(&mut missing, short, *qty);
            }
        }

        let per_run_output = recipe.output_of(item).unwrap_or(0.0);
        debug!(item, recipe = recipe.index, runs, "reverse route capacity");
        producible += per_run_output * runs;
    }

    let result = (on_hand + producible, prune(&missing));
    memo.insert(item.to_string(), result.clone());
    result
}

/// Amount of every craftable item obtainable beyond what is already on hand.
pub fn reverse_calculate(catalog: &Catalog, inventory: &Pool) -> Pool {
    let mut memo = Memo::new();
    for (item, qty) in inventory {
        if catalog.is_base(item) {
            memo.insert(item.clone(), (*qty, Pool::new()));
        }
    }

    let mut craftable = Pool::new();
    for item in catalog.all_items() {
        if catalog.is_base(item) {
            continue;
        }
        let (max_qty, _) = max_producible(item, inventory, catalog, &mut memo);
        let extra = max_qty - inventory.get(item).copied().unwrap_or(0.0);
        if extra > EPSILON {
            craftable.insert(item.clone(), extra);
        }
    }
    craftable
}
