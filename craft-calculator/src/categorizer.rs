//! Splits a calculation into finished goods, intermediates, and by-products

use std::collections::HashSet;

use crate::calculator::Calculation;
use crate::catalog::Catalog;
use crate::models::{prune, Pool, EPSILON};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductBreakdown {
    /// Requested items that were delivered.
    pub finished: Pool,
    /// Crafted and consumed along the way.
    pub intermediate: Pool,
    /// Non-base material left in the pool, excluding finished goods.
    pub byproduct: Pool,
}

impl ProductBreakdown {
    pub fn is_empty(&self) -> bool {
        self.finished.is_empty() && self.intermediate.is_empty() && self.byproduct.is_empty()
    }
}

pub fn categorize(
    calculation: &Calculation,
    requested: &[String],
    catalog: &Catalog,
) -> ProductBreakdown {
    let requested: HashSet<&str> = requested.iter().map(String::as_str).collect();

    let finished: Pool = calculation
        .outputs
        .iter()
        .filter(|(item, amount)| requested.contains(item.as_str()) && **amount > EPSILON)
        .map(|(item, amount)| (item.clone(), *amount))
        .collect();

    let mut byproduct = Pool::new();
    for (item, amount) in &calculation.pool {
        if *amount <= EPSILON || catalog.is_base(item) {
            continue;
        }
        let left = match finished.get(item) {
            Some(done) => amount - done,
            None => *amount,
        };
        if left > EPSILON {
            byproduct.insert(item.clone(), left);
        }
    }

    ProductBreakdown {
        finished,
        intermediate: prune(&calculation.intermediates),
        byproduct,
    }
}
