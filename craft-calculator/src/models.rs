//! Data models shared by the forward and reverse engines

use std::collections::BTreeMap;
use std::fmt;

/// Quantities at or below this are treated as absent.
pub const EPSILON: f64 = 1e-9;

/// Item name to quantity. Sorted so reports and persisted files are stable.
pub type Pool = BTreeMap<String, f64>;

/// Add `amount` of `item` to a pool.
pub fn add_to(pool: &mut Pool, item: &str, amount: f64) {
    *pool.entry(item.to_string()).or_default() += amount;
}

/// Add every entry of `other` into `pool`.
pub fn merge_into(pool: &mut Pool, other: &Pool) {
    for (item, amount) in other {
        add_to(pool, item, *amount);
    }
}

/// Drop every entry at or below [`EPSILON`].
pub fn prune(pool: &Pool) -> Pool {
    pool.iter()
        .filter(|(_, amount)| **amount > EPSILON)
        .map(|(item, amount)| (item.clone(), *amount))
        .collect()
}

/// How a unit of demand was sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Taken from the pool (child node of a partially stocked demand).
    Stock,
    /// A base resource, drawn as raw input.
    Base,
    /// Crafted with the recipe at this catalog index.
    Recipe(usize),
    /// The whole demand was met from the pool.
    StockOnly,
    /// The item is already being resolved further up the chain.
    UnresolvedLoop,
    /// No viable recipe and not a base resource.
    MissingRecipeOrBase,
    ZeroNeeded,
}

impl Source {
    pub fn is_recipe(&self) -> bool {
        matches!(self, Source::Recipe(_))
    }

    /// Sort key used when rendering sibling nodes.
    pub fn display_priority(&self) -> u8 {
        match self {
            Source::Stock => 0,
            Source::Base => 1,
            Source::Recipe(_) => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stock => write!(f, "stock"),
            Source::Base => write!(f, "base"),
            Source::Recipe(index) => write!(f, "recipe_{}", index),
            Source::StockOnly => write!(f, "stock_only"),
            Source::UnresolvedLoop => write!(f, "unresolved_loop"),
            Source::MissingRecipeOrBase => write!(f, "missing_recipe_or_base"),
            Source::ZeroNeeded => write!(f, "zero_needed"),
        }
    }
}

/// One step of fulfilling a need for an item
#[derive(Debug, Clone, PartialEq)]
pub struct DerivationNode {
    pub item: String,
    pub needed: f64,
    /// Amount contributed toward `needed`.
    pub produced: f64,
    /// Gross recipe output, may exceed `needed`.
    pub actual_produced_by_recipe: f64,
    pub source: Source,
    pub children: Vec<DerivationNode>,
    pub depth: usize,
}

impl DerivationNode {
    pub fn new(item: &str, needed: f64, depth: usize, source: Source) -> Self {
        Self {
            item: item.to_string(),
            needed,
            produced: 0.0,
            actual_produced_by_recipe: 0.0,
            source,
            children: Vec::new(),
            depth,
        }
    }

    /// True when this node or one of its direct children was crafted.
    pub fn involves_recipe(&self) -> bool {
        self.source.is_recipe() || self.children.iter().any(|c| c.source.is_recipe())
    }

    /// Remove zero-demand children, recursively.
    pub fn prune(&mut self) {
        self.children.retain(|c| c.needed > EPSILON);
        for child in &mut self.children {
            child.prune();
        }
    }
}
