//! Forward resolution engine and sequential aggregator
//!
//! Resolving a request walks the recipe graph depth first. The resource pool
//! is threaded by value: each call receives a snapshot and returns the pool
//! after its own effects, so a route that is evaluated and then discarded
//! never leaks state into its siblings.

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{CalculatorError, Result};
use crate::models::{add_to, merge_into, prune, DerivationNode, Pool, Source, EPSILON};
use crate::route::{self, BASE_RESOURCE_COST_WEIGHT};

/// Result of resolving one demand
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Base inputs drawn, plus any demand that could not be met.
    pub inputs: Pool,
    /// Amount of the requested item delivered (stock and crafted).
    pub outputs: Pool,
    pub byproducts: Pool,
    /// Pool after this call.
    pub pool: Pool,
    pub node: DerivationNode,
    /// Items crafted only to feed a parent demand.
    pub intermediates: Pool,
}

impl Resolution {
    fn leaf(node: DerivationNode, pool: Pool) -> Self {
        Self {
            inputs: Pool::new(),
            outputs: Pool::new(),
            byproducts: Pool::new(),
            pool,
            node,
            intermediates: Pool::new(),
        }
    }
}

/// Aggregate totals for a batch of requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calculation {
    /// Total base inputs required.
    pub inputs: Pool,
    /// Total delivered for each requested item.
    pub outputs: Pool,
    /// Intermediates crafted and consumed.
    pub intermediates: Pool,
    /// Pool after the whole batch.
    pub pool: Pool,
    pub trees: Vec<DerivationNode>,
}

impl Calculation {
    /// Input entries that are not base resources: demand that could not be met.
    pub fn unmet(&self, catalog: &Catalog) -> Pool {
        self.inputs
            .iter()
            .filter(|(item, _)| !catalog.is_base(item))
            .map(|(item, amount)| (item.clone(), *amount))
            .collect()
    }
}

pub struct Calculator<'a> {
    catalog: &'a Catalog,
    cost_weight: f64,
}

impl<'a> Calculator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            cost_weight: BASE_RESOURCE_COST_WEIGHT,
        }
    }

    /// Override the weight of raw material against craft steps in route scoring.
    pub fn with_cost_weight(mut self, weight: f64) -> Self {
        self.cost_weight = weight;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub(crate) fn cost_weight(&self) -> f64 {
        self.cost_weight
    }

    /// Resolve every request in order, feeding each one's leftover pool into the next.
    pub fn calculate(&self, requests: &[(String, f64)], initial: &Pool) -> Result<Calculation> {
        let mut pool = prune(initial);
        let mut inputs = Pool::new();
        let mut outputs = Pool::new();
        let mut intermediates = Pool::new();
        let mut trees = Vec::with_capacity(requests.len());

        for (item, quantity) in requests {
            let resolution = self.resolve(item, *quantity, &pool, &HashSet::new(), 0)?;
            merge_into(&mut inputs, &resolution.inputs);
            merge_into(&mut outputs, &resolution.outputs);
            merge_into(&mut intermediates, &resolution.intermediates);
            pool = resolution.pool;
            trees.push(resolution.node);
        }

        for tree in &mut trees {
            tree.prune();
        }

        Ok(Calculation {
            inputs: prune(&inputs),
            outputs: prune(&outputs),
            intermediates: prune(&intermediates),
            pool: prune(&pool),
            trees,
        })
    }

    /// Resolve `quantity` of `item` against `pool`.
    ///
    /// `ancestors` holds the items being resolved higher up this call chain.
    pub fn resolve(
        &self,
        item: &str,
        quantity: f64,
        pool: &Pool,
        ancestors: &HashSet<String>,
        depth: usize,
    ) -> Result<Resolution> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(CalculatorError::NegativeQuantity {
                item: item.to_string(),
                quantity,
            });
        }

        if quantity <= EPSILON {
            let node = DerivationNode::new(item, quantity, depth, Source::ZeroNeeded);
            return Ok(Resolution::leaf(node, pool.clone()));
        }

        if ancestors.contains(item) {
            debug!(item, quantity, "circular recipe dependency, leaving demand unresolved");
            let node = DerivationNode::new(item, quantity, depth, Source::UnresolvedLoop);
            let mut resolution = Resolution::leaf(node, pool.clone());
            add_to(&mut resolution.inputs, item, quantity);
            return Ok(resolution);
        }

        let mut node = DerivationNode::new(item, quantity, depth, Source::StockOnly);
        let mut pool = pool.clone();
        let mut remaining = quantity;

        let on_hand = pool.get(item).copied().unwrap_or(0.0);
        let used = on_hand.min(remaining);
        if used > EPSILON {
            let left = on_hand - used;
            if left > EPSILON {
                pool.insert(item.to_string(), left);
            } else {
                pool.remove(item);
            }
            remaining -= used;
            debug!(item, used, remaining, "used from stock");

            let mut stock = DerivationNode::new(item, used, depth + 1, Source::Stock);
            stock.produced = used;
            node.children.push(stock);
            node.produced += used;
        }

        let mut resolution = Resolution::leaf(node, pool);

        if remaining <= EPSILON {
            let produced = resolution.node.produced;
            add_to(&mut resolution.outputs, item, produced);
            return Ok(resolution);
        }

        let mut ancestors = ancestors.clone();
        ancestors.insert(item.to_string());

        match route::best_route(self, item, remaining, &resolution.pool, &ancestors, depth)? {
            Some(best) => {
                debug!(item, recipe = best.recipe_index, score = best.score, "selected route");
                let node = &mut resolution.node;
                node.source = Source::Recipe(best.recipe_index);
                node.produced += remaining;
                node.actual_produced_by_recipe = best.actual_produced;
                node.children.extend(best.children);

                add_to(&mut resolution.outputs, item, remaining);
                resolution.inputs = best.inputs;
                resolution.byproducts = best.byproducts;
                resolution.intermediates = best.intermediates;
                resolution.pool = best.pool;
            }
            None if self.catalog.is_base(item) => {
                let node = &mut resolution.node;
                node.source = Source::Base;
                node.produced += remaining;
                node.actual_produced_by_recipe = remaining;
                add_to(&mut resolution.inputs, item, remaining);
                add_to(&mut resolution.outputs, item, remaining);
            }
            None => {
                debug!(item, remaining, "no viable recipe and not a base resource");
                resolution.node.source = Source::MissingRecipeOrBase;
                add_to(&mut resolution.inputs, item, remaining);
            }
        }

        let produced = resolution.node.produced;
        if depth > 0
            && !self.catalog.is_base(item)
            && resolution.node.source.is_recipe()
            && produced > EPSILON
        {
            add_to(&mut resolution.intermediates, item, produced);
        }

        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Recipe;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn requests(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(i, q)| (i.to_string(), *q)).collect()
    }

    fn pool(items: &[(&str, f64)]) -> Pool {
        items.iter().map(|(i, q)| (i.to_string(), *q)).collect()
    }

    #[test]
    fn test_simple_craft() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Mana Crystal", 1.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.inputs, pool(&[("Rich Air", 2.0)]));
        assert_eq!(calc.outputs, pool(&[("Mana Crystal", 1.0)]));
        assert!(calc.intermediates.is_empty());
        assert!(calc.pool.is_empty());
        assert_eq!(calc.trees[0].source, Source::Recipe(0));
    }

    #[test]
    fn test_byproducts_and_excess() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Mana Dust", 2.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.inputs, pool(&[("Rich Air", 6.0)]));
        assert_eq!(calc.outputs, pool(&[("Mana Dust", 2.0)]));
        assert_eq!(calc.intermediates, pool(&[("Mana Crystal", 3.0)]));
        assert!(approx(calc.pool["Liquid Curse"], 1.0));
        assert!(approx(calc.pool["Silica Powder"], 1.0));
        assert!(!calc.pool.contains_key("Mana Crystal"));
    }

    #[test]
    fn test_partial_stock_of_base_input() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Mana Crystal", 1.0)]), &pool(&[("Rich Air", 1.0)]))
            .unwrap();
        assert_eq!(calc.inputs, pool(&[("Rich Air", 1.0)]));
        assert!(calc.pool.is_empty());
    }

    #[test]
    fn test_partly_stocked_base_request_outputs_only_sourced_amount() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Rich Air", 10.0)]), &pool(&[("Rich Air", 4.0)]))
            .unwrap();
        assert_eq!(calc.inputs, pool(&[("Rich Air", 6.0)]));
        assert_eq!(calc.outputs, pool(&[("Rich Air", 6.0)]));
        assert!(approx(calc.trees[0].produced, 10.0));
    }

    #[test]
    fn test_partly_stocked_crafted_request_outputs_only_crafted_amount() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Mana Crystal", 2.0)]), &pool(&[("Mana Crystal", 1.0)]))
            .unwrap();
        assert_eq!(calc.inputs, pool(&[("Rich Air", 2.0)]));
        assert_eq!(calc.outputs, pool(&[("Mana Crystal", 1.0)]));
        assert_eq!(calc.trees[0].source, Source::Recipe(0));
        assert!(calc.pool.is_empty());
    }

    #[test]
    fn test_partly_stocked_missing_item_has_no_output() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Phylactery", 3.0)]), &pool(&[("Phylactery", 1.0)]))
            .unwrap();
        assert_eq!(calc.unmet(&catalog), pool(&[("Phylactery", 2.0)]));
        assert!(calc.outputs.is_empty());
    }

    #[test]
    fn test_stock_draws_inside_routes_are_removed_from_pool() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Mana Crystal", 1.0)]), &pool(&[("Rich Air", 10.0)]))
            .unwrap();
        assert!(calc.inputs.is_empty());
        assert!(approx(calc.pool["Rich Air"], 8.0));
    }

    #[test]
    fn test_stock_only_consumes_exactly() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Mana Dust", 2.0)]), &pool(&[("Mana Dust", 5.0)]))
            .unwrap();
        assert!(calc.inputs.is_empty());
        assert!(approx(calc.pool["Mana Dust"], 3.0));
        assert_eq!(calc.outputs, pool(&[("Mana Dust", 2.0)]));
        assert_eq!(calc.trees[0].source, Source::StockOnly);
        assert_eq!(calc.trees[0].children[0].source, Source::Stock);
    }

    #[test]
    fn test_scaling_rounds_up_into_excess() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Mana Dust", 1.0)]), &Pool::new())
            .unwrap();
        // One run makes 2 Mana Dust; the extra one is left over.
        assert_eq!(calc.inputs, pool(&[("Rich Air", 6.0)]));
        assert!(approx(calc.pool["Mana Dust"], 1.0));
        assert!(approx(calc.trees[0].actual_produced_by_recipe, 2.0));
        assert!(approx(calc.trees[0].produced, 1.0));
    }

    #[test]
    fn test_cycle_guard_terminates() {
        let catalog = Catalog::new(vec![
            Recipe::new([("Beta", 1.0)], [("Alpha", 1.0)]),
            Recipe::new([("Alpha", 1.0)], [("Beta", 1.0)]),
        ])
        .unwrap();
        let calculator = Calculator::new(&catalog);
        let res = calculator
            .resolve("Alpha", 2.0, &Pool::new(), &HashSet::new(), 0)
            .unwrap();
        // Beta's only route needs Alpha, which is unresolved, so Beta is not viable.
        assert_eq!(res.node.source, Source::MissingRecipeOrBase);
        assert_eq!(res.inputs, pool(&[("Alpha", 2.0)]));

        let mut ancestors = HashSet::new();
        ancestors.insert("Alpha".to_string());
        let looped = calculator
            .resolve("Alpha", 2.0, &Pool::new(), &ancestors, 1)
            .unwrap();
        assert_eq!(looped.node.source, Source::UnresolvedLoop);
        assert_eq!(looped.inputs, pool(&[("Alpha", 2.0)]));
    }

    #[test]
    fn test_self_referential_route_falls_back() {
        let catalog = Catalog::new(vec![
            Recipe::new([("Seed", 1.0)], [("Seed", 2.0)]),
            Recipe::new([("Dirt", 3.0)], [("Seed", 1.0)]),
        ])
        .unwrap();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Seed", 1.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.trees[0].source, Source::Recipe(1));
        assert_eq!(calc.inputs, pool(&[("Dirt", 3.0)]));
    }

    #[test]
    fn test_missing_recipe_is_reported_as_unmet() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Phylactery", 1.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.trees[0].source, Source::MissingRecipeOrBase);
        assert_eq!(calc.unmet(&catalog), pool(&[("Phylactery", 1.0)]));
        assert!(calc.outputs.is_empty());
    }

    #[test]
    fn test_base_resource_request_passes_through() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Rich Air", 10.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.inputs, pool(&[("Rich Air", 10.0)]));
        assert_eq!(calc.outputs, pool(&[("Rich Air", 10.0)]));
        assert_eq!(calc.trees[0].source, Source::Base);
    }

    #[test]
    fn test_sequential_byproduct_reuse() {
        let catalog = Catalog::sample();
        let calculator = Calculator::new(&catalog);

        // Mana Dust leaves one Liquid Curse behind, which Bright Shard needs.
        let batch = calculator
            .calculate(
                &requests(&[("Mana Dust", 2.0), ("Bright Shard", 1.0)]),
                &Pool::new(),
            )
            .unwrap();
        let alone = calculator
            .calculate(&requests(&[("Bright Shard", 1.0)]), &Pool::new())
            .unwrap();

        let batch_extra = batch.inputs["Rich Air"] - 6.0;
        assert!(batch_extra < alone.inputs["Rich Air"]);
        assert!(approx(batch_extra, 6.0));
        assert!(approx(alone.inputs["Rich Air"], 12.0));
        assert!(approx(batch.inputs["Gold Coin"], 1.0));
    }

    #[test]
    fn test_sibling_reuses_earlier_sibling_byproduct() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Weak Mana Gem", 1.0)]), &Pool::new())
            .unwrap();
        // Crafting the Mana Dust also yields the Silica Powder its sibling needs.
        assert_eq!(calc.inputs, pool(&[("Rich Air", 6.0)]));
        assert_eq!(calc.pool, pool(&[("Liquid Curse", 1.0)]));
        assert_eq!(
            calc.intermediates,
            pool(&[("Mana Crystal", 3.0), ("Mana Dust", 2.0)])
        );
        let gem = &calc.trees[0];
        assert_eq!(gem.children[1].item, "Silica Powder");
        assert_eq!(gem.children[1].source, Source::StockOnly);
    }

    #[test]
    fn test_cheaper_route_wins_and_ties_keep_first() {
        let catalog = Catalog::new(vec![
            Recipe::new([("Ore", 4.0)], [("Plate", 1.0)]),
            Recipe::new([("Ore", 2.0)], [("Plate", 1.0)]),
            Recipe::new([("Scrap", 2.0)], [("Plate", 1.0)]),
        ])
        .unwrap();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Plate", 1.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.trees[0].source, Source::Recipe(1));
        assert_eq!(calc.inputs, pool(&[("Ore", 2.0)]));
    }

    #[test]
    fn test_step_count_breaks_raw_material_ties() {
        let catalog = Catalog::new(vec![
            Recipe::new([("Ingot", 1.0)], [("Plate", 1.0)]),
            Recipe::new([("Ore", 1.0)], [("Ingot", 1.0)]),
            Recipe::new([("Ore", 1.0)], [("Plate", 1.0)]),
        ])
        .unwrap();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Plate", 1.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.trees[0].source, Source::Recipe(2));
        assert!(calc.intermediates.is_empty());
    }

    #[test]
    fn test_non_viable_route_is_discarded() {
        let catalog = Catalog::new(vec![
            Recipe::new([("Moonstone", 1.0)], [("Charm", 1.0)]),
            Recipe::new([("Charm", 1.0)], [("Moonstone", 1.0)]),
            Recipe::new([("Thread", 3.0)], [("Charm", 1.0)]),
        ])
        .unwrap();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Charm", 1.0)]), &Pool::new())
            .unwrap();
        assert_eq!(calc.trees[0].source, Source::Recipe(2));
        assert_eq!(calc.inputs, pool(&[("Thread", 3.0)]));
        assert!(calc.pool.is_empty());
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let catalog = Catalog::sample();
        let err = Calculator::new(&catalog)
            .resolve("Mana Crystal", -1.0, &Pool::new(), &HashSet::new(), 0)
            .unwrap_err();
        assert!(matches!(err, CalculatorError::NegativeQuantity { .. }));
    }

    #[test]
    fn test_zero_quantity_leaves_pool_untouched() {
        let catalog = Catalog::sample();
        let start = pool(&[("Rich Air", 3.0)]);
        let res = Calculator::new(&catalog)
            .resolve("Mana Crystal", 0.0, &start, &HashSet::new(), 0)
            .unwrap();
        assert_eq!(res.node.source, Source::ZeroNeeded);
        assert_eq!(res.pool, start);
        assert!(res.inputs.is_empty());
    }

    #[test]
    fn test_multi_step_astral_sheet() {
        let catalog = Catalog::sample();
        let calc = Calculator::new(&catalog)
            .calculate(&requests(&[("Astral Sheet", 1.0)]), &Pool::new())
            .unwrap();
        for base in ["Rich Air", "Silver Coin", "Copper Coin", "Gold Coin"] {
            assert!(calc.inputs.contains_key(base), "missing {}", base);
        }
        assert_eq!(calc.outputs, pool(&[("Astral Sheet", 1.0)]));
        for mid in ["Pure Mana Gem", "Adamantine Bar", "Bright Shard"] {
            assert!(calc.intermediates.contains_key(mid), "missing {}", mid);
        }
        assert!(calc.pool.contains_key("Vial of Blood"));
        assert!(calc.unmet(&catalog).is_empty());
    }
}
