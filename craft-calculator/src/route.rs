//! Route evaluation and scoring
//!
//! Every recipe that produces an item is a candidate route. Each candidate is
//! resolved against its own copy of the pool; the cheapest viable one wins.
//! That copy is threaded through the input resolutions in order, so the
//! candidate's final pool is whatever its inputs left plus its own outputs.

use std::collections::HashSet;

use tracing::trace;

use crate::calculator::Calculator;
use crate::catalog::Recipe;
use crate::error::{CalculatorError, Result};
use crate::models::{add_to, merge_into, prune, DerivationNode, Pool, EPSILON};

/// Weight of one unit of raw material against one craft step.
pub const BASE_RESOURCE_COST_WEIGHT: f64 = 1000.0;

/// Outcome of resolving one candidate recipe
#[derive(Debug, Clone)]
pub struct RouteEvaluation {
    pub recipe_index: usize,
    pub score: f64,
    /// Base inputs consumed across the whole sub-tree.
    pub inputs: Pool,
    /// Secondary outputs and excess of the target, including nested ones.
    pub byproducts: Pool,
    pub intermediates: Pool,
    /// Pool after committing this route.
    pub pool: Pool,
    pub children: Vec<DerivationNode>,
    /// Gross output of the target item at the chosen scale.
    pub actual_produced: f64,
}

/// Number of whole runs needed to make `need` with `per_run` per run.
pub fn runs_needed(need: f64, per_run: f64) -> f64 {
    ((need / per_run) - EPSILON).ceil().max(1.0)
}

/// Evaluate every route for `item` and return the lowest-scoring viable one.
///
/// Ties keep the first route in catalog order.
pub fn best_route(
    calculator: &Calculator<'_>,
    item: &str,
    need: f64,
    pool: &Pool,
    ancestors: &HashSet<String>,
    depth: usize,
) -> Result<Option<RouteEvaluation>> {
    let mut best: Option<RouteEvaluation> = None;
    for recipe in calculator.catalog().recipes_producing(item) {
        let Some(evaluation) = evaluate(calculator, recipe, item, need, pool, ancestors, depth)?
        else {
            trace!(item, recipe = recipe.index, "route not viable");
            continue;
        };
        trace!(item, recipe = recipe.index, score = evaluation.score, "route evaluated");
        if best.as_ref().is_none_or(|b| evaluation.score < b.score) {
            best = Some(evaluation);
        }
    }
    Ok(best)
}

/// Resolve one candidate recipe. `None` when an input cannot be produced at all.
pub fn evaluate(
    calculator: &Calculator<'_>,
    recipe: &Recipe,
    item: &str,
    need: f64,
    pool: &Pool,
    ancestors: &HashSet<String>,
    depth: usize,
) -> Result<Option<RouteEvaluation>> {
    let catalog = calculator.catalog();
    let per_run = match recipe.output_of(item) {
        Some(qty) if qty > EPSILON => qty,
        _ => {
            return Err(CalculatorError::InvalidRecipeOutput {
                index: recipe.index,
                item: item.to_string(),
            });
        }
    };
    let scale = runs_needed(need, per_run);

    let mut route_pool = pool.clone();
    let mut inputs = Pool::new();
    let mut byproducts = Pool::new();
    let mut intermediates = Pool::new();
    let mut children = Vec::with_capacity(recipe.inputs.len());
    let mut craft_steps = 0usize;

    for (input, per_run_input) in &recipe.inputs {
        let required = per_run_input * scale;
        let sub = calculator.resolve(input, required, &route_pool, ancestors, depth + 1)?;

        if !catalog.is_base(input)
            && sub.inputs.get(input).is_some_and(|unmet| *unmet >= required - EPSILON)
        {
            return Ok(None);
        }

        route_pool = sub.pool;
        merge_into(&mut inputs, &sub.inputs);
        merge_into(&mut byproducts, &sub.byproducts);
        merge_into(&mut intermediates, &sub.intermediates);
        if sub.node.involves_recipe() {
            craft_steps += 1;
        }
        children.push(sub.node);
    }

    let actual_produced = per_run * scale;
    let excess = actual_produced - need;
    if excess > EPSILON {
        add_to(&mut byproducts, item, excess);
        add_to(&mut route_pool, item, excess);
    }
    for (output, per_run_output) in &recipe.outputs {
        if output == item {
            continue;
        }
        let produced = per_run_output * scale;
        if produced > EPSILON {
            add_to(&mut byproducts, output, produced);
            add_to(&mut route_pool, output, produced);
        }
    }

    let raw_material: f64 = inputs.values().sum();
    let score = raw_material * calculator.cost_weight() + craft_steps as f64;

    Ok(Some(RouteEvaluation {
        recipe_index: recipe.index,
        score,
        inputs,
        byproducts,
        intermediates,
        pool: prune(&route_pool),
        children,
        actual_produced,
    }))
}
