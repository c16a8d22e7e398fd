//! Text rendering of trees, reports, and recipe lists

use std::fmt;

use crate::calculator::Calculation;
use crate::catalog::{Catalog, Recipe};
use crate::categorizer::ProductBreakdown;
use crate::models::{DerivationNode, Pool, Source, EPSILON};

pub const DEFAULT_PRECISION: usize = 4;

/// Format a quantity: integers without decimals, otherwise trailing zeros stripped.
pub fn format_quantity(value: f64, precision: usize) -> String {
    if value.abs() < EPSILON {
        return "0".to_string();
    }
    if (value - value.round()).abs() < EPSILON {
        return format!("{}", value.round() as i64);
    }
    let text = format!("{:.*}", precision, value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn sorted_children(node: &DerivationNode) -> Vec<&DerivationNode> {
    let mut children: Vec<&DerivationNode> = node.children.iter().collect();
    children.sort_by(|a, b| {
        a.source
            .display_priority()
            .cmp(&b.source.display_priority())
            .then_with(|| a.item.cmp(&b.item))
    });
    children
}

fn format_node(node: &DerivationNode, prefix: &str, last: bool, precision: usize, out: &mut String) {
    let connector = if last { "└─ " } else { "├─ " };
    let mut line = format!(
        "{}{}{} (Needed: {}",
        prefix,
        connector,
        node.item,
        format_quantity(node.needed, precision)
    );
    match node.source {
        Source::Recipe(_) if node.actual_produced_by_recipe > EPSILON => line.push_str(&format!(
            ", Produced by recipe: {}",
            format_quantity(node.actual_produced_by_recipe, precision)
        )),
        Source::Stock if node.produced > EPSILON => line.push_str(&format!(
            ", Used from Stock: {}",
            format_quantity(node.produced, precision)
        )),
        Source::Recipe(_) => {}
        _ if node.produced > EPSILON => line.push_str(&format!(
            ", Provided: {}",
            format_quantity(node.produced, precision)
        )),
        _ => {}
    }
    out.push_str(&format!("{}) [{}]\n", line, node.source));

    let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
    let children = sorted_children(node);
    for (i, child) in children.iter().enumerate() {
        format_node(child, &child_prefix, i + 1 == children.len(), precision, out);
    }
}

/// Render derivation trees, one block per request.
pub fn format_trees(trees: &[DerivationNode], precision: usize) -> String {
    let mut out = String::from("--- Recipe Tree ---\n");
    if trees.is_empty() {
        out.push_str("  (No tree generated)\n");
        return out;
    }
    for root in trees {
        out.push_str(&format!(
            "\nTree for: {} (Needed: {}) [{}]\n",
            root.item,
            format_quantity(root.needed, precision),
            root.source
        ));
        let children = sorted_children(root);
        for (i, child) in children.iter().enumerate() {
            format_node(child, "", i + 1 == children.len(), precision, &mut out);
        }
    }
    out
}

/// Summary printed after a calculation
#[derive(Debug)]
pub struct CalculationReport {
    pub base_inputs: Pool,
    pub unmet: Pool,
    pub products: ProductBreakdown,
    pub pool: Pool,
    pub precision: usize,
}

impl CalculationReport {
    pub fn new(calculation: &Calculation, products: ProductBreakdown, catalog: &Catalog) -> Self {
        let base_inputs = calculation
            .inputs
            .iter()
            .filter(|(item, _)| catalog.is_base(item))
            .map(|(item, amount)| (item.clone(), *amount))
            .collect();
        Self {
            base_inputs,
            unmet: calculation.unmet(catalog),
            products,
            pool: calculation.pool.clone(),
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    fn write_section(&self, f: &mut fmt::Formatter<'_>, title: &str, pool: &Pool) -> fmt::Result {
        writeln!(f, "  {}:", title)?;
        for (item, amount) in pool {
            writeln!(f, "    {}: {}", item, format_quantity(*amount, self.precision))?;
        }
        Ok(())
    }
}

impl fmt::Display for CalculationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Calculation Summary ---")?;
        writeln!(f)?;

        writeln!(f, "Total base resources needed for this request:")?;
        if self.base_inputs.is_empty() {
            writeln!(f, "  None")?;
        }
        for (item, amount) in &self.base_inputs {
            // Raw material is gathered in whole units.
            writeln!(f, "  {}: {}", item, format_quantity(amount.ceil(), self.precision))?;
        }

        if !self.unmet.is_empty() {
            writeln!(f)?;
            writeln!(f, "Demand that could not be met (no viable recipe or circular):")?;
            for (item, amount) in &self.unmet {
                writeln!(f, "  {}: {}", item, format_quantity(*amount, self.precision))?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Products Breakdown:")?;
        let products = &self.products;
        if !products.finished.is_empty() {
            self.write_section(f, "Finished products (Requested & Produced)", &products.finished)?;
        }
        if !products.intermediate.is_empty() {
            self.write_section(f, "Intermediate products (Crafted & Consumed)", &products.intermediate)?;
        }
        if !products.byproduct.is_empty() {
            self.write_section(f, "Byproducts / Excess (Remaining non-base items)", &products.byproduct)?;
        }
        if products.is_empty() {
            if self.base_inputs.is_empty() {
                writeln!(f, "  No products generated or resources needed for this request.")?;
            } else {
                writeln!(f, "  Only base inputs were consumed; no crafted products remain.")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Updated available resources for next calculation:")?;
        write!(f, "{}", format_pool(&self.pool, self.precision))
    }
}

/// One `  item: qty` line per entry, or `  None`.
pub fn format_pool(pool: &Pool, precision: usize) -> String {
    if pool.is_empty() {
        return "  None\n".to_string();
    }
    pool.iter()
        .map(|(item, amount)| format!("  {}: {}\n", item, format_quantity(*amount, precision)))
        .collect()
}

fn format_side(entries: &indexmap::IndexMap<String, f64>, precision: usize) -> String {
    entries
        .iter()
        .map(|(item, qty)| format!("{} {}", format_quantity(*qty, precision), item))
        .collect::<Vec<_>>()
        .join(" + ")
}

pub fn format_recipe(recipe: &Recipe, precision: usize) -> String {
    format!(
        "{} -> {}",
        format_side(&recipe.inputs, precision),
        format_side(&recipe.outputs, precision)
    )
}

/// Numbered recipe list, 1-based.
pub fn format_recipe_list(catalog: &Catalog, precision: usize) -> String {
    let mut out = String::from("--- Available Recipes ---\n");
    if catalog.recipes().is_empty() {
        out.push_str("  (None)\n");
    }
    for recipe in catalog.recipes() {
        out.push_str(&format!("  [{}] {}\n", recipe.index + 1, format_recipe(recipe, precision)));
    }
    out
}

pub fn format_reverse(craftable: &Pool, precision: usize) -> String {
    let mut out = String::from("--- Craftable With Current Resources ---\n");
    out.push_str(&format_pool(craftable, precision));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::Calculator;
    use crate::categorizer::categorize;

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(0.0, 4), "0");
        assert_eq!(format_quantity(2.0, 4), "2");
        assert_eq!(format_quantity(2.5, 4), "2.5");
        assert_eq!(format_quantity(1.0 / 3.0, 4), "0.3333");
        assert_eq!(format_quantity(0.1 + 0.2, 4), "0.3");
    }

    #[test]
    fn test_tree_shows_sources() {
        let catalog = Catalog::sample();
        let requests = vec![("Mana Dust".to_string(), 1.0)];
        let calc = Calculator::new(&catalog).calculate(&requests, &Pool::new()).unwrap();
        let text = format_trees(&calc.trees, DEFAULT_PRECISION);
        assert!(text.contains("Tree for: Mana Dust (Needed: 1) [recipe_1]"));
        assert!(text.contains("└─ Mana Crystal (Needed: 3, Produced by recipe: 3) [recipe_0]"));
        assert!(text.contains("    └─ Rich Air (Needed: 6, Provided: 6) [base]"));
    }

    #[test]
    fn test_report_sections() {
        let catalog = Catalog::sample();
        let requests = vec![("Mana Dust".to_string(), 2.0), ("Phylactery".to_string(), 1.0)];
        let names: Vec<String> = requests.iter().map(|(i, _)| i.clone()).collect();
        let calc = Calculator::new(&catalog).calculate(&requests, &Pool::new()).unwrap();
        let products = categorize(&calc, &names, &catalog);
        let text = CalculationReport::new(&calc, products, &catalog).to_string();
        assert!(text.contains("  Rich Air: 6\n"));
        assert!(text.contains("Demand that could not be met"));
        assert!(text.contains("  Phylactery: 1\n"));
        assert!(text.contains("    Mana Dust: 2\n"));
        assert!(text.contains("    Liquid Curse: 1\n"));
    }

    #[test]
    fn test_recipe_list_is_one_based() {
        let text = format_recipe_list(&Catalog::sample(), DEFAULT_PRECISION);
        assert!(text.contains("Available Recipes"));
        assert!(text.contains("  [1] 2 Rich Air -> 1 Mana Crystal\n"));
        assert!(text.contains("-> 1 Astral Sheet"));
    }
}
