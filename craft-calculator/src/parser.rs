//! Parsing of request strings and recipe strings
//!
//! Requests look like `Mana Crystal, 2; Mana Dust`. Recipes look like
//! `Wood,2;Stone,1 -> Advanced Tool,1`. A missing quantity means 1.

use indexmap::IndexMap;
use regex::Regex;

use crate::catalog::{Catalog, Recipe};
use crate::error::{CalculatorError, Result};

/// Minimum similarity for a fuzzy item-name match.
const FUZZY_CUTOFF: f64 = 0.6;
const FUZZY_CANDIDATES: usize = 3;

/// One validated, name-resolved request
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub item: String,
    pub quantity: f64,
    /// What the user typed, when it was replaced by a fuzzy match.
    pub typed: Option<String>,
}

/// Parse a `;`-separated request list and resolve names against the catalog.
pub fn parse_requests(input: &str, catalog: &Catalog) -> Result<Vec<ParsedRequest>> {
    let mut requests = Vec::new();
    for (name, quantity) in parse_entries(input)? {
        if catalog.contains_item(&name) {
            requests.push(ParsedRequest {
                item: name,
                quantity,
                typed: None,
            });
            continue;
        }
        let matches = fuzzy_match(&name, catalog.all_items());
        let Some(best) = matches.into_iter().next() else {
            return Err(CalculatorError::ItemNotFound(name));
        };
        requests.push(ParsedRequest {
            item: best,
            quantity,
            typed: Some(name),
        });
    }

    if requests.is_empty() {
        return Err(CalculatorError::InvalidInput(
            "no valid items entered for calculation".to_string(),
        ));
    }
    Ok(requests)
}

/// Parse `inputs -> outputs` into a recipe.
pub fn parse_recipe(text: &str) -> Result<Recipe> {
    let re = Regex::new(r"^\s*(?P<inputs>.*?)\s*->\s*(?P<outputs>.+?)\s*$")
        .map_err(|e| CalculatorError::InvalidInput(e.to_string()))?;
    let caps = re.captures(text).ok_or_else(|| {
        CalculatorError::InvalidInput(format!(
            "invalid recipe '{}', expected 'Item,Qty;Item,Qty -> Item,Qty'",
            text
        ))
    })?;

    let inputs = collect_entries(parse_entries(&caps["inputs"])?);
    let outputs = collect_entries(parse_entries(&caps["outputs"])?);
    if outputs.is_empty() {
        return Err(CalculatorError::InvalidInput(format!(
            "recipe '{}' has no outputs",
            text
        )));
    }

    Ok(Recipe::new(inputs, outputs))
}

fn collect_entries(entries: Vec<(String, f64)>) -> IndexMap<String, f64> {
    let mut map = IndexMap::new();
    for (name, qty) in entries {
        *map.entry(name).or_insert(0.0) += qty;
    }
    map
}

/// Split `A, 2; B` into `[(A, 2), (B, 1)]`.
fn parse_entries(input: &str) -> Result<Vec<(String, f64)>> {
    let mut entries = Vec::new();
    for part in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let fields: Vec<&str> = part.split(',').map(str::trim).collect();
        let (name, quantity) = match fields.as_slice() {
            [name] => (*name, 1.0),
            [name, qty] => (*name, parse_quantity(name, qty)?),
            _ => {
                return Err(CalculatorError::InvalidInput(format!(
                    "invalid format for item entry '{}', expected 'Item, Quantity' or 'Item'",
                    part
                )));
            }
        };
        if name.is_empty() {
            return Err(CalculatorError::InvalidInput(format!(
                "missing item name in '{}'",
                part
            )));
        }
        entries.push((name.to_string(), quantity));
    }
    Ok(entries)
}

fn parse_quantity(name: &str, raw: &str) -> Result<f64> {
    let quantity: f64 = raw.parse().map_err(|_| {
        CalculatorError::InvalidInput(format!("invalid quantity for {}: '{}'", name, raw))
    })?;
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(CalculatorError::InvalidInput(format!(
            "quantity for {} must be positive",
            name
        )));
    }
    Ok(quantity)
}

/// Close matches for `name` among `items`, best first, case-insensitive.
pub fn fuzzy_match(name: &str, items: &[String]) -> Vec<String> {
    let target = name.to_lowercase();
    let mut scored: Vec<(f64, &String)> = items
        .iter()
        .map(|item| (similarity(&target, &item.to_lowercase()), item))
        .filter(|(score, _)| *score >= FUZZY_CUTOFF)
        .collect();
    // Stable sort keeps catalog order among equal scores.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(FUZZY_CANDIDATES)
        .map(|(_, item)| item.clone())
        .collect()
}

fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
