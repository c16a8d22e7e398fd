//! Crafting Resource Calculator
//!
//! Turns requests for crafted items into raw-material totals, intermediates,
//! by-products, and a derivation tree per request. Leftovers from one request
//! feed the next. The reverse engine answers how much of each item the
//! current inventory could make.

pub mod calculator;
pub mod catalog;
pub mod categorizer;
pub mod config;
pub mod display;
pub mod error;
pub mod inventory;
pub mod models;
pub mod parser;
pub mod reverse;
pub mod route;

pub use calculator::{Calculation, Calculator, Resolution};
pub use catalog::{Catalog, Recipe};
pub use categorizer::{categorize, ProductBreakdown};
pub use error::{CalculatorError, Result};
pub use models::{DerivationNode, Pool, Source, EPSILON};
