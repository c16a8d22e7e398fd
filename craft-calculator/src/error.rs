//! Error types for the calculator library.
//!
//! Infeasible demand is reported as data on the derivation tree, never as an
//! error. Only contract violations, malformed persisted data and bad user
//! input surface here.

/// Errors raised by the catalog, the engines, and the parsing layer.
#[derive(Debug, thiserror::Error)]
pub enum CalculatorError {
    /// An engine was asked to resolve a negative or non-finite quantity.
    #[error("quantity for '{item}' must be a non-negative number, got {quantity}")]
    NegativeQuantity {
        /// The item being resolved.
        item: String,
        /// The offending quantity.
        quantity: f64,
    },

    /// A recipe declares a non-positive output for the item it was selected for.
    #[error("recipe {index} declares a non-positive output for '{item}'")]
    InvalidRecipeOutput {
        /// Catalog index of the recipe.
        index: usize,
        /// The target item.
        item: String,
    },

    /// A recipe failed catalog validation.
    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    /// A recipe index outside the catalog was referenced.
    #[error("recipe index {index} out of range (catalog has {len} recipes)")]
    RecipeIndexOutOfRange {
        /// The requested index (0-based).
        index: usize,
        /// Number of recipes in the catalog.
        len: usize,
    },

    /// An item name did not match any known item.
    #[error("item '{0}' not found, and no close matches found")]
    ItemNotFound(String),

    /// A request or recipe string was malformed.
    #[error("{0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, CalculatorError>;
