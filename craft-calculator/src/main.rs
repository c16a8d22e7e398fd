//! Crafting Resource Calculator
//!
//! Command-line shell over the resolution and reverse-capacity engines.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use craft_calculator::config::CalculatorConfig;
use craft_calculator::display::{
    format_pool, format_quantity, format_recipe, format_recipe_list, format_reverse, format_trees,
    CalculationReport,
};
use craft_calculator::inventory::{add_to_inventory, clear_inventory, load_inventory, save_inventory};
use craft_calculator::parser::{parse_recipe, parse_requests};
use craft_calculator::reverse::{max_producible, reverse_calculate, Memo};
use craft_calculator::{categorize, Calculator, Catalog, Pool};

#[derive(Parser)]
#[command(name = "craft-calculator")]
#[command(about = "Crafting resource calculator with by-product reuse")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recipe file (overrides the configuration)
    #[arg(long)]
    recipes: Option<PathBuf>,

    /// Inventory file (overrides the configuration)
    #[arg(long)]
    inventory: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate resources for a request (e.g. "Mana Crystal, 2; Mana Dust")
    Calc {
        /// Items to craft; omit to list available items
        request: Option<String>,

        /// Quantity, when the request names a single item
        quantity: Option<f64>,

        /// Do not write the leftover pool back to the inventory
        #[arg(long)]
        no_save: bool,

        /// Skip the derivation tree
        #[arg(long)]
        no_tree: bool,
    },

    /// Show what the current inventory can craft
    Reverse {
        /// Limit to one item and show its shortages
        item: Option<String>,
    },

    /// Interactive session; leftovers carry over between requests
    Session,

    /// Manage the inventory
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },

    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },

    /// List all items and base resources
    Items,
}

#[derive(Subcommand)]
enum InventoryAction {
    /// Show current available resources
    List,

    /// Add an item to the inventory
    Add {
        item: String,
        #[arg(default_value = "1")]
        quantity: f64,
    },

    /// Remove one item, or everything
    Clear { item: Option<String> },
}

#[derive(Subcommand)]
enum RecipeAction {
    /// List recipes with their 1-based index
    List,

    /// Add a recipe (e.g. "Wood,2;Stone,1 -> Advanced Tool,1")
    Add { definition: String },

    /// Delete a recipe by its 1-based index
    Delete { index: usize },

    /// Replace the recipe file with the built-in sample set
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "craft_calculator=warn",
        1 => "craft_calculator=info",
        2 => "craft_calculator=debug",
        _ => "craft_calculator=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = CalculatorConfig::load(cli.config.as_deref())?;
    if let Some(recipes) = cli.recipes {
        config.recipes = recipes;
    }
    if let Some(inventory) = cli.inventory {
        config.inventory = inventory;
    }

    let mut catalog = Catalog::load(&config.recipes)
        .with_context(|| format!("failed to load recipes from {}", config.recipes.display()))?;
    let precision = config.display.precision;

    match cli.command {
        Commands::Calc {
            request,
            quantity,
            no_save,
            no_tree,
        } => {
            let Some(request) = request else {
                print_items(&catalog, "Available Items for Calculation");
                return Ok(());
            };
            let request = with_quantity(request, quantity)?;

            let pool = load_inventory(&config.inventory)?;
            let pool = run_calculation(&catalog, &config, &request, &pool, !no_tree)?;
            if config.persist_inventory && !no_save {
                save_inventory(&config.inventory, &pool)?;
            }
        }

        Commands::Reverse { item } => {
            let pool = load_inventory(&config.inventory)?;
            match item {
                None => {
                    let craftable = reverse_calculate(&catalog, &pool);
                    print!("{}", format_reverse(&craftable, precision));
                }
                Some(name) => {
                    let request = parse_requests(&name, &catalog)?.remove(0);
                    if let Some(typed) = &request.typed {
                        println!("Notice: '{}' not found. Assuming you meant '{}'.", typed, request.item);
                    }
                    let mut memo = Memo::new();
                    let (max_qty, missing) = max_producible(&request.item, &pool, &catalog, &mut memo);
                    let on_hand = pool.get(&request.item).copied().unwrap_or(0.0);
                    let craftable = (max_qty - on_hand).max(0.0);
                    println!(
                        "You can craft {} of '{}'",
                        format_quantity(craftable, precision),
                        request.item
                    );
                    if !missing.is_empty() {
                        println!("Missing for a first run:");
                        print!("{}", format_pool(&missing, precision));
                    }
                }
            }
        }

        Commands::Session => run_session(&catalog, &config)?,

        Commands::Inventory { action } => {
            let mut pool = load_inventory(&config.inventory)?;
            match action {
                InventoryAction::List => {
                    println!("--- Current Available Resources ---");
                    if pool.is_empty() {
                        println!("  (None)");
                    } else {
                        print!("{}", format_pool(&pool, precision));
                    }
                }
                InventoryAction::Add { item, quantity } => {
                    if !quantity.is_finite() || quantity <= 0.0 {
                        bail!("quantity for {} must be positive", item);
                    }
                    add_to_inventory(&mut pool, &item, quantity);
                    save_inventory(&config.inventory, &pool)?;
                    println!("Added {} {}", format_quantity(quantity, precision), item);
                }
                InventoryAction::Clear { item } => {
                    if clear_inventory(&mut pool, item.as_deref()) {
                        save_inventory(&config.inventory, &pool)?;
                    }
                    match item {
                        Some(item) => println!("Cleared {}", item),
                        None => println!("Inventory cleared"),
                    }
                }
            }
        }

        Commands::Recipe { action } => match action {
            RecipeAction::List => print!("{}", format_recipe_list(&catalog, precision)),
            RecipeAction::Add { definition } => {
                let recipe = parse_recipe(&definition)?;
                let index = catalog.add_recipe(recipe)?;
                catalog.save(&config.recipes)?;
                println!(
                    "Added recipe [{}] {}",
                    index + 1,
                    format_recipe(&catalog.recipes()[index], precision)
                );
            }
            RecipeAction::Delete { index } => {
                if index == 0 {
                    bail!("recipe indices start at 1");
                }
                let removed = catalog.delete_recipe(index - 1)?;
                catalog.save(&config.recipes)?;
                println!("Deleted recipe [{}] {}", index, format_recipe(&removed, precision));
            }
            RecipeAction::LoadSample => {
                let sample = Catalog::sample();
                sample.save(&config.recipes)?;
                println!("Loaded {} sample recipes", sample.recipes().len());
            }
        },

        Commands::Items => print_items(&catalog, "Available Items"),
    }

    Ok(())
}

/// Resolve one request string against `pool`, print the results, and return the leftover pool.
fn run_calculation(
    catalog: &Catalog,
    config: &CalculatorConfig,
    input: &str,
    pool: &Pool,
    show_tree: bool,
) -> Result<Pool> {
    let requests = parse_requests(input, catalog)?;
    for request in &requests {
        if let Some(typed) = &request.typed {
            println!("Notice: '{}' not found. Assuming you meant '{}'.", typed, request.item);
        }
    }

    let items: Vec<(String, f64)> = requests
        .iter()
        .map(|r| (r.item.clone(), r.quantity))
        .collect();
    let names: Vec<String> = requests.iter().map(|r| r.item.clone()).collect();

    let calculation = Calculator::new(catalog)
        .with_cost_weight(config.route_cost_weight)
        .calculate(&items, pool)?;
    info!(
        requests = items.len(),
        base_inputs = calculation.inputs.len(),
        "calculation complete"
    );

    if show_tree {
        println!("{}", format_trees(&calculation.trees, config.display.precision));
    }
    let products = categorize(&calculation, &names, catalog);
    let report = CalculationReport::new(&calculation, products, catalog)
        .with_precision(config.display.precision);
    print!("{}", report);

    Ok(calculation.pool)
}

/// Attach a separate quantity argument to a single-item request.
fn with_quantity(request: String, quantity: Option<f64>) -> Result<String> {
    let Some(qty) = quantity else {
        return Ok(request);
    };
    let entries = request.split(';').filter(|p| !p.trim().is_empty()).count();
    if entries != 1 {
        bail!("a separate quantity only applies to a single item; use 'Item, Qty; Item, Qty'");
    }
    if request.contains(',') {
        bail!("quantity given twice in '{}'", request);
    }
    Ok(format!("{}, {}", request.trim().trim_end_matches(';'), qty))
}

fn run_session(catalog: &Catalog, config: &CalculatorConfig) -> Result<()> {
    let mut pool = load_inventory(&config.inventory)?;

    println!("Welcome to the Resource Calculator!");
    println!("Enter items and quantities (e.g. 'Mana Crystal, 2; Mana Dust').");
    print_items(catalog, "Available Items");
    println!("Type 'quit' to exit.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nEnter items to calculate (or 'quit'): ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match run_calculation(catalog, config, line, &pool, true) {
            Ok(next) => pool = next,
            Err(e) => println!("Error: {}", e),
        }
        println!("{}", "-".repeat(40));
    }

    if config.persist_inventory {
        save_inventory(&config.inventory, &pool)?;
    }
    println!("Exiting program.");
    Ok(())
}

fn print_items(catalog: &Catalog, title: &str) {
    if catalog.all_items().is_empty() {
        println!("No recipes loaded. Run 'recipe load-sample' or 'recipe add' first.");
        return;
    }
    println!("--- {} ---", title);
    for item in catalog.all_items() {
        println!("  {}", item);
    }
    println!("Base resources:");
    for item in catalog.base_resources() {
        println!("  {}", item);
    }
}
