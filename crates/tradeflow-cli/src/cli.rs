//! CLI argument definitions for Tradeflow.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `enrich` | Replace product ids with product names in a trade file |
//! | `products load` | Load product reference data into the store |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--store` | `$TRADEFLOW_HOME/products.duckdb` | Product store file |
//! | `--config` | none | JSON pipeline config |
//! | `--batch-size` | `1000` | Records per cache lookup |
//! | `--max-in-flight` | `2` | Batches resolving at once |
//! | `--workers` | `0` | Worker threads, `0` runs batches inline |
//! | `--log-level` | `warn` | Log filter when `RUST_LOG` is unset |
//!
//! # Examples
//!
//! ```bash
//! tradeflow products load --input product.csv
//! tradeflow enrich --input trade.csv > enriched.csv
//! cat trade.csv | tradeflow enrich --input - --workers 4
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

/// Path argument where `-` selects stdin or stdout.
pub const STDIO: &str = "-";

/// Tradeflow - streaming trade enrichment
#[derive(Debug, Parser)]
#[command(
    name = "tradeflow",
    version,
    about = "Enrich trade files with product names",
    long_about = "Reads a trade file (date,productId,currency,price), resolves every product id \
against the product store in batches, and writes date,productName,currency,price in input order. \
Invalid rows are skipped with a warning; unknown products become 'Missing Product Name'."
)]
pub struct Cli {
    /// Product store database file.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// JSON pipeline configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Records per batched cache lookup (overrides the config file).
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Batches allowed in flight at once (overrides the config file).
    #[arg(long, global = true)]
    pub max_in_flight: Option<usize>,

    /// Worker threads for batch tasks; 0 runs them on the output task.
    #[arg(long, global = true, default_value_t = 0)]
    pub workers: usize,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enrich a trade file with product names.
    ///
    /// # Examples
    ///
    ///   tradeflow enrich --input trade.csv
    ///   tradeflow enrich --input trade.csv --output enriched.csv
    Enrich(EnrichArgs),

    /// Product reference data commands.
    Products(ProductsArgs),
}

/// Arguments for the `enrich` command.
#[derive(Debug, Args)]
pub struct EnrichArgs {
    /// Trade file, or `-` for stdin.
    #[arg(long)]
    pub input: PathBuf,

    /// Destination file, or `-` for stdout.
    #[arg(long, default_value = STDIO)]
    pub output: PathBuf,
}

/// Arguments for the `products` command.
#[derive(Debug, Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    pub command: ProductsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProductsCommand {
    /// Load `productId,productName` rows into the store.
    ///
    /// # Examples
    ///
    ///   tradeflow products load --input product.csv
    Load(ProductsLoadArgs),
}

/// Arguments for the `products load` command.
#[derive(Debug, Args)]
pub struct ProductsLoadArgs {
    /// Product file, or `-` for stdin.
    #[arg(long)]
    pub input: PathBuf,
}

pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}
