//! `tradeflow products load`: bulk load reference data into the store.

use tradeflow_core::load_products;

use crate::cli::{Cli, ProductsLoadArgs};
use crate::error::CliError;

use super::{open_input, open_store, pipeline_config};

pub async fn load(cli: &Cli, args: &ProductsLoadArgs) -> Result<(), CliError> {
    let config = pipeline_config(cli)?;
    let input = open_input(&args.input).await?;
    let store = open_store(cli)?;

    let report = load_products(input, &store, config.batch_size).await?;
    tracing::info!(path = %store.db_path().display(), "products stored");

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
