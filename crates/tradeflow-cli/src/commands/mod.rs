mod enrich;
mod products;

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tradeflow_core::{BatchSize, PipelineConfig};
use tradeflow_store::{ProductStore, ProductStoreConfig};

use crate::cli::{self, Cli, Command, ProductsCommand};
use crate::error::CliError;

pub type Input = BufReader<Box<dyn AsyncRead + Unpin + Send>>;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Enrich(args) => enrich::run(cli, args).await,
        Command::Products(args) => match &args.command {
            ProductsCommand::Load(load) => products::load(cli, load).await,
        },
    }
}

/// Config file (or defaults) with explicit flags applied on top.
pub fn pipeline_config(cli: &Cli) -> Result<PipelineConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = BatchSize::new(batch_size)?;
    }
    if let Some(max_in_flight) = cli.max_in_flight {
        config.max_in_flight_batches = max_in_flight;
    }
    config.validate()?;
    Ok(config)
}

pub fn open_store(cli: &Cli) -> Result<ProductStore, CliError> {
    let config = match &cli.store {
        Some(path) => ProductStoreConfig::with_db_path(path),
        None => ProductStoreConfig::default(),
    };
    Ok(ProductStore::open(config)?)
}

/// Open a file or stdin, rejecting input with no bytes at all.
pub async fn open_input(path: &Path) -> Result<Input, CliError> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = if cli::is_stdio(path) {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(tokio::fs::File::open(path).await?)
    };

    let mut input = BufReader::new(reader);
    if input.fill_buf().await?.is_empty() {
        return Err(CliError::EmptyInput(path.display().to_string()));
    }
    Ok(input)
}
