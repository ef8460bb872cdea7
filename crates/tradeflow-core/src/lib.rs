//! # Tradeflow Core
//!
//! Streaming enrichment of trade rows with product names from a key-value cache.
//!
//! ## Overview
//!
//! A delimited trade feed (`date,productId,currency,price`) is read line by
//! line, validated, grouped into bounded batches, resolved against an injected
//! product cache with one batched lookup per batch, and re-emitted as
//! `date,productName,currency,price` in input order. Neither the input nor the
//! output is ever held in memory as a whole.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`source`] | Lazy line reader that discards the header |
//! | [`domain`] | Validated trade records, dates, product ids, resolved names |
//! | [`batch`] | Order-preserving batcher |
//! | [`cache`] | Product cache capability and in-memory implementation |
//! | [`resolver`] | One batched lookup per batch, index-aligned names |
//! | [`format`] | Output header and line rendering |
//! | [`scheduler`] | Inline and tokio batch schedulers |
//! | [`pipeline`] | Orchestrator, output stream, run monitor |
//! | [`config`] | Pipeline tuning |
//! | [`products`] | Bulk load of product reference data |
//! | [`error`] | Error types |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use tradeflow_core::{EnrichmentPipeline, MemoryProductCache, PipelineConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = MemoryProductCache::from_entries([("1", "Treasury Bills")]);
//! let pipeline = EnrichmentPipeline::new(Arc::new(cache), PipelineConfig::default());
//!
//! let input: &[u8] = b"date,productId,currency,price\n20230101,1,USD,100.25\n";
//! let mut output = pipeline.enrich(input);
//! let mut text = String::new();
//! while let Some(line) = output.next().await {
//!     text.push_str(&line.expect("in-memory input"));
//! }
//!
//! assert_eq!(
//!     text,
//!     "date,productName,currency,price\n20230101,Treasury Bills,USD,100.25\n"
//! );
//! # }
//! ```
//!
//! ## Error Handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Invalid row | Dropped with a warning, run continues |
//! | Cache lookup failure | Batch resolves to [`MISSING_PRODUCT_NAME`], run continues |
//! | Input I/O failure | Lines already produced are flushed, then the stream ends with [`PipelineError::Source`] |

pub mod batch;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod products;
pub mod resolver;
pub mod scheduler;
pub mod source;

pub use batch::{Batch, BatchSize, Batcher};
pub use cache::{MemoryProductCache, ProductCache};
pub use config::PipelineConfig;
pub use domain::{Price, ProductId, ResolvedName, TradeDate, TradeRecord, MISSING_PRODUCT_NAME};
pub use error::{CacheError, ConfigError, LoadError, PipelineError, ValidationError};
pub use format::{format_line, HEADER};
pub use pipeline::{BatchStage, EnrichedStream, EnrichmentPipeline, PipelineMonitor, PipelineState, PipelineStats};
pub use products::{load_products, parse_product_line, LoadReport};
pub use resolver::{EnrichedBatch, LookupOutcome, Resolution, Resolver};
pub use scheduler::{BatchScheduler, BatchTask, InlineScheduler, TokioScheduler};
pub use source::{LineSource, RawLine};
