//! Batched product-name resolution.
//!
//! Each batch costs exactly one [`ProductCache::batch_get`] call. Names are
//! paired with records by position: the ordered key list is zipped with the
//! ordered response, so repeated ids and out-of-order completions cannot
//! misattribute a name.

use std::sync::Arc;

use serde::Serialize;

use crate::batch::Batch;
use crate::cache::ProductCache;
use crate::domain::ResolvedName;
use crate::format::format_line;
use crate::pipeline::BatchStage;

/// Summary of one batched lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LookupOutcome {
    pub requested: usize,
    pub found: usize,
    pub missing: usize,
    /// The whole lookup failed or returned a misaligned response and every
    /// key fell back to the sentinel name.
    pub degraded: bool,
}

/// Names for one batch, aligned with its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub names: Vec<ResolvedName>,
    pub outcome: LookupOutcome,
}

/// A batch after resolution and formatting, ready to be emitted in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedBatch {
    pub seq: u64,
    pub lines: Vec<String>,
    pub outcome: LookupOutcome,
}

/// Resolves product names for whole batches against an injected cache.
#[derive(Clone)]
pub struct Resolver {
    cache: Arc<dyn ProductCache>,
}

impl Resolver {
    pub fn new(cache: Arc<dyn ProductCache>) -> Self {
        Self { cache }
    }

    /// Resolve one name per record of `batch`, in record order.
    ///
    /// Lookup failures never escape: a failed or misaligned response turns
    /// every name in the batch into [`ResolvedName::Missing`].
    pub async fn resolve(&self, batch: &Batch) -> Resolution {
        if batch.is_empty() {
            return Resolution {
                names: Vec::new(),
                outcome: LookupOutcome::default(),
            };
        }

        let keys: Vec<String> = batch
            .records()
            .iter()
            .map(|record| record.product_id().cache_key())
            .collect();
        let requested = keys.len();

        let response = match self.cache.batch_get(&keys).await {
            Ok(values) if values.len() == requested => Some(values),
            Ok(values) => {
                tracing::warn!(
                    batch = batch.seq(),
                    requested,
                    returned = values.len(),
                    "cache response misaligned with request, resolving batch as missing"
                );
                None
            }
            Err(error) => {
                tracing::warn!(
                    batch = batch.seq(),
                    requested,
                    %error,
                    "cache lookup failed, resolving batch as missing"
                );
                None
            }
        };

        let degraded = response.is_none();
        let names: Vec<ResolvedName> = match response {
            Some(values) => values.into_iter().map(ResolvedName::from).collect(),
            None => vec![ResolvedName::Missing; requested],
        };
        let missing = names.iter().filter(|name| name.is_missing()).count();

        Resolution {
            names,
            outcome: LookupOutcome {
                requested,
                found: requested - missing,
                missing,
                degraded,
            },
        }
    }

    /// Resolve then format a batch. Formatting starts only after the whole
    /// batch is resolved.
    pub async fn enrich(&self, batch: Batch) -> EnrichedBatch {
        let seq = batch.seq();
        tracing::trace!(
            batch = seq,
            records = batch.len(),
            stage = BatchStage::Resolving.as_str()
        );
        let Resolution { names, outcome } = self.resolve(&batch).await;

        tracing::trace!(batch = seq, stage = BatchStage::Formatting.as_str());
        let lines = batch
            .records()
            .iter()
            .zip(names.iter())
            .map(|(record, name)| format_line(record, name))
            .collect();

        EnrichedBatch {
            seq,
            lines,
            outcome,
        }
    }
}
