//! Bulk load of product reference data (`productId,productName`) into the cache.

use serde::Serialize;
use tokio::io::AsyncRead;

use crate::batch::BatchSize;
use crate::cache::ProductCache;
use crate::domain::{ProductId, FIELD_DELIMITER};
use crate::source::LineSource;
use crate::LoadError;

/// Outcome of a reference-data load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub lines_read: u64,
    pub entries_written: u64,
    pub lines_skipped: u64,
    pub batches: u64,
}

/// Parse one `productId,productName` line into a cache entry.
///
/// The id is stored under its canonical key so that trade rows resolve it
/// regardless of leading zeros.
pub fn parse_product_line(line: &str) -> Option<(String, String)> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    let [id, name] = fields.as_slice() else {
        return None;
    };
    if name.is_empty() {
        return None;
    }
    let id = ProductId::parse(id).ok()?;
    Some((id.cache_key(), (*name).to_string()))
}

/// Read product lines from `input` and write them with one `batch_set` per
/// `batch_size` entries. The header line is discarded.
pub async fn load_products<R>(
    input: R,
    cache: &dyn ProductCache,
    batch_size: BatchSize,
) -> Result<LoadReport, LoadError>
where
    R: AsyncRead + Unpin,
{
    let mut source = LineSource::new(input);
    let mut report = LoadReport::default();
    let mut pending: Vec<(String, String)> = Vec::with_capacity(batch_size.get());

    loop {
        let line = source.next_line().await.map_err(|source_error| LoadError::Source {
            line: source.lines_read() + 1,
            source: source_error,
        })?;
        let Some(line) = line else {
            break;
        };
        report.lines_read += 1;

        match parse_product_line(&line.text) {
            Some(entry) => pending.push(entry),
            None => {
                report.lines_skipped += 1;
                tracing::warn!(line = line.number, record = %line.text, "skipping invalid product record");
            }
        }

        if pending.len() >= batch_size.get() {
            flush(cache, &mut pending, &mut report).await?;
        }
    }

    if !pending.is_empty() {
        flush(cache, &mut pending, &mut report).await?;
    }

    tracing::info!(
        entries = report.entries_written,
        skipped = report.lines_skipped,
        batches = report.batches,
        "product reference data loaded"
    );
    Ok(report)
}

async fn flush(
    cache: &dyn ProductCache,
    pending: &mut Vec<(String, String)>,
    report: &mut LoadReport,
) -> Result<(), LoadError> {
    cache.batch_set(pending).await?;
    report.entries_written += pending.len() as u64;
    report.batches += 1;
    pending.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryProductCache;

    #[test]
    fn parses_two_field_lines() {
        assert_eq!(
            parse_product_line("007,Treasury Bills"),
            Some(("7".to_string(), "Treasury Bills".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["1", "1,", "1,a,b", "x,Name", "-1,Name", ""] {
            assert_eq!(parse_product_line(line), None, "{line}");
        }
    }

    #[tokio::test]
    async fn loads_in_batches_and_skips_invalid_lines() {
        let cache = MemoryProductCache::new();
        let input = "productId,productName\n1,Treasury Bills\nbroken\n2,Corporate Bonds\n3,Swaps\n";

        let report = load_products(input.as_bytes(), &cache, BatchSize::new(2).expect("non-zero"))
            .await
            .expect("load succeeds");

        assert_eq!(
            report,
            LoadReport {
                lines_read: 4,
                entries_written: 3,
                lines_skipped: 1,
                batches: 2,
            }
        );
        assert_eq!(cache.get("2").await, Some("Corporate Bonds".to_string()));
        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn header_only_input_writes_nothing() {
        let cache = MemoryProductCache::new();
        let report = load_products(&b"productId,productName\n"[..], &cache, BatchSize::default())
            .await
            .expect("load succeeds");

        assert_eq!(report.batches, 0);
        assert!(cache.is_empty().await);
    }
}
