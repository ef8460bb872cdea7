//! Pipeline orchestration.
//!
//! ```text
//! bytes ─▶ LineSource ─▶ TradeRecord::parse ─▶ Batcher ─┐
//!                                                        │  (producer, pulled lazily)
//!                     ┌──────────────────────────────────┘
//!                     ▼
//!      BatchScheduler::schedule(Resolver::enrich)   × max_in_flight_batches
//!                     │
//!                     ▼  awaited in batch order
//!          header ─▶ batch 0 lines ─▶ batch 1 lines ─▶ ...
//! ```
//!
//! The output is a single lazy [`EnrichedStream`]. Nothing is read until the
//! consumer polls, at most `max_in_flight_batches` batches are in flight, and
//! dropping the stream drops the source and aborts in-flight batch tasks.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::batch::{Batch, Batcher};
use crate::cache::ProductCache;
use crate::config::PipelineConfig;
use crate::format::HEADER;
use crate::resolver::{EnrichedBatch, Resolver};
use crate::scheduler::{BatchScheduler, InlineScheduler};
use crate::source::LineSource;
use crate::{PipelineError, TradeRecord};

/// Stage of an enrichment run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Sourcing,
    Draining,
    Completed,
    Failed,
}

impl PipelineState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sourcing => "sourcing",
            Self::Draining => "draining",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Step a single line or batch is passing through, reported on trace events.
///
/// Several batches are in different stages at once, so this is never a
/// run-level [`PipelineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Parsing,
    Batching,
    Resolving,
    Formatting,
}

impl BatchStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parsing => "parsing",
            Self::Batching => "batching",
            Self::Resolving => "resolving",
            Self::Formatting => "formatting",
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub lines_read: u64,
    pub records_rejected: u64,
    pub records_accepted: u64,
    pub batches_emitted: u64,
    pub lookups: u64,
    pub names_missing: u64,
    pub lookups_degraded: u64,
    /// Data lines handed to the consumer, header excluded.
    pub lines_emitted: u64,
}

#[derive(Debug, Default)]
struct MonitorInner {
    state: Mutex<PipelineState>,
    lines_read: AtomicU64,
    records_rejected: AtomicU64,
    records_accepted: AtomicU64,
    batches_emitted: AtomicU64,
    lookups: AtomicU64,
    names_missing: AtomicU64,
    lookups_degraded: AtomicU64,
    lines_emitted: AtomicU64,
}

/// Read-only view of a run's progress, shared with the caller.
///
/// Updated only by the producer and the in-order drain; batch tasks report
/// through their [`EnrichedBatch`] instead.
#[derive(Debug, Clone, Default)]
pub struct PipelineMonitor {
    inner: Arc<MonitorInner>,
}

impl PipelineMonitor {
    pub fn state(&self) -> PipelineState {
        *self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> PipelineStats {
        let inner = &self.inner;
        PipelineStats {
            lines_read: inner.lines_read.load(Ordering::Relaxed),
            records_rejected: inner.records_rejected.load(Ordering::Relaxed),
            records_accepted: inner.records_accepted.load(Ordering::Relaxed),
            batches_emitted: inner.batches_emitted.load(Ordering::Relaxed),
            lookups: inner.lookups.load(Ordering::Relaxed),
            names_missing: inner.names_missing.load(Ordering::Relaxed),
            lookups_degraded: inner.lookups_degraded.load(Ordering::Relaxed),
            lines_emitted: inner.lines_emitted.load(Ordering::Relaxed),
        }
    }

    fn set_state(&self, next: PipelineState) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !state.is_terminal() {
            tracing::debug!(from = state.as_str(), to = next.as_str(), "pipeline state");
            *state = next;
        }
    }

    fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    fn record_batch(&self, batch: &EnrichedBatch) {
        let inner = &self.inner;
        Self::add(&inner.lookups, 1);
        Self::add(&inner.names_missing, batch.outcome.missing as u64);
        if batch.outcome.degraded {
            Self::add(&inner.lookups_degraded, 1);
        }
    }
}

/// Pulls lines, validates them and cuts batches on demand.
struct BatchProducer<R> {
    source: LineSource<R>,
    batcher: Batcher,
    monitor: PipelineMonitor,
    pending_error: Option<PipelineError>,
    done: bool,
}

impl<R: AsyncRead + Unpin> BatchProducer<R> {
    fn new(source: LineSource<R>, batcher: Batcher, monitor: PipelineMonitor) -> Self {
        Self {
            source,
            batcher,
            monitor,
            pending_error: None,
            done: false,
        }
    }

    async fn next_batch(&mut self) -> Option<Result<Batch, PipelineError>> {
        if let Some(error) = self.pending_error.take() {
            return Some(Err(error));
        }
        if self.done {
            return None;
        }

        loop {
            match self.source.next_line().await {
                Ok(Some(line)) => {
                    PipelineMonitor::add(&self.monitor.inner.lines_read, 1);
                    tracing::trace!(line = line.number, stage = BatchStage::Parsing.as_str());
                    match TradeRecord::parse(&line.text) {
                        Ok(record) => {
                            PipelineMonitor::add(&self.monitor.inner.records_accepted, 1);
                            if let Some(batch) = self.batcher.push(record) {
                                return Some(Ok(self.emit(batch)));
                            }
                        }
                        Err(error) => {
                            PipelineMonitor::add(&self.monitor.inner.records_rejected, 1);
                            tracing::warn!(
                                line = line.number,
                                record = %line.text,
                                %error,
                                "skipping invalid trade record"
                            );
                        }
                    }
                }
                Ok(None) => {
                    self.done = true;
                    self.monitor.set_state(PipelineState::Draining);
                    let rest = self.batcher.finish();
                    return rest.map(|batch| Ok(self.emit(batch)));
                }
                Err(source) => {
                    self.done = true;
                    let error = PipelineError::Source {
                        line: self.source.lines_read() + 1,
                        source,
                    };
                    // Records read before the failure are still flushed.
                    return match self.batcher.finish() {
                        Some(batch) => {
                            self.pending_error = Some(error);
                            Some(Ok(self.emit(batch)))
                        }
                        None => Some(Err(error)),
                    };
                }
            }
        }
    }

    fn emit(&self, batch: Batch) -> Batch {
        PipelineMonitor::add(&self.monitor.inner.batches_emitted, 1);
        tracing::trace!(batch = batch.seq(), stage = BatchStage::Batching.as_str());
        tracing::debug!(batch = batch.seq(), records = batch.len(), "batch assembled");
        batch
    }
}

/// Streaming enrichment pipeline.
///
/// The pipeline is cheap to clone and can run any number of inputs; runs
/// share nothing but the read-only cache.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    resolver: Resolver,
    scheduler: Arc<dyn BatchScheduler>,
    config: PipelineConfig,
}

impl EnrichmentPipeline {
    /// Pipeline that runs batch tasks inline on the consuming task.
    pub fn new(cache: Arc<dyn ProductCache>, config: PipelineConfig) -> Self {
        Self {
            resolver: Resolver::new(cache),
            scheduler: Arc::new(InlineScheduler),
            config,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn BatchScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start a run over `input`.
    ///
    /// The first item is always the header. Data lines follow in input order;
    /// invalid rows are skipped. A source failure is reported as the final
    /// `Err` item, after every line produced before it.
    pub fn enrich<R>(&self, input: R) -> EnrichedStream
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let monitor = PipelineMonitor::default();
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("enrich", %run_id);

        let producer = BatchProducer::new(
            LineSource::new(input),
            Batcher::new(self.config.batch_size),
            monitor.clone(),
        );
        let batches = stream::unfold(producer, |mut producer| async move {
            producer.next_batch().await.map(|item| (item, producer))
        });

        let resolver = self.resolver.clone();
        let scheduler = Arc::clone(&self.scheduler);
        let enriched = batches
            .map(move |item| match item {
                Ok(batch) => {
                    let resolver = resolver.clone();
                    let seq = batch.seq();
                    scheduler.schedule(seq, async move { resolver.enrich(batch).await }.boxed())
                }
                Err(error) => future::ready(Err(error)).boxed(),
            })
            .buffered(self.config.max_in_flight_batches.max(1));

        let drain_monitor = monitor.clone();
        let lines = enriched.flat_map(move |item| match item {
            Ok(batch) => {
                drain_monitor.record_batch(&batch);
                stream::iter(batch.lines.into_iter().map(Ok)).left_stream()
            }
            Err(error) => stream::once(future::ready(Err(error))).right_stream(),
        });

        let output = stream::once(future::ready(Ok(HEADER.to_string())))
            .chain(lines)
            .boxed();

        EnrichedStream {
            inner: output,
            monitor,
            span,
            header_sent: false,
            finished: false,
        }
    }
}

/// Ordered output of one run: the header, then one line per valid record.
///
/// Ends after the first `Err` item. Dropping it cancels the run.
pub struct EnrichedStream {
    inner: BoxStream<'static, Result<String, PipelineError>>,
    monitor: PipelineMonitor,
    span: tracing::Span,
    header_sent: bool,
    finished: bool,
}

impl EnrichedStream {
    pub fn monitor(&self) -> PipelineMonitor {
        self.monitor.clone()
    }

    fn close(&mut self) {
        self.finished = true;
        self.inner = stream::empty().boxed();
    }
}

impl Stream for EnrichedStream {
    type Item = Result<String, PipelineError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let span = this.span.clone();
        let _entered = span.enter();
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(line))) => {
                if this.header_sent {
                    PipelineMonitor::add(&this.monitor.inner.lines_emitted, 1);
                } else {
                    this.header_sent = true;
                }
                Poll::Ready(Some(Ok(line)))
            }
            Poll::Ready(Some(Err(error))) => {
                this.close();
                this.monitor.set_state(PipelineState::Failed);
                tracing::error!(%error, stats = ?this.monitor.snapshot(), "enrichment failed");
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.close();
                this.monitor.set_state(PipelineState::Completed);
                tracing::info!(stats = ?this.monitor.snapshot(), "enrichment completed");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryProductCache;

    async fn run(input: &'static str, config: PipelineConfig) -> (Vec<String>, PipelineMonitor) {
        let cache = MemoryProductCache::from_entries([("1", "Treasury Bills"), ("2", "Corporate Bonds")]);
        let pipeline = EnrichmentPipeline::new(Arc::new(cache), config);
        let mut stream = pipeline.enrich(input.as_bytes());
        let monitor = stream.monitor();
        let mut lines = Vec::new();
        while let Some(line) = stream.next().await {
            lines.push(line.expect("in-memory input cannot fail"));
        }
        (lines, monitor)
    }

    #[tokio::test]
    async fn enriches_example_rows() {
        let input = "date,productId,currency,price\n20230101,1,USD,100.25\n20230102,2,EUR,200.50\n";
        let (lines, monitor) = run(input, PipelineConfig::default()).await;

        assert_eq!(
            lines.concat(),
            "date,productName,currency,price\n20230101,Treasury Bills,USD,100.25\n20230102,Corporate Bonds,EUR,200.50\n"
        );
        assert_eq!(monitor.state(), PipelineState::Completed);
    }

    #[tokio::test]
    async fn header_only_input_yields_header_only() {
        let (lines, monitor) = run("date,productId,currency,price\n", PipelineConfig::default()).await;
        assert_eq!(lines, vec![HEADER.to_string()]);
        assert_eq!(monitor.snapshot().batches_emitted, 0);
    }

    #[tokio::test]
    async fn counts_rejected_and_emitted_lines() {
        let input = "h\nnotadate,1,USD,100.25\n20230101,1,USD,1\n20230101,x,USD,1\n20230102,2,EUR,2\n";
        let config = PipelineConfig::new(1, 1).expect("valid config");
        let (lines, monitor) = run(input, config).await;

        assert_eq!(lines.len(), 3);
        let stats = monitor.snapshot();
        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.records_rejected, 2);
        assert_eq!(stats.records_accepted, 2);
        assert_eq!(stats.batches_emitted, 2);
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.lines_emitted, 2);
    }

    #[tokio::test]
    async fn stream_is_lazy_until_polled() {
        let cache = MemoryProductCache::new();
        let pipeline = EnrichmentPipeline::new(Arc::new(cache), PipelineConfig::default());
        let stream = pipeline.enrich(&b"h\n20230101,1,USD,1\n"[..]);

        let stats = stream.monitor().snapshot();
        assert_eq!(stats.lines_read, 0);
        assert_eq!(stream.monitor().state(), PipelineState::Sourcing);
    }

    #[test]
    fn terminal_states() {
        assert!(PipelineState::Completed.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Draining.is_terminal());
        assert_eq!(PipelineState::Draining.as_str(), "draining");
    }

    #[test]
    fn batch_stages_are_named_for_trace_events() {
        let names: Vec<&str> = [
            BatchStage::Parsing,
            BatchStage::Batching,
            BatchStage::Resolving,
            BatchStage::Formatting,
        ]
        .into_iter()
        .map(BatchStage::as_str)
        .collect();
        assert_eq!(names, ["parsing", "batching", "resolving", "formatting"]);
    }
}
