//! `tradeflow enrich`: stream a trade file through the enrichment pipeline.

use std::io::{self, ErrorKind};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tradeflow_core::{
    EnrichmentPipeline, PipelineError, PipelineState, PipelineStats, TokioScheduler,
};

use crate::cli::{self, Cli, EnrichArgs};
use crate::error::CliError;

use super::{open_input, open_store, pipeline_config};

#[derive(Debug, Serialize)]
struct RunSummary {
    state: PipelineState,
    #[serde(flatten)]
    stats: PipelineStats,
}

pub async fn run(cli: &Cli, args: &EnrichArgs) -> Result<(), CliError> {
    let config = pipeline_config(cli)?;
    let input = open_input(&args.input).await?;
    let store = open_store(cli)?;

    let mut pipeline = EnrichmentPipeline::new(Arc::new(store), config);
    if cli.workers > 0 {
        pipeline = pipeline.with_scheduler(Arc::new(TokioScheduler::current()));
    }

    let sink: Box<dyn AsyncWrite + Unpin + Send> = if cli::is_stdio(&args.output) {
        Box::new(tokio::io::stdout())
    } else {
        Box::new(tokio::fs::File::create(&args.output).await?)
    };
    let mut writer = BufWriter::new(sink);

    let mut stream = pipeline.enrich(input);
    let monitor = stream.monitor();
    let delivery = deliver(&mut stream, &mut writer, config.batch_size.get()).await?;
    drop(stream);

    let failure = match delivery {
        Delivery::Finished(failure) => failure,
        Delivery::Closed => return Ok(()),
    };

    let summary = RunSummary {
        state: monitor.state(),
        stats: monitor.snapshot(),
    };
    eprintln!("{}", serde_json::to_string(&summary)?);

    match failure {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// How writing the enriched lines ended.
#[derive(Debug)]
enum Delivery {
    /// The stream ended; holds the pipeline error that cut it short, if any.
    Finished(Option<PipelineError>),
    /// The reader closed the output before the stream ended.
    Closed,
}

/// Write every line of `stream`, flushing every `flush_every` lines.
///
/// A closed output (`BrokenPipe`) on any write or flush stops pulling from the
/// stream and is not an error.
async fn deliver<S, W>(stream: &mut S, writer: &mut W, flush_every: usize) -> io::Result<Delivery>
where
    S: Stream<Item = Result<String, PipelineError>> + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut written = 0usize;
    let mut failure = None;

    while let Some(item) = stream.next().await {
        let line = match item {
            Ok(line) => line,
            Err(error) => {
                failure = Some(error);
                break;
            }
        };

        if let Err(error) = writer.write_all(line.as_bytes()).await {
            return closed_or(error);
        }
        written += 1;
        if written % flush_every == 0 {
            if let Err(error) = writer.flush().await {
                return closed_or(error);
            }
        }
    }

    // Lines emitted before a failure stay written.
    if let Err(error) = writer.flush().await {
        return closed_or(error);
    }
    Ok(Delivery::Finished(failure))
}

fn closed_or(error: io::Error) -> io::Result<Delivery> {
    if error.kind() == ErrorKind::BrokenPipe {
        tracing::debug!("output closed by reader, stopping");
        Ok(Delivery::Closed)
    } else {
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::stream;

    use super::*;

    /// Accepts writes, then fails every flush with `kind`.
    struct FlushFails {
        kind: ErrorKind,
        received: Vec<u8>,
    }

    impl AsyncWrite for FlushFails {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.received.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::from(self.kind)))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn lines(count: usize) -> Vec<Result<String, PipelineError>> {
        (0..count).map(|i| Ok(format!("line {i}\n"))).collect()
    }

    #[tokio::test]
    async fn closed_output_during_periodic_flush_stops_quietly() {
        let mut source = stream::iter(lines(5));
        let mut writer = FlushFails {
            kind: ErrorKind::BrokenPipe,
            received: Vec::new(),
        };

        let delivery = deliver(&mut source, &mut writer, 2).await.expect("not an error");

        assert!(matches!(delivery, Delivery::Closed));
        assert_eq!(writer.received, b"line 0\nline 1\n");
        assert_eq!(source.count().await, 3);
    }

    #[tokio::test]
    async fn other_flush_failures_are_reported() {
        let mut source = stream::iter(lines(2));
        let mut writer = FlushFails {
            kind: ErrorKind::PermissionDenied,
            received: Vec::new(),
        };

        let error = deliver(&mut source, &mut writer, 1).await.expect_err("flush fails");

        assert_eq!(error.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn lines_before_a_pipeline_failure_are_written() {
        let mut items = lines(2);
        items.push(Err(PipelineError::Worker {
            seq: 1,
            message: "cancelled".to_string(),
        }));
        items.extend(lines(1));
        let mut source = stream::iter(items);
        let mut writer = Vec::new();

        let delivery = deliver(&mut source, &mut writer, 1000).await.expect("written");

        assert!(matches!(
            delivery,
            Delivery::Finished(Some(PipelineError::Worker { seq: 1, .. }))
        ));
        assert_eq!(writer, b"line 0\nline 1\n");
    }
}
