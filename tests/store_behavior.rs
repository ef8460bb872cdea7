//! Behavior-driven tests for the persistent product store
//!
//! These tests verify the store from the pipeline's point of view: loaded
//! products survive reopening and resolve trade rows like any other cache.

use std::sync::Arc;

use futures::StreamExt;
use tempfile::tempdir;
use tradeflow_core::{load_products, BatchSize, EnrichmentPipeline, PipelineConfig, PipelineState};
use tradeflow_store::{ProductStore, ProductStoreConfig};

fn store_at(path: &std::path::Path) -> ProductStore {
    ProductStore::open(ProductStoreConfig {
        home: path.to_path_buf(),
        db_path: path.join("products.duckdb"),
        max_pool_size: 2,
    })
    .expect("store open")
}

#[tokio::test]
async fn products_loaded_into_the_store_enrich_trades_after_reopen() {
    // Given: Reference data loaded into a store that is then closed
    let temp = tempdir().expect("tempdir");
    {
        let store = store_at(temp.path());
        let report = load_products(
            &b"productId,productName\n1,Treasury Bills\n2,Corporate Bonds\nbad line\n"[..],
            &store,
            BatchSize::new(1).expect("non-zero"),
        )
        .await
        .expect("load");
        assert_eq!(report.entries_written, 2);
        assert_eq!(report.lines_skipped, 1);
        assert_eq!(report.batches, 2);
    }

    // When: A fresh store handle backs an enrichment run
    let store = store_at(temp.path());
    assert_eq!(store.count().expect("count"), 2);
    let pipeline = EnrichmentPipeline::new(Arc::new(store), PipelineConfig::default());
    let mut stream = pipeline.enrich(
        &b"date,productId,currency,price\n20230101,1,USD,100.25\n20230102,3,EUR,1\n20230103,2,GBP,200.50\n"[..],
    );
    let monitor = stream.monitor();
    let mut output = String::new();
    while let Some(line) = stream.next().await {
        output.push_str(&line.expect("in-memory input"));
    }

    // Then: Stored names resolve and unknown ids get the sentinel
    assert_eq!(
        output,
        "date,productName,currency,price\n\
         20230101,Treasury Bills,USD,100.25\n\
         20230102,Missing Product Name,EUR,1\n\
         20230103,Corporate Bonds,GBP,200.50\n"
    );
    assert_eq!(monitor.state(), PipelineState::Completed);
    assert_eq!(monitor.snapshot().names_missing, 1);
}

#[tokio::test]
async fn reloading_reference_data_replaces_names() {
    let temp = tempdir().expect("tempdir");
    let store = store_at(temp.path());

    load_products(&b"id,name\n1,Bills\n"[..], &store, BatchSize::default())
        .await
        .expect("first load");
    load_products(&b"id,name\n1,Treasury Bills\n"[..], &store, BatchSize::default())
        .await
        .expect("second load");

    assert_eq!(store.count().expect("count"), 1);
    assert_eq!(
        store.get_many(&["1".to_string()]).expect("get"),
        vec![Some("Treasury Bills".to_string())]
    );
}
