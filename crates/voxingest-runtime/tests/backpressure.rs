use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use voxingest_runtime::inserter::{Inserter, InserterCaps};
use voxingest_runtime::sink::BatchSink;

#[derive(Clone, Default)]
struct CountingSink {
    records: Arc<AtomicU64>,
}

impl BatchSink<u64> for CountingSink {
    fn insert(&self, batch: Vec<u64>) -> Result<()> {
        self.records.fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_queue_suspends_producers_without_dropping() -> Result<()> {
    let sink = CountingSink::default();
    let inserter = Inserter::new(
        8,
        sink.clone(),
        InserterCaps {
            breathing_time: Duration::from_millis(10),
            batch_size_hint: 100,
            queue_capacity: 4,
        },
    );
    let handle = inserter.handle();

    // Fill the queue while nothing drains it.
    for record in 0..4u64 {
        handle.submit(record).await?;
    }

    // The next submit must suspend, not fail or drop.
    let blocked = tokio::time::timeout(Duration::from_millis(50), handle.submit(4)).await;
    assert!(
        blocked.is_err(),
        "submit on a full queue must suspend until the drain loop consumes"
    );

    // Once the drain loop runs, the same producer makes progress again. The
    // timed-out submit never enqueued its record, so send the remaining four.
    let serve = tokio::spawn(inserter.serve(CancellationToken::new()));
    for record in 4..8u64 {
        handle.submit(record).await?;
    }
    drop(handle);

    serve.await??;
    assert_eq!(sink.records.load(Ordering::Relaxed), 8);
    Ok(())
}
