use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use voxingest_observe::metrics::{Counter, Gauge};

use crate::sink::BatchSink;

/// Default capacity of the submission queue. Producers that outpace the store
/// suspend once this many records are queued.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct InserterCaps {
    /// Period between flush attempts ("breathing time"). The dominant
    /// scheduling knob: flush latency is bounded by it.
    pub breathing_time: Duration,
    /// Soft sizing hint for flushed batches; clamped to the expected total.
    /// Batches are opportunistic (whatever accumulated since the last tick),
    /// so under steady load they are typically far smaller than this.
    pub batch_size_hint: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Default)]
pub struct InserterMetrics {
    pub flushed_records_total: Counter,
    pub flushed_batches_total: Counter,
    pub buffered_records: Gauge,
}

#[derive(Debug, Error)]
pub enum ServeError {
    /// The run was cancelled before the expected total was flushed. Buffered
    /// and still-queued records are discarded, not persisted.
    #[error("ingestion cancelled")]
    Cancelled,
    /// The sink rejected a flush. Fatal to the run; the batch is not retried.
    #[error(transparent)]
    Sink(#[from] anyhow::Error),
}

/// Bounded concurrent batch inserter.
///
/// Any number of producer tasks submit records one at a time through
/// [`SubmitHandle`]s; a single drain loop buffers them and periodically flushes
/// the buffer through the sink. The run completes once exactly
/// `expected_total` records have been durably flushed, so the caller-declared
/// total must match what producers actually submit: fewer submissions leave
/// [`Inserter::serve`] waiting until cancelled, excess submissions are left in
/// the queue when it returns.
pub struct Inserter<T> {
    expected_total: u64,
    batch_size: usize,
    breathing_time: Duration,
    sink: Arc<dyn BatchSink<T>>,
    metrics: Arc<InserterMetrics>,
    tx: mpsc::Sender<T>,
    rx: mpsc::Receiver<T>,
}

pub struct SubmitHandle<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for SubmitHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> SubmitHandle<T> {
    /// Enqueues one record, suspending while the queue is full (backpressure).
    /// Errors only if the drain loop has already terminated.
    pub async fn submit(&self, record: T) -> anyhow::Result<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| anyhow::anyhow!("inserter stopped before the record was accepted"))
    }
}

impl<T: Send + 'static> Inserter<T> {
    pub fn new(expected_total: u64, sink: impl BatchSink<T>, caps: InserterCaps) -> Self {
        let total = usize::try_from(expected_total).unwrap_or(usize::MAX);
        let (tx, rx) = mpsc::channel(caps.queue_capacity.max(1));
        Self {
            expected_total,
            batch_size: caps.batch_size_hint.min(total),
            breathing_time: caps.breathing_time,
            sink: Arc::new(sink),
            metrics: Arc::new(InserterMetrics::default()),
            tx,
            rx,
        }
    }

    pub fn handle(&self) -> SubmitHandle<T> {
        SubmitHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn metrics(&self) -> Arc<InserterMetrics> {
        self.metrics.clone()
    }

    pub fn expected_total(&self) -> u64 {
        self.expected_total
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size
    }

    /// Runs the drain loop to completion.
    ///
    /// Returns `Ok(())` once `expected_total` records have been flushed and the
    /// buffer is empty, [`ServeError::Cancelled`] if the token fires first, or
    /// the sink's error unmodified if a flush fails. Cancellation is observed
    /// between flushes only; an in-flight sink call always runs to completion.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), ServeError> {
        let Inserter {
            expected_total,
            batch_size,
            breathing_time,
            sink,
            metrics,
            tx,
            mut rx,
        } = self;
        // Only producer handles keep the queue open from here on.
        drop(tx);

        let mut buffer: Vec<T> = Vec::with_capacity(batch_size);
        let mut flushed: u64 = 0;
        let mut queue_open = true;

        let first_tick = tokio::time::Instant::now() + breathing_time;
        let mut ticker = tokio::time::interval_at(first_tick, breathing_time);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ServeError::Cancelled),
                _ = ticker.tick() => {
                    log_progress::<T>(expected_total, batch_size, buffer.len(), flushed);

                    if !buffer.is_empty() {
                        let batch = std::mem::take(&mut buffer);
                        let count = batch.len() as u64;
                        let sink = sink.clone();
                        // The sink is synchronous; run it on a blocking thread so a
                        // slow store exerts backpressure without stalling the runtime.
                        tokio::task::spawn_blocking(move || sink.insert(batch))
                            .await
                            .map_err(anyhow::Error::from)??;

                        flushed = flushed.saturating_add(count);
                        metrics.flushed_batches_total.inc();
                        metrics.flushed_records_total.inc_by(count);
                        metrics.buffered_records.set(0);
                        log_progress::<T>(expected_total, batch_size, 0, flushed);
                    }

                    if flushed >= expected_total && buffer.is_empty() {
                        return Ok(());
                    }
                }
                received = rx.recv(), if queue_open => match received {
                    Some(record) => {
                        buffer.push(record);
                        metrics.buffered_records.set(buffer.len() as u64);
                    }
                    // Every producer handle is gone. Whatever is buffered still
                    // flushes on the next tick; termination stays count-driven.
                    None => queue_open = false,
                },
            }
        }
    }
}

fn log_progress<T>(expected: u64, batch_size: usize, buffered: usize, flushed: u64) {
    tracing::info!(
        target: "voxingest_progress",
        record_type = std::any::type_name::<T>(),
        buffered = buffered as u64,
        flushed = flushed,
        expected = expected,
        batch_size = batch_size as u64,
        remaining = expected.saturating_sub(flushed),
        "inserter progress"
    );
}
