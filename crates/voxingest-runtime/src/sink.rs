use anyhow::Result;

/// Persistence interface for the inserter.
///
/// This is intentionally synchronous. Each flush runs the sink on a blocking
/// thread, and a slow store must exert backpressure (i.e., block upstream) so
/// ingestion stays bounded.
pub trait BatchSink<T>: Send + Sync + 'static {
    /// Durably writes one batch, or fails as a unit.
    ///
    /// Partial failure is reported as total failure; the inserter never retries
    /// a batch. Callers that want resilience wrap the sink before handing it in.
    fn insert(&self, batch: Vec<T>) -> Result<()>;
}

impl<T, F> BatchSink<T> for F
where
    F: Fn(Vec<T>) -> Result<()> + Send + Sync + 'static,
{
    fn insert(&self, batch: Vec<T>) -> Result<()> {
        self(batch)
    }
}
