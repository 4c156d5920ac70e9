use tracing_subscriber::EnvFilter;

/// Initializes a `tracing_subscriber` using `VOXINGEST_LOG` first, then `RUST_LOG`,
/// then a default.
///
/// Log field contract for ingestion runs:
/// - Progress events carry `buffered`, `flushed`, `expected` and `remaining`.
/// - Stage-level events carry the `stage` name and its record count.
pub fn init_tracing() {
    let filter = env_filter();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("VOXINGEST_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
