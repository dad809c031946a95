#![doc(test(attr(deny(warnings))))]

//! Per-diem budget core: turns a linked bank transaction feed (or manual
//! entries) into a single daily number — how much discretionary money
//! remains today. Provides the cent-exact allocation engine, the feed
//! reconciliation pipeline, recurring-stream merging, and the summary
//! orchestrator. Transport, auth, and real persistence are the embedding
//! service's job.

pub mod clock;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod money;
pub mod storage;

pub use errors::{CoreError, CoreResult};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("perdiem=info"));

        fmt().with_env_filter(filter).init();
        tracing::info!("Perdiem core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
