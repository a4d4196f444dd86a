//! Tracing setup shared by codevet binaries.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence for filtering; `default_level` applies when
/// it is unset. With `json` set, log lines come out as newline-delimited
/// JSON for aggregation pipelines.
///
/// Calling this more than once is harmless: the global subscriber can only
/// be installed once per process and later calls are ignored.
pub fn init_tracing(json: bool, default_level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
