//! Tracing subscriber setup.
//!
//! `LOG_FORMAT=json` emits one flattened JSON object per event for log
//! shippers; anything else gets compact human-readable lines. The level comes
//! from `RUST_LOG` when set, otherwise from `LOG_LEVEL`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber. `RUST_LOG` wins over `log_level` when set.
pub fn init(log_format: &str, log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let format = normalize_log_format(log_format);

    if format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }

    tracing::debug!(log_format = format, log_level, "Logging system initialized");
}

fn normalize_log_format(format: &str) -> &'static str {
    match format.to_lowercase().as_str() {
        "json" => "json",
        "pretty" | "compact" | "text" => "pretty",
        _ => {
            eprintln!("WARN: Invalid log format '{format}', defaulting to 'pretty'. Valid options: json, pretty");
            "pretty"
        }
    }
}
