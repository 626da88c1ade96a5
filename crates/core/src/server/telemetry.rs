//! Tracing subscriber and Sentry initialisation.

use std::borrow::Cow;
use std::str::FromStr;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected pretty or json)")),
        }
    }
}

/// Logging and error tracking settings for one service.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `shopfloor_catalog=info,tower_http=debug`.
    pub default_filter: String,
    pub log_format: LogFormat,
    /// Sentry DSN; Sentry stays disabled when unset.
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Initialize Sentry (if configured) and the global tracing subscriber.
///
/// The returned guard flushes Sentry on drop and must be kept alive for the
/// lifetime of the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Option<sentry::ClientInitGuard> {
    // Sentry must be initialised before the tracing subscriber
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config.sentry_environment.clone().map(Cow::Owned),
                attach_stacktrace: true,
                ..Default::default()
            },
        ))
    });

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_filter.as_str().into());

    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if guard.is_some() {
        tracing::info!("Sentry initialized");
    }
    guard
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}
