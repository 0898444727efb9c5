use std::io;

use time::macros::format_description;
use tracing_subscriber::fmt::time::{FormatTime, UtcTime};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used if `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "refuge_sync=info";

/// Provides a tracing layer for emitting logs to STDERR.
pub fn layer<S>() -> impl tracing_subscriber::Layer<S>
where
	S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
	tracing_subscriber::fmt::layer()
		.with_writer(io::stderr)
		.with_timer(timer())
		.pretty()
		.with_filter(filter())
}

/// `RUST_LOG`, or our own crate at `info`.
fn filter() -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// UTC timestamps with millisecond precision.
fn timer() -> impl FormatTime {
	let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

	UtcTime::new(format)
}
