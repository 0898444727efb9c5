//! Log-capturing facilities.
//!
//! Logs always go to STDERR. If a log directory is configured, they are additionally written to
//! daily rotated JSON files there.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod stderr;
mod files;

/// Initializes [`tracing-subscriber`].
///
/// NOTE: the returned [`WorkerGuard`] (if any) flushes the file logs when dropped, which means it
///       has to stay alive until the program exits!
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
	let (files_layer, guard) = match log_dir {
		None => (None, None),
		Some(log_dir) => {
			let (layer, guard) = files::layer(log_dir).context("files layer")?;
			(Some(layer), Some(guard))
		},
	};

	tracing_subscriber::registry()
		.with(stderr::layer())
		.with(files_layer)
		.try_init()
		.context("install global subscriber")?;

	if let Some(log_dir) = log_dir {
		tracing::debug!(dir = %log_dir.display(), "writing logs to files");
	}

	Ok(guard)
}
