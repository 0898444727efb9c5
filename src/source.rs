//! Where the data of a run comes from.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::Config;
use crate::leaderboards::LeaderboardSnapshot;
use crate::output;
use crate::transport::{self, Network};

/// The input of a run.
#[derive(Debug)]
pub enum Source {
	/// A PLAN database on disk.
	Snapshot(PathBuf),

	/// A previously written output file; only used in dev mode.
	Previous(LeaderboardSnapshot),
}

/// Errors that can occur while acquiring a [`Source`].
#[derive(Debug, Error)]
pub enum Error {
	/// The download failed.
	#[error(transparent)]
	Transport(#[from] transport::Error),

	/// The download task panicked.
	#[error("download task failed: {0}")]
	Task(#[from] tokio::task::JoinError),

	/// The downloaded snapshot could not be stored.
	#[error("failed to store snapshot at `{}`: {source}", path.display())]
	Store {
		/// Where we tried to store it.
		path: PathBuf,

		/// The underlying error.
		source: io::Error,
	},

	/// The fixture database could not be created.
	#[error("failed to create fixture database: {0}")]
	Fixture(#[from] sqlx::Error),
}

/// Acquires the input of a run.
///
/// In production the PLAN database is downloaded to the configured snapshot path. In dev mode
/// nothing touches the network: an existing snapshot is used as-is, then the previous output
/// file, and as a last resort a fixture database is created.
#[tracing::instrument(skip_all, fields(dev_mode = config.dev_mode), err(Display))]
pub async fn acquire(config: &Config, now: DateTime<Utc>) -> Result<Source, Error> {
	if config.dev_mode {
		return local(config, now).await;
	}

	download(config).await.map(Source::Snapshot)
}

/// Downloads the PLAN database to the configured snapshot path and returns that path.
pub async fn download(config: &Config) -> Result<PathBuf, Error> {
	let transport_config = config.transport.clone();
	let downloaded = tokio::task::spawn_blocking(move || {
		transport::download(&transport_config, &Network::new(&transport_config))
	})
	.await??;

	store(&config.snapshot_path, &downloaded.bytes).await?;

	Ok(config.snapshot_path.clone())
}

/// Picks the dev mode source without touching the network.
async fn local(config: &Config, now: DateTime<Utc>) -> Result<Source, Error> {
	let snapshot_path = &config.snapshot_path;

	if tokio::fs::try_exists(snapshot_path).await.unwrap_or(false) {
		tracing::info!(path = %snapshot_path.display(), "using local snapshot");
		return Ok(Source::Snapshot(snapshot_path.clone()));
	}

	match output::read(&config.output_path).await {
		Ok(previous) => {
			tracing::info!(path = %config.output_path.display(), "reusing previous leaderboards");
			return Ok(Source::Previous(previous));
		},
		Err(output::Error::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
			tracing::debug!("no previous leaderboards");
		},
		Err(error) => {
			tracing::warn!(%error, "ignoring unreadable previous leaderboards");
		},
	}

	tracing::info!(path = %snapshot_path.display(), "creating fixture database");
	crate::fixture::create(snapshot_path, now).await?;

	Ok(Source::Snapshot(snapshot_path.clone()))
}

/// Writes downloaded bytes to `path`.
async fn store(path: &Path, bytes: &[u8]) -> Result<(), Error> {
	let with_path = |source| Error::Store { path: path.to_owned(), source };

	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent).await.map_err(with_path)?;
	}

	tokio::fs::write(path, bytes).await.map_err(with_path)?;

	tracing::debug!(path = %path.display(), bytes = bytes.len(), "stored snapshot");

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::ffi::OsStr;
	use std::path::Path;

	use clap::Parser;

	use super::{acquire, Source};
	use crate::config::Config;
	use crate::extract::tests::now;
	use crate::leaderboards::LeaderboardSnapshot;
	use crate::output;

	fn dev_config(dir: &Path) -> anyhow::Result<Config> {
		let snapshot_path = dir.join("Plan.db");
		let output_path = dir.join("leaderboards.json");

		Ok(Config::try_parse_from([
			OsStr::new("refuge-sync"),
			OsStr::new("--dev"),
			OsStr::new("--snapshot-path"),
			snapshot_path.as_os_str(),
			OsStr::new("--output-path"),
			output_path.as_os_str(),
		])?)
	}

	#[tokio::test]
	async fn dev_mode_order() -> anyhow::Result<()> {
		let dir = std::env::temp_dir().join(format!("refuge-sync-{}", uuid::Uuid::new_v4()));
		let config = dev_config(&dir)?;

		let previous = LeaderboardSnapshot::empty(now());
		output::write(&config.output_path, &previous).await?;

		assert!(
			matches!(acquire(&config, now()).await?, Source::Previous(snapshot) if snapshot == previous),
			"previous output before fixture",
		);

		tokio::fs::remove_file(&config.output_path).await?;

		assert!(
			matches!(acquire(&config, now()).await?, Source::Snapshot(path) if path == config.snapshot_path),
			"fixture as a last resort",
		);

		assert!(
			matches!(acquire(&config, now()).await?, Source::Snapshot(_)),
			"existing snapshot wins",
		);

		tokio::fs::remove_dir_all(&dir).await?;

		Ok(())
	}
}
