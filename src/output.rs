//! Reading and writing `leaderboards.json`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::leaderboards::LeaderboardSnapshot;

/// Errors that can occur while reading or writing the output file.
#[derive(Debug, Error)]
pub enum Error {
	/// Filesystem access failed.
	#[error("failed to access `{}`: {source}", path.display())]
	Io {
		/// The file or directory we tried to access.
		path: PathBuf,

		/// The underlying error.
		source: io::Error,
	},

	/// The snapshot could not be (de)serialized.
	#[error("invalid leaderboard JSON in `{}`: {source}", path.display())]
	Json {
		/// The file we tried to read or write.
		path: PathBuf,

		/// The underlying error.
		source: serde_json::Error,
	},
}

impl Error {
	fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
		move |source| Self::Io { path: path.to_owned(), source }
	}

	fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
		move |source| Self::Json { path: path.to_owned(), source }
	}
}

/// Writes `snapshot` to `path` as pretty-printed JSON.
///
/// The file is written next to `path` first and then moved into place, so readers never see a
/// partially written file.
#[tracing::instrument(skip_all, fields(path = %path.display()), err(Display))]
pub async fn write(path: &Path, snapshot: &LeaderboardSnapshot) -> Result<(), Error> {
	let mut json = serde_json::to_vec_pretty(snapshot).map_err(Error::json(path))?;
	json.push(b'\n');

	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		fs::create_dir_all(parent).await.map_err(Error::io(parent))?;
	}

	let temp = temp_path(path);

	fs::write(&temp, &json).await.map_err(Error::io(&temp))?;
	fs::rename(&temp, path).await.map_err(Error::io(path))?;

	tracing::info!(bytes = json.len(), "wrote leaderboards");

	Ok(())
}

/// Reads a previously written snapshot.
#[tracing::instrument(skip_all, fields(path = %path.display()), err(Display))]
pub async fn read(path: &Path) -> Result<LeaderboardSnapshot, Error> {
	let json = fs::read(path).await.map_err(Error::io(path))?;

	serde_json::from_slice(&json).map_err(Error::json(path))
}

/// `leaderboards.json` → `.leaderboards.json.tmp`, in the same directory.
fn temp_path(path: &Path) -> PathBuf {
	let name = path
		.file_name()
		.map_or_else(|| String::from("leaderboards"), |name| name.to_string_lossy().into_owned());

	path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use super::{read, temp_path, write};
	use crate::leaderboards::LeaderboardSnapshot;
	use crate::players::tests::{at, record};
	use crate::players::{Kills, PlayerRecord};

	#[test]
	fn temp_file_is_a_sibling() {
		assert_eq!(
			temp_path(Path::new("public/data/leaderboards.json")),
			Path::new("public/data/.leaderboards.json.tmp"),
			"same directory, hidden",
		);
	}

	#[tokio::test]
	async fn round_trip() -> anyhow::Result<()> {
		let dir = std::env::temp_dir().join(format!("refuge-sync-{}", uuid::Uuid::new_v4()));
		let path = dir.join("data").join("leaderboards.json");

		let snapshot = LeaderboardSnapshot {
			most_active: vec![PlayerRecord {
				playtime: 3_600_000,
				sessions: 2,
				afk_time: 60_000,
				last_seen: at(1_714_570_620_000),
				join_date: at(1_700_000_000_000),
				rank: Some(String::from("admin")),
				activity_score: Some(1.25),
				..record("00000000-0000-0000-0000-000000000001")
			}],
			top_killers: vec![PlayerRecord {
				kills: Kills { mob: 4, player: 1 },
				..record("00000000-0000-0000-0000-000000000002")
			}],
			most_deaths: Vec::new(),
			last_updated: at(1_715_731_200_123),
		};

		write(&path, &snapshot).await?;

		let json = tokio::fs::read_to_string(&path).await?;

		assert!(json.contains("\"lastSeen\": \"2024-05-01T13:37:00.000Z\""), "camelCase ISO dates: {json}");
		assert!(json.contains("\"mob\": 4"), "nested kills: {json}");
		assert!(!json.contains("\"rank\": null"), "absent rank is omitted: {json}");
		assert_eq!(read(&path).await?, snapshot, "read back what was written");

		tokio::fs::remove_dir_all(&dir).await?;

		Ok(())
	}

	#[tokio::test]
	async fn missing_file() {
		let path = std::env::temp_dir().join(format!("refuge-sync-{}.json", uuid::Uuid::new_v4()));

		assert!(read(&path).await.is_err(), "nothing to read");
	}
}
