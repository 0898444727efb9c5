//! The list of players excluded from every leaderboard.
//!
//! The list is a plain text file with one UUID per line. Lines starting with `#` are comments.
//! Entries are matched case-insensitively; malformed entries are skipped with a warning.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use uuid::Uuid;

/// Banned player UUIDs, lowercased and hyphenated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BanList {
	/// The UUIDs.
	uuids: BTreeSet<String>,
}

impl BanList {
	/// Reads the ban list at `path`.
	///
	/// This never fails: a missing or unreadable file is logged and treated as an empty list, so
	/// a broken ban file can't take the leaderboards down with it.
	#[tracing::instrument(skip_all, fields(path = %path.display()))]
	pub async fn load(path: &Path) -> Self {
		match tokio::fs::read_to_string(path).await {
			Ok(contents) => {
				let bans = Self::parse(&contents);
				tracing::info!(count = bans.len(), "loaded ban list");
				bans
			},
			Err(error) if error.kind() == io::ErrorKind::NotFound => {
				tracing::info!("no ban list found; not excluding anyone");
				Self::default()
			},
			Err(error) => {
				tracing::error!(%error, "failed to read ban list; not excluding anyone");
				Self::default()
			},
		}
	}

	/// Parses the contents of a ban list file.
	pub fn parse(contents: &str) -> Self {
		let mut uuids = BTreeSet::new();

		for (idx, line) in contents.lines().enumerate() {
			let line = line.trim();

			if line.is_empty() || line.starts_with('#') {
				continue;
			}

			match parse_uuid(line) {
				Some(uuid) => {
					uuids.insert(uuid);
				},
				None => tracing::warn!(line = idx + 1, value = line, "skipping malformed UUID"),
			}
		}

		Self { uuids }
	}

	/// Whether `uuid` is banned.
	pub fn contains(&self, uuid: &str) -> bool {
		self.uuids.contains(&uuid.trim().to_ascii_lowercase())
	}

	/// Iterates over the banned UUIDs in their normalized form.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.uuids.iter().map(String::as_str)
	}

	/// The number of banned UUIDs.
	pub fn len(&self) -> usize {
		self.uuids.len()
	}

	/// Whether nobody is banned.
	pub fn is_empty(&self) -> bool {
		self.uuids.is_empty()
	}
}

/// Accepts the canonical 8-4-4-4-12 form only; that is what the game and PLAN store.
fn parse_uuid(value: &str) -> Option<String> {
	if value.len() != 36 {
		return None;
	}

	Uuid::try_parse(value)
		.ok()
		.map(|uuid| uuid.hyphenated().to_string())
}
