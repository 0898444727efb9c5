//! Player records as they appear on the leaderboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::serde::timestamp;

/// Placeholder for players whose name the snapshot does not know.
pub const UNKNOWN_NAME: &str = "Unknown";

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
	/// The player's Minecraft UUID.
	pub uuid: String,

	/// The player's last known name.
	pub name: String,

	/// Total time spent online, in milliseconds.
	pub playtime: u64,

	/// Number of sessions.
	pub sessions: u64,

	/// Kill counts.
	pub kills: Kills,

	/// Number of deaths.
	pub deaths: u64,

	/// Time spent AFK, in milliseconds.
	pub afk_time: u64,

	/// When the player was last online.
	#[serde(with = "timestamp")]
	pub last_seen: DateTime<Utc>,

	/// When the player first joined.
	#[serde(with = "timestamp")]
	pub join_date: DateTime<Utc>,

	/// The player's permission group.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rank: Option<String>,

	/// Sort key of the "Most Active" leaderboard.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub activity_score: Option<f64>,
}

/// Kill counts of a player.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kills {
	/// Mobs killed.
	pub mob: u64,

	/// Players killed.
	pub player: u64,
}

impl Kills {
	/// Mob and player kills combined.
	pub const fn total(&self) -> u64 {
		self.mob.saturating_add(self.player)
	}
}

impl PlayerRecord {
	/// The key used to correlate records across leaderboards.
	pub fn key(&self) -> String {
		self.uuid.to_ascii_lowercase()
	}

	/// Folds `other` (a record of the same player) into `self`.
	///
	/// Cumulative counters keep the largest value, `last_seen` the latest and `join_date` the
	/// earliest. A known rank is never replaced by an unknown one.
	pub fn absorb(&mut self, other: &Self) {
		self.playtime = self.playtime.max(other.playtime);
		self.sessions = self.sessions.max(other.sessions);
		self.kills.mob = self.kills.mob.max(other.kills.mob);
		self.kills.player = self.kills.player.max(other.kills.player);
		self.deaths = self.deaths.max(other.deaths);
		self.afk_time = self.afk_time.max(other.afk_time);
		self.last_seen = self.last_seen.max(other.last_seen);
		self.join_date = self.join_date.min(other.join_date);

		if self.rank.is_none() {
			self.rank.clone_from(&other.rank);
		}

		if self.name == UNKNOWN_NAME && other.name != UNKNOWN_NAME {
			self.name.clone_from(&other.name);
		}
	}
}

/// A raw result row of any leaderboard query.
///
/// Every query selects the same set of columns, filling in `0` / `NULL` for whatever its
/// strategy cannot provide.
#[derive(Debug, sqlx::FromRow)]
pub struct PlayerRow {
	/// `players.uuid`
	pub uuid: String,

	/// `players.name`
	pub name: Option<String>,

	/// Registration date in epoch milliseconds.
	pub join_date: Option<i64>,

	/// Last activity in epoch milliseconds.
	pub last_seen: Option<i64>,

	/// Milliseconds online.
	pub playtime: i64,

	/// Session count.
	pub sessions: i64,

	/// Milliseconds AFK.
	pub afk_time: i64,

	/// Mob kills.
	pub mob_kills: i64,

	/// Player kills.
	pub player_kills: i64,

	/// Deaths.
	pub deaths: i64,

	/// Permission group.
	pub rank: Option<String>,

	/// Weighted activity score, if the query computed one.
	pub activity_score: Option<f64>,
}

impl From<PlayerRow> for PlayerRecord {
	fn from(row: PlayerRow) -> Self {
		let join_date = timestamp::from_millis(row.join_date).unwrap_or(DateTime::UNIX_EPOCH);
		let last_seen = timestamp::from_millis(row.last_seen).unwrap_or(join_date);

		Self {
			uuid: row.uuid,
			name: row
				.name
				.filter(|name| !name.is_empty())
				.unwrap_or_else(|| UNKNOWN_NAME.to_owned()),
			playtime: non_negative(row.playtime),
			sessions: non_negative(row.sessions),
			kills: Kills {
				mob: non_negative(row.mob_kills),
				player: non_negative(row.player_kills),
			},
			deaths: non_negative(row.deaths),
			afk_time: non_negative(row.afk_time),
			last_seen,
			join_date,
			rank: row.rank.filter(|rank| !rank.is_empty()),
			activity_score: row.activity_score.filter(|score| score.is_finite()),
		}
	}
}

/// Clamps negative counters (clock skew in session rows, mostly) to zero.
fn non_negative(value: i64) -> u64 {
	u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
	use chrono::{DateTime, TimeZone, Utc};

	use super::{Kills, PlayerRecord, PlayerRow, UNKNOWN_NAME};

	pub(crate) fn at(millis: i64) -> DateTime<Utc> {
		Utc.timestamp_millis_opt(millis).single().expect("valid timestamp")
	}

	pub(crate) fn record(uuid: &str) -> PlayerRecord {
		PlayerRecord {
			uuid: uuid.to_owned(),
			name: uuid.to_owned(),
			playtime: 0,
			sessions: 0,
			kills: Kills::default(),
			deaths: 0,
			afk_time: 0,
			last_seen: at(0),
			join_date: at(0),
			rank: None,
			activity_score: None,
		}
	}

	#[test]
	fn absorb_keeps_extremes() {
		let mut a = PlayerRecord {
			playtime: 500,
			kills: Kills { mob: 3, player: 0 },
			last_seen: at(2_000),
			join_date: at(1_000),
			..record("a")
		};

		let b = PlayerRecord {
			playtime: 100,
			sessions: 7,
			kills: Kills { mob: 1, player: 4 },
			deaths: 2,
			last_seen: at(3_000),
			join_date: at(500),
			rank: Some(String::from("vip")),
			..record("a")
		};

		a.absorb(&b);

		assert_eq!(a.playtime, 500, "playtime should keep max");
		assert_eq!(a.sessions, 7, "sessions should keep max");
		assert_eq!(a.kills, Kills { mob: 3, player: 4 }, "kills should keep max per kind");
		assert_eq!(a.deaths, 2, "deaths should keep max");
		assert_eq!(a.last_seen, at(3_000), "last_seen should keep latest");
		assert_eq!(a.join_date, at(500), "join_date should keep earliest");
		assert_eq!(a.rank.as_deref(), Some("vip"), "rank should be filled in");
	}

	#[test]
	fn row_conversion_fills_gaps() {
		let row = PlayerRow {
			uuid: String::from("abc"),
			name: None,
			join_date: Some(1_000),
			last_seen: None,
			playtime: -5,
			sessions: 2,
			afk_time: 0,
			mob_kills: 1,
			player_kills: 0,
			deaths: 0,
			rank: Some(String::new()),
			activity_score: Some(f64::NAN),
		};

		let record = PlayerRecord::from(row);

		assert_eq!(record.name, UNKNOWN_NAME, "missing names get a placeholder");
		assert_eq!(record.playtime, 0, "negative counters clamp to zero");
		assert_eq!(record.last_seen, record.join_date, "last_seen falls back to join_date");
		assert!(record.rank.is_none(), "empty ranks are dropped");
		assert!(record.activity_score.is_none(), "non-finite scores are dropped");
	}
}
