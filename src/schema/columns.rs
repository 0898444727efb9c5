//! Per-table column resolution.
//!
//! Every logical field has a list of synonyms seen across PLAN versions; the first one that
//! exists in the table wins.

use crate::sqlx::column;

/// Synonyms for a player's UUID.
const UUID: &[&str] = &["uuid", "player_uuid"];

/// Synonyms for a player's display name.
const NAME: &[&str] = &["name", "player_name", "username"];

/// Synonyms for the registration date.
const REGISTERED: &[&str] = &["registered", "join_date", "first_join", "first_seen"];

/// Synonyms for a numeric player id.
const PLAYER_ID: &[&str] = &["id", "user_id"];

/// Columns that reference a player by UUID.
const UUID_REF: &[&str] = &["uuid", "user_uuid", "player_uuid"];

/// Columns that reference a player by numeric id.
const ID_REF: &[&str] = &["user_id", "player_id"];

/// Synonyms for a session's start timestamp.
const SESSION_START: &[&str] = &["session_start", "start", "started_at"];

/// Synonyms for a session's end timestamp.
const SESSION_END: &[&str] = &["session_end", "end", "ended_at"];

/// Synonyms for pre-aggregated playtime.
const PLAYTIME: &[&str] = &["playtime", "play_time", "total_playtime"];

/// Synonyms for a pre-aggregated session count.
const SESSION_COUNT: &[&str] = &["session_count", "sessions"];

/// Synonyms for the last activity timestamp.
const LAST_SEEN: &[&str] = &["last_seen", "last_login", "last_played"];

/// Synonyms for AFK time.
const AFK_TIME: &[&str] = &["afk_time", "afk"];

/// Synonyms for mob kills.
const MOB_KILLS: &[&str] = &["mob_kills", "mobkills"];

/// Synonyms for player kills.
const PLAYER_KILLS: &[&str] = &["player_kills", "pvp_kills"];

/// Synonyms for death counts.
const DEATHS: &[&str] = &["deaths", "death_count"];

/// Columns of a kill event naming the killer by UUID.
const KILLER_UUID: &[&str] = &["killer_uuid", "killer"];

/// Columns of a kill event naming the killer by numeric id.
const KILLER_ID: &[&str] = &["killer_id"];

/// Columns of a kill event naming the victim.
const VICTIM: &[&str] = &["victim_uuid", "victim"];

/// Synonyms for a permission group.
const GROUP: &[&str] = &["primary_group", "group", "rank"];

/// The first of `candidates` among `columns`, case-insensitively, spelled like the table does.
pub(super) fn find_column(columns: &[String], candidates: &[&str]) -> Option<String> {
	candidates.iter().find_map(|candidate| {
		columns
			.iter()
			.find(|column| column.eq_ignore_ascii_case(candidate))
			.cloned()
	})
}

/// The players table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayersMapping {
	/// Table name.
	pub table: String,

	/// UUID column.
	pub uuid: String,

	/// Name column.
	pub name: Option<String>,

	/// Registration date column (epoch milliseconds).
	pub registered: Option<String>,

	/// Numeric id column.
	pub id: Option<String>,
}

impl PlayersMapping {
	/// Resolves the players table; `None` if it has no UUID column.
	pub fn resolve(table: &str, columns: &[String]) -> Option<Self> {
		Some(Self {
			table: table.to_owned(),
			uuid: find_column(columns, UUID)?,
			name: find_column(columns, NAME),
			registered: find_column(columns, REGISTERED),
			id: find_column(columns, PLAYER_ID),
		})
	}

	/// The column other tables' [`PlayerRef`]s point at, qualified with `alias`.
	pub fn key(&self, alias: &str, player_ref: &PlayerRef) -> Option<String> {
		match player_ref {
			PlayerRef::Uuid(_) => Some(column(alias, &self.uuid)),
			PlayerRef::UserId(_) => self.id.as_deref().map(|id| column(alias, id)),
		}
	}
}

/// How a table points at a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRef {
	/// By UUID, through the given column.
	Uuid(String),

	/// By the players table's numeric id, through the given column.
	UserId(String),
}

impl PlayerRef {
	/// The referencing column.
	pub fn column(&self) -> &str {
		match self {
			Self::Uuid(column) | Self::UserId(column) => column,
		}
	}

	/// Resolves a player reference from `uuid_candidates`, then `id_candidates`.
	///
	/// Id references only count if the players table has an id to point at.
	fn resolve(
		columns: &[String],
		players: &PlayersMapping,
		uuid_candidates: &[&str],
		id_candidates: &[&str],
	) -> Option<Self> {
		find_column(columns, uuid_candidates).map(Self::Uuid).or_else(|| {
			players
				.id
				.as_ref()
				.and(find_column(columns, id_candidates))
				.map(Self::UserId)
		})
	}
}

/// The way session data is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLayout {
	/// One row per player with pre-aggregated totals.
	Summary,

	/// One row per session with start and end timestamps.
	Granular,

	/// Neither; no playtime can be derived.
	Unusable,
}

/// The sessions table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionsMapping {
	/// Table name.
	pub table: String,

	/// Link to the players table.
	pub player: PlayerRef,

	/// Session start (epoch milliseconds).
	pub start: Option<String>,

	/// Session end (epoch milliseconds).
	pub end: Option<String>,

	/// Total playtime (summary tables).
	pub playtime: Option<String>,

	/// Session count (summary tables).
	pub session_count: Option<String>,

	/// Last activity (summary tables).
	pub last_seen: Option<String>,

	/// AFK time in milliseconds.
	pub afk_time: Option<String>,

	/// Mob kills.
	pub mob_kills: Option<String>,

	/// Deaths.
	pub deaths: Option<String>,
}

impl SessionsMapping {
	/// Resolves the sessions table; `None` if it cannot be linked to players.
	pub fn resolve(table: &str, columns: &[String], players: &PlayersMapping) -> Option<Self> {
		Some(Self {
			table: table.to_owned(),
			player: PlayerRef::resolve(columns, players, UUID_REF, ID_REF)?,
			start: find_column(columns, SESSION_START),
			end: find_column(columns, SESSION_END),
			playtime: find_column(columns, PLAYTIME),
			session_count: find_column(columns, SESSION_COUNT),
			last_seen: find_column(columns, LAST_SEEN),
			afk_time: find_column(columns, AFK_TIME),
			mob_kills: find_column(columns, MOB_KILLS),
			deaths: find_column(columns, DEATHS),
		})
	}

	/// How the table stores sessions.
	pub const fn layout(&self) -> SessionLayout {
		if self.playtime.is_some() {
			SessionLayout::Summary
		} else if self.start.is_some() && self.end.is_some() {
			SessionLayout::Granular
		} else {
			SessionLayout::Unusable
		}
	}
}

/// The kills table.
///
/// Depending on the PLAN version this is either a log of kill events (`killer`) or a per-player
/// summary (`player` + counters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillsMapping {
	/// Table name.
	pub table: String,

	/// Killer of a kill event.
	pub killer: Option<PlayerRef>,

	/// Victim of a kill event.
	pub victim: Option<String>,

	/// Owner of a summary row.
	pub player: Option<PlayerRef>,

	/// Mob kills (summary tables).
	pub mob_kills: Option<String>,

	/// Player kills (summary tables).
	pub player_kills: Option<String>,
}

impl KillsMapping {
	/// Resolves the kills table; `None` if no row can be linked to a player.
	pub fn resolve(table: &str, columns: &[String], players: &PlayersMapping) -> Option<Self> {
		let killer = PlayerRef::resolve(columns, players, KILLER_UUID, KILLER_ID);
		let player = PlayerRef::resolve(columns, players, UUID, ID_REF);

		if killer.is_none() && player.is_none() {
			return None;
		}

		Some(Self {
			table: table.to_owned(),
			killer,
			victim: find_column(columns, VICTIM),
			player,
			mob_kills: find_column(columns, MOB_KILLS),
			player_kills: find_column(columns, PLAYER_KILLS),
		})
	}
}

/// A dedicated deaths table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathsMapping {
	/// Table name.
	pub table: String,

	/// Link to the players table.
	pub player: PlayerRef,

	/// Death counter; without one, every row is a single death.
	pub count: Option<String>,
}

impl DeathsMapping {
	/// Resolves the deaths table; `None` if it cannot be linked to players.
	pub fn resolve(table: &str, columns: &[String], players: &PlayersMapping) -> Option<Self> {
		Some(Self {
			table: table.to_owned(),
			player: PlayerRef::resolve(columns, players, UUID_REF, ID_REF)?,
			count: find_column(columns, DEATHS).or_else(|| find_column(columns, &["count"])),
		})
	}
}

/// A table mapping players to their permission group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupsMapping {
	/// Table name.
	pub table: String,

	/// UUID column.
	pub uuid: String,

	/// Group column.
	pub group: String,
}

impl GroupsMapping {
	/// Resolves the groups table; `None` unless both columns exist.
	pub fn resolve(table: &str, columns: &[String]) -> Option<Self> {
		Some(Self {
			table: table.to_owned(),
			uuid: find_column(columns, UUID)?,
			group: find_column(columns, GROUP)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::{find_column, PlayerRef, PlayersMapping, SessionLayout, SessionsMapping};

	fn names(columns: &[&str]) -> Vec<String> {
		columns.iter().map(|&column| column.to_owned()).collect()
	}

	fn players(columns: &[&str]) -> PlayersMapping {
		PlayersMapping::resolve("players", &names(columns)).expect("players should resolve")
	}

	#[test]
	fn synonyms_in_priority_order() {
		let columns = names(&["Player_Name", "name"]);

		assert_eq!(find_column(&columns, &["name", "player_name"]).as_deref(), Some("name"), "first synonym wins");
		assert_eq!(find_column(&columns, &["player_name"]).as_deref(), Some("Player_Name"), "case-insensitive");
		assert_eq!(find_column(&columns, &["username"]), None, "absent");
	}

	#[test]
	fn id_reference_needs_players_id() {
		let columns = names(&["user_id", "session_start", "session_end"]);

		assert!(
			SessionsMapping::resolve("sessions", &columns, &players(&["uuid", "name"])).is_none(),
			"players without id cannot be joined by user_id",
		);

		let sessions = SessionsMapping::resolve("sessions", &columns, &players(&["id", "uuid"]))
			.expect("should resolve with players.id");

		assert_eq!(sessions.player, PlayerRef::UserId(String::from("user_id")), "id reference");
	}

	#[test]
	fn layouts() {
		let players = players(&["uuid"]);
		let layout = |columns: &[&str]| {
			SessionsMapping::resolve("sessions", &names(columns), &players)
				.expect("should resolve")
				.layout()
		};

		assert_eq!(layout(&["uuid", "playtime", "session_count"]), SessionLayout::Summary, "summary");
		assert_eq!(layout(&["uuid", "session_start", "session_end"]), SessionLayout::Granular, "granular");
		assert_eq!(layout(&["uuid", "session_start", "mob_kills"]), SessionLayout::Unusable, "no end");
	}
}
