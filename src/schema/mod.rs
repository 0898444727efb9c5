//! Detection of the PLAN database layout.
//!
//! PLAN has changed its table names and columns several times over its history, and servers
//! upgrade whenever they feel like it. Instead of validating the snapshot against one schema, we
//! keep an ordered list of known [`Scheme`]s, pick the first one whose players table exists, and
//! then map every logical field we care about to whatever column the snapshot actually has.
//!
//! Nothing in here fails because something is missing. Missing tables and columns disable the
//! parts of the extraction that need them, and that is logged.

use std::collections::HashMap;

use sqlx::SqlitePool;
use thiserror::Error;

mod columns;
pub use columns::{
	DeathsMapping,
	GroupsMapping,
	KillsMapping,
	PlayerRef,
	PlayersMapping,
	SessionLayout,
	SessionsMapping,
};

/// A known table naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheme {
	/// Name used in logs.
	pub name: &'static str,

	/// Candidates for the players table. The scheme is present if any of them is.
	pub players: &'static [&'static str],

	/// Candidates for the sessions table.
	pub sessions: &'static [&'static str],

	/// Candidates for the kills table.
	pub kills: &'static [&'static str],

	/// Candidates for a dedicated deaths table.
	pub deaths: &'static [&'static str],

	/// Candidates for a table mapping players to permission groups.
	pub groups: &'static [&'static str],
}

/// Permission plugins that store a primary group per player.
const GROUP_TABLES: &[&str] = &["luckperms_players"];

/// Every known scheme, highest priority first.
pub static SCHEMES: &[Scheme] = &[
	Scheme {
		name: "plan-v5",
		players: &["plan_users"],
		sessions: &["plan_sessions"],
		kills: &["plan_kills"],
		deaths: &[],
		groups: GROUP_TABLES,
	},
	Scheme {
		name: "plan-legacy",
		players: &["plan_players"],
		sessions: &["plan_sessions_summary", "plan_sessions"],
		kills: &["plan_kills"],
		deaths: &["plan_deaths"],
		groups: GROUP_TABLES,
	},
	Scheme {
		name: "unprefixed",
		players: &["users", "players"],
		sessions: &["sessions"],
		kills: &["kills"],
		deaths: &["deaths"],
		groups: GROUP_TABLES,
	},
];

/// The tables of a [`Scheme`] that exist in a snapshot, spelled the way the snapshot spells them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedTables {
	/// The scheme these tables belong to.
	pub scheme: &'static str,

	/// The players table.
	pub players: String,

	/// The sessions table, if any.
	pub sessions: Option<String>,

	/// The kills table, if any.
	pub kills: Option<String>,

	/// The deaths table, if any.
	pub deaths: Option<String>,

	/// The groups table, if any.
	pub groups: Option<String>,
}

impl Scheme {
	/// Whether this scheme's players table is among `tables`.
	pub fn is_present(&self, tables: &[String]) -> bool {
		find_table(tables, self.players).is_some()
	}

	/// Resolves this scheme's tables against `tables`, keeping only the ones that exist.
	pub fn resolve(&self, tables: &[String]) -> Option<DetectedTables> {
		Some(DetectedTables {
			scheme: self.name,
			players: find_table(tables, self.players)?,
			sessions: find_table(tables, self.sessions),
			kills: find_table(tables, self.kills),
			deaths: find_table(tables, self.deaths),
			groups: find_table(tables, self.groups),
		})
	}
}

/// Picks the first known scheme present in `tables`.
pub fn detect_tables(tables: &[String]) -> Option<DetectedTables> {
	SCHEMES
		.iter()
		.find(|scheme| scheme.is_present(tables))
		.and_then(|scheme| scheme.resolve(tables))
}

/// The first of `candidates` that exists, case-insensitively.
fn find_table(tables: &[String], candidates: &[&str]) -> Option<String> {
	candidates.iter().find_map(|candidate| {
		tables
			.iter()
			.find(|table| table.eq_ignore_ascii_case(candidate))
			.cloned()
	})
}

/// Where every logical table and field lives in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMapping {
	/// The name of the detected [`Scheme`].
	pub scheme: &'static str,

	/// The players table.
	pub players: PlayersMapping,

	/// The sessions table.
	pub sessions: Option<SessionsMapping>,

	/// The kills table.
	pub kills: Option<KillsMapping>,

	/// The deaths table.
	pub deaths: Option<DeathsMapping>,

	/// The groups table.
	pub groups: Option<GroupsMapping>,
}

impl SchemaMapping {
	/// Builds a mapping from detected tables and the columns of each table.
	///
	/// Returns `None` if the players table has no usable UUID column.
	pub fn resolve(tables: &DetectedTables, columns: &HashMap<String, Vec<String>>) -> Option<Self> {
		let columns_of = |table: &str| columns.get(table).map(Vec::as_slice).unwrap_or_default();

		let Some(players) = PlayersMapping::resolve(&tables.players, columns_of(&tables.players))
		else {
			tracing::warn!(table = %tables.players, "players table has no uuid column");
			return None;
		};

		let sessions = tables.sessions.as_deref().and_then(|table| {
			let mapping = SessionsMapping::resolve(table, columns_of(table), &players);

			if mapping.is_none() {
				tracing::warn!(table, "sessions table cannot be linked to players; ignoring it");
			}

			mapping
		});

		let kills = tables.kills.as_deref().and_then(|table| {
			let mapping = KillsMapping::resolve(table, columns_of(table), &players);

			if mapping.is_none() {
				tracing::warn!(table, "kills table cannot be linked to players; ignoring it");
			}

			mapping
		});

		let deaths = tables.deaths.as_deref().and_then(|table| {
			let mapping = DeathsMapping::resolve(table, columns_of(table), &players);

			if mapping.is_none() {
				tracing::warn!(table, "deaths table cannot be linked to players; ignoring it");
			}

			mapping
		});

		let groups = tables
			.groups
			.as_deref()
			.and_then(|table| GroupsMapping::resolve(table, columns_of(table)));

		Some(Self { scheme: tables.scheme, players, sessions, kills, deaths, groups })
	}
}

/// Errors that can occur while inspecting a snapshot.
#[derive(Debug, Error)]
pub enum Error {
	/// The snapshot's catalog could not be read.
	#[error("failed to read snapshot catalog: {0}")]
	Catalog(#[from] sqlx::Error),
}

/// Inspects a snapshot and works out its [`SchemaMapping`].
///
/// `Ok(None)` means the snapshot does not look like any known PLAN database.
#[tracing::instrument(skip(pool), err(Debug))]
pub async fn inspect(pool: &SqlitePool) -> Result<Option<SchemaMapping>, Error> {
	let tables = crate::sqlx::list_tables(pool).await?;

	tracing::debug!(?tables, "found tables");

	let Some(detected) = detect_tables(&tables) else {
		tracing::warn!(?tables, "no known PLAN table scheme found");
		return Ok(None);
	};

	tracing::info!(scheme = detected.scheme, players = %detected.players, "detected table scheme");

	let mut columns = HashMap::new();

	for table in [
		Some(&detected.players),
		detected.sessions.as_ref(),
		detected.kills.as_ref(),
		detected.deaths.as_ref(),
		detected.groups.as_ref(),
	]
	.into_iter()
	.flatten()
	{
		let table_columns = crate::sqlx::list_columns(pool, table).await?;
		tracing::debug!(table, columns = ?table_columns, "found columns");
		columns.insert(table.clone(), table_columns);
	}

	let mapping = SchemaMapping::resolve(&detected, &columns);

	if let Some(mapping) = &mapping {
		tracing::info!(?mapping, "resolved schema");
	}

	Ok(mapping)
}
