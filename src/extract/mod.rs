//! Extraction of the leaderboards from a snapshot.
//!
//! Every leaderboard is a single aggregate query built from the [`SchemaMapping`]. The queries
//! are independent of each other and run concurrently; one failing only empties its own
//! leaderboard.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::bans::BanList;
use crate::config::{ActivityWeights, Limits};
use crate::leaderboards::{Leaderboard, LeaderboardSnapshot};
use crate::players::{PlayerRecord, PlayerRow};
use crate::schema::{self, PlayerRef, PlayersMapping, SchemaMapping, SessionLayout};
use crate::sqlx::{column, quote_ident, FilteredQuery};

mod most_active;
pub use most_active::Strategy as ActivityStrategy;

mod top_killers;
mod most_deaths;

/// Alias of the players table in every query.
const PLAYERS: &str = "p";

/// Alias of the groups table in every query.
const GROUPS: &str = "g";

/// Errors of a single leaderboard query.
#[derive(Debug, Error)]
pub enum Error {
	/// The query was rejected or failed while running.
	#[error("query failed: {0}")]
	Query(#[from] sqlx::Error),
}

/// Everything a query needs besides the schema.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
	/// Players to leave out.
	pub bans: &'a BanList,

	/// Leaderboard sizes.
	pub limits: Limits,

	/// Activity score constants.
	pub weights: ActivityWeights,

	/// Reference point for "recent" activity; also becomes `lastUpdated`.
	pub now: DateTime<Utc>,
}

impl Params<'_> {
	/// The configured size of `leaderboard`, as a SQL `LIMIT`.
	fn limit(&self, leaderboard: Leaderboard) -> i64 {
		i64::from(match leaderboard {
			Leaderboard::MostActive => self.limits.most_active,
			Leaderboard::TopKillers => self.limits.top_killers,
			Leaderboard::MostDeaths => self.limits.most_deaths,
		})
	}
}

/// Detects the snapshot's schema and extracts all leaderboards.
///
/// This never fails; an unknown schema results in empty leaderboards.
#[tracing::instrument(skip_all)]
pub async fn run(pool: &SqlitePool, params: &Params<'_>) -> LeaderboardSnapshot {
	match schema::inspect(pool).await {
		Ok(Some(mapping)) => leaderboards(pool, &mapping, params).await,
		Ok(None) => {
			tracing::warn!("unrecognized snapshot; writing empty leaderboards");
			LeaderboardSnapshot::empty(params.now)
		},
		Err(error) => {
			tracing::error!(%error, "failed to inspect snapshot; writing empty leaderboards");
			LeaderboardSnapshot::empty(params.now)
		},
	}
}

/// Runs the three leaderboard queries concurrently.
#[tracing::instrument(skip_all, fields(scheme = mapping.scheme))]
pub async fn leaderboards(
	pool: &SqlitePool,
	mapping: &SchemaMapping,
	params: &Params<'_>,
) -> LeaderboardSnapshot {
	let (most_active, top_killers, most_deaths) = tokio::join!(
		most_active::fetch(pool, mapping, params),
		top_killers::fetch(pool, mapping, params),
		most_deaths::fetch(pool, mapping, params),
	);

	LeaderboardSnapshot {
		most_active: settle(Leaderboard::MostActive, most_active),
		top_killers: settle(Leaderboard::TopKillers, top_killers),
		most_deaths: settle(Leaderboard::MostDeaths, most_deaths),
		last_updated: params.now,
	}
}

/// Turns a query result into a leaderboard, emptying it on failure.
fn settle(leaderboard: Leaderboard, result: Result<Vec<PlayerRecord>, Error>) -> Vec<PlayerRecord> {
	match result {
		Ok(records) => {
			tracing::info!(%leaderboard, count = records.len(), "extracted leaderboard");
			records
		},
		Err(error) => {
			tracing::error!(%leaderboard, %error, "leaderboard query failed; leaving it empty");
			Vec::new()
		},
	}
}

/// Executes a finished query.
async fn fetch_records(
	pool: &SqlitePool,
	mut query: FilteredQuery<'_>,
) -> Result<Vec<PlayerRecord>, Error> {
	tracing::debug!(sql = query.sql(), "running query");

	let rows = query
		.build_query_as::<PlayerRow>()
		.fetch_all(pool)
		.await?;

	Ok(rows.into_iter().map(PlayerRecord::from).collect())
}

/// `uuid`, `name`, `join_date` and `rank` of the current player.
fn identity_columns(mapping: &SchemaMapping) -> String {
	let players = &mapping.players;
	let name = players
		.name
		.as_deref()
		.map_or_else(|| String::from("NULL"), |name| column(PLAYERS, name));
	let join_date = players.registered.as_deref().map_or_else(
		|| String::from("NULL"),
		|registered| format!("CAST({} AS INTEGER)", column(PLAYERS, registered)),
	);
	let rank = mapping
		.groups
		.as_ref()
		.map_or_else(|| String::from("NULL"), |groups| column(GROUPS, &groups.group));

	format!(
		"{} AS uuid, {name} AS name, {join_date} AS join_date, {rank} AS rank",
		column(PLAYERS, &players.uuid),
	)
}

/// `FROM` the players table, with the groups table joined on if there is one.
fn from_players(mapping: &SchemaMapping) -> String {
	let mut sql = format!(" FROM {} {PLAYERS}", quote_ident(&mapping.players.table));

	if let Some(groups) = &mapping.groups {
		sql.push_str(&format!(
			" LEFT JOIN {} {GROUPS} ON lower({}) = lower({})",
			quote_ident(&groups.table),
			column(GROUPS, &groups.uuid),
			column(PLAYERS, &mapping.players.uuid),
		));
	}

	sql
}

/// Leaves players without a uuid and banned players out of `query`.
fn filter_players(query: &mut FilteredQuery<'_>, mapping: &SchemaMapping, bans: &BanList) {
	let uuid = column(PLAYERS, &mapping.players.uuid);

	query
		.filter_raw(&format!("{uuid} IS NOT NULL AND trim({uuid}) <> ''"))
		.filter_not_in(&format!("lower({uuid})"), bans.iter().map(ToOwned::to_owned));
}

/// `GROUP BY` the current player.
fn group_by_player(mapping: &SchemaMapping) -> String {
	format!(" GROUP BY {}", column(PLAYERS, &mapping.players.uuid))
}

/// A per-player total computed from some table.
///
/// Renders as a subquery yielding `(player, total)` rows, joined onto the players table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tally {
	/// The subquery.
	sql: String,

	/// The players column `player` is compared against.
	key: String,
}

/// What a [`Tally`] adds up.
#[derive(Debug, Clone, Copy)]
enum TallyOf<'a> {
	/// The sum of a column.
	Sum(&'a str),

	/// The number of rows.
	Rows,

	/// The largest value of a column.
	Latest(&'a str),
}

impl Tally {
	/// Alias of the tallied table inside the subquery.
	const SOURCE: &'static str = "src";

	/// Builds a tally over `table`, linked to players through `player`.
	///
	/// `None` if `player` cannot be matched against the players table.
	fn new(
		players: &PlayersMapping,
		table: &str,
		player: &PlayerRef,
		of: TallyOf<'_>,
	) -> Option<Self> {
		let key = players.key(PLAYERS, player)?;
		let player_column = column(Self::SOURCE, player.column());
		let total = match of {
			TallyOf::Sum(value) => format!("SUM({})", column(Self::SOURCE, value)),
			TallyOf::Rows => String::from("COUNT(*)"),
			TallyOf::Latest(value) => format!("MAX({})", column(Self::SOURCE, value)),
		};

		let sql = format!(
			"SELECT {player_column} AS player, {total} AS total \
			 FROM {table} {source} \
			 WHERE {player_column} IS NOT NULL \
			 GROUP BY {player_column}",
			table = quote_ident(table),
			source = Self::SOURCE,
		);

		Some(Self { sql, key })
	}

	/// `LEFT JOIN`s this tally as `alias`.
	fn join(&self, alias: &str) -> String {
		format!(" LEFT JOIN ({}) {alias} ON {alias}.player = {}", self.sql, self.key)
	}

	/// The tallied total for the current player, `0` if there is none.
	fn total(alias: &str) -> String {
		format!("COALESCE({alias}.total, 0)")
	}
}

/// When each player was last online, as far as the sessions table knows.
fn last_seen_tally(mapping: &SchemaMapping) -> Option<Tally> {
	let sessions = mapping.sessions.as_ref()?;
	let latest = match sessions.layout() {
		SessionLayout::Granular => sessions.end.as_deref(),
		SessionLayout::Summary | SessionLayout::Unusable => sessions.last_seen.as_deref(),
	}?;

	Tally::new(&mapping.players, &sessions.table, &sessions.player, TallyOf::Latest(latest))
}

/// The `last_seen` column for queries joining `tally` as `alias`.
fn last_seen_column(tally: Option<&Tally>, alias: &str) -> String {
	tally.map_or_else(
		|| String::from("NULL"),
		|_| format!("CAST({alias}.total AS INTEGER)"),
	)
}
