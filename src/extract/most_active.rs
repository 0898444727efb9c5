//! The "Most Active" leaderboard.

use sqlx::SqlitePool;

use super::{
	fetch_records,
	filter_players,
	from_players,
	group_by_player,
	identity_columns,
	Error,
	Params,
	PLAYERS,
};
use crate::leaderboards::Leaderboard;
use crate::players::PlayerRecord;
use crate::schema::{SchemaMapping, SessionLayout, SessionsMapping};
use crate::sqlx::{column, quote_ident, FilteredQuery};

/// Alias of the sessions table.
const SESSIONS: &str = "s";

/// How activity is measured for a given snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'a> {
	/// Pre-aggregated playtime per player; ranked by playtime.
	Summary(&'a SessionsMapping),

	/// Individual sessions; ranked by the weighted activity score.
	Weighted(&'a SessionsMapping),

	/// No activity data at all; registered players, newest first.
	PlayersOnly,
}

impl<'a> Strategy<'a> {
	/// Picks the best strategy the snapshot supports.
	pub fn choose(mapping: &'a SchemaMapping) -> Self {
		match mapping.sessions.as_ref() {
			Some(sessions) => match sessions.layout() {
				SessionLayout::Summary => Self::Summary(sessions),
				SessionLayout::Granular => Self::Weighted(sessions),
				SessionLayout::Unusable => Self::PlayersOnly,
			},
			None => Self::PlayersOnly,
		}
	}
}

/// Fetches the "Most Active" leaderboard.
#[tracing::instrument(level = "debug", skip_all, err(Display))]
pub(super) async fn fetch(
	pool: &SqlitePool,
	mapping: &SchemaMapping,
	params: &Params<'_>,
) -> Result<Vec<PlayerRecord>, Error> {
	let strategy = Strategy::choose(mapping);

	if strategy == Strategy::PlayersOnly {
		tracing::warn!("no usable session data; listing registered players instead");
	} else {
		tracing::debug!(?strategy, "measuring activity");
	}

	let query = match strategy {
		Strategy::Summary(sessions) => summary(mapping, sessions, params),
		Strategy::Weighted(sessions) => weighted(mapping, sessions, params),
		Strategy::PlayersOnly => players_only(mapping, params),
	};

	fetch_records(pool, query).await
}

/// `SUM(column)` over the sessions of the current player, `0` if there is no such column.
fn sum_of(column_name: Option<&str>) -> String {
	column_name.map_or_else(
		|| String::from("CAST(0 AS INTEGER)"),
		|name| format!("CAST(COALESCE(SUM({}), 0) AS INTEGER)", column(SESSIONS, name)),
	)
}

/// `JOIN` the sessions table onto the players table.
fn join_sessions(mapping: &SchemaMapping, sessions: &SessionsMapping) -> String {
	let key = mapping
		.players
		.key(PLAYERS, &sessions.player)
		.unwrap_or_else(|| column(PLAYERS, &mapping.players.uuid));

	format!(
		" JOIN {} {SESSIONS} ON {} = {key}",
		quote_ident(&sessions.table),
		column(SESSIONS, sessions.player.column()),
	)
}

/// Ranks players by pre-aggregated playtime.
fn summary<'q>(
	mapping: &SchemaMapping,
	sessions: &SessionsMapping,
	params: &Params<'_>,
) -> FilteredQuery<'q> {
	let playtime = sum_of(sessions.playtime.as_deref());
	let last_seen = sessions.last_seen.as_deref().map_or_else(
		|| String::from("NULL"),
		|last_seen| format!("CAST(MAX({}) AS INTEGER)", column(SESSIONS, last_seen)),
	);

	let mut query = FilteredQuery::new(format!(
		"SELECT {identity}, \
		 {last_seen} AS last_seen, \
		 {playtime} AS playtime, \
		 {sessions_count} AS sessions, \
		 {afk_time} AS afk_time, \
		 {mob_kills} AS mob_kills, \
		 CAST(0 AS INTEGER) AS player_kills, \
		 {deaths} AS deaths, \
		 CAST(NULL AS REAL) AS activity_score\
		 {from}{join}",
		identity = identity_columns(mapping),
		sessions_count = sum_of(sessions.session_count.as_deref()),
		afk_time = sum_of(sessions.afk_time.as_deref()),
		mob_kills = sum_of(sessions.mob_kills.as_deref()),
		deaths = sum_of(sessions.deaths.as_deref()),
		from = from_players(mapping),
		join = join_sessions(mapping, sessions),
	));

	filter_players(&mut query, mapping, params.bans);

	query
		.push(group_by_player(mapping))
		.push(format!(" HAVING {playtime} > 0"))
		.push(" ORDER BY playtime DESC, join_date DESC LIMIT ")
		.push_bind(params.limit(Leaderboard::MostActive));

	query
}

/// Ranks players by the weighted activity score.
///
/// Active time is session length minus AFK time. "Recent" sessions started within the
/// configured window before `now`.
fn weighted<'q>(
	mapping: &SchemaMapping,
	sessions: &SessionsMapping,
	params: &Params<'_>,
) -> FilteredQuery<'q> {
	// `layout()` guarantees both for `Strategy::Weighted`
	let start = column(SESSIONS, sessions.start.as_deref().unwrap_or("session_start"));
	let end = column(SESSIONS, sessions.end.as_deref().unwrap_or("session_end"));
	let afk = sessions.afk_time.as_deref().map_or_else(
		|| String::from("0"),
		|afk| format!("COALESCE({}, 0)", column(SESSIONS, afk)),
	);

	let active = format!("MAX({end} - {start} - {afk}, 0)");
	let weights = params.weights;
	let cutoff = recent_cutoff(params);

	let mut query = FilteredQuery::new(format!(
		"SELECT {identity}, \
		 CAST(MAX({end}) AS INTEGER) AS last_seen, \
		 CAST(COALESCE(SUM({end} - {start}), 0) AS INTEGER) AS playtime, \
		 CAST(COUNT(*) AS INTEGER) AS sessions, \
		 {afk_time} AS afk_time, \
		 {mob_kills} AS mob_kills, \
		 CAST(0 AS INTEGER) AS player_kills, \
		 {deaths} AS deaths, \
		 CAST(",
		identity = identity_columns(mapping),
		afk_time = sum_of(sessions.afk_time.as_deref()),
		mob_kills = sum_of(sessions.mob_kills.as_deref()),
		deaths = sum_of(sessions.deaths.as_deref()),
	));

	query
		// recent active time
		.push_bind(weights.recent)
		.push(format!(" * (COALESCE(SUM(CASE WHEN {start} >= "))
		.push_bind(cutoff)
		.push(format!(" THEN {active} ELSE 0 END), 0) / "))
		.push_bind(weights.recent_unit_millis())
		// lifetime active time
		.push(") + ")
		.push_bind(weights.lifetime)
		.push(format!(" * (COALESCE(SUM({active}), 0) / "))
		.push_bind(weights.lifetime_unit_millis())
		// session frequency
		.push(") + ")
		.push_bind(weights.sessions)
		.push(" * (COUNT(*) * ")
		.push_bind(weights.session_bonus)
		// distinct active days
		.push(") + ")
		.push_bind(weights.days)
		.push(format!(" * (COUNT(DISTINCT CASE WHEN {start} >= "))
		.push_bind(cutoff)
		.push(format!(" THEN date({start} / 1000, 'unixepoch') END) * "))
		.push_bind(weights.day_bonus)
		.push(") AS REAL) AS activity_score")
		.push(from_players(mapping))
		.push(join_sessions(mapping, sessions));

	filter_players(&mut query, mapping, params.bans);

	query
		.push(group_by_player(mapping))
		.push(" ORDER BY activity_score DESC, join_date DESC LIMIT ")
		.push_bind(params.limit(Leaderboard::MostActive));

	query
}

/// Lists registered players, newest first, without any stats.
fn players_only<'q>(mapping: &SchemaMapping, params: &Params<'_>) -> FilteredQuery<'q> {
	let mut query = FilteredQuery::new(format!(
		"SELECT {identity}, \
		 NULL AS last_seen, \
		 CAST(0 AS INTEGER) AS playtime, \
		 CAST(0 AS INTEGER) AS sessions, \
		 CAST(0 AS INTEGER) AS afk_time, \
		 CAST(0 AS INTEGER) AS mob_kills, \
		 CAST(0 AS INTEGER) AS player_kills, \
		 CAST(0 AS INTEGER) AS deaths, \
		 CAST(NULL AS REAL) AS activity_score\
		 {from}",
		identity = identity_columns(mapping),
		from = from_players(mapping),
	));

	filter_players(&mut query, mapping, params.bans);

	query
		.push(group_by_player(mapping))
		.push(" ORDER BY join_date DESC LIMIT ")
		.push_bind(params.limit(Leaderboard::MostActive));

	query
}

/// Start of the recency window, in epoch milliseconds.
fn recent_cutoff(params: &Params<'_>) -> i64 {
	let window = params.weights.recent_window();
	let window = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

	params.now.timestamp_millis().saturating_sub(window)
}
