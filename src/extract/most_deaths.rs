//! The "Most Deaths" leaderboard.

use sqlx::SqlitePool;

use super::{
	fetch_records,
	filter_players,
	from_players,
	group_by_player,
	identity_columns,
	last_seen_column,
	last_seen_tally,
	Error,
	Params,
	Tally,
	TallyOf,
};
use crate::leaderboards::Leaderboard;
use crate::players::PlayerRecord;
use crate::schema::SchemaMapping;
use crate::sqlx::FilteredQuery;

/// Alias of the death tally.
const DEATHS: &str = "d";

/// Alias of the last-seen tally.
const LAST_SEEN: &str = "ls";

/// Deaths per player.
///
/// A dedicated deaths table wins over the per-session counter. Kill victims are never counted;
/// the kill log only covers PvP.
fn deaths(mapping: &SchemaMapping) -> Option<Tally> {
	let from_table = mapping.deaths.as_ref().and_then(|deaths| {
		let of = deaths.count.as_deref().map_or(TallyOf::Rows, TallyOf::Sum);
		Tally::new(&mapping.players, &deaths.table, &deaths.player, of)
	});

	from_table.or_else(|| {
		let sessions = mapping.sessions.as_ref()?;
		Tally::new(
			&mapping.players,
			&sessions.table,
			&sessions.player,
			TallyOf::Sum(sessions.deaths.as_deref()?),
		)
	})
}

/// Fetches the "Most Deaths" leaderboard.
#[tracing::instrument(level = "debug", skip_all, err(Display))]
pub(super) async fn fetch(
	pool: &SqlitePool,
	mapping: &SchemaMapping,
	params: &Params<'_>,
) -> Result<Vec<PlayerRecord>, Error> {
	let Some(deaths) = deaths(mapping) else {
		tracing::warn!("snapshot has no death data");
		return Ok(Vec::new());
	};

	let last_seen = last_seen_tally(mapping);
	let total = Tally::total(DEATHS);

	let mut sql = format!(
		"SELECT {identity}, \
		 {last_seen_column} AS last_seen, \
		 CAST(0 AS INTEGER) AS playtime, \
		 CAST(0 AS INTEGER) AS sessions, \
		 CAST(0 AS INTEGER) AS afk_time, \
		 CAST(0 AS INTEGER) AS mob_kills, \
		 CAST(0 AS INTEGER) AS player_kills, \
		 CAST({total} AS INTEGER) AS deaths, \
		 CAST(NULL AS REAL) AS activity_score\
		 {from}{join}",
		identity = identity_columns(mapping),
		last_seen_column = last_seen_column(last_seen.as_ref(), LAST_SEEN),
		from = from_players(mapping),
		join = deaths.join(DEATHS),
	);

	if let Some(last_seen) = &last_seen {
		sql.push_str(&last_seen.join(LAST_SEEN));
	}

	let mut query = FilteredQuery::new(sql);

	query.filter_raw(&format!("{total} > 0"));
	filter_players(&mut query, mapping, params.bans);

	query
		.push(group_by_player(mapping))
		.push(format!(" ORDER BY {total} DESC, join_date DESC LIMIT "))
		.push_bind(params.limit(Leaderboard::MostDeaths));

	fetch_records(pool, query).await
}
