//! The "Top Killers" leaderboard.

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

/// Alias of the mob kill tally.
const MOB_KILLS: &str = "mk";

/// Alias of the player kill tally.
const PLAYER_KILLS: &str = "pk";

/// Alias of the last-seen tally.
const LAST_SEEN: &str = "ls";

/// Mob kills per player.
///
/// Session rows carry them in PLAN v5; older versions keep a per-player kills summary.
fn mob_kills(mapping: &SchemaMapping) -> Option<Tally> {
	let from_sessions = mapping.sessions.as_ref().and_then(|sessions| {
		let mob_kills = sessions.mob_kills.as_deref()?;
		Tally::new(&mapping.players, &sessions.table, &sessions.player, TallyOf::Sum(mob_kills))
	});

	from_sessions.or_else(|| {
		let kills = mapping.kills.as_ref()?;
		Tally::new(
			&mapping.players,
			&kills.table,
			kills.player.as_ref()?,
			TallyOf::Sum(kills.mob_kills.as_deref()?),
		)
	})
}

/// Player kills per player.
///
/// One row per kill event if the table names a killer, a per-player counter otherwise.
fn player_kills(mapping: &SchemaMapping) -> Option<Tally> {
	let kills = mapping.kills.as_ref()?;

	if let Some(killer) = &kills.killer {
		return Tally::new(&mapping.players, &kills.table, killer, TallyOf::Rows);
	}

	Tally::new(
		&mapping.players,
		&kills.table,
		kills.player.as_ref()?,
		TallyOf::Sum(kills.player_kills.as_deref()?),
	)
}

/// Fetches the "Top Killers" leaderboard.
#[tracing::instrument(level = "debug", skip_all, err(Display))]
pub(super) async fn fetch(
	pool: &SqlitePool,
	mapping: &SchemaMapping,
	params: &Params<'_>,
) -> Result<Vec<PlayerRecord>, Error> {
	let mob_kills = mob_kills(mapping);
	let player_kills = player_kills(mapping);

	if mob_kills.is_none() && player_kills.is_none() {
		tracing::warn!("snapshot has no kill data");
		return Ok(Vec::new());
	}

	fetch_records(pool, query(mapping, mob_kills, player_kills, params)).await
}

/// Ranks players by mob kills plus player kills.
fn query<'q>(
	mapping: &SchemaMapping,
	mob_kills: Option<Tally>,
	player_kills: Option<Tally>,
	params: &Params<'_>,
) -> FilteredQuery<'q> {
	let last_seen = last_seen_tally(mapping);
	let total = |tally: Option<&Tally>, alias| {
		tally.map_or_else(|| String::from("0"), |_| Tally::total(alias))
	};

	let mob = total(mob_kills.as_ref(), MOB_KILLS);
	let pvp = total(player_kills.as_ref(), PLAYER_KILLS);

	let mut sql = format!(
		"SELECT {identity}, \
		 {last_seen_column} AS last_seen, \
		 CAST(0 AS INTEGER) AS playtime, \
		 CAST(0 AS INTEGER) AS sessions, \
		 CAST(0 AS INTEGER) AS afk_time, \
		 CAST({mob} AS INTEGER) AS mob_kills, \
		 CAST({pvp} AS INTEGER) AS player_kills, \
		 CAST(0 AS INTEGER) AS deaths, \
		 CAST(NULL AS REAL) AS activity_score\
		 {from}",
		identity = identity_columns(mapping),
		last_seen_column = last_seen_column(last_seen.as_ref(), LAST_SEEN),
		from = from_players(mapping),
	);

	for (tally, alias) in [(&mob_kills, MOB_KILLS), (&player_kills, PLAYER_KILLS), (&last_seen, LAST_SEEN)] {
		if let Some(tally) = tally {
			sql.push_str(&tally.join(alias));
		}
	}

	let mut query = FilteredQuery::new(sql);

	query.filter_raw(&format!("{mob} + {pvp} > 0"));
	filter_players(&mut query, mapping, params.bans);

	query
		.push(group_by_player(mapping))
		.push(format!(" ORDER BY {mob} + {pvp} DESC, join_date DESC LIMIT "))
		.push_bind(params.limit(Leaderboard::TopKillers));

	query
}

#[cfg(test)]
mod tests {
	use crate::bans::BanList;
	use crate::extract::tests::{params, uuids, DAY, HOUR, NOW, V5_PLAYERS};
	use crate::extract::leaderboards;
	use crate::leaderboards::Leaderboard;
	use crate::schema;
	use crate::sqlx::tests::memory_pool;

	/// Sessions referencing players by UUID, without a deaths column, plus a kill log.
	fn snapshot() -> String {
		let start = NOW - DAY;

		format!(
			"{V5_PLAYERS}
			CREATE TABLE plan_sessions (
				uuid TEXT NOT NULL,
				session_start INTEGER NOT NULL,
				session_end INTEGER NOT NULL,
				afk_time INTEGER NOT NULL,
				mob_kills INTEGER NOT NULL
			);
			INSERT INTO plan_sessions VALUES
				('00000000-0000-0000-0000-000000000001', {start}, {start} + {HOUR}, 0, 10),
				('00000000-0000-0000-0000-000000000001', {start} + 2 * {HOUR}, {start} + 3 * {HOUR}, 0, 5),
				('00000000-0000-0000-0000-000000000002', {start}, {start} + {HOUR}, 0, 2),
				('00000000-0000-0000-0000-000000000003', {start}, {start} + 4 * {HOUR}, 0, 0);
			CREATE TABLE plan_kills (
				killer_uuid TEXT NOT NULL,
				victim_uuid TEXT NOT NULL,
				weapon TEXT NOT NULL,
				date INTEGER NOT NULL
			);
			INSERT INTO plan_kills VALUES
				('00000000-0000-0000-0000-000000000002', '00000000-0000-0000-0000-000000000001', 'bow', {start}),
				('00000000-0000-0000-0000-000000000002', '00000000-0000-0000-0000-000000000001', 'bow', {start}),
				('00000000-0000-0000-0000-000000000004', '00000000-0000-0000-0000-000000000001', 'sword', {start});
			"
		)
	}

	#[tokio::test]
	async fn sessions_and_kill_log() -> anyhow::Result<()> {
		let pool = memory_pool(&snapshot()).await?;
		let mapping = schema::inspect(&pool).await?.expect("v5 schema");
		let bans = BanList::default();
		let snapshot = leaderboards(&pool, &mapping, &params(&bans)).await;

		assert_eq!(
			uuids(&snapshot, Leaderboard::TopKillers),
			[
				"00000000-0000-0000-0000-000000000001",
				"00000000-0000-0000-0000-000000000002",
				"00000000-0000-0000-0000-000000000004",
			],
			"15 mob kills, then 2 + 2, then 1; players without kills left out",
		);

		let p1 = snapshot.top_killers.first().expect("p1 is first");

		assert_eq!((p1.kills.mob, p1.kills.player), (15, 0), "p1 kills");
		assert_eq!(p1.last_seen.timestamp_millis(), NOW - DAY + 3 * HOUR, "latest session end");

		let p4 = snapshot.top_killers.get(2).expect("p4 is third");

		assert_eq!(p4.last_seen, p4.join_date, "no sessions; last seen falls back to join date");
		assert_eq!(uuids(&snapshot, Leaderboard::MostActive).len(), 3, "p1, p2 and p3 played");
		assert!(snapshot.most_deaths.is_empty(), "no deaths table and no deaths column");

		Ok(())
	}

	#[tokio::test]
	async fn banned_killers_are_left_out() -> anyhow::Result<()> {
		let pool = memory_pool(&snapshot()).await?;
		let mapping = schema::inspect(&pool).await?.expect("v5 schema");
		let bans = BanList::parse("00000000-0000-0000-0000-000000000001\n# griefer\n");
		let snapshot = leaderboards(&pool, &mapping, &params(&bans)).await;

		assert_eq!(
			uuids(&snapshot, Leaderboard::TopKillers),
			["00000000-0000-0000-0000-000000000002", "00000000-0000-0000-0000-000000000004"],
			"banned player is gone",
		);
		assert!(
			!uuids(&snapshot, Leaderboard::MostActive).contains(&"00000000-0000-0000-0000-000000000001"),
			"banned player is gone from every leaderboard",
		);

		Ok(())
	}

	#[tokio::test]
	async fn legacy_kill_summary() -> anyhow::Result<()> {
		let pool = memory_pool(
			"CREATE TABLE players (uuid TEXT, name TEXT);
			 CREATE TABLE kills (uuid TEXT, mob_kills INTEGER, player_kills INTEGER);
			 INSERT INTO players VALUES ('b0000000-0000-0000-0000-000000000001', 'a'), ('b0000000-0000-0000-0000-000000000002', 'b');
			 INSERT INTO kills VALUES
				('b0000000-0000-0000-0000-000000000001', 1, 1),
				('b0000000-0000-0000-0000-000000000002', 0, 5);",
		)
		.await?;

		let mapping = schema::inspect(&pool).await?.expect("unprefixed schema");
		let bans = BanList::default();
		let snapshot = leaderboards(&pool, &mapping, &params(&bans)).await;
		let kills = snapshot
			.top_killers
			.iter()
			.map(|record| (record.name.as_str(), record.kills.mob, record.kills.player))
			.collect::<Vec<_>>();

		assert_eq!(kills, [("b", 0, 5), ("a", 1, 1)], "summary counters");

		Ok(())
	}
}
