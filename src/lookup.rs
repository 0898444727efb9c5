//! Finding a player's UUID by name, for the ban list.

use sqlx::SqlitePool;
use thiserror::Error;

use crate::schema::{self, SchemaMapping};
use crate::sqlx::{column, quote_ident};

/// Maximum number of players returned by [`lookup()`].
const MAX_MATCHES: i64 = 10;

/// A player found by [`lookup()`].
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PlayerMatch {
	/// The player's UUID, as stored in the snapshot.
	pub uuid: String,

	/// The player's name.
	pub name: String,
}

/// Errors that can occur while looking up a player.
#[derive(Debug, Error)]
pub enum Error {
	/// The snapshot could not be inspected.
	#[error(transparent)]
	Schema(#[from] schema::Error),

	/// The snapshot does not look like a PLAN database.
	#[error("snapshot does not look like a PLAN database")]
	UnknownSchema,

	/// The players table has no name column to search.
	#[error("players table `{0}` has no name column")]
	NoNames(String),

	/// The search query failed.
	#[error("failed to search players: {0}")]
	Query(#[from] sqlx::Error),
}

/// Looks up players whose name contains `name`, ignoring case.
///
/// Exact matches come first. Players without a UUID are never returned.
#[tracing::instrument(skip(pool), err(Display))]
pub async fn lookup(pool: &SqlitePool, name: &str) -> Result<Vec<PlayerMatch>, Error> {
	let mapping = schema::inspect(pool).await?.ok_or(Error::UnknownSchema)?;

	find(pool, &mapping, name).await
}

/// Searches the players table described by `mapping`.
async fn find(
	pool: &SqlitePool,
	mapping: &SchemaMapping,
	name: &str,
) -> Result<Vec<PlayerMatch>, Error> {
	let players = &mapping.players;
	let name_column = players
		.name
		.as_deref()
		.ok_or_else(|| Error::NoNames(players.table.clone()))?;

	let uuid = column("p", &players.uuid);
	let player_name = column("p", name_column);
	let sql = format!(
		"SELECT CAST({uuid} AS TEXT) AS uuid, CAST({player_name} AS TEXT) AS name \
		 FROM {table} p \
		 WHERE {uuid} IS NOT NULL \
		   AND trim({uuid}) <> '' \
		   AND instr(lower({player_name}), lower(?)) > 0 \
		 ORDER BY lower({player_name}) = lower(?) DESC, lower({player_name}) \
		 LIMIT ?",
		table = quote_ident(&players.table),
	);

	let matches = sqlx::query_as::<_, PlayerMatch>(&sql)
		.bind(name.trim())
		.bind(name.trim())
		.bind(MAX_MATCHES)
		.fetch_all(pool)
		.await?;

	tracing::debug!(count = matches.len(), "found players");

	Ok(matches)
}

#[cfg(test)]
mod tests {
	use super::{lookup, Error, PlayerMatch};
	use crate::sqlx::tests::memory_pool;

	const PLAYERS: &str = "
		CREATE TABLE plan_users (id INTEGER PRIMARY KEY, uuid TEXT, registered INTEGER, name TEXT);
		INSERT INTO plan_users (id, uuid, registered, name) VALUES
			(1, '00000000-0000-0000-0000-000000000001', 0, 'Kage45'),
			(2, '00000000-0000-0000-0000-000000000002', 0, 'kage'),
			(3, '00000000-0000-0000-0000-000000000003', 0, 'Steve'),
			(4, NULL, 0, 'Kagemusha');
	";

	fn found(uuid: &str, name: &str) -> PlayerMatch {
		PlayerMatch { uuid: uuid.to_owned(), name: name.to_owned() }
	}

	#[tokio::test]
	async fn exact_match_first() -> anyhow::Result<()> {
		let pool = memory_pool(PLAYERS).await?;

		assert_eq!(
			lookup(&pool, "KAGE").await?,
			[
				found("00000000-0000-0000-0000-000000000002", "kage"),
				found("00000000-0000-0000-0000-000000000001", "Kage45"),
			],
			"case-insensitive, exact before partial, no uuid-less players",
		);
		assert!(lookup(&pool, "Herobrine").await?.is_empty(), "unknown player");

		Ok(())
	}

	#[tokio::test]
	async fn needs_a_plan_database() -> anyhow::Result<()> {
		let pool = memory_pool("CREATE TABLE world (x INTEGER);").await?;

		assert!(matches!(lookup(&pool, "Steve").await, Err(Error::UnknownSchema)), "not PLAN");

		let pool = memory_pool("CREATE TABLE plan_users (id INTEGER, uuid TEXT);").await?;

		assert!(
			matches!(lookup(&pool, "Steve").await, Err(Error::NoNames(table)) if table == "plan_users"),
			"nothing to search",
		);

		Ok(())
	}
}
