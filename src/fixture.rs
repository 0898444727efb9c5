//! A small PLAN v5 database for local development.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Connection, SqliteConnection};

/// `plan_users`, `plan_sessions`, `plan_kills` and a LuckPerms table, as PLAN v5 creates them.
const SCHEMA: &str = "
	CREATE TABLE plan_users (
		id INTEGER PRIMARY KEY,
		uuid VARCHAR(36) NOT NULL UNIQUE,
		registered BIGINT NOT NULL,
		name VARCHAR(36) NOT NULL,
		times_kicked INTEGER NOT NULL DEFAULT 0
	);
	CREATE TABLE plan_sessions (
		id INTEGER PRIMARY KEY,
		user_id INTEGER NOT NULL REFERENCES plan_users (id),
		server_id INTEGER NOT NULL,
		session_start BIGINT NOT NULL,
		session_end BIGINT NOT NULL,
		mob_kills INTEGER NOT NULL,
		deaths INTEGER NOT NULL,
		afk_time BIGINT NOT NULL
	);
	CREATE TABLE plan_kills (
		id INTEGER PRIMARY KEY,
		killer_uuid VARCHAR(36) NOT NULL,
		victim_uuid VARCHAR(36) NOT NULL,
		server_uuid VARCHAR(36) NOT NULL,
		weapon VARCHAR(30) NOT NULL,
		date BIGINT NOT NULL
	);
	CREATE TABLE luckperms_players (
		uuid VARCHAR(36) PRIMARY KEY,
		username VARCHAR(16) NOT NULL,
		primary_group VARCHAR(36) NOT NULL
	);
";

/// Name, group, sessions played, and mob kills / deaths / player kills per session.
const PLAYERS: &[(&str, &str, i64, i64, i64, i64)] = &[
	("Steve", "admin", 12, 8, 1, 1),
	("Alex", "moderator", 9, 14, 3, 0),
	("Notch", "default", 3, 2, 0, 2),
	("Herobrine", "default", 20, 1, 6, 0),
	("Jeb", "vip", 6, 5, 2, 1),
	("Dinnerbone", "default", 1, 0, 0, 0),
];

const HOUR: i64 = 3_600_000;
const DAY: i64 = 24 * HOUR;

/// Creates a fixture database at `path`, with activity relative to `now`.
///
/// Fails if `path` already exists.
#[tracing::instrument(skip_all, fields(path = %path.display()), err(Debug))]
pub async fn create(path: &Path, now: DateTime<Utc>) -> sqlx::Result<()> {
	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent).await?;
	}

	let options = SqliteConnectOptions::new()
		.filename(path)
		.create_if_missing(true)
		.journal_mode(SqliteJournalMode::Delete);

	let mut conn = SqliteConnection::connect_with(&options).await?;
	let mut txn = conn.begin().await?;

	sqlx::raw_sql(SCHEMA).execute(&mut *txn).await?;

	let now = now.timestamp_millis();

	for (id, &(name, group, sessions, mob_kills, deaths, player_kills)) in (1_i64..).zip(PLAYERS) {
		let uuid = format!("00000000-0000-4000-8000-{id:012}");

		sqlx::query("INSERT INTO plan_users (id, uuid, registered, name) VALUES (?, ?, ?, ?)")
			.bind(id)
			.bind(&uuid)
			.bind(now - (90 - id) * DAY)
			.bind(name)
			.execute(&mut *txn)
			.await?;

		sqlx::query("INSERT INTO luckperms_players (uuid, username, primary_group) VALUES (?, ?, ?)")
			.bind(&uuid)
			.bind(name.to_ascii_lowercase())
			.bind(group)
			.execute(&mut *txn)
			.await?;

		for session in 0..sessions {
			// spread sessions out so some fall outside the recency window
			let start = now - (session * 3 + id) * DAY + id * HOUR;
			let length = HOUR + (session % 4) * HOUR / 2;

			sqlx::query(
				"INSERT INTO plan_sessions
				   (user_id, server_id, session_start, session_end, mob_kills, deaths, afk_time)
				 VALUES (?, 1, ?, ?, ?, ?, ?)",
			)
			.bind(id)
			.bind(start)
			.bind(start + length)
			.bind(mob_kills)
			.bind(deaths)
			.bind(length / 10)
			.execute(&mut *txn)
			.await?;

			for kill in 0..player_kills {
				let victim = format!("00000000-0000-4000-8000-{:012}", (id % 6) + 1);

				sqlx::query(
					"INSERT INTO plan_kills (killer_uuid, victim_uuid, server_uuid, weapon, date)
					 VALUES (?, ?, ?, 'Diamond Sword', ?)",
				)
				.bind(&uuid)
				.bind(victim)
				.bind("00000000-0000-0000-0000-000000000000")
				.bind(start + kill * 60_000)
				.execute(&mut *txn)
				.await?;
			}
		}
	}

	txn.commit().await?;
	conn.close().await?;

	tracing::info!(players = PLAYERS.len(), "created fixture database");

	Ok(())
}
