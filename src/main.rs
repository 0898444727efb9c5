use anyhow::Context;
use clap::Parser;
use refuge_sync::bans::BanList;
use refuge_sync::config::Command;
use refuge_sync::transport::{self, Network};
use refuge_sync::{catalog, lookup, source, Config};
use sqlx::SqlitePool;

mod logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let dotenv = dotenvy::dotenv();
	let config = Config::parse();
	let _guard = logging::init(config.log_dir.as_deref()).context("initialize logging")?;

	match dotenv {
		Ok(path) => tracing::debug!(path = %path.display(), "loaded `.env` file"),
		Err(error) if error.not_found() => {},
		Err(error) => tracing::warn!(%error, "failed to load `.env` file"),
	}

	tracing::debug!(?config, "loaded configuration");

	match &config.command {
		None => sync(&config).await,
		Some(Command::Lookup { name }) => lookup(&config, name).await,
		Some(Command::Inspect { download }) => inspect(&config, *download).await,
		Some(Command::CheckConnection) => check_connection(&config).await,
	}
}

/// Updates the leaderboards.
async fn sync(config: &Config) -> anyhow::Result<()> {
	if config.dev_mode {
		tracing::warn!("running in development mode; nothing is downloaded");
	}

	let snapshot = refuge_sync::run(config).await?;

	tracing::info! {
		most_active = snapshot.most_active.len(),
		top_killers = snapshot.top_killers.len(),
		most_deaths = snapshot.most_deaths.len(),
		output = %config.output_path.display(),
		"sync complete",
	};

	Ok(())
}

/// Prints the players matching `name`.
async fn lookup(config: &Config, name: &str) -> anyhow::Result<()> {
	let pool = local_snapshot(config).await?;
	let matches = lookup::lookup(&pool, name).await;

	pool.close().await;

	let matches = matches.context("look up player")?;

	if matches.is_empty() {
		println!("no player matching `{name}`; has the player joined since the last sync?");
		return Ok(());
	}

	let bans = BanList::load(&config.banned_players_path).await;

	for player in &matches {
		let banned = if bans.contains(&player.uuid) { "  (banned)" } else { "" };
		println!("{}  {}{banned}", player.uuid, player.name);
	}

	Ok(())
}

/// Prints the tables of the snapshot and the detected layout.
async fn inspect(config: &Config, download: bool) -> anyhow::Result<()> {
	if download {
		source::download(config)
			.await
			.context("download PLAN database")?;
	}

	let pool = local_snapshot(config).await?;
	let catalog = catalog::describe(&pool).await;

	pool.close().await;

	let catalog = catalog.context("inspect snapshot")?;

	println!("{}", config.snapshot_path.display());

	for table in &catalog.tables {
		println!("\n{} ({} rows)", table.name, table.rows);
		println!("  {}", table.columns.join(", "));
	}

	match &catalog.mapping {
		Some(mapping) => println!("\ndetected layout `{}`:\n{mapping:#?}", mapping.scheme),
		None => println!("\nno known PLAN layout; the leaderboards would be empty"),
	}

	Ok(())
}

/// Prints every login attempt and suggests working connection details.
async fn check_connection(config: &Config) -> anyhow::Result<()> {
	let transport_config = config.transport.clone();
	let logins = tokio::task::spawn_blocking(move || {
		transport::check_connection(&transport_config, &Network::new(&transport_config))
	})
	.await??;

	for login in &logins {
		match &login.error {
			None => println!("ok      {}", login.endpoint),
			Some(error) => println!("failed  {}: {error}", login.endpoint),
		}
	}

	let working = logins
		.last()
		.filter(|login| login.is_ok())
		.map(|login| &login.endpoint)
		.context("no candidate accepted the credentials")?;

	let configured = config.transport.host.as_deref() == Some(working.host.as_str())
		&& config.transport.port == working.port;

	if !configured {
		println!("\nconsider setting GGSERVERS_HOST={} and GGSERVERS_PORT={}", working.host, working.port);
	}

	Ok(())
}

/// Opens the snapshot at the configured path, which must already exist.
async fn local_snapshot(config: &Config) -> anyhow::Result<SqlitePool> {
	let path = &config.snapshot_path;

	anyhow::ensure!(
		tokio::fs::try_exists(path).await.unwrap_or(false),
		"no snapshot at `{}`; run a sync or `inspect --download` first",
		path.display(),
	);

	refuge_sync::sqlx::open_snapshot(path)
		.await
		.with_context(|| format!("open snapshot `{}`", path.display()))
}
