//! Module containing the [`Config`] struct, the sync job's configuration.
//!
//! Every value can be passed as a flag or as an environment variable; a `.env` file in the
//! working directory is loaded before parsing. The config is built once in `main` and handed to
//! every component by reference.

use std::path::PathBuf;
use std::time::Duration;

use derive_more::Debug;

/// Configuration of a sync run.
#[derive(Debug, Clone, clap::Parser)]
#[command(author, version, about)]
pub struct Config {
	/// An operator tool to run instead of the sync.
	#[command(subcommand)]
	pub command: Option<Command>,

	/// Skip the download and work with local data instead.
	///
	/// Uses an existing snapshot at `--snapshot-path`, then the previous output file, and finally
	/// a synthesized fixture database.
	#[arg(long = "dev", env = "REFUGE_DEV_MODE")]
	pub dev_mode: bool,

	/// Where the downloaded PLAN database is stored.
	#[arg(long, env = "PLAN_SNAPSHOT_PATH", default_value = "./temp/Plan.db")]
	pub snapshot_path: PathBuf,

	/// Where the leaderboard JSON is written.
	#[arg(long, env = "LEADERBOARDS_OUTPUT", default_value = "./public/data/leaderboards.json")]
	pub output_path: PathBuf,

	/// File containing banned player UUIDs, one per line.
	#[arg(long, env = "BANNED_PLAYERS_FILE", default_value = "./banned-players.txt")]
	pub banned_players_path: PathBuf,

	/// Directory for JSON log files; file logging is disabled if unset.
	#[arg(long, env = "LOG_DIR")]
	pub log_dir: Option<PathBuf>,

	/// Connection details of the game server host.
	#[command(flatten)]
	pub transport: TransportConfig,

	/// Leaderboard sizes.
	#[command(flatten)]
	pub limits: Limits,

	/// Tuning of the activity score.
	#[command(flatten)]
	pub activity: ActivityWeights,
}

/// Operator tools.
#[derive(Debug, Clone, PartialEq, Eq, clap::Subcommand)]
pub enum Command {
	/// Print the UUID of a player, ready for the ban list.
	///
	/// Searches the local snapshot; names match case-insensitively and partially.
	Lookup {
		/// The player's name.
		name: String,
	},

	/// List the tables and columns of the local snapshot and the layout detected from them.
	Inspect {
		/// Download a fresh snapshot first.
		#[arg(long)]
		download: bool,
	},

	/// Try to log in on every candidate host, port and protocol.
	CheckConnection,
}

/// How to reach the game server's files.
#[derive(Debug, Clone, clap::Args)]
pub struct TransportConfig {
	/// Hostname of the game server's file access.
	#[arg(long, env = "GGSERVERS_HOST")]
	pub host: Option<String>,

	/// FTP / SFTP user.
	#[arg(long, env = "GGSERVERS_USERNAME", default_value = "")]
	pub username: String,

	/// FTP / SFTP password.
	#[debug("*****")]
	#[arg(long, env = "GGSERVERS_PASSWORD", default_value = "", hide_env_values = true)]
	pub password: String,

	/// FTP / SFTP port. Ports 22 and 2022 are tried with SFTP first.
	#[arg(long, env = "GGSERVERS_PORT", default_value_t = 21)]
	pub port: u16,

	/// Path of the PLAN database on the server; well-known locations are tried afterwards.
	#[arg(long, env = "PLAN_REMOTE_PATH")]
	pub remote_path: Option<String>,

	/// Domain of the hosting provider, used to repair mistyped hostnames.
	#[arg(long, env = "GGSERVERS_HOST_SUFFIX", default_value = "ggservers.com")]
	pub host_suffix: String,
}

/// Maximum number of players per leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Args)]
pub struct Limits {
	/// Size of the "Most Active" leaderboard.
	#[arg(long, env = "MOST_ACTIVE_LIMIT", default_value_t = 10)]
	pub most_active: u32,

	/// Size of the "Top Killers" leaderboard.
	#[arg(long, env = "TOP_KILLERS_LIMIT", default_value_t = 10)]
	pub top_killers: u32,

	/// Size of the "Most Deaths" leaderboard.
	#[arg(long, env = "MOST_DEATHS_LIMIT", default_value_t = 10)]
	pub most_deaths: u32,
}

impl Default for Limits {
	fn default() -> Self {
		Self { most_active: 10, top_killers: 10, most_deaths: 10 }
	}
}

/// Constants of the activity score.
///
/// ```text
/// score = recent   * (recent active time / recent unit)
///       + lifetime * (lifetime active time / lifetime unit)
///       + sessions * (session count * session bonus)
///       + days     * (distinct recent days * day bonus)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, clap::Args)]
pub struct ActivityWeights {
	/// Weight of active time within the recency window.
	#[arg(long = "activity-recent-weight", env = "ACTIVITY_RECENT_WEIGHT", default_value_t = 0.4)]
	pub recent: f64,

	/// Weight of lifetime active time.
	#[arg(long = "activity-lifetime-weight", env = "ACTIVITY_LIFETIME_WEIGHT", default_value_t = 0.3)]
	pub lifetime: f64,

	/// Weight of the session count.
	#[arg(long = "activity-sessions-weight", env = "ACTIVITY_SESSIONS_WEIGHT", default_value_t = 0.2)]
	pub sessions: f64,

	/// Weight of distinct active days within the recency window.
	#[arg(long = "activity-days-weight", env = "ACTIVITY_DAYS_WEIGHT", default_value_t = 0.1)]
	pub days: f64,

	/// Size of the recency window, in days.
	#[arg(long = "activity-window-days", env = "ACTIVITY_WINDOW_DAYS", default_value_t = 14)]
	pub recent_window_days: u32,

	/// Minutes of recent active time worth one point.
	#[arg(long = "activity-recent-unit", env = "ACTIVITY_RECENT_UNIT_MINUTES", default_value_t = 30)]
	pub recent_unit_minutes: u32,

	/// Minutes of lifetime active time worth one point.
	#[arg(long = "activity-lifetime-unit", env = "ACTIVITY_LIFETIME_UNIT_MINUTES", default_value_t = 60)]
	pub lifetime_unit_minutes: u32,

	/// Points per session.
	#[arg(long = "activity-session-bonus", env = "ACTIVITY_SESSION_BONUS", default_value_t = 1.0)]
	pub session_bonus: f64,

	/// Points per distinct recent day.
	#[arg(long = "activity-day-bonus", env = "ACTIVITY_DAY_BONUS", default_value_t = 5.0)]
	pub day_bonus: f64,
}

impl ActivityWeights {
	/// The recency window.
	pub fn recent_window(&self) -> Duration {
		Duration::from_secs(u64::from(self.recent_window_days) * 86_400)
	}

	/// Milliseconds per recent-time point. Never zero.
	pub fn recent_unit_millis(&self) -> f64 {
		f64::from(self.recent_unit_minutes.max(1)) * 60_000.0
	}

	/// Milliseconds per lifetime-time point. Never zero.
	pub fn lifetime_unit_millis(&self) -> f64 {
		f64::from(self.lifetime_unit_minutes.max(1)) * 60_000.0
	}
}

impl Default for ActivityWeights {
	fn default() -> Self {
		Self {
			recent: 0.4,
			lifetime: 0.3,
			sessions: 0.2,
			days: 0.1,
			recent_window_days: 14,
			recent_unit_minutes: 30,
			lifetime_unit_minutes: 60,
			session_bonus: 1.0,
			day_bonus: 5.0,
		}
	}
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::{ActivityWeights, Command, Config, Limits};

	#[test]
	fn dev_mode_needs_no_host() -> anyhow::Result<()> {
		let config = Config::try_parse_from(["refuge-sync", "--dev"])?;

		assert!(config.dev_mode, "flag should be set");
		assert!(config.command.is_none(), "sync by default");
		assert!(config.transport.host.is_none(), "no host given");
		assert_eq!(config.limits, Limits::default(), "limits should default to 10");
		assert_eq!(config.activity, ActivityWeights::default(), "flag defaults match `Default`");

		Ok(())
	}

	#[test]
	fn password_is_redacted() -> anyhow::Result<()> {
		let config = Config::try_parse_from([
			"refuge-sync",
			"--host",
			"mc.example.org",
			"--password",
			"hunter2",
		])?;

		assert!(!format!("{config:?}").contains("hunter2"), "password leaked into Debug output");

		Ok(())
	}

	#[test]
	fn tools() -> anyhow::Result<()> {
		let config = Config::try_parse_from(["refuge-sync", "lookup", "Kage45"])?;

		assert_eq!(
			config.command,
			Some(Command::Lookup { name: String::from("Kage45") }),
			"lookup takes a name",
		);

		let config = Config::try_parse_from(["refuge-sync", "inspect", "--download"])?;

		assert_eq!(config.command, Some(Command::Inspect { download: true }), "inspect flag");

		let config = Config::try_parse_from(["refuge-sync", "check-connection"])?;

		assert_eq!(config.command, Some(Command::CheckConnection), "kebab-case name");

		Ok(())
	}
}
