#![doc = include_str!("../README.md")]

use anyhow::Context;
use chrono::{SubsecRound, Utc};

pub mod config;
pub use config::Config;

pub mod serde;
pub mod sqlx;

pub mod players;
pub mod leaderboards;
pub mod bans;
pub mod schema;
pub mod extract;
pub mod merge;
pub mod output;
pub mod transport;
pub mod source;
pub mod fixture;
pub mod lookup;
pub mod catalog;

use bans::BanList;
use leaderboards::LeaderboardSnapshot;
use source::Source;

/// Runs a full sync: acquire the PLAN data, extract and merge the leaderboards, write the output.
///
/// Returns the snapshot that was written.
#[tracing::instrument(skip_all, fields(dev_mode = config.dev_mode))]
pub async fn run(config: &Config) -> anyhow::Result<LeaderboardSnapshot> {
	// the output only keeps milliseconds
	let now = Utc::now().trunc_subsecs(3);
	let bans = BanList::load(&config.banned_players_path).await;
	let source = source::acquire(config, now)
		.await
		.context("acquire PLAN data")?;

	let mut snapshot = match source {
		Source::Snapshot(path) => {
			let pool = crate::sqlx::open_snapshot(&path)
				.await
				.with_context(|| format!("open snapshot `{}`", path.display()))?;

			let params = extract::Params {
				bans: &bans,
				limits: config.limits,
				weights: config.activity,
				now,
			};

			let snapshot = extract::run(&pool, &params).await;

			pool.close().await;
			snapshot
		},
		Source::Previous(mut previous) => {
			merge::retain_unbanned(&mut previous, &bans);
			previous.last_updated = now;
			previous
		},
	};

	merge::merge(&mut snapshot);
	merge::normalize(&mut snapshot, config.limits);

	if snapshot.is_empty() {
		tracing::warn!("every leaderboard is empty");
	}

	output::write(&config.output_path, &snapshot)
		.await
		.context("write leaderboards")?;

	Ok(snapshot)
}
