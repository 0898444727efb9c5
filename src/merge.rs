//! Cross-leaderboard merging and normalization.
//!
//! Each leaderboard query only knows the stats it ranks by, so the same player can show up in
//! several lists with different partial data. Merging gives every occurrence the full picture.

use std::collections::HashMap;

use itertools::Itertools;

use crate::bans::BanList;
use crate::config::Limits;
use crate::leaderboards::{Leaderboard, LeaderboardSnapshot};
use crate::players::PlayerRecord;

/// Fills every record with what the other leaderboards know about the same player.
///
/// Each record keeps its own `activity_score`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn merge(snapshot: &mut LeaderboardSnapshot) {
	let mut superset = HashMap::<String, PlayerRecord>::new();

	for record in Leaderboard::ALL
		.iter()
		.flat_map(|&leaderboard| snapshot.list(leaderboard))
	{
		superset
			.entry(record.key())
			.and_modify(|merged| merged.absorb(record))
			.or_insert_with(|| record.clone());
	}

	tracing::debug!(players = superset.len(), "merged player records");

	for leaderboard in Leaderboard::ALL {
		for record in snapshot.list_mut(leaderboard) {
			let Some(merged) = superset.get(&record.key()) else {
				continue;
			};

			let activity_score = record.activity_score;
			record.clone_from(merged);
			record.activity_score = activity_score;
		}
	}
}

/// Deduplicates, sorts and truncates every leaderboard.
pub fn normalize(snapshot: &mut LeaderboardSnapshot, limits: Limits) {
	for leaderboard in Leaderboard::ALL {
		let list = snapshot.list_mut(leaderboard);
		let mut records = std::mem::take(list)
			.into_iter()
			.unique_by(PlayerRecord::key)
			.collect_vec();

		records.sort_by(|a, b| leaderboard.compare(a, b));
		records.truncate(limit(limits, leaderboard));

		*list = records;
	}
}

/// Removes banned players from every leaderboard.
pub fn retain_unbanned(snapshot: &mut LeaderboardSnapshot, bans: &BanList) {
	if bans.is_empty() {
		return;
	}

	for leaderboard in Leaderboard::ALL {
		let list = snapshot.list_mut(leaderboard);
		let before = list.len();

		list.retain(|record| !bans.contains(&record.uuid));

		if list.len() != before {
			tracing::info!(%leaderboard, removed = before - list.len(), "removed banned players");
		}
	}
}

/// The configured size of `leaderboard`.
fn limit(limits: Limits, leaderboard: Leaderboard) -> usize {
	let limit = match leaderboard {
		Leaderboard::MostActive => limits.most_active,
		Leaderboard::TopKillers => limits.top_killers,
		Leaderboard::MostDeaths => limits.most_deaths,
	};

	usize::try_from(limit).unwrap_or(usize::MAX)
}
