//! The leaderboards and the file the website reads them from.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::players::PlayerRecord;
use crate::serde::timestamp;

/// One of the ranked lists shown on the website.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leaderboard {
	/// Ranked by activity score (or playtime, if no score could be computed).
	#[display("most active")]
	MostActive,

	/// Ranked by mob kills + player kills.
	#[display("top killers")]
	TopKillers,

	/// Ranked by deaths.
	#[display("most deaths")]
	MostDeaths,
}

impl Leaderboard {
	/// All leaderboards, in output order.
	pub const ALL: [Self; 3] = [Self::MostActive, Self::TopKillers, Self::MostDeaths];

	/// Orders two records the way they should appear on this leaderboard.
	///
	/// Higher ranking keys come first; ties go to the player who joined most recently.
	pub fn compare(&self, a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
		let by_key = match self {
			// scored players rank above unscored ones
			Self::MostActive => b
				.activity_score
				.is_some()
				.cmp(&a.activity_score.is_some())
				.then_with(|| match (a.activity_score, b.activity_score) {
					(Some(a_score), Some(b_score)) => b_score.total_cmp(&a_score),
					_ => Ordering::Equal,
				})
				.then_with(|| b.playtime.cmp(&a.playtime)),
			Self::TopKillers => b.kills.total().cmp(&a.kills.total()),
			Self::MostDeaths => b.deaths.cmp(&a.deaths),
		};

		by_key.then_with(|| b.join_date.cmp(&a.join_date))
	}
}

/// The contents of `leaderboards.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
	/// Players ranked by activity.
	pub most_active: Vec<PlayerRecord>,

	/// Players ranked by kills.
	pub top_killers: Vec<PlayerRecord>,

	/// Players ranked by deaths.
	pub most_deaths: Vec<PlayerRecord>,

	/// When this snapshot was generated.
	#[serde(with = "timestamp")]
	pub last_updated: DateTime<Utc>,
}

impl LeaderboardSnapshot {
	/// A snapshot without any players.
	pub const fn empty(last_updated: DateTime<Utc>) -> Self {
		Self {
			most_active: Vec::new(),
			top_killers: Vec::new(),
			most_deaths: Vec::new(),
			last_updated,
		}
	}

	/// The list belonging to `leaderboard`.
	pub fn list(&self, leaderboard: Leaderboard) -> &[PlayerRecord] {
		match leaderboard {
			Leaderboard::MostActive => &self.most_active,
			Leaderboard::TopKillers => &self.top_killers,
			Leaderboard::MostDeaths => &self.most_deaths,
		}
	}

	/// The list belonging to `leaderboard`, mutably.
	pub fn list_mut(&mut self, leaderboard: Leaderboard) -> &mut Vec<PlayerRecord> {
		match leaderboard {
			Leaderboard::MostActive => &mut self.most_active,
			Leaderboard::TopKillers => &mut self.top_killers,
			Leaderboard::MostDeaths => &mut self.most_deaths,
		}
	}

	/// Whether every list is empty.
	pub fn is_empty(&self) -> bool {
		Leaderboard::ALL
			.iter()
			.all(|&leaderboard| self.list(leaderboard).is_empty())
	}
}

#[cfg(test)]
mod tests {
	use std::cmp::Ordering;

	use super::Leaderboard;
	use crate::players::tests::{at, record};
	use crate::players::{Kills, PlayerRecord};

	#[test]
	fn most_active_prefers_score() {
		let a = PlayerRecord { activity_score: Some(2.0), playtime: 10, ..record("a") };
		let b = PlayerRecord { activity_score: Some(1.0), playtime: 99, ..record("b") };

		assert_eq!(Leaderboard::MostActive.compare(&a, &b), Ordering::Less, "higher score first");
	}

	#[test]
	fn scored_players_rank_above_unscored() {
		let mut records = vec![
			PlayerRecord { playtime: 500, ..record("unscored-long") },
			PlayerRecord { activity_score: Some(1.0), playtime: 10, ..record("low") },
			PlayerRecord { playtime: 50, ..record("unscored-short") },
			PlayerRecord { activity_score: Some(3.0), playtime: 20, ..record("high") },
		];

		records.sort_by(|a, b| Leaderboard::MostActive.compare(a, b));

		let order = records.iter().map(|record| record.uuid.as_str()).collect::<Vec<_>>();

		assert_eq!(
			order,
			["high", "low", "unscored-long", "unscored-short"],
			"scores first, then playtime",
		);

		let scored = PlayerRecord { activity_score: Some(0.0), ..record("scored") };
		let busy = PlayerRecord { playtime: u64::MAX, ..record("busy") };

		assert_eq!(
			Leaderboard::MostActive.compare(&scored, &busy),
			Ordering::Less,
			"a score outranks any playtime",
		);
	}

	#[test]
	fn ties_go_to_newest_player() {
		let old = PlayerRecord { kills: Kills { mob: 1, player: 1 }, join_date: at(1), ..record("old") };
		let new = PlayerRecord { kills: Kills { mob: 2, player: 0 }, join_date: at(2), ..record("new") };

		assert_eq!(Leaderboard::TopKillers.compare(&new, &old), Ordering::Less, "newer player first");
	}
}
