//! Custom [`serde`] functions.

#![allow(missing_docs)]

/// Timestamps in the format the website's `new Date(...)` parsing expects.
///
/// UTC, RFC 3339, always millisecond precision and a `Z` suffix
/// (`2024-05-01T13:37:00.000Z`).
pub mod timestamp {
	use chrono::{DateTime, SecondsFormat, Utc};
	use serde::{de, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;

		DateTime::parse_from_rfc3339(&value)
			.map(|timestamp| timestamp.with_timezone(&Utc))
			.map_err(de::Error::custom)
	}

	/// Converts epoch milliseconds, as stored by PLAN, into a timestamp.
	///
	/// Out-of-range values are treated as missing.
	pub fn from_millis(millis: Option<i64>) -> Option<DateTime<Utc>> {
		millis.and_then(DateTime::from_timestamp_millis)
	}
}

#[cfg(test)]
mod tests {
	use chrono::{DateTime, TimeZone, Utc};
	use serde::{Deserialize, Serialize};

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Wrapper {
		#[serde(with = "super::timestamp")]
		at: DateTime<Utc>,
	}

	#[test]
	fn millisecond_precision() -> anyhow::Result<()> {
		let at = Utc.timestamp_millis_opt(1_714_570_620_000).single().expect("valid timestamp");
		let json = serde_json::to_string(&Wrapper { at })?;

		assert_eq!(json, r#"{"at":"2024-05-01T13:37:00.000Z"}"#, "unexpected format");
		assert_eq!(serde_json::from_str::<Wrapper>(&json)?, Wrapper { at }, "round trip changed value");

		Ok(())
	}

	#[test]
	fn out_of_range_millis() {
		assert!(super::timestamp::from_millis(Some(i64::MAX)).is_none(), "should be rejected");
		assert!(super::timestamp::from_millis(None).is_none(), "should stay missing");
	}
}
