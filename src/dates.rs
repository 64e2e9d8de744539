//! Per-request date decoding policies for JSON response bodies.
//!
//! Response types mark their timestamp fields with
//! `#[serde(with = "concertly_client::dates::field")]` (or [`option`] for nullable fields). The
//! [`DateDecoding`] chosen on the request decides how those fields parse while that response is
//! being decoded; outside a decode the ISO-8601 policy applies. Serialization always emits
//! RFC 3339.

// std
use std::cell::Cell;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::Error as SerError};
use time::{
	PrimitiveDateTime,
	format_description::well_known::{Iso8601, Rfc3339},
	macros::format_description,
};
// self
use crate::_prelude::*;

thread_local! {
	static ACTIVE_POLICY: Cell<DateDecoding> = const { Cell::new(DateDecoding::Iso8601) };
}

/// Date format expected in a response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateDecoding {
	/// ISO-8601 timestamps such as `2025-06-01T20:00:00Z`.
	#[default]
	Iso8601,
	/// Minute-precision stamps in the fixed `yyyy-MM-dd HH:mm` pattern, read as UTC.
	MinuteStamp,
}
impl DateDecoding {
	/// Parses `raw` according to this policy.
	pub fn parse(self, raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
		match self {
			Self::Iso8601 => OffsetDateTime::parse(raw, &Iso8601::DEFAULT),
			Self::MinuteStamp =>
				PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day] [hour]:[minute]"))
					.map(PrimitiveDateTime::assume_utc),
		}
	}

	/// Policy in effect on the current thread.
	pub fn active() -> Self {
		ACTIVE_POLICY.with(Cell::get)
	}

	fn enter(self) -> PolicyScope {
		PolicyScope { previous: ACTIVE_POLICY.with(|active| active.replace(self)) }
	}
}

struct PolicyScope {
	previous: DateDecoding,
}
impl Drop for PolicyScope {
	fn drop(&mut self) {
		ACTIVE_POLICY.with(|active| active.set(self.previous));
	}
}

/// Decodes a JSON body with `policy` applied to every [`field`]/[`option`] timestamp.
///
/// Decoding is synchronous, so the policy is scoped to the calling thread for exactly the
/// duration of this call.
pub fn decode<T>(
	body: &[u8],
	policy: DateDecoding,
) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
	T: DeserializeOwned,
{
	let _scope = policy.enter();
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}

/// Serde adapter for required `OffsetDateTime` fields.
pub mod field {
	// self
	use super::*;

	/// Parses the field with the active [`DateDecoding`].
	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = <String>::deserialize(deserializer)?;
		let policy = DateDecoding::active();

		policy.parse(&raw).map_err(|e| {
			D::Error::custom(format!("invalid {policy:?} date `{raw}`: {e}"))
		})
	}

	/// Writes the field as RFC 3339.
	pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let formatted = value.format(&Rfc3339).map_err(S::Error::custom)?;

		serializer.serialize_str(&formatted)
	}
}

/// Serde adapter for optional `OffsetDateTime` fields.
pub mod option {
	// self
	use super::*;

	/// Parses the field with the active [`DateDecoding`]; `null` yields `None`.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let Some(raw) = <Option<String>>::deserialize(deserializer)? else {
			return Ok(None);
		};
		let policy = DateDecoding::active();

		policy.parse(&raw).map(Some).map_err(|e| {
			D::Error::custom(format!("invalid {policy:?} date `{raw}`: {e}"))
		})
	}

	/// Writes the field as RFC 3339, or `null`.
	pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(value) => field::serialize(value, serializer),
			None => serializer.serialize_none(),
		}
	}
}
