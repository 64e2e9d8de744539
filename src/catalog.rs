//! Typed catalog endpoints for concerts, flights, and hotels.

// crates.io
use time::Date;
// self
use crate::{
	_prelude::*,
	dates::{self, DateDecoding},
	fetcher::AuthenticatedFetcher,
	http::HttpTransport,
	request::ApiRequest,
};

/// Concert feed shown on the discovery screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcertCategory {
	/// What is popular right now.
	Trending,
	/// Personalized picks.
	Recommended,
	/// Shows close to the user.
	Nearby,
	/// Shows starting soon.
	Upcoming,
}
impl ConcertCategory {
	/// Query value sent to the API.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Trending => "trending",
			Self::Recommended => "recommended",
			Self::Nearby => "nearby",
			Self::Upcoming => "upcoming",
		}
	}
}
impl Display for ConcertCategory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A concert listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concert {
	/// Stable concert identifier.
	pub id: String,
	/// Headlining artist.
	pub artist: String,
	/// Tour or show title.
	pub title: String,
	/// Venue name.
	pub venue: String,
	/// City the venue is in.
	pub city: String,
	/// Show start.
	#[serde(with = "dates::field")]
	pub starts_at: OffsetDateTime,
	/// Cover art, when the API has one.
	#[serde(default)]
	pub image_url: Option<Url>,
	/// Lowest listed ticket price.
	#[serde(default)]
	pub price_from: Option<f64>,
}

/// Search parameters for [`Catalog::flights`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlightQuery {
	/// Origin airport code.
	pub origin: String,
	/// Destination airport code.
	pub destination: String,
	/// Departure day; any day when unset.
	pub date: Option<Date>,
}
impl FlightQuery {
	/// Searches flights between two airports on any day.
	pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
		Self { origin: origin.into(), destination: destination.into(), date: None }
	}

	/// Restricts the search to one departure day.
	pub fn on(mut self, date: Date) -> Self {
		self.date = Some(date);

		self
	}
}

/// A flight offer. Times are minute stamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
	/// Offer identifier.
	pub id: String,
	/// Marketing airline.
	pub airline: String,
	/// Flight number.
	pub flight_number: String,
	/// Origin airport code.
	pub origin: String,
	/// Destination airport code.
	pub destination: String,
	/// Scheduled departure.
	#[serde(with = "dates::field")]
	pub departure: OffsetDateTime,
	/// Scheduled arrival.
	#[serde(with = "dates::field")]
	pub arrival: OffsetDateTime,
	/// Fare amount.
	pub price: f64,
	/// ISO 4217 currency of `price`.
	pub currency: String,
}

/// A hotel offer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
	/// Offer identifier.
	pub id: String,
	/// Hotel name.
	pub name: String,
	/// City the hotel is in.
	pub city: String,
	/// Guest rating out of five.
	#[serde(default)]
	pub rating: Option<f32>,
	/// Nightly rate.
	pub price_per_night: f64,
	/// ISO 4217 currency of `price_per_night`.
	pub currency: String,
	/// Photo, when the API has one.
	#[serde(default)]
	pub image_url: Option<Url>,
}

/// Confirmation returned after saving a concert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedConcert {
	/// Concert that was saved.
	pub concert_id: String,
	/// When the server recorded the save.
	#[serde(with = "dates::field")]
	pub saved_at: OffsetDateTime,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveConcertBody<'a> {
	concert_id: &'a str,
}

/// Catalog endpoints issued through an [`AuthenticatedFetcher`].
pub struct Catalog<T>
where
	T: ?Sized + HttpTransport,
{
	fetcher: AuthenticatedFetcher<T>,
}
impl<T> Catalog<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps a fetcher.
	pub fn new(fetcher: AuthenticatedFetcher<T>) -> Self {
		Self { fetcher }
	}

	/// Underlying fetcher, for session operations.
	pub fn fetcher(&self) -> &AuthenticatedFetcher<T> {
		&self.fetcher
	}

	/// `GET concerts?category=..`
	pub async fn concerts(&self, category: ConcertCategory) -> Result<Vec<Concert>> {
		let request = ApiRequest::get("concerts").query("category", category.as_str());

		self.fetcher.fetch(&request).await
	}

	/// `GET flights?origin=..&destination=..[&date=..]`, decoded with minute stamps.
	pub async fn flights(&self, query: &FlightQuery) -> Result<Vec<Flight>> {
		let mut request = ApiRequest::get("flights")
			.query("origin", &query.origin)
			.query("destination", &query.destination)
			.dates(DateDecoding::MinuteStamp);

		if let Some(date) = query.date {
			request = request.query("date", date.to_string());
		}

		self.fetcher.fetch(&request).await
	}

	/// `GET hotels?city=..`
	pub async fn hotels(&self, city: &str) -> Result<Vec<Hotel>> {
		self.fetcher.fetch(&ApiRequest::get("hotels").query("city", city)).await
	}

	/// `POST concerts/saved` with `{"concertId": ..}`.
	pub async fn save_concert(&self, concert_id: &str) -> Result<SavedConcert> {
		let request = ApiRequest::post("concerts/saved").json(&SaveConcertBody { concert_id })?;

		self.fetcher.fetch(&request).await
	}
}
impl<T> Clone for Catalog<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { fetcher: self.fetcher.clone() }
	}
}
impl<T> Debug for Catalog<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Catalog").field("fetcher", &self.fetcher).finish()
	}
}
