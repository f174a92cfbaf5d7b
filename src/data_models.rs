use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_PRICE: f64 = 800.0;
pub const DEFAULT_MAX_STOPS: u32 = 1;

/// Body of `POST /flights/search` as issued by every iteration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SearchRequest {
    pub max_price: f64,
    pub max_stops: u32,
}

impl SearchRequest {
    pub fn new(max_price: f64, max_stops: u32) -> SearchRequest {
        SearchRequest {
            max_price,
            max_stops,
        }
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PRICE, DEFAULT_MAX_STOPS)
    }
}

/// The only part of the response body the scenario looks at. Record shape is
/// left opaque.
#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    pub flights: Vec<serde_json::Value>,
}

impl SearchResponse {
    /// Number of flights in `body`, or `None` if the body is not JSON or has
    /// no `flights` array.
    pub fn count_flights(body: &[u8]) -> Option<usize> {
        serde_json::from_slice::<SearchResponse>(body)
            .ok()
            .map(|res| res.flights.len())
    }
}

/// What one request looked like from the client side.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSample {
    /// `None` when the request never produced a response.
    pub status: Option<u16>,
    pub duration: Duration,
    /// `None` when the body could not be read or parsed.
    pub flights: Option<usize>,
}

impl ResponseSample {
    pub fn new(status: Option<u16>, duration: Duration, flights: Option<usize>) -> ResponseSample {
        ResponseSample {
            status,
            duration,
            flights,
        }
    }

    pub fn transport_error(duration: Duration) -> ResponseSample {
        Self::new(None, duration, None)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub airline_code: String,
    pub airline_name: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: u32,
    pub price: f64,
    pub stops: u32,
    pub currency: String,
    pub cabin_class: String,
    pub segments: Vec<Segment>,
}

/// One leg of a [`Flight`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub flight_number: String,
    pub airline_code: String,
    pub airline_name: String,
    pub duration: u32,
}
