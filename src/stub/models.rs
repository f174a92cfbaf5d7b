use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data_models::Flight;

/// Search body accepted by the stub. Every filter is optional; the load
/// scenario only ever sends `max_price` and `max_stops`.
#[derive(Debug, Default, Deserialize)]
pub struct FlightSearch {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDate>,
    #[serde(default = "default_passengers")]
    pub passengers: i64,
    pub max_price: Option<f64>,
    pub max_stops: Option<u32>,
    pub airline_codes: Option<Vec<String>>,
}

fn default_passengers() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct FlightsResponse {
    pub flights: Vec<Flight>,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}
