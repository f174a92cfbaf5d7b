use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::data_models::Flight;

use super::StubState;
use super::models::{ErrorDetail, FlightSearch, FlightsResponse, StatusMessage};

pub async fn root_handler() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "flight search stub".to_string(),
    })
}

pub async fn search_handler(
    State(state): State<Arc<StubState>>,
    Json(search): Json<FlightSearch>,
) -> Result<Json<FlightsResponse>, (StatusCode, Json<ErrorDetail>)> {
    if !state.options.delay.is_zero() {
        tokio::time::sleep(state.options.delay).await;
    }

    if let Some(status) = state.options.forced_status.filter(|s| *s != 200) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err((
            status,
            Json(ErrorDetail {
                detail: format!("forced {} from stub", status.as_u16()),
            }),
        ));
    }

    let flights = filter_flights(&state.flights, &search);
    log::debug!("search matched {} flights", flights.len());
    Ok(Json(FlightsResponse { flights }))
}

/// Calendar date of an ISO departure time, with or without an offset.
fn departure_day(time: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(time)
        .map(|t| t.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S").map(|t| t.date()))
        .ok()
}

/// Fares whose price and stops are within the limits and whose route,
/// airline and departure day match when given. Airports compare
/// case-insensitively; a departure time that does not parse is not filtered
/// on date.
pub fn filter_flights(flights: &[Flight], search: &FlightSearch) -> Vec<Flight> {
    flights
        .iter()
        .filter(|f| search.max_price.is_none_or(|max| f.price <= max))
        .filter(|f| search.max_stops.is_none_or(|max| f.stops <= max))
        .filter(|f| {
            search
                .airline_codes
                .as_ref()
                .filter(|codes| !codes.is_empty())
                .is_none_or(|codes| codes.contains(&f.airline_code))
        })
        .filter(|f| {
            search
                .origin
                .as_ref()
                .is_none_or(|o| f.departure_airport.eq_ignore_ascii_case(o))
        })
        .filter(|f| {
            search
                .destination
                .as_ref()
                .is_none_or(|d| f.arrival_airport.eq_ignore_ascii_case(d))
        })
        .filter(|f| {
            search.departure_date.is_none_or(|date| {
                departure_day(&f.departure_time).is_none_or(|day| day == date)
            })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::fixtures::fixture_flights;

    fn ids(flights: &[Flight]) -> Vec<&str> {
        flights.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn no_filters_returns_everything() {
        let all = fixture_flights();
        assert_eq!(filter_flights(&all, &FlightSearch::default()).len(), all.len());
    }

    #[test]
    fn price_and_stops() {
        let search = FlightSearch {
            max_price: Some(800.0),
            max_stops: Some(1),
            ..Default::default()
        };
        let found = filter_flights(&fixture_flights(), &search);
        assert_eq!(ids(&found), vec!["flt_0", "flt_1", "flt_2", "flt_3"]);

        let cheap = FlightSearch {
            max_price: Some(129.0),
            ..Default::default()
        };
        assert_eq!(ids(&filter_flights(&fixture_flights(), &cheap)), vec!["flt_0"]);
    }

    #[test]
    fn route_and_airline() {
        let search = FlightSearch {
            origin: Some("ams".to_string()),
            destination: Some("JFK".to_string()),
            airline_codes: Some(vec!["AF".to_string(), "BA".to_string()]),
            ..Default::default()
        };
        let found = filter_flights(&fixture_flights(), &search);
        assert_eq!(ids(&found), vec!["flt_3", "flt_4"]);

        let nowhere = FlightSearch {
            origin: Some("NON".to_string()),
            destination: Some("EXIST".to_string()),
            ..Default::default()
        };
        assert!(filter_flights(&fixture_flights(), &nowhere).is_empty());
    }

    #[test]
    fn departure_date() {
        let search = FlightSearch {
            departure_date: NaiveDate::from_ymd_opt(2025, 3, 11),
            ..Default::default()
        };
        assert_eq!(
            ids(&filter_flights(&fixture_flights(), &search)),
            vec!["flt_2", "flt_3"]
        );

        let mut flights = fixture_flights();
        flights[0].departure_time = "2025-03-10T07:05:00Z".to_string();
        flights[1].departure_time = "tomorrow morning".to_string();
        let search = FlightSearch {
            departure_date: NaiveDate::from_ymd_opt(2025, 3, 10),
            ..Default::default()
        };
        // unparseable times are kept
        assert_eq!(ids(&filter_flights(&flights, &search)), vec!["flt_0", "flt_1"]);
    }
}
