use crate::data_models::{Flight, Segment};

#[allow(clippy::too_many_arguments)]
fn flight(
    idx: usize,
    airline: (&str, &str),
    number: &str,
    route: (&str, &str),
    times: (&str, &str),
    duration: u32,
    price: f64,
    stops: u32,
    cabin_class: &str,
) -> Flight {
    let segment = Segment {
        departure_airport: route.0.to_string(),
        arrival_airport: route.1.to_string(),
        departure_time: times.0.to_string(),
        arrival_time: times.1.to_string(),
        flight_number: number.to_string(),
        airline_code: airline.0.to_string(),
        airline_name: airline.1.to_string(),
        duration,
    };
    Flight {
        id: format!("flt_{idx}"),
        airline_code: airline.0.to_string(),
        airline_name: airline.1.to_string(),
        flight_number: number.to_string(),
        departure_airport: route.0.to_string(),
        arrival_airport: route.1.to_string(),
        departure_time: times.0.to_string(),
        arrival_time: times.1.to_string(),
        duration,
        price,
        stops,
        currency: "USD".to_string(),
        cabin_class: cabin_class.to_string(),
        segments: vec![segment],
    }
}

/// Fares served by the stub target.
pub fn fixture_flights() -> Vec<Flight> {
    vec![
        flight(
            0,
            ("HV", "Transavia"),
            "5141",
            ("RTM", "STN"),
            ("2025-03-10T07:05:00", "2025-03-10T07:15:00"),
            70,
            129.0,
            0,
            "Economy",
        ),
        flight(
            1,
            ("KL", "KLM"),
            "1001",
            ("AMS", "LHR"),
            ("2025-03-10T09:40:00", "2025-03-10T10:00:00"),
            80,
            245.5,
            0,
            "Economy",
        ),
        flight(
            2,
            ("LH", "Lufthansa"),
            "400",
            ("FRA", "JFK"),
            ("2025-03-11T10:15:00", "2025-03-11T13:05:00"),
            530,
            689.0,
            0,
            "Economy",
        ),
        flight(
            3,
            ("BA", "British Airways"),
            "117",
            ("AMS", "JFK"),
            ("2025-03-11T06:30:00", "2025-03-11T11:45:00"),
            675,
            742.3,
            1,
            "Economy",
        ),
        flight(
            4,
            ("AF", "Air France"),
            "22",
            ("AMS", "JFK"),
            ("2025-03-12T08:00:00", "2025-03-12T14:20:00"),
            740,
            910.0,
            1,
            "Premium Economy",
        ),
        flight(
            5,
            ("TK", "Turkish Airlines"),
            "1952",
            ("AMS", "SIN"),
            ("2025-03-12T12:05:00", "2025-03-13T15:40:00"),
            1235,
            780.0,
            2,
            "Economy",
        ),
        flight(
            6,
            ("EK", "Emirates"),
            "148",
            ("AMS", "SYD"),
            ("2025-03-13T14:45:00", "2025-03-15T06:10:00"),
            1885,
            1650.0,
            1,
            "Business",
        ),
    ]
}
