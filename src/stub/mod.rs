use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::data_models::Flight;

pub mod fixtures;
pub mod handlers;
pub mod models;

/// Knobs for misbehaving on purpose.
#[derive(Debug, Clone, Default)]
pub struct StubOptions {
    /// Added before every search response.
    pub delay: Duration,
    /// Answer every search with this status instead of results.
    pub forced_status: Option<u16>,
}

pub struct StubState {
    pub flights: Vec<Flight>,
    pub options: StubOptions,
}

impl StubState {
    pub fn new(options: StubOptions) -> StubState {
        StubState {
            flights: fixtures::fixture_flights(),
            options,
        }
    }
}

pub fn create_router(state: Arc<StubState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/flights/search", post(handlers::search_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serves the stub on `addr` until the process exits.
pub async fn serve(addr: SocketAddr, options: StubOptions) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind stub server to {addr}"))?;
    log::info!("flight search stub listening on http://{}", listener.local_addr()?);

    let router = create_router(Arc::new(StubState::new(options)));
    axum::serve(listener, router)
        .await
        .context("Stub server failed")?;
    Ok(())
}

/// Starts the stub on an ephemeral local port. Returns the search URL and the
/// server task.
pub async fn spawn_stub(options: StubOptions) -> Result<(String, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind stub server")?;
    let addr = listener.local_addr()?;
    let router = create_router(Arc::new(StubState::new(options)));

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            log::error!("stub server error: {:#}", e);
        }
    });

    Ok((format!("http://{addr}/flights/search"), handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn search(body: &str) -> Request<Body> {
        Request::post("/flights/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn search_returns_filtered_flights() {
        let router = create_router(Arc::new(StubState::new(StubOptions::default())));
        let res = router
            .oneshot(search(r#"{"max_price":800.0,"max_stops":1}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = json_body(res).await;
        let flights = body["flights"].as_array().unwrap();
        assert_eq!(flights.len(), 4);
        assert_eq!(flights[0]["airlineCode"], "HV");
        assert_eq!(flights[0]["segments"][0]["departureAirport"], "RTM");
        assert_eq!(flights[0]["segments"][0]["flightNumber"], "5141");
        assert!(flights.iter().all(|f| f["price"].as_f64().unwrap() <= 800.0));
    }

    #[tokio::test]
    async fn forced_status() {
        let options = StubOptions {
            forced_status: Some(503),
            ..Default::default()
        };
        let router = create_router(Arc::new(StubState::new(options)));
        let res = router.oneshot(search("{}")).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(json_body(res).await.get("flights").is_none());
    }

    #[tokio::test]
    async fn passengers_are_not_validated() {
        let router = create_router(Arc::new(StubState::new(StubOptions::default())));
        for body in [r#"{"passengers":0}"#, r#"{"passengers":-1}"#] {
            let res = router.clone().oneshot(search(body)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{body}");
        }
    }

    #[tokio::test]
    async fn malformed_departure_date_is_rejected() {
        let router = create_router(Arc::new(StubState::new(StubOptions::default())));
        let res = router
            .oneshot(search(r#"{"departure_date":"next tuesday"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn root_reports_status_message() {
        let router = create_router(Arc::new(StubState::new(StubOptions::default())));
        let res = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["message"], "flight search stub");
    }
}
