use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

pub const DEFAULT_TARGET_URL: &str = "http://localhost:8000/flights/search";
pub const DEFAULT_STAGES: &str = "30s:100,1m:100,30s:0";

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        target_url: get_env_or_default("FLIGHTLOAD_TARGET_URL", DEFAULT_TARGET_URL),
        stages: get_env_or_default("FLIGHTLOAD_STAGES", DEFAULT_STAGES),
        think_time: get_env_or_default("FLIGHTLOAD_THINK_TIME", "1s"),
        latency_threshold: get_env_or_default("FLIGHTLOAD_LATENCY_THRESHOLD", "500ms"),
        request_timeout: get_env_or_default("FLIGHTLOAD_REQUEST_TIMEOUT", "30s"),
        stub_addr: get_env_or_default("FLIGHTLOAD_STUB_ADDR", "127.0.0.1:8000"),
    }
});

/// Raw defaults for the CLI. Durations and stages stay as strings here and are
/// parsed by [`crate::stages`] so that flags and env share one grammar.
pub struct Config {
    pub target_url: String,
    pub stages: String,
    pub think_time: String,
    pub latency_threshold: String,
    pub request_timeout: String,
    pub stub_addr: String,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
