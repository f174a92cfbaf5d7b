pub mod checks;
pub mod config;
pub mod data_models;
pub mod metrics;
pub mod scenario;
pub mod scheduler;
pub mod stages;
pub mod stub;
