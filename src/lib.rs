pub mod config;
pub mod errors;
pub mod generator;
pub mod host;
pub mod ingestor;
pub mod models;
pub mod services;
pub mod sources;
pub mod transport;
pub mod utils;
