pub mod config;
pub mod dataset;
pub mod error;
pub mod label;
pub mod loader;
pub mod plot;
