pub mod api;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod ml;
pub mod telemetry;
