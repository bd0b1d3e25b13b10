// Library for the binary and the integration tests

pub mod activity;
pub mod api;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod logtail;
pub mod models;
pub mod rate_limit;
pub mod reconcile;
pub mod series;
pub mod session;
pub mod store;
