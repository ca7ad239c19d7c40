pub mod api;
pub mod app_state;
pub mod config;
pub mod entities;
pub mod extractor;
pub mod fetcher;
pub mod health;
pub mod notifier;
pub mod orchestrator;
pub mod remote;
pub mod repositories;
pub mod telemetry;
