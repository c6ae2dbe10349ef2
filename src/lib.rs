pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod feeds;
pub mod geo;
pub mod location;
pub mod logging;
pub mod store;
pub mod ui;
