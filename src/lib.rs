pub mod app_context;
pub mod common;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod server;
pub mod services;
pub mod store;
