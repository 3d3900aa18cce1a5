pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
