pub mod analytics;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod export;
pub mod filters;
pub mod matcher;
pub mod models;
pub mod session;
pub mod store;
pub mod transcript;
