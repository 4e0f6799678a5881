pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod integrations;
pub mod store;
