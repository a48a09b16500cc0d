//! Infrastructure layer (adapters/implementations).
//!
//! SQLite persistence, credential hashing, and configuration loading.

pub mod app_config;
pub mod credentials;
pub mod db;
