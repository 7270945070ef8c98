//! Configuration and request models

pub mod config;
pub mod models;
