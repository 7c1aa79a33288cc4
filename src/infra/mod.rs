// src/infra/mod.rs — Infrastructure: errors, logging, credentials

pub mod config;
pub mod errors;
pub mod logger;
