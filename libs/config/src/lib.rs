//! # Connector Configuration
//!
//! Centralized configuration and fixed resource budgets for the
//! device-resident data-plane connector, following the shape of the
//! teacher's `config` crate: a typed `ServiceConfig` built from layered
//! `config_crate` sources (a TOML file plus environment overrides), plus
//! a `constants` module for values that are structural limits rather than
//! tunables.

pub mod constants;
pub mod error;
pub mod service;

pub use error::ConfigError;
pub use service::{load_config, RecorderConfig, ServiceConfig};
