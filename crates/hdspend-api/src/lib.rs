//! hdspend HTTP API
//!
//! Network collaborators backed by the wallet data API, plus the TOML
//! configuration that wires discovery and signing together.
//!
//! # Example
//!
//! ```ignore
//! use hdspend_api::EngineConfig;
//!
//! let mut config = EngineConfig::from_file(Path::new("hdspend.toml"))?;
//! config.apply_env_overrides();
//! config.validate()?;
//!
//! let discovery = config.account_discovery()?;
//! let used = discovery.discover_accounts(config.discovery.batch_size, &deriver).await?;
//! ```

pub mod client;
pub mod config;
pub mod models;

pub use client::{ApiClient, DEFAULT_TIMEOUT};
pub use config::EngineConfig;
