//! Arbiter Configuration Module
//!
//! Scoring weights, action speeds, detection bands and artifact paths loaded
//! from TOML, with every value defaulting to the built-in rules.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `BLOCK_ARBITER_CONFIG` environment variable (path to TOML file)
//! 3. `block_arbiter.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The loaded config is an ordinary value: it is handed to the engine and the
//! schedule loader at startup and never mutated afterwards.

mod arbiter_config;
pub mod defaults;
pub mod validation;

pub use arbiter_config::*;
