//! Configuration management
//!
//! Node address, key file location and startup peers, seeded from the
//! environment and overridable from the command line.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
