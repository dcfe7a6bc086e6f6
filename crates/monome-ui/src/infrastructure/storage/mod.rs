//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration file from the
//! platform-appropriate directory (or a path given on the command line),
//! fills in defaults for anything missing, and can write it back.

pub mod config;
