//! Infrastructure layer for the host.
//!
//! Contains the OS-facing adapters: UDP sockets talking to serialosc and to
//! each device, and file-system storage for the TOML config.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `monome_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
