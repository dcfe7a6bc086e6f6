//! Network infrastructure.
//!
//! # Sub-modules
//!
//! - **`discovery`** – Talks to the serialosc daemon: asks for the device
//!   list, subscribes to hot-plug notices, and keeps a live registry of
//!   attached devices.
//!
//! - **`port_allocator`** – Hands out distinct local UDP ports, one per
//!   device session.
//!
//! - **`session`** – One bound device: performs the `/sys/port` and
//!   `/sys/prefix` handshake, sends LED commands, and dispatches decoded
//!   input to a registered handler from its listener thread.

pub mod discovery;
pub mod port_allocator;
pub mod session;
