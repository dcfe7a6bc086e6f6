//! # monome-core
//!
//! Shared library for monome-ui containing the OSC codec, the typed
//! serialosc messages, and the interaction model for arc and grid devices.
//!
//! This crate has no dependencies on sockets, threads, or OS APIs; the
//! `monome-ui` crate supplies the UDP transport.
//!
//! # Architecture overview
//!
//! A monome device (an *arc* of LED rings or a *grid* of lit buttons) is
//! driven over OSC through the serialosc daemon:
//!
//! - **`protocol`** – How bytes travel over the network. `osc` wraps `rosc`
//!   for OSC 1.0 packets; `messages` gives the discovery and device messages
//!   typed Rust shapes.
//!
//! - **`domain`** – What the controls do. A [`Ring`] turns encoder deltas into
//!   a position and an LED frame; a [`Key`] turns presses into state. Both are
//!   drawn through the [`LedSurface`] trait, which validates every write
//!   against the device [`Geometry`] before anything is sent.

pub mod domain;
pub mod protocol;

pub use domain::device::{DeviceClass, DeviceDescriptor};
pub use domain::error::ControlError;
pub use domain::geometry::{validate_level, Geometry, MAX_LEVEL};
pub use domain::key::{GridLevels, Key, KeyMode, KeyOutcome};
pub use domain::ring::{scale_delta, Ring, RingLevels, RingMode, RingUpdate};
pub use domain::surface::LedSurface;
pub use protocol::messages::{
    DeviceCommand, DeviceInput, DeviceNotice, DiscoveryNotice, DiscoveryRequest,
};
pub use protocol::osc::{
    decode_packet, encode_bundle, encode_message, int_value, message, str_value, OscMessage,
    OscType, ProtocolError,
};
