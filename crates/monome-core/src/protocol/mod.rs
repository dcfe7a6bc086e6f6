//! Protocol module containing the OSC codec and the typed serialosc messages.

pub mod messages;
pub mod osc;

pub use messages::*;
pub use osc::{
    decode_packet, encode_bundle, encode_message, int_value, message, str_value, OscMessage,
    OscType, ProtocolError,
};
