//! OSC packet encoding and decoding on top of `rosc`.
//!
//! Both serialosc and the devices speak plain OSC 1.0 over UDP. Outbound
//! traffic is always single messages (or an explicit bundle); inbound
//! datagrams may be bundles, which are flattened into their messages in
//! order. Time tags are ignored because serialosc never schedules delivery.

use rosc::{OscBundle, OscPacket, OscTime};
use thiserror::Error;

pub use rosc::{OscMessage, OscType};

/// Errors that can occur while encoding, decoding, or interpreting OSC packets.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The datagram is not a valid OSC packet.
    #[error("malformed OSC packet: {0}")]
    Decode(String),

    /// A message could not be encoded.
    #[error("failed to encode OSC packet: {0}")]
    Encode(String),

    /// The address is not one of the messages this protocol understands.
    #[error("unrecognized address: {0}")]
    UnrecognizedAddress(String),

    /// The address is known but its arguments do not match the expected shape.
    #[error("bad arguments for {address}: {reason}")]
    ArgumentMismatch { address: String, reason: String },
}

/// Shorthand for building a message.
pub fn message(address: impl Into<String>, args: Vec<OscType>) -> OscMessage {
    OscMessage {
        addr: address.into(),
        args,
    }
}

/// Returns an argument as an integer, accepting whole-valued floats and booleans.
pub fn int_value(arg: &OscType) -> Option<i32> {
    match arg {
        OscType::Int(v) => Some(*v),
        OscType::Float(v) if v.fract() == 0.0 => Some(*v as i32),
        OscType::Bool(b) => Some(i32::from(*b)),
        _ => None,
    }
}

pub fn str_value(arg: &OscType) -> Option<&str> {
    match arg {
        OscType::String(s) => Some(s),
        _ => None,
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a single message into an OSC packet.
///
/// # Examples
///
/// ```rust
/// use monome_core::protocol::osc::{decode_packet, encode_message, message, OscType};
///
/// let msg = message("/sys/port", vec![OscType::Int(13001)]);
/// let bytes = encode_message(&msg).unwrap();
/// assert_eq!(bytes.len() % 4, 0);
/// assert_eq!(decode_packet(&bytes).unwrap(), vec![msg]);
/// ```
pub fn encode_message(msg: &OscMessage) -> Result<Vec<u8>, ProtocolError> {
    encode(&OscPacket::Message(msg.clone()))
}

/// Encodes several messages into one bundle with an "immediately" time tag.
pub fn encode_bundle(msgs: &[OscMessage]) -> Result<Vec<u8>, ProtocolError> {
    encode(&OscPacket::Bundle(OscBundle {
        timetag: OscTime {
            seconds: 0,
            fractional: 1,
        },
        content: msgs.iter().cloned().map(OscPacket::Message).collect(),
    }))
}

/// Decodes one datagram into the messages it carries.
///
/// A plain message yields a single-element vector; a bundle yields every
/// nested message in order.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if the packet is truncated or malformed.
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<OscMessage>, ProtocolError> {
    let (_rest, packet) =
        rosc::decoder::decode_udp(bytes).map_err(|e| ProtocolError::Decode(format!("{e:?}")))?;
    let mut out = Vec::new();
    flatten(packet, &mut out);
    Ok(out)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn encode(packet: &OscPacket) -> Result<Vec<u8>, ProtocolError> {
    rosc::encoder::encode(packet).map_err(|e| ProtocolError::Encode(format!("{e:?}")))
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_matches_reference_bytes_for_sys_port() {
        // Arrange
        let msg = message("/sys/port", vec![OscType::Int(13001)]);

        // Act
        let bytes = encode_message(&msg).unwrap();

        // Assert – "/sys/port" is 9 bytes → padded to 12; ",i" → 4; one int → 4
        let mut expected = b"/sys/port\0\0\0,i\0\0".to_vec();
        expected.extend_from_slice(&13001i32.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_decode_mixed_argument_types() {
        // Arrange
        let msg = message(
            "/serialosc/device",
            vec![
                OscType::String("m1000286".into()),
                OscType::String("monome arc 4".into()),
                OscType::Int(16139),
            ],
        );

        // Act
        let decoded = decode_packet(&encode_message(&msg).unwrap()).expect("decode");

        // Assert
        assert_eq!(decoded, vec![msg]);
    }

    #[test]
    fn test_decode_nested_bundle_flattens_messages_in_order() {
        // Arrange
        let a = message("/monome/enc/delta", vec![OscType::Int(0), OscType::Int(3)]);
        let b = message("/monome/enc/delta", vec![OscType::Int(1), OscType::Int(-2)]);
        let c = message("/monome/enc/key", vec![OscType::Int(1), OscType::Int(1)]);
        let inner = OscPacket::Bundle(OscBundle {
            timetag: OscTime { seconds: 0, fractional: 1 },
            content: vec![OscPacket::Message(b.clone()), OscPacket::Message(c.clone())],
        });
        let outer = OscPacket::Bundle(OscBundle {
            timetag: OscTime { seconds: 0, fractional: 1 },
            content: vec![OscPacket::Message(a.clone()), inner],
        });

        // Act
        let decoded = decode_packet(&rosc::encoder::encode(&outer).unwrap()).expect("decode");

        // Assert
        assert_eq!(decoded, vec![a, b, c]);
    }

    #[test]
    fn test_encode_bundle_decodes_back_to_the_same_messages() {
        let msgs = vec![
            message("/monome/ring/all", vec![OscType::Int(0), OscType::Int(0)]),
            message("/monome/ring/all", vec![OscType::Int(1), OscType::Int(15)]),
        ];

        let decoded = decode_packet(&encode_bundle(&msgs).unwrap()).unwrap();

        assert_eq!(decoded, msgs);
    }

    #[test]
    fn test_truncated_packet_is_a_decode_error() {
        // Arrange – drop the last two bytes of the int payload
        let bytes = encode_message(&message("/a", vec![OscType::Int(1)])).unwrap();
        let truncated = &bytes[..bytes.len() - 2];

        // Act
        let result = decode_packet(truncated);

        // Assert
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(decode_packet(b"nope"), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_int_value_accepts_whole_floats_and_bools_only() {
        assert_eq!(int_value(&OscType::Float(3.0)), Some(3));
        assert_eq!(int_value(&OscType::Float(3.5)), None);
        assert_eq!(int_value(&OscType::Bool(true)), Some(1));
        assert_eq!(int_value(&OscType::String("3".into())), None);
    }
}
