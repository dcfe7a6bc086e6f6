//! Typed messages of the serialosc discovery protocol and the device protocol.
//!
//! Discovery (to and from the serialosc daemon):
//! ```text
//! → /serialosc/list   [host, port]        enumerate devices
//! → /serialosc/notify [host, port]        next add/remove goes to host:port
//! ← /serialosc/device [id, type, port]    one per connected device
//! ← /serialosc/add    [id, type, port]
//! ← /serialosc/remove [id, type, port]
//! ```
//!
//! Device (to and from one device's control port). Outbound LED commands and
//! inbound input events carry the session prefix; `/sys/*` messages do not.
//! ```text
//! → /{prefix}/ring/set|all|map|range     arc LEDs
//! → /{prefix}/led/set|all|map|row|col    grid LEDs (binary, bit-packed)
//! → /{prefix}/led/intensity
//! → /{prefix}/led/level/set|all|map|row|col
//! ← /{prefix}/enc/delta [ring, delta]
//! ← /{prefix}/enc/key   [ring, down]
//! ← /{prefix}/grid/key  [x, y, down]
//! ```

use crate::domain::device::DeviceDescriptor;
use crate::protocol::osc::{int_value, message, str_value, OscMessage, OscType, ProtocolError};

// ── Addresses ─────────────────────────────────────────────────────────────────

pub const ADDR_LIST: &str = "/serialosc/list";
pub const ADDR_NOTIFY: &str = "/serialosc/notify";
pub const ADDR_DEVICE: &str = "/serialosc/device";
pub const ADDR_ADD: &str = "/serialosc/add";
pub const ADDR_REMOVE: &str = "/serialosc/remove";

pub const ADDR_SYS_PORT: &str = "/sys/port";
pub const ADDR_SYS_PREFIX: &str = "/sys/prefix";

/// Cells covered by one bit-packed byte in grid row/column/map commands.
pub const CELLS_PER_PACKED_BYTE: usize = 8;

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Requests sent to the discovery daemon. `host`/`port` name where replies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryRequest {
    List { host: String, port: u16 },
    Notify { host: String, port: u16 },
}

impl DiscoveryRequest {
    pub fn to_osc(&self) -> OscMessage {
        let (address, host, port) = match self {
            DiscoveryRequest::List { host, port } => (ADDR_LIST, host, port),
            DiscoveryRequest::Notify { host, port } => (ADDR_NOTIFY, host, port),
        };
        message(
            address,
            vec![OscType::String(host.clone()), OscType::Int(i32::from(*port))],
        )
    }
}

/// Registration messages pushed by the discovery daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryNotice {
    /// Reply to a list request.
    Device(DeviceDescriptor),
    /// A device was plugged in.
    Added(DeviceDescriptor),
    /// A device was unplugged.
    Removed(DeviceDescriptor),
}

impl DiscoveryNotice {
    pub fn from_osc(msg: &OscMessage) -> Result<Self, ProtocolError> {
        let wrap: fn(DeviceDescriptor) -> DiscoveryNotice = match msg.addr.as_str() {
            ADDR_DEVICE => DiscoveryNotice::Device,
            ADDR_ADD => DiscoveryNotice::Added,
            ADDR_REMOVE => DiscoveryNotice::Removed,
            other => return Err(ProtocolError::UnrecognizedAddress(other.to_string())),
        };
        let id = str_arg(msg, 0)?;
        let device_type = str_arg(msg, 1)?;
        let port = int_arg(msg, 2)?;
        let port = u16::try_from(port).map_err(|_| mismatch(msg, format!("port {port} out of range")))?;
        Ok(wrap(DeviceDescriptor::from_registration(id, device_type, port)))
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        match self {
            DiscoveryNotice::Device(d) | DiscoveryNotice::Added(d) | DiscoveryNotice::Removed(d) => d,
        }
    }
}

// ── Device commands ───────────────────────────────────────────────────────────

/// Outbound messages to one device.
///
/// Arguments are not validated here; sessions check them against the device
/// geometry before building a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Route subsequent device output to this local port.
    SysPort(u16),
    /// Prefix used on all subsequent prefixed messages.
    SysPrefix(String),

    RingSet { ring: usize, led: usize, level: u8 },
    RingAll { ring: usize, level: u8 },
    RingMap { ring: usize, levels: Vec<u8> },
    /// Inclusive, wrapping clockwise when `from > to`.
    RingRange { ring: usize, from: usize, to: usize, level: u8 },

    LedSet { x: usize, y: usize, on: bool },
    LedAll { on: bool },
    /// Eight bit-packed rows of an 8×8 quad.
    LedMap { x_offset: usize, y_offset: usize, rows: [u8; 8] },
    /// Bit-packed bytes, one per 8 columns starting at `x_offset`.
    LedRow { x_offset: usize, y: usize, data: Vec<u8> },
    /// Bit-packed bytes, one per 8 rows starting at `y_offset`.
    LedCol { x: usize, y_offset: usize, data: Vec<u8> },
    LedIntensity(u8),
    LedLevelSet { x: usize, y: usize, level: u8 },
    LedLevelAll(u8),
    /// 64 levels of an 8×8 quad, row-major.
    LedLevelMap { x_offset: usize, y_offset: usize, levels: Vec<u8> },
    LedLevelRow { x_offset: usize, y: usize, levels: Vec<u8> },
    LedLevelCol { x: usize, y_offset: usize, levels: Vec<u8> },
}

impl DeviceCommand {
    /// Builds the wire message, placing `prefix` in front of LED addresses.
    pub fn to_osc(&self, prefix: &str) -> OscMessage {
        let p = |suffix: &str| prefixed(prefix, suffix);
        match self {
            DeviceCommand::SysPort(port) => {
                message(ADDR_SYS_PORT, vec![OscType::Int(i32::from(*port))])
            }
            DeviceCommand::SysPrefix(new_prefix) => {
                message(ADDR_SYS_PREFIX, vec![OscType::String(new_prefix.clone())])
            }
            DeviceCommand::RingSet { ring, led, level } => {
                message(p("ring/set"), ints(&[*ring, *led, usize::from(*level)]))
            }
            DeviceCommand::RingAll { ring, level } => {
                message(p("ring/all"), ints(&[*ring, usize::from(*level)]))
            }
            DeviceCommand::RingMap { ring, levels } => {
                message(p("ring/map"), with_levels(&[*ring], levels))
            }
            DeviceCommand::RingRange { ring, from, to, level } => message(
                p("ring/range"),
                ints(&[*ring, *from, *to, usize::from(*level)]),
            ),
            DeviceCommand::LedSet { x, y, on } => {
                message(p("led/set"), ints(&[*x, *y, usize::from(*on)]))
            }
            DeviceCommand::LedAll { on } => {
                message(p("led/all"), ints(&[usize::from(*on)]))
            }
            DeviceCommand::LedMap { x_offset, y_offset, rows } => {
                message(p("led/map"), with_levels(&[*x_offset, *y_offset], rows))
            }
            DeviceCommand::LedRow { x_offset, y, data } => {
                message(p("led/row"), with_levels(&[*x_offset, *y], data))
            }
            DeviceCommand::LedCol { x, y_offset, data } => {
                message(p("led/col"), with_levels(&[*x, *y_offset], data))
            }
            DeviceCommand::LedIntensity(level) => {
                message(p("led/intensity"), ints(&[usize::from(*level)]))
            }
            DeviceCommand::LedLevelSet { x, y, level } => message(
                p("led/level/set"),
                ints(&[*x, *y, usize::from(*level)]),
            ),
            DeviceCommand::LedLevelAll(level) => {
                message(p("led/level/all"), ints(&[usize::from(*level)]))
            }
            DeviceCommand::LedLevelMap { x_offset, y_offset, levels } => message(
                p("led/level/map"),
                with_levels(&[*x_offset, *y_offset], levels),
            ),
            DeviceCommand::LedLevelRow { x_offset, y, levels } => message(
                p("led/level/row"),
                with_levels(&[*x_offset, *y], levels),
            ),
            DeviceCommand::LedLevelCol { x, y_offset, levels } => message(
                p("led/level/col"),
                with_levels(&[*x, *y_offset], levels),
            ),
        }
    }
}

/// Packs on/off cells into bytes, bit `i` of byte `k` = cell `8k + i`.
pub fn pack_cells(cells: &[bool]) -> Vec<u8> {
    cells
        .chunks(CELLS_PER_PACKED_BYTE)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .filter(|(_, on)| **on)
                .fold(0u8, |byte, (bit, _)| byte | (1 << bit))
        })
        .collect()
}

// ── Device input ──────────────────────────────────────────────────────────────

/// Raw input events reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceInput {
    /// `/{prefix}/enc/delta [ring, delta]`
    EncoderDelta { ring: usize, delta: i32 },
    /// `/{prefix}/enc/key [ring, down]`
    EncoderKey { ring: usize, down: bool },
    /// `/{prefix}/grid/key [x, y, down]`
    GridKey { x: usize, y: usize, down: bool },
}

/// Anything a device may send back to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceNotice {
    Input(DeviceInput),
    /// `/sys/*` replies (id, size, host, port, prefix, rotation).
    System(OscMessage),
}

impl DeviceNotice {
    /// Classifies an inbound message for a session using `prefix`.
    pub fn from_osc(msg: &OscMessage, prefix: &str) -> Result<Self, ProtocolError> {
        if msg.addr.starts_with("/sys/") {
            return Ok(DeviceNotice::System(msg.clone()));
        }
        let input = match strip_prefix(&msg.addr, prefix) {
            Some("enc/delta") => DeviceInput::EncoderDelta {
                ring: index_arg(msg, 0)?,
                delta: int_arg(msg, 1)?,
            },
            Some("enc/key") => DeviceInput::EncoderKey {
                ring: index_arg(msg, 0)?,
                down: int_arg(msg, 1)? != 0,
            },
            Some("grid/key") => DeviceInput::GridKey {
                x: index_arg(msg, 0)?,
                y: index_arg(msg, 1)?,
                down: int_arg(msg, 2)? != 0,
            },
            _ => return Err(ProtocolError::UnrecognizedAddress(msg.addr.clone())),
        };
        Ok(DeviceNotice::Input(input))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn prefixed(prefix: &str, suffix: &str) -> String {
    format!("/{}/{}", prefix.trim_matches('/'), suffix)
}

fn strip_prefix<'a>(address: &'a str, prefix: &str) -> Option<&'a str> {
    address
        .strip_prefix('/')?
        .strip_prefix(prefix.trim_matches('/'))?
        .strip_prefix('/')
}

fn ints(values: &[usize]) -> Vec<OscType> {
    values.iter().map(|&v| OscType::Int(v as i32)).collect()
}

fn with_levels(head: &[usize], levels: &[u8]) -> Vec<OscType> {
    let mut args = ints(head);
    args.extend(levels.iter().map(|&l| OscType::Int(i32::from(l))));
    args
}

fn mismatch(msg: &OscMessage, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::ArgumentMismatch {
        address: msg.addr.clone(),
        reason: reason.into(),
    }
}

fn int_arg(msg: &OscMessage, i: usize) -> Result<i32, ProtocolError> {
    msg.args
        .get(i)
        .and_then(int_value)
        .ok_or_else(|| mismatch(msg, format!("argument {i} must be an integer")))
}

fn index_arg(msg: &OscMessage, i: usize) -> Result<usize, ProtocolError> {
    let value = int_arg(msg, i)?;
    usize::try_from(value).map_err(|_| mismatch(msg, format!("argument {i} is negative ({value})")))
}

fn str_arg(msg: &OscMessage, i: usize) -> Result<&str, ProtocolError> {
    msg.args
        .get(i)
        .and_then(str_value)
        .ok_or_else(|| mismatch(msg, format!("argument {i} must be a string")))
}
