//! The network channel to one bound device.
//!
//! A [`DeviceSession`] is created from a discovery result:
//!
//! 1. Pick the first registered device of the requested class.
//! 2. Bind a fresh local UDP port from the [`PortAllocator`].
//! 3. Handshake: `/sys/port <local port>` then `/sys/prefix <prefix>`, so the
//!    device sends its input to us under our prefix.
//! 4. Start a listener thread that decodes inbound datagrams and forwards
//!    recognised input to the registered [`InputHandler`].
//!
//! Outbound writes go through the [`CommandSink`] seam. Every write is
//! validated against the session [`Geometry`] before any command is sent.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use monome_core::protocol::messages::{pack_cells, DeviceCommand, DeviceInput, DeviceNotice};
use monome_core::protocol::osc::{decode_packet, encode_message, OscMessage, ProtocolError};
use monome_core::{validate_level, ControlError, DeviceClass, DeviceDescriptor, Geometry, LedSurface};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::discovery::{is_timeout_error, DiscoveryClient, DiscoveryError};
use super::port_allocator::PortAllocator;

/// Grid quads and bit-packed bytes both span eight cells.
const QUAD: usize = 8;

/// Error type for opening a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No registered device matches the requested class.
    #[error("no {0} device found")]
    DeviceNotFound(DeviceClass),

    /// Waiting for discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The port allocator has no ports left.
    #[error("local port range exhausted")]
    PortsExhausted,

    /// The local session port could not be bound.
    #[error("failed to bind session socket on port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The `/sys/port` or `/sys/prefix` handshake could not be sent.
    #[error("handshake failed: {0}")]
    Handshake(#[from] ControlError),

    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Delivers device commands to the device.
///
/// The UDP implementation encodes and sends them; tests record them.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSink: Send + Sync {
    fn send(&self, command: &DeviceCommand) -> Result<(), ControlError>;
}

/// The single downstream consumer of a session's input.
pub trait InputHandler: Send + Sync {
    fn on_input(&self, input: DeviceInput);
}

impl<F> InputHandler for F
where
    F: Fn(DeviceInput) + Send + Sync,
{
    fn on_input(&self, input: DeviceInput) {
        self(input)
    }
}

/// [`CommandSink`] over a UDP socket, prefixing LED addresses.
pub struct UdpCommandSink {
    socket: UdpSocket,
    remote: (String, u16),
    prefix: String,
}

impl UdpCommandSink {
    pub fn new(socket: UdpSocket, remote_host: impl Into<String>, remote_port: u16, prefix: impl Into<String>) -> Self {
        Self {
            socket,
            remote: (remote_host.into(), remote_port),
            prefix: prefix.into(),
        }
    }
}

impl CommandSink for UdpCommandSink {
    fn send(&self, command: &DeviceCommand) -> Result<(), ControlError> {
        let bytes = encode_message(&command.to_osc(&self.prefix))
            .map_err(|e| ControlError::Transport(e.to_string()))?;
        self.socket
            .send_to(&bytes, (self.remote.0.as_str(), self.remote.1))
            .map(|_| ())
            .map_err(|e| ControlError::Transport(e.to_string()))
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// What to bind and how to address it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub class: DeviceClass,
    /// Prefix for LED commands and inbound events.
    pub prefix: String,
    pub geometry: Geometry,
    /// Host of the device control ports (where serialosc runs).
    pub device_host: String,
    /// Local host the session socket binds to.
    pub listen_host: String,
}

impl SessionOptions {
    /// Arc session with default geometry and loopback hosts.
    pub fn arc(prefix: impl Into<String>) -> Self {
        Self {
            class: DeviceClass::Arc,
            prefix: prefix.into(),
            geometry: Geometry::default(),
            device_host: "127.0.0.1".to_string(),
            listen_host: "127.0.0.1".to_string(),
        }
    }

    /// Grid session with default geometry and loopback hosts.
    pub fn grid(prefix: impl Into<String>) -> Self {
        Self {
            class: DeviceClass::Grid,
            geometry: Geometry::grid(
                monome_core::domain::geometry::DEFAULT_GRID_WIDTH,
                monome_core::domain::geometry::DEFAULT_GRID_HEIGHT,
            ),
            ..Self::arc(prefix)
        }
    }
}

// ── Inbound dispatch ──────────────────────────────────────────────────────────

/// Classifies inbound messages and hands input to the registered handler.
///
/// Shared between the session handle and its listener thread.
struct Dispatcher {
    prefix: String,
    handler: Mutex<Option<Arc<dyn InputHandler>>>,
}

impl Dispatcher {
    fn dispatch_packet(&self, bytes: &[u8]) {
        match decode_packet(bytes) {
            Ok(msgs) => msgs.iter().for_each(|msg| self.dispatch(msg)),
            Err(e) => warn!("dropping undecodable datagram: {e}"),
        }
    }

    fn dispatch(&self, msg: &OscMessage) {
        match DeviceNotice::from_osc(msg, &self.prefix) {
            Ok(DeviceNotice::Input(input)) => {
                debug!("input: {input:?}");
                // Clone out so the handler may replace itself without deadlocking.
                let handler = self
                    .handler
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match handler {
                    Some(handler) => handler.on_input(input),
                    None => debug!("no input handler registered, dropping {input:?}"),
                }
            }
            Ok(DeviceNotice::System(sys)) => debug!("system reply {} {:?}", sys.addr, sys.args),
            Err(ProtocolError::UnrecognizedAddress(addr)) => warn!("unrecognized message {addr}"),
            Err(e) => warn!("dropping message {}: {e}", msg.addr),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One bound device.
pub struct DeviceSession {
    descriptor: Option<DeviceDescriptor>,
    geometry: Geometry,
    local_port: Option<u16>,
    sink: Arc<dyn CommandSink>,
    dispatcher: Arc<Dispatcher>,
    running: Arc<AtomicBool>,
}

impl DeviceSession {
    /// Binds the first discovered device of `options.class`.
    ///
    /// # Errors
    ///
    /// [`SessionError::DeviceNotFound`] when no listed device has the class;
    /// bind, handshake, and I/O failures otherwise.
    pub fn connect(
        discovery: &DiscoveryClient,
        ports: &PortAllocator,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let descriptor = discovery
            .find(options.class)
            .ok_or(SessionError::DeviceNotFound(options.class))?;
        let port = ports.allocate().ok_or(SessionError::PortsExhausted)?;
        Self::open(descriptor, port, options)
    }

    /// Binds `descriptor` on `local_port` (`0` lets the OS choose).
    pub fn open(descriptor: DeviceDescriptor, local_port: u16, options: SessionOptions) -> Result<Self, SessionError> {
        let socket = UdpSocket::bind((options.listen_host.as_str(), local_port))
            .map_err(|source| SessionError::BindFailed { port: local_port, source })?;
        socket.set_read_timeout(Some(Duration::from_millis(500)))?;
        let local_port = socket.local_addr()?.port();

        let sink = Arc::new(UdpCommandSink::new(
            socket.try_clone()?,
            options.device_host.clone(),
            descriptor.control_port,
            options.prefix.clone(),
        ));
        let mut session = Self::detached(options.geometry, options.prefix.clone(), sink);
        session.descriptor = Some(descriptor);
        session.local_port = Some(local_port);

        session.sink.send(&DeviceCommand::SysPort(local_port))?;
        session.sink.send(&DeviceCommand::SysPrefix(options.prefix))?;

        let dispatcher = Arc::clone(&session.dispatcher);
        let running = Arc::clone(&session.running);
        std::thread::Builder::new()
            .name(format!("monome-session-{local_port}"))
            .spawn(move || listen_loop(socket, dispatcher, running))?;

        if let Some(desc) = &session.descriptor {
            info!("session bound to {desc} on local port {local_port}");
        }
        Ok(session)
    }

    /// A session with no socket: commands go to `sink`, input arrives through
    /// [`dispatch`](Self::dispatch).
    pub fn detached(geometry: Geometry, prefix: impl Into<String>, sink: Arc<dyn CommandSink>) -> Self {
        Self {
            descriptor: None,
            geometry,
            local_port: None,
            sink,
            dispatcher: Arc::new(Dispatcher {
                prefix: prefix.into(),
                handler: Mutex::new(None),
            }),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn descriptor(&self) -> Option<&DeviceDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    pub fn prefix(&self) -> &str {
        &self.dispatcher.prefix
    }

    /// Replaces the input handler. Only one handler is registered at a time.
    pub fn set_handler(&self, handler: Arc<dyn InputHandler>) {
        *self.dispatcher.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub fn clear_handler(&self) {
        *self.dispatcher.handler.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Decodes one datagram and dispatches every message it carries.
    pub fn dispatch_packet(&self, bytes: &[u8]) {
        self.dispatcher.dispatch_packet(bytes);
    }

    /// Dispatches one decoded message. Unrecognized messages are logged and dropped.
    pub fn dispatch(&self, msg: &OscMessage) {
        self.dispatcher.dispatch(msg);
    }

    // ── Grid commands ─────────────────────────────────────────────────────────

    fn require_grid(&self) -> Result<(), ControlError> {
        if self.geometry.class() != DeviceClass::Grid {
            return Err(ControlError::InvalidArgument(format!(
                "command requires a grid, session is bound to an {}",
                self.geometry.class()
            )));
        }
        Ok(())
    }

    fn validate_quad(&self, x_offset: usize, y_offset: usize) -> Result<(), ControlError> {
        if x_offset % QUAD != 0 || y_offset % QUAD != 0 {
            return Err(ControlError::InvalidArgument(format!(
                "quad offset ({x_offset}, {y_offset}) must be a multiple of {QUAD}"
            )));
        }
        self.geometry.validate_cell(y_offset, x_offset)
    }

    /// Checks `len` cells starting at `start` along a line of `extent` cells.
    fn validate_span(start: usize, len: usize, extent: usize) -> Result<(), ControlError> {
        if len == 0 || start.saturating_add(len) > extent {
            return Err(ControlError::InvalidArgument(format!(
                "span of {len} cells from {start} does not fit in {extent}"
            )));
        }
        Ok(())
    }

    /// Binary single LED.
    pub fn led_set(&self, x: usize, y: usize, on: bool) -> Result<(), ControlError> {
        self.require_grid()?;
        self.geometry.validate_cell(y, x)?;
        self.sink.send(&DeviceCommand::LedSet { x, y, on })
    }

    /// Binary whole grid.
    pub fn led_all(&self, on: bool) -> Result<(), ControlError> {
        self.require_grid()?;
        self.sink.send(&DeviceCommand::LedAll { on })
    }

    /// Binary 8×8 quad; `rows[i]` bit `j` is cell `(x_offset + j, y_offset + i)`.
    pub fn led_map(&self, x_offset: usize, y_offset: usize, rows: [u8; 8]) -> Result<(), ControlError> {
        self.require_grid()?;
        self.validate_quad(x_offset, y_offset)?;
        self.sink.send(&DeviceCommand::LedMap { x_offset, y_offset, rows })
    }

    /// Binary row segment starting at `x_offset`.
    pub fn led_row(&self, x_offset: usize, y: usize, cells: &[bool]) -> Result<(), ControlError> {
        self.require_grid()?;
        self.geometry.validate_unit(y)?;
        Self::validate_span(x_offset, cells.len(), self.geometry.width())?;
        self.sink.send(&DeviceCommand::LedRow {
            x_offset,
            y,
            data: pack_cells(cells),
        })
    }

    /// Binary column segment starting at `y_offset`.
    pub fn led_col(&self, x: usize, y_offset: usize, cells: &[bool]) -> Result<(), ControlError> {
        self.require_grid()?;
        self.geometry.validate_cell(0, x)?;
        Self::validate_span(y_offset, cells.len(), self.geometry.height())?;
        self.sink.send(&DeviceCommand::LedCol {
            x,
            y_offset,
            data: pack_cells(cells),
        })
    }

    /// Global brightness of binary output.
    pub fn led_intensity(&self, level: u8) -> Result<(), ControlError> {
        self.require_grid()?;
        validate_level(level)?;
        self.sink.send(&DeviceCommand::LedIntensity(level))
    }

    pub fn led_level_all(&self, level: u8) -> Result<(), ControlError> {
        self.require_grid()?;
        validate_level(level)?;
        self.sink.send(&DeviceCommand::LedLevelAll(level))
    }

    /// Varibright 8×8 quad, 64 levels row-major.
    pub fn led_level_map(&self, x_offset: usize, y_offset: usize, levels: &[u8]) -> Result<(), ControlError> {
        self.require_grid()?;
        self.validate_quad(x_offset, y_offset)?;
        if levels.len() != QUAD * QUAD {
            return Err(ControlError::InvalidArgument(format!(
                "quad map needs {} levels, got {}",
                QUAD * QUAD,
                levels.len()
            )));
        }
        levels.iter().try_for_each(|&l| validate_level(l))?;
        self.sink.send(&DeviceCommand::LedLevelMap {
            x_offset,
            y_offset,
            levels: levels.to_vec(),
        })
    }

    pub fn led_level_row(&self, x_offset: usize, y: usize, levels: &[u8]) -> Result<(), ControlError> {
        self.require_grid()?;
        self.geometry.validate_unit(y)?;
        Self::validate_span(x_offset, levels.len(), self.geometry.width())?;
        levels.iter().try_for_each(|&l| validate_level(l))?;
        self.sink.send(&DeviceCommand::LedLevelRow {
            x_offset,
            y,
            levels: levels.to_vec(),
        })
    }

    pub fn led_level_col(&self, x: usize, y_offset: usize, levels: &[u8]) -> Result<(), ControlError> {
        self.require_grid()?;
        self.geometry.validate_cell(0, x)?;
        Self::validate_span(y_offset, levels.len(), self.geometry.height())?;
        levels.iter().try_for_each(|&l| validate_level(l))?;
        self.sink.send(&DeviceCommand::LedLevelCol {
            x,
            y_offset,
            levels: levels.to_vec(),
        })
    }

    /// Sends one grid row as level/row commands of at most eight cells.
    fn send_grid_row(&self, y: usize, levels: &[u8]) -> Result<(), ControlError> {
        levels.chunks(QUAD).enumerate().try_for_each(|(i, chunk)| {
            self.sink.send(&DeviceCommand::LedLevelRow {
                x_offset: i * QUAD,
                y,
                levels: chunk.to_vec(),
            })
        })
    }
}

impl LedSurface for DeviceSession {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn set_cell(&self, unit: usize, index: usize, level: u8) -> Result<(), ControlError> {
        self.geometry.validate_cell(unit, index)?;
        validate_level(level)?;
        let command = match self.geometry.class() {
            DeviceClass::Arc => DeviceCommand::RingSet { ring: unit, led: index, level },
            DeviceClass::Grid => DeviceCommand::LedLevelSet { x: index, y: unit, level },
        };
        self.sink.send(&command)
    }

    fn set_range(&self, unit: usize, from: usize, to: usize, level: u8) -> Result<(), ControlError> {
        self.geometry.validate_range(unit, from, to)?;
        validate_level(level)?;
        match self.geometry.class() {
            DeviceClass::Arc => self.sink.send(&DeviceCommand::RingRange { ring: unit, from, to, level }),
            DeviceClass::Grid => (from..=to).try_for_each(|x| {
                self.sink.send(&DeviceCommand::LedLevelSet { x, y: unit, level })
            }),
        }
    }

    fn set_all(&self, unit: usize, level: u8) -> Result<(), ControlError> {
        self.geometry.validate_unit(unit)?;
        validate_level(level)?;
        match self.geometry.class() {
            DeviceClass::Arc => self.sink.send(&DeviceCommand::RingAll { ring: unit, level }),
            DeviceClass::Grid => self.send_grid_row(unit, &vec![level; self.geometry.width()]),
        }
    }

    fn set_map(&self, unit: usize, levels: &[u8]) -> Result<(), ControlError> {
        self.geometry.validate_map(unit, levels)?;
        match self.geometry.class() {
            DeviceClass::Arc => self.sink.send(&DeviceCommand::RingMap {
                ring: unit,
                levels: levels.to_vec(),
            }),
            DeviceClass::Grid => self.send_grid_row(unit, levels),
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// The receive loop executed on the session thread.
fn listen_loop(socket: UdpSocket, dispatcher: Arc<Dispatcher>, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; 4096];

    while running.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((len, _src)) => dispatcher.dispatch_packet(&buf[..len]),
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => error!("session recv error: {e}"),
        }
    }

    info!("session listener stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use monome_core::protocol::osc::{message, OscType};
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        commands: Mutex<Vec<DeviceCommand>>,
    }

    impl CommandSink for RecordingSink {
        fn send(&self, command: &DeviceCommand) -> Result<(), ControlError> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        inputs: Mutex<Vec<DeviceInput>>,
    }

    impl InputHandler for RecordingHandler {
        fn on_input(&self, input: DeviceInput) {
            self.inputs.lock().unwrap().push(input);
        }
    }

    fn arc_session(sink: Arc<dyn CommandSink>) -> DeviceSession {
        DeviceSession::detached(Geometry::default(), "monome", sink)
    }

    fn grid_session(sink: Arc<dyn CommandSink>) -> DeviceSession {
        DeviceSession::detached(Geometry::grid(16, 8), "monome", sink)
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn test_invalid_writes_never_reach_the_sink() {
        // Arrange
        let mut sink = MockCommandSink::new();
        sink.expect_send().times(0);
        let session = arc_session(Arc::new(sink));

        // Act / Assert
        assert!(session.set_cell(4, 0, 15).is_err(), "ring out of range");
        assert!(session.set_cell(0, 64, 15).is_err(), "led out of range");
        assert!(session.set_cell(0, 0, 16).is_err(), "level out of range");
        assert!(session.set_all(0, 200).is_err());
        assert!(session.set_range(0, 10, 70, 3).is_err());
        assert!(session.set_map(0, &[0; 63]).is_err());
        assert!(session.set_map(0, &[16; 64]).is_err());
    }

    #[test]
    fn test_arc_set_map_sends_one_ring_map() {
        // Arrange
        let mut sink = MockCommandSink::new();
        sink.expect_send()
            .withf(|cmd| matches!(cmd, DeviceCommand::RingMap { ring: 2, levels } if levels.len() == 64))
            .times(1)
            .returning(|_| Ok(()));
        let session = arc_session(Arc::new(sink));

        // Act
        let result = session.set_map(2, &[7; 64]);

        // Assert
        assert!(result.is_ok());
    }

    #[test]
    fn test_arc_range_may_wrap_past_last_led() {
        let sink = Arc::new(RecordingSink::default());
        let session = arc_session(sink.clone());

        session.set_range(1, 60, 3, 9).unwrap();

        assert_eq!(
            *sink.commands.lock().unwrap(),
            vec![DeviceCommand::RingRange { ring: 1, from: 60, to: 3, level: 9 }]
        );
    }

    #[test]
    fn test_transport_error_is_surfaced() {
        let mut sink = MockCommandSink::new();
        sink.expect_send()
            .returning(|_| Err(ControlError::Transport("unreachable".into())));
        let session = arc_session(Arc::new(sink));

        assert_eq!(
            session.set_all(0, 0),
            Err(ControlError::Transport("unreachable".into()))
        );
    }

    // ── Grid mapping ──────────────────────────────────────────────────────────

    #[test]
    fn test_grid_set_map_is_split_into_eight_cell_rows() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let session = grid_session(sink.clone());
        let levels: Vec<u8> = (0..16).map(|x| x as u8 % 16).collect();

        // Act
        session.set_map(3, &levels).unwrap();

        // Assert
        assert_eq!(
            *sink.commands.lock().unwrap(),
            vec![
                DeviceCommand::LedLevelRow { x_offset: 0, y: 3, levels: levels[..8].to_vec() },
                DeviceCommand::LedLevelRow { x_offset: 8, y: 3, levels: levels[8..].to_vec() },
            ]
        );
    }

    #[test]
    fn test_grid_set_cell_uses_column_and_row() {
        let sink = Arc::new(RecordingSink::default());
        let session = grid_session(sink.clone());

        session.set_cell(2, 11, 10).unwrap();

        assert_eq!(
            *sink.commands.lock().unwrap(),
            vec![DeviceCommand::LedLevelSet { x: 11, y: 2, level: 10 }]
        );
    }

    #[test]
    fn test_grid_range_rejects_reversed_span_before_writing() {
        let sink = Arc::new(RecordingSink::default());
        let session = grid_session(sink.clone());

        assert!(session.set_range(0, 9, 2, 5).is_err());
        assert!(sink.commands.lock().unwrap().is_empty());

        session.set_range(0, 2, 4, 5).unwrap();
        assert_eq!(sink.commands.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_grid_led_row_is_bit_packed() {
        let sink = Arc::new(RecordingSink::default());
        let session = grid_session(sink.clone());
        let mut cells = [false; 16];
        cells[0] = true;
        cells[15] = true;

        session.led_row(0, 7, &cells).unwrap();

        assert_eq!(
            *sink.commands.lock().unwrap(),
            vec![DeviceCommand::LedRow { x_offset: 0, y: 7, data: vec![0x01, 0x80] }]
        );
    }

    #[test]
    fn test_grid_commands_rejected_on_arc_session() {
        let mut sink = MockCommandSink::new();
        sink.expect_send().times(0);
        let session = arc_session(Arc::new(sink));

        assert!(session.led_all(true).is_err());
        assert!(session.led_intensity(8).is_err());
    }

    #[test]
    fn test_grid_quad_offsets_must_be_aligned() {
        let sink = Arc::new(RecordingSink::default());
        let session = grid_session(sink.clone());

        assert!(session.led_map(4, 0, [0; 8]).is_err());
        assert!(session.led_level_map(8, 0, &[1; 63]).is_err());
        assert!(session.led_level_map(16, 0, &[1; 64]).is_err());
        session.led_level_map(8, 0, &[1; 64]).unwrap();
        assert_eq!(sink.commands.lock().unwrap().len(), 1);
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    #[test]
    fn test_dispatch_forwards_recognised_input_to_handler() {
        // Arrange
        let session = arc_session(Arc::new(RecordingSink::default()));
        let handler = Arc::new(RecordingHandler::default());
        session.set_handler(handler.clone());
        let msg = message("/monome/enc/delta", vec![OscType::Int(0), OscType::Int(14)]);

        // Act
        session.dispatch(&msg);

        // Assert
        assert_eq!(
            *handler.inputs.lock().unwrap(),
            vec![DeviceInput::EncoderDelta { ring: 0, delta: 14 }]
        );
    }

    #[test]
    fn test_unrecognised_and_malformed_messages_are_dropped() {
        let session = arc_session(Arc::new(RecordingSink::default()));
        let handler = Arc::new(RecordingHandler::default());
        session.set_handler(handler.clone());

        session.dispatch(&message("/monome/tilt", vec![OscType::Int(0)]));
        session.dispatch(&message("/sys/id", vec![OscType::String("m1".into())]));
        session.dispatch(&message("/monome/enc/delta", vec![]));
        session.dispatch_packet(&[0xde, 0xad]);

        assert!(handler.inputs.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_without_handler_is_a_no_op() {
        let session = arc_session(Arc::new(RecordingSink::default()));
        session.dispatch(&message("/monome/enc/key", vec![OscType::Int(1), OscType::Int(1)]));
    }

    #[test]
    fn test_closure_can_be_used_as_handler() {
        let session = grid_session(Arc::new(RecordingSink::default()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.set_handler(Arc::new(move |input: DeviceInput| sink.lock().unwrap().push(input)));

        let bytes = encode_message(&message(
            "/monome/grid/key",
            vec![OscType::Int(1), OscType::Int(2), OscType::Int(1)],
        ))
        .unwrap();
        session.dispatch_packet(&bytes);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![DeviceInput::GridKey { x: 1, y: 2, down: true }]
        );
    }
}
