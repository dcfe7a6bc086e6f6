//! serialosc device discovery.
//!
//! The client binds a UDP socket on the listen port (default 12003), sends
//! `/serialosc/list` to the serialosc daemon (default `127.0.0.1:12002`), and
//! keeps the set of connected devices up to date from the replies:
//!
//! 1. `/serialosc/device` and `/serialosc/add` insert a descriptor if it is
//!    not already listed.
//! 2. `/serialosc/remove` deletes the descriptor with the same
//!    `(id, model, port)`; a removal that matches nothing is logged as a
//!    warning and otherwise ignored.
//! 3. After every notification the client re-sends `/serialosc/notify`,
//!    because serialosc only reports the *next* hot-plug event to a
//!    registered listener.
//!
//! The listener runs on a dedicated thread with a blocking socket, so it
//! works the same whether or not the caller has an async runtime.
//!
//! # Read timeout
//!
//! The socket is configured with a 500 ms read timeout. On each timeout the
//! loop checks the `running` flag; dropping the [`DiscoveryClient`] clears it
//! and the thread exits on its next wake-up.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use monome_core::protocol::messages::{DiscoveryNotice, DiscoveryRequest};
use monome_core::protocol::osc::{decode_packet, encode_message, ProtocolError};
use monome_core::{DeviceClass, DeviceDescriptor};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How long a blocking `recv_from` waits before re-checking the running flag.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Sleep between polls of the device list in [`DiscoveryClient::await_at_least_one`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Error type for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// No device was registered before the timeout elapsed.
    #[error("no devices found within {0:?}")]
    NoDevicesFound(Duration),

    /// [`DiscoveryClient::interrupt`] was called while waiting.
    #[error("discovery wait interrupted")]
    Interrupted,

    /// Sending a request or starting the listener failed.
    #[error("discovery I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request could not be encoded.
    #[error("discovery request encoding failed: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Where the discovery daemon lives and where its replies should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Host of the serialosc daemon.
    pub server_host: String,
    /// Port of the serialosc daemon.
    pub server_port: u16,
    /// Local host serialosc should reply to.
    pub listen_host: String,
    /// Local port to bind; `0` lets the OS choose.
    pub listen_port: u16,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 12002,
            listen_host: "127.0.0.1".to_string(),
            listen_port: 12003,
        }
    }
}

/// State shared between the client handle and its listener thread.
struct Shared {
    devices: Mutex<Vec<DeviceDescriptor>>,
    running: AtomicBool,
    interrupted: AtomicBool,
}

impl Shared {
    fn devices(&self) -> std::sync::MutexGuard<'_, Vec<DeviceDescriptor>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Live view of the devices registered with serialosc.
pub struct DiscoveryClient {
    shared: Arc<Shared>,
    local_port: u16,
}

impl DiscoveryClient {
    /// Binds the listen socket, starts the listener thread, and sends the
    /// initial `/serialosc/list` request.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::BindFailed`] if the socket cannot be bound,
    /// [`DiscoveryError::Protocol`] if a request cannot be encoded, and
    /// [`DiscoveryError::Io`] if the request cannot be sent or the thread
    /// cannot be spawned.
    pub fn start(options: DiscoveryOptions) -> Result<Self, DiscoveryError> {
        let addr = format!("{}:{}", options.listen_host, options.listen_port);
        let socket = UdpSocket::bind(addr.as_str())
            .map_err(|source| DiscoveryError::BindFailed { addr, source })?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let local_port = socket.local_addr()?.port();

        let shared = Arc::new(Shared {
            devices: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
            interrupted: AtomicBool::new(false),
        });

        let server = (options.server_host.clone(), options.server_port);
        let notify = encode_message(
            &DiscoveryRequest::Notify {
                host: options.listen_host.clone(),
                port: local_port,
            }
            .to_osc(),
        )?;
        let list = encode_message(
            &DiscoveryRequest::List {
                host: options.listen_host.clone(),
                port: local_port,
            }
            .to_osc(),
        )?;

        let listener = socket.try_clone()?;
        let thread_shared = Arc::clone(&shared);
        std::thread::Builder::new()
            .name("monome-discovery".to_string())
            .spawn(move || listen_loop(listener, thread_shared, server, notify))?;

        socket.send_to(&list, (options.server_host.as_str(), options.server_port))?;
        info!(
            "discovery listening on UDP port {local_port}, serialosc at {}:{}",
            options.server_host, options.server_port
        );

        Ok(Self { shared, local_port })
    }

    /// The UDP port serialosc replies to.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Snapshot of the devices currently registered.
    pub fn list_available(&self) -> Vec<DeviceDescriptor> {
        self.shared.devices().clone()
    }

    /// The first registered device of `class`, if any.
    pub fn find(&self, class: DeviceClass) -> Option<DeviceDescriptor> {
        self.shared
            .devices()
            .iter()
            .find(|d| d.device_class() == Some(class))
            .cloned()
    }

    /// Blocks until at least one device is registered and returns them all.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::NoDevicesFound`] when `timeout` elapses with an empty
    /// list; [`DiscoveryError::Interrupted`] when [`interrupt`](Self::interrupt)
    /// is called first.
    pub fn await_at_least_one(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, DiscoveryError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.shared.interrupted.swap(false, Ordering::AcqRel) {
                return Err(DiscoveryError::Interrupted);
            }
            let devices = self.list_available();
            if !devices.is_empty() {
                return Ok(devices);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(DiscoveryError::NoDevicesFound(timeout));
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Wakes a pending (or the next) [`await_at_least_one`](Self::await_at_least_one)
    /// with [`DiscoveryError::Interrupted`].
    pub fn interrupt(&self) {
        self.shared.interrupted.store(true, Ordering::Release);
    }
}

impl Drop for DiscoveryClient {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
    }
}

/// The receive loop executed on the discovery thread.
fn listen_loop(socket: UdpSocket, shared: Arc<Shared>, server: (String, u16), notify: Vec<u8>) {
    let mut buf = vec![0u8; 4096];

    while shared.running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                error!("discovery recv error: {e}");
                continue;
            }
        };

        let msgs = match decode_packet(&buf[..len]) {
            Ok(msgs) => msgs,
            Err(e) => {
                debug!("failed to decode discovery datagram from {src}: {e}");
                continue;
            }
        };

        for msg in &msgs {
            match DiscoveryNotice::from_osc(msg) {
                Ok(notice) => {
                    apply_notice(&mut shared.devices(), &notice);
                    if let Err(e) = socket.send_to(&notify, (server.0.as_str(), server.1)) {
                        warn!("failed to re-register with serialosc: {e}");
                    }
                }
                Err(e) => warn!("ignoring discovery message from {src}: {e}"),
            }
        }
    }

    info!("discovery listener stopped");
}

/// Applies one notification to the device list.
///
/// Returns `false` for a removal that matched no listed device.
fn apply_notice(devices: &mut Vec<DeviceDescriptor>, notice: &DiscoveryNotice) -> bool {
    match notice {
        DiscoveryNotice::Device(desc) | DiscoveryNotice::Added(desc) => {
            if !devices.iter().any(|d| d.same_registration(desc)) {
                info!("device available: {desc}");
                devices.push(desc.clone());
            }
            true
        }
        DiscoveryNotice::Removed(desc) => match devices.iter().position(|d| d.same_registration(desc)) {
            Some(i) => {
                info!("device removed: {desc}");
                devices.remove(i);
                true
            }
            None => {
                warn!("removal of unlisted device {desc}");
                false
            }
        },
    }
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
pub(crate) fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
