//! Domain entities for monome devices.
//!
//! Pure interaction logic with no sockets or threads: what a device looks
//! like, how each control variant reacts to input, and how it is drawn.
//! Drawing goes through the [`surface::LedSurface`] trait so the same code
//! drives a real device session or an in-memory recorder in tests.

pub mod device;
pub mod error;
pub mod geometry;
/// Button variants (momentary, toggle, radio).
pub mod key;
/// Encoder variants (bipolar, unipolar, angular, reel).
pub mod ring;
pub mod surface;
