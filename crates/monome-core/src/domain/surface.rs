//! The LED write seam pages draw through.
//!
//! A surface addresses LEDs as `unit × cell` (ring × LED on an arc, row ×
//! column on a grid; see [`Geometry`]). Implementations must validate every
//! argument against their geometry before writing anything, so a rejected
//! call leaves the device untouched.

use crate::domain::error::ControlError;
use crate::domain::geometry::Geometry;

/// Raw LED writes to one device.
pub trait LedSurface: Send + Sync {
    /// Dimensions that bound every other call.
    fn geometry(&self) -> Geometry;

    /// Sets one cell to `level`.
    fn set_cell(&self, unit: usize, index: usize, level: u8) -> Result<(), ControlError>;

    /// Sets the inclusive range `from..=to` on one unit to `level`.
    fn set_range(&self, unit: usize, from: usize, to: usize, level: u8) -> Result<(), ControlError>;

    /// Sets every cell of one unit to `level`.
    fn set_all(&self, unit: usize, level: u8) -> Result<(), ControlError>;

    /// Writes a full frame for one unit. `levels.len()` must equal
    /// `geometry().cells_per_unit()`.
    fn set_map(&self, unit: usize, levels: &[u8]) -> Result<(), ControlError>;
}
