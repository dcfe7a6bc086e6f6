//! Physical layout of a device and validation of LED write arguments.
//!
//! Both device classes are modelled as `units × cells_per_unit`:
//!
//! | class | unit   | cell          | control count   |
//! |-------|--------|---------------|-----------------|
//! | arc   | ring   | LED on ring   | rings           |
//! | grid  | row y  | column x      | width × height  |
//!
//! All checks here run before any message is built, so an invalid write
//! never reaches the wire.

use crate::domain::device::DeviceClass;
use crate::domain::error::ControlError;

/// Highest brightness a device accepts. Levels are `0..=MAX_LEVEL`.
pub const MAX_LEVEL: u8 = 15;

/// Default number of rings on an arc.
pub const DEFAULT_RING_COUNT: usize = 4;
/// Default number of LEDs per arc ring.
pub const DEFAULT_LED_COUNT: usize = 64;
/// Default grid width.
pub const DEFAULT_GRID_WIDTH: usize = 16;
/// Default grid height.
pub const DEFAULT_GRID_HEIGHT: usize = 8;

/// Dimensions of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    class: DeviceClass,
    units: usize,
    cells_per_unit: usize,
}

impl Geometry {
    /// An arc with `rings` encoders of `leds` LEDs each.
    pub fn arc(rings: usize, leds: usize) -> Self {
        Self {
            class: DeviceClass::Arc,
            units: rings,
            cells_per_unit: leds,
        }
    }

    /// A grid `width` cells wide and `height` cells tall.
    pub fn grid(width: usize, height: usize) -> Self {
        Self {
            class: DeviceClass::Grid,
            units: height,
            cells_per_unit: width,
        }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// Rings on an arc, rows on a grid.
    pub fn units(&self) -> usize {
        self.units
    }

    /// LEDs per ring on an arc, columns on a grid.
    pub fn cells_per_unit(&self) -> usize {
        self.cells_per_unit
    }

    /// Number of independently bindable controls: rings, or grid buttons.
    pub fn control_count(&self) -> usize {
        match self.class {
            DeviceClass::Arc => self.units,
            DeviceClass::Grid => self.units * self.cells_per_unit,
        }
    }

    pub fn width(&self) -> usize {
        self.cells_per_unit
    }

    pub fn height(&self) -> usize {
        self.units
    }

    /// Row-major control index of grid cell `(x, y)`.
    pub fn control_index(&self, x: usize, y: usize) -> Result<usize, ControlError> {
        if x >= self.cells_per_unit || y >= self.units {
            return Err(ControlError::IndexOutOfRange {
                kind: "cell",
                index: y.saturating_mul(self.cells_per_unit).saturating_add(x),
                len: self.control_count(),
            });
        }
        Ok(y * self.cells_per_unit + x)
    }

    /// Inverse of [`Geometry::control_index`].
    pub fn control_position(&self, index: usize) -> (usize, usize) {
        let width = self.cells_per_unit.max(1);
        (index % width, index / width)
    }

    // ── Validation ────────────────────────────────────────────────────────────

    pub fn validate_unit(&self, unit: usize) -> Result<(), ControlError> {
        if unit >= self.units {
            return Err(ControlError::invalid(format!(
                "unit {unit} outside 0..{}",
                self.units
            )));
        }
        Ok(())
    }

    pub fn validate_cell(&self, unit: usize, index: usize) -> Result<(), ControlError> {
        self.validate_unit(unit)?;
        if index >= self.cells_per_unit {
            return Err(ControlError::invalid(format!(
                "cell {index} outside 0..{}",
                self.cells_per_unit
            )));
        }
        Ok(())
    }

    pub fn validate_level(&self, level: u8) -> Result<(), ControlError> {
        validate_level(level)
    }

    /// Checks an inclusive range `from..=to` on one unit.
    pub fn validate_range(&self, unit: usize, from: usize, to: usize) -> Result<(), ControlError> {
        self.validate_cell(unit, from)?;
        self.validate_cell(unit, to)?;
        // Arc ranges wrap clockwise past the last LED; grid ranges do not.
        if self.class == DeviceClass::Grid && from > to {
            return Err(ControlError::invalid(format!(
                "range start {from} is after end {to}"
            )));
        }
        Ok(())
    }

    /// Checks that `levels` is a complete frame for one unit.
    pub fn validate_map(&self, unit: usize, levels: &[u8]) -> Result<(), ControlError> {
        self.validate_unit(unit)?;
        if levels.len() != self.cells_per_unit {
            return Err(ControlError::invalid(format!(
                "map needs exactly {} levels, got {}",
                self.cells_per_unit,
                levels.len()
            )));
        }
        levels.iter().try_for_each(|&l| validate_level(l))
    }
}

/// Checks a brightness value against `0..=MAX_LEVEL`.
pub fn validate_level(level: u8) -> Result<(), ControlError> {
    if level > MAX_LEVEL {
        return Err(ControlError::invalid(format!(
            "level {level} outside 0..={MAX_LEVEL}"
        )));
    }
    Ok(())
}

impl Default for Geometry {
    fn default() -> Self {
        Self::arc(DEFAULT_RING_COUNT, DEFAULT_LED_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_control_count_is_ring_count() {
        let g = Geometry::arc(4, 64);
        assert_eq!(g.control_count(), 4);
        assert_eq!(g.cells_per_unit(), 64);
    }

    #[test]
    fn test_grid_control_count_is_every_button() {
        let g = Geometry::grid(16, 8);
        assert_eq!(g.control_count(), 128);
        assert_eq!(g.units(), 8);
        assert_eq!(g.width(), 16);
    }

    #[test]
    fn test_control_index_and_position_are_inverse() {
        // Arrange
        let g = Geometry::grid(16, 8);

        // Act
        let index = g.control_index(5, 3).expect("in range");

        // Assert
        assert_eq!(index, 53);
        assert_eq!(g.control_position(index), (5, 3));
    }

    #[test]
    fn test_control_index_out_of_bounds() {
        let g = Geometry::grid(8, 8);
        assert!(matches!(
            g.control_index(8, 0),
            Err(ControlError::IndexOutOfRange { kind: "cell", .. })
        ));
    }

    #[test]
    fn test_validate_cell_rejects_bad_unit_and_cell() {
        let g = Geometry::arc(4, 64);
        assert!(g.validate_cell(3, 63).is_ok());
        assert!(matches!(g.validate_cell(4, 0), Err(ControlError::InvalidArgument(_))));
        assert!(matches!(g.validate_cell(0, 64), Err(ControlError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_level_bounds() {
        assert!(validate_level(0).is_ok());
        assert!(validate_level(MAX_LEVEL).is_ok());
        assert!(matches!(validate_level(16), Err(ControlError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_map_requires_exact_length_and_levels() {
        let g = Geometry::arc(4, 64);
        assert!(g.validate_map(0, &[0; 64]).is_ok());
        assert!(g.validate_map(0, &[0; 63]).is_err());
        assert!(g.validate_map(0, &[0; 65]).is_err());
        let mut bad = [0u8; 64];
        bad[10] = 16;
        assert!(g.validate_map(0, &bad).is_err());
    }

    #[test]
    fn test_arc_range_may_wrap_but_grid_range_may_not() {
        assert!(Geometry::arc(4, 64).validate_range(0, 60, 4).is_ok());
        assert!(Geometry::grid(16, 8).validate_range(0, 10, 4).is_err());
    }
}
