//! Encoder page: one [`Ring`] per encoder of an arc.

use monome_core::{
    scale_delta, ControlError, DeviceClass, DeviceInput, Geometry, LedSurface, Ring, RingLevels,
    RingMode,
};
use tracing::debug;

use super::page::{Page, RouteContext, VariantSpec};
use super::subscribers::Subscribers;

/// Options for an encoder page.
#[derive(Debug, Clone, PartialEq)]
pub struct RingPageSettings {
    pub levels: RingLevels,
    /// Report unipolar rings as `position / N`.
    pub normalise: bool,
    /// Overrides the controller sensitivity for this page.
    pub sensitivity: Option<f64>,
}

impl Default for RingPageSettings {
    fn default() -> Self {
        Self {
            levels: RingLevels::default(),
            normalise: false,
            sensitivity: None,
        }
    }
}

/// A ring moved.
#[derive(Debug, Clone, PartialEq)]
pub struct RingEvent {
    pub page: usize,
    pub ring: usize,
    pub mode: RingMode,
    /// Cells, radians (angular), or a fraction of the ring (normalised unipolar).
    pub position: f64,
    /// Applied delta, in the same unit as `position` (cells for normalised unipolar).
    pub delta: f64,
}

/// An encoder was pushed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderKeyEvent {
    pub page: usize,
    pub ring: usize,
    pub down: bool,
}

/// Events reported by an encoder page.
#[derive(Debug, Clone, PartialEq)]
pub enum ArcEvent {
    Ring(RingEvent),
    Key(EncoderKeyEvent),
}

impl ArcEvent {
    pub fn ring(&self) -> usize {
        match self {
            ArcEvent::Ring(e) => e.ring,
            ArcEvent::Key(e) => e.ring,
        }
    }
}

pub struct RingPage {
    index: usize,
    rings: Vec<Ring>,
    led_count: usize,
    settings: RingPageSettings,
    subscribers: Subscribers<ArcEvent>,
}

impl RingPage {
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn ring(&self, ring: usize) -> Result<&Ring, ControlError> {
        self.rings.get(ring).ok_or(ControlError::IndexOutOfRange {
            kind: "ring",
            index: ring,
            len: self.rings.len(),
        })
    }

    fn ring_mut(&mut self, ring: usize) -> Result<&mut Ring, ControlError> {
        let len = self.rings.len();
        self.rings.get_mut(ring).ok_or(ControlError::IndexOutOfRange {
            kind: "ring",
            index: ring,
            len,
        })
    }

    pub fn settings(&self) -> &RingPageSettings {
        &self.settings
    }

    /// Sets a ring position directly (clamped or wrapped per its mode)
    /// without notifying subscribers.
    pub fn set_position(&mut self, ring: usize, position: i64) -> Result<(), ControlError> {
        let led_count = self.led_count;
        self.ring_mut(ring)?.set_position(position, led_count);
        Ok(())
    }

    /// Sets or clears this page's sensitivity override.
    pub fn set_sensitivity(&mut self, sensitivity: Option<f64>) -> Result<(), ControlError> {
        if let Some(value) = sensitivity {
            validate_sensitivity(value)?;
        }
        self.settings.sensitivity = sensitivity;
        Ok(())
    }

    pub fn set_normalise(&mut self, normalise: bool) {
        self.settings.normalise = normalise;
    }

    fn draw_ring(&self, ring: &Ring, surface: &dyn LedSurface) -> Result<(), ControlError> {
        surface.set_map(ring.index(), &ring.render(self.led_count, self.settings.levels))
    }
}

/// Sensitivity must be a finite, non-negative multiplier.
pub fn validate_sensitivity(value: f64) -> Result<(), ControlError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ControlError::InvalidArgument(format!(
            "sensitivity {value} is not a finite non-negative number"
        )));
    }
    Ok(())
}

impl Page for RingPage {
    type Event = ArcEvent;
    type Settings = RingPageSettings;

    fn build(
        index: usize,
        spec: &VariantSpec,
        geometry: Geometry,
        settings: &RingPageSettings,
    ) -> Result<Self, ControlError> {
        if geometry.class() != DeviceClass::Arc {
            return Err(ControlError::InvalidArgument(format!(
                "encoder page needs an arc, device is a {}",
                geometry.class()
            )));
        }
        if let Some(value) = settings.sensitivity {
            validate_sensitivity(value)?;
        }
        let modes = spec.resolve(geometry.units(), str::parse::<RingMode>)?;
        Ok(Self {
            index,
            rings: modes
                .into_iter()
                .enumerate()
                .map(|(i, mode)| Ring::new(i, mode))
                .collect(),
            led_count: geometry.cells_per_unit(),
            settings: settings.clone(),
            subscribers: Subscribers::new(),
        })
    }

    fn index(&self) -> usize {
        self.index
    }

    fn route(
        &mut self,
        input: DeviceInput,
        ctx: RouteContext<'_>,
        events: &mut Vec<ArcEvent>,
    ) -> Result<(), ControlError> {
        match input {
            DeviceInput::EncoderDelta { ring, delta } => {
                let sensitivity = self.settings.sensitivity.unwrap_or(ctx.sensitivity);
                let scaled = scale_delta(delta, sensitivity);
                let (led_count, normalise, page) = (self.led_count, self.settings.normalise, self.index);
                let unit = self.ring_mut(ring)?;
                if scaled == 0 {
                    return Ok(());
                }
                let update = unit.apply_delta(scaled, led_count);
                let (position, delta) = unit.event_values(update, led_count, normalise);
                events.push(ArcEvent::Ring(RingEvent {
                    page,
                    ring,
                    mode: unit.mode(),
                    position,
                    delta,
                }));
                self.draw_ring(&self.rings[ring], ctx.surface)
            }
            DeviceInput::EncoderKey { ring, down } => {
                self.ring(ring)?;
                events.push(ArcEvent::Key(EncoderKeyEvent {
                    page: self.index,
                    ring,
                    down,
                }));
                Ok(())
            }
            DeviceInput::GridKey { .. } => {
                debug!("encoder page ignoring {input:?}");
                Ok(())
            }
        }
    }

    fn draw(&self, surface: &dyn LedSurface) -> Result<(), ControlError> {
        self.rings
            .iter()
            .try_for_each(|ring| self.draw_ring(ring, surface))
    }

    fn subscribers(&self) -> &Subscribers<ArcEvent> {
        &self.subscribers
    }

    fn subscribers_mut(&mut self) -> &mut Subscribers<ArcEvent> {
        &mut self.subscribers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSurface {
        maps: Mutex<Vec<(usize, Vec<u8>)>>,
    }

    impl LedSurface for RecordingSurface {
        fn geometry(&self) -> Geometry {
            Geometry::default()
        }
        fn set_cell(&self, _: usize, _: usize, _: u8) -> Result<(), ControlError> {
            Ok(())
        }
        fn set_range(&self, _: usize, _: usize, _: usize, _: u8) -> Result<(), ControlError> {
            Ok(())
        }
        fn set_all(&self, _: usize, _: u8) -> Result<(), ControlError> {
            Ok(())
        }
        fn set_map(&self, unit: usize, levels: &[u8]) -> Result<(), ControlError> {
            self.maps.lock().unwrap().push((unit, levels.to_vec()));
            Ok(())
        }
    }

    fn page(spec: &str) -> RingPage {
        RingPage::build(0, &VariantSpec::from(spec), Geometry::default(), &RingPageSettings::default())
            .unwrap()
    }

    fn ctx(surface: &RecordingSurface, sensitivity: f64) -> RouteContext<'_> {
        RouteContext {
            surface,
            sensitivity,
        }
    }

    #[test]
    fn test_build_rejects_grid_geometry() {
        let result = RingPage::build(
            0,
            &VariantSpec::from("bipolar"),
            Geometry::grid(16, 8),
            &RingPageSettings::default(),
        );
        assert!(matches!(result, Err(ControlError::InvalidArgument(_))));
    }

    #[test]
    fn test_build_rejects_short_per_ring_spec() {
        let result = RingPage::build(
            0,
            &VariantSpec::from(["bipolar", "reel"]),
            Geometry::default(),
            &RingPageSettings::default(),
        );
        assert!(matches!(result, Err(ControlError::InvalidArgument(_))));
    }

    #[test]
    fn test_scaled_delta_moves_ring_emits_and_redraws_only_that_ring() {
        // Arrange
        let surface = RecordingSurface::default();
        let mut page = page("bipolar");
        let mut events = Vec::new();

        // Act
        page.route(DeviceInput::EncoderDelta { ring: 2, delta: 14 }, ctx(&surface, 0.5), &mut events)
            .unwrap();

        // Assert
        assert_eq!(page.ring(2).unwrap().position(), 7);
        assert_eq!(
            events,
            vec![ArcEvent::Ring(RingEvent {
                page: 0,
                ring: 2,
                mode: RingMode::Bipolar,
                position: 7.0,
                delta: 7.0,
            })]
        );
        let maps = surface.maps.lock().unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].0, 2);
    }

    #[test]
    fn test_page_override_takes_precedence_over_controller_sensitivity() {
        let surface = RecordingSurface::default();
        let mut page = page("bipolar");
        page.set_sensitivity(Some(2.0)).unwrap();
        let mut events = Vec::new();

        page.route(DeviceInput::EncoderDelta { ring: 0, delta: 3 }, ctx(&surface, 0.5), &mut events)
            .unwrap();

        assert_eq!(page.ring(0).unwrap().position(), 6);
    }

    #[test]
    fn test_single_tick_at_low_sensitivity_moves_one_cell() {
        // Arrange
        let surface = RecordingSurface::default();
        let mut page = page("angular");
        let mut events = Vec::new();

        // Act
        page.route(DeviceInput::EncoderDelta { ring: 0, delta: 1 }, ctx(&surface, 0.1), &mut events)
            .unwrap();
        page.route(DeviceInput::EncoderDelta { ring: 1, delta: -1 }, ctx(&surface, 0.25), &mut events)
            .unwrap();

        // Assert
        assert_eq!(page.ring(0).unwrap().position(), 1);
        assert_eq!(page.ring(1).unwrap().position(), 63);
        assert_eq!(events.len(), 2);
        assert_eq!(surface.maps.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_zero_sensitivity_is_silent() {
        let surface = RecordingSurface::default();
        let mut page = page("angular");
        let mut events = Vec::new();

        page.route(DeviceInput::EncoderDelta { ring: 0, delta: 5 }, ctx(&surface, 0.0), &mut events)
            .unwrap();

        assert!(events.is_empty());
        assert!(surface.maps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_ring_is_index_error() {
        let surface = RecordingSurface::default();
        let mut page = page("bipolar");
        let mut events = Vec::new();

        let result = page.route(DeviceInput::EncoderDelta { ring: 4, delta: 1 }, ctx(&surface, 1.0), &mut events);

        assert_eq!(
            result,
            Err(ControlError::IndexOutOfRange { kind: "ring", index: 4, len: 4 })
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_encoder_key_is_reported() {
        let surface = RecordingSurface::default();
        let mut page = page("reel");
        let mut events = Vec::new();

        page.route(DeviceInput::EncoderKey { ring: 1, down: true }, ctx(&surface, 1.0), &mut events)
            .unwrap();

        assert_eq!(
            events,
            vec![ArcEvent::Key(EncoderKeyEvent { page: 0, ring: 1, down: true })]
        );
    }

    #[test]
    fn test_normalised_unipolar_reports_fraction() {
        let surface = RecordingSurface::default();
        let mut page = page("unipolar");
        page.set_normalise(true);
        let mut events = Vec::new();

        page.route(DeviceInput::EncoderDelta { ring: 0, delta: 32 }, ctx(&surface, 1.0), &mut events)
            .unwrap();

        let ArcEvent::Ring(event) = &events[0] else {
            panic!("expected ring event");
        };
        assert_eq!(event.position, 0.5);
    }

    #[test]
    fn test_set_position_applies_mode_rule_without_events() {
        let mut page = RingPage::build(
            0,
            &VariantSpec::from(["bipolar", "unipolar", "angular", "reel"]),
            Geometry::default(),
            &RingPageSettings::default(),
        )
        .unwrap();

        page.set_position(1, 500).unwrap();
        page.set_position(2, -1).unwrap();

        assert_eq!(page.ring(1).unwrap().position(), 64);
        assert_eq!(page.ring(2).unwrap().position(), 63);
        assert!(page.set_position(9, 0).is_err());
    }

    #[test]
    fn test_draw_is_idempotent() {
        let surface = RecordingSurface::default();
        let mut page = page("unipolar");
        page.set_position(3, 20).unwrap();

        page.draw(&surface).unwrap();
        page.draw(&surface).unwrap();

        let maps = surface.maps.lock().unwrap();
        assert_eq!(maps.len(), 8);
        assert_eq!(maps[..4], maps[4..]);
    }
}
