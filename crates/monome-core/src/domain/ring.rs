//! Encoder ring variants.
//!
//! Each ring owns an integer position on an `N`-cell LED ring (64 on current
//! hardware). The variant decides how a delta moves the position, what value
//! subscribers see, and what frame is drawn:
//!
//! | mode     | position domain    | frame                                   |
//! |----------|--------------------|-----------------------------------------|
//! | bipolar  | any signed integer | fill from LED 0 toward the position     |
//! | unipolar | clamped to `0..=N` | bipolar frame rotated by `N/2`          |
//! | angular  | wraps mod `N`      | single cursor LED                       |
//! | reel     | wraps mod `N`      | three cursors `N/3` apart               |
//!
//! All wrapping uses Euclidean remainder so negative positions land in `0..N`.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ControlError;

/// Interaction variant bound to one encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingMode {
    Bipolar,
    Unipolar,
    Angular,
    Reel,
}

impl RingMode {
    /// Every registered ring variant, in registry order.
    pub const ALL: [RingMode; 4] = [
        RingMode::Bipolar,
        RingMode::Unipolar,
        RingMode::Angular,
        RingMode::Reel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RingMode::Bipolar => "bipolar",
            RingMode::Unipolar => "unipolar",
            RingMode::Angular => "angular",
            RingMode::Reel => "reel",
        }
    }
}

impl fmt::Display for RingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RingMode {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ControlError::invalid(format!("unknown ring mode: {s}")))
    }
}

/// Brightness pair used when drawing rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLevels {
    /// Level of the filled span of bipolar/unipolar rings.
    pub fill: u8,
    /// Level of the cursor LED.
    pub cursor: u8,
}

impl Default for RingLevels {
    fn default() -> Self {
        Self { fill: 4, cursor: 15 }
    }
}

/// Result of applying one delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingUpdate {
    /// Position after the update, in cells.
    pub position: i64,
    /// The integer delta that was applied.
    pub delta: i64,
}

/// Scales a raw encoder delta by `sensitivity` and rounds it to whole cells.
///
/// Fractions round away from zero (ceiling when turning up, floor when
/// turning down), so every nonzero tick moves the ring by at least one cell
/// at any positive sensitivity.
pub fn scale_delta(raw: i32, sensitivity: f64) -> i64 {
    let scaled = f64::from(raw) * sensitivity;
    if scaled > 0.0 {
        scaled.ceil() as i64
    } else {
        scaled.floor() as i64
    }
}

/// State of one encoder on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    index: usize,
    mode: RingMode,
    position: i64,
}

impl Ring {
    pub fn new(index: usize, mode: RingMode) -> Self {
        Self {
            index,
            mode,
            position: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mode(&self) -> RingMode {
        self.mode
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// Moves the ring by `delta` cells according to its variant rule.
    pub fn apply_delta(&mut self, delta: i64, led_count: usize) -> RingUpdate {
        let target = self.position.saturating_add(delta);
        self.position = constrain(self.mode, target, led_count);
        RingUpdate {
            position: self.position,
            delta,
        }
    }

    /// Sets the position directly, applying the variant's clamp or wrap.
    pub fn set_position(&mut self, position: i64, led_count: usize) {
        self.position = constrain(self.mode, position, led_count);
    }

    /// The `(position, delta)` pair delivered to subscribers.
    ///
    /// Angular rings report radians; unipolar rings report `position / N`
    /// when `normalise` is set; everything else reports cells.
    pub fn event_values(&self, update: RingUpdate, led_count: usize, normalise: bool) -> (f64, f64) {
        let n = led_count.max(1) as f64;
        let position = update.position as f64;
        let delta = update.delta as f64;
        match self.mode {
            RingMode::Angular => (TAU * position / n, TAU * delta / n),
            RingMode::Unipolar if normalise => (position / n, delta),
            _ => (position, delta),
        }
    }

    /// Builds the full LED frame for this ring.
    pub fn render(&self, led_count: usize, levels: RingLevels) -> Vec<u8> {
        if led_count == 0 {
            return Vec::new();
        }
        match self.mode {
            RingMode::Bipolar => fill_frame(self.position, led_count, levels),
            RingMode::Unipolar => {
                let mut frame = fill_frame(self.position, led_count, levels);
                frame.rotate_right(led_count / 2);
                frame
            }
            RingMode::Angular => {
                let mut frame = vec![0; led_count];
                frame[wrap(self.position, led_count)] = levels.cursor;
                frame
            }
            RingMode::Reel => {
                let mut frame = vec![0; led_count];
                let third = (led_count / 3) as i64;
                for k in 0..3 {
                    frame[wrap(self.position + k * third, led_count)] = levels.cursor;
                }
                frame
            }
        }
    }
}

fn constrain(mode: RingMode, position: i64, led_count: usize) -> i64 {
    match mode {
        RingMode::Bipolar => position,
        RingMode::Unipolar => position.clamp(0, led_count as i64),
        RingMode::Angular | RingMode::Reel => {
            if led_count == 0 {
                0
            } else {
                wrap(position, led_count) as i64
            }
        }
    }
}

/// Euclidean `position mod n`, always in `0..n`. `n` must be non-zero.
fn wrap(position: i64, n: usize) -> usize {
    position.rem_euclid(n as i64) as usize
}

/// `|position|` cells at fill level starting at LED 0 (clockwise for positive
/// positions, counter-clockwise for negative), with the cursor at
/// `position mod n`.
fn fill_frame(position: i64, n: usize, levels: RingLevels) -> Vec<u8> {
    let filled = usize::try_from(position.unsigned_abs()).map_or(n, |v| v.min(n));
    let mut frame = vec![0; n];
    if position > 0 {
        frame[..filled].fill(levels.fill);
    } else {
        frame[n - filled..].fill(levels.fill);
    }
    frame[wrap(position, n)] = levels.cursor;
    frame
}
