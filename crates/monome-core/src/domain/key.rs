//! Button variants bound to single grid cells.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ControlError;

/// Interaction variant bound to one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// Lit while held; reports both press and release.
    Momentary,
    /// Press flips the state; release is ignored.
    Toggle,
    /// Press selects this member of its radio group.
    Radio,
}

impl KeyMode {
    pub const ALL: [KeyMode; 3] = [KeyMode::Momentary, KeyMode::Toggle, KeyMode::Radio];

    pub fn as_str(self) -> &'static str {
        match self {
            KeyMode::Momentary => "momentary",
            KeyMode::Toggle => "toggle",
            KeyMode::Radio => "radio",
        }
    }
}

impl fmt::Display for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyMode {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ControlError::invalid(format!("unknown key mode: {s}")))
    }
}

/// Brightness levels used when drawing grid pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLevels {
    /// Assigned but unlit key.
    pub low: u8,
    /// Lit key.
    pub high: u8,
}

impl Default for GridLevels {
    fn default() -> Self {
        Self {
            low: 5,
            high: 15,
        }
    }
}

/// What a single press or release did to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Nothing changed and nothing is reported (toggle/radio release).
    Ignored,
    /// Momentary key went down or up.
    Momentary { down: bool },
    /// Toggle key flipped to `state`.
    Toggled { state: bool },
    /// Radio key was pressed; the owning page resolves the rest of the group.
    Selected,
}

/// State of one assigned grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    x: usize,
    y: usize,
    mode: KeyMode,
    state: bool,
    group: Option<usize>,
}

impl Key {
    pub fn new(x: usize, y: usize, mode: KeyMode) -> Self {
        Self {
            x,
            y,
            mode,
            state: false,
            group: None,
        }
    }

    /// A radio key belonging to `group`.
    pub fn radio(x: usize, y: usize, group: usize) -> Self {
        Self {
            group: Some(group),
            ..Self::new(x, y, KeyMode::Radio)
        }
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    pub fn state(&self) -> bool {
        self.state
    }

    pub fn group(&self) -> Option<usize> {
        self.group
    }

    /// Applies one press (`down = true`) or release.
    pub fn press(&mut self, down: bool) -> KeyOutcome {
        match self.mode {
            KeyMode::Momentary => {
                self.state = down;
                KeyOutcome::Momentary { down }
            }
            KeyMode::Toggle if down => {
                self.state = !self.state;
                KeyOutcome::Toggled { state: self.state }
            }
            KeyMode::Radio if down => {
                self.state = true;
                KeyOutcome::Selected
            }
            KeyMode::Toggle | KeyMode::Radio => KeyOutcome::Ignored,
        }
    }

    /// Clears a radio key when another member of its group is selected.
    pub fn deselect(&mut self) {
        self.state = false;
    }

    /// Brightness this key should currently show.
    pub fn level(&self, levels: GridLevels) -> u8 {
        if self.state {
            levels.high
        } else {
            levels.low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_momentary_reports_press_and_release() {
        // Arrange
        let mut key = Key::new(0, 0, KeyMode::Momentary);

        // Act
        let down = key.press(true);
        let lit = key.level(GridLevels::default());
        let up = key.press(false);

        // Assert
        assert_eq!(down, KeyOutcome::Momentary { down: true });
        assert_eq!(lit, 15);
        assert_eq!(up, KeyOutcome::Momentary { down: false });
        assert_eq!(key.level(GridLevels::default()), 5);
    }

    #[test]
    fn test_toggle_flips_on_press_and_ignores_release() {
        let mut key = Key::new(3, 1, KeyMode::Toggle);

        assert_eq!(key.press(true), KeyOutcome::Toggled { state: true });
        assert_eq!(key.press(false), KeyOutcome::Ignored);
        assert!(key.state());
        assert_eq!(key.press(true), KeyOutcome::Toggled { state: false });
        assert!(!key.state());
    }

    #[test]
    fn test_radio_press_selects_and_release_is_ignored() {
        let mut key = Key::radio(2, 2, 0);

        assert_eq!(key.press(true), KeyOutcome::Selected);
        assert!(key.state());
        assert_eq!(key.press(false), KeyOutcome::Ignored);
        assert!(key.state());

        key.deselect();
        assert!(!key.state());
        assert_eq!(key.group(), Some(0));
    }

    #[test]
    fn test_key_mode_rejects_unknown_tag() {
        assert_eq!("toggle".parse::<KeyMode>(), Ok(KeyMode::Toggle));
        assert!("latch".parse::<KeyMode>().is_err());
    }
}
