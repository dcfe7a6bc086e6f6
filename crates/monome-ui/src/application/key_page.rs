//! Button page: an optional [`Key`] per grid cell plus its radio groups.
//!
//! Cells without a key are inert: presses on them are ignored and they draw
//! dark. A freeform page starts fully unassigned (`"none"`) and binds keys one
//! at a time with [`KeyPage::assign`].

use monome_core::{
    ControlError, DeviceClass, DeviceInput, Geometry, GridLevels, Key, KeyMode, KeyOutcome,
    LedSurface,
};
use tracing::debug;

use super::page::{Page, RouteContext, VariantSpec, UNASSIGNED_TAG};
use super::subscribers::Subscribers;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPageSettings {
    pub levels: GridLevels,
}

/// What a key press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEventKind {
    Momentary { down: bool },
    Toggle { state: bool },
    /// `selected` is the pressed key's position in the group's member list.
    Radio { group: usize, selected: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEvent {
    pub page: usize,
    pub x: usize,
    pub y: usize,
    pub kind: GridEventKind,
}

/// Radio keys of which at most one is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioGroup {
    index: usize,
    /// Control indices (row-major) in join order.
    members: Vec<usize>,
}

impl RadioGroup {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }
}

pub struct KeyPage {
    index: usize,
    geometry: Geometry,
    keys: Vec<Option<Key>>,
    groups: Vec<RadioGroup>,
    settings: KeyPageSettings,
    subscribers: Subscribers<GridEvent>,
}

fn parse_tag(tag: &str) -> Result<Option<KeyMode>, ControlError> {
    if tag == UNASSIGNED_TAG {
        Ok(None)
    } else {
        tag.parse().map(Some)
    }
}

impl KeyPage {
    /// The key at `(x, y)`, if one is assigned.
    pub fn key(&self, x: usize, y: usize) -> Result<Option<&Key>, ControlError> {
        let i = self.geometry.control_index(x, y)?;
        Ok(self.keys[i].as_ref())
    }

    pub fn radio_group(&self, group: usize) -> Option<&RadioGroup> {
        self.groups.get(group)
    }

    /// Adds an empty radio group and returns its index.
    pub fn add_radio_group(&mut self) -> usize {
        let index = self.groups.len();
        self.groups.push(RadioGroup {
            index,
            members: Vec::new(),
        });
        index
    }

    /// Binds a key to the unassigned cell `(x, y)`.
    ///
    /// Radio keys need an existing `group`; other modes must not name one.
    ///
    /// # Errors
    ///
    /// [`ControlError::IndexOutOfRange`] for a cell outside the grid;
    /// [`ControlError::InvalidArgument`] if the cell already has a key or the
    /// group argument does not fit the mode.
    pub fn assign(&mut self, x: usize, y: usize, mode: KeyMode, group: Option<usize>) -> Result<(), ControlError> {
        let i = self.geometry.control_index(x, y)?;
        if self.keys[i].is_some() {
            return Err(ControlError::InvalidArgument(format!("cell ({x}, {y}) is already assigned")));
        }
        let key = match (mode, group) {
            (KeyMode::Radio, Some(g)) => {
                let group = self.groups.get_mut(g).ok_or_else(|| {
                    ControlError::InvalidArgument(format!("radio group {g} does not exist"))
                })?;
                group.members.push(i);
                Key::radio(x, y, g)
            }
            (KeyMode::Radio, None) => {
                return Err(ControlError::InvalidArgument("radio key needs a group".to_string()))
            }
            (_, Some(_)) => {
                return Err(ControlError::InvalidArgument(format!("{mode} key cannot join a group")))
            }
            (_, None) => Key::new(x, y, mode),
        };
        self.keys[i] = Some(key);
        Ok(())
    }

    fn draw_key(&self, i: usize, surface: &dyn LedSurface) -> Result<(), ControlError> {
        let (x, y) = self.geometry.control_position(i);
        let level = self.keys[i]
            .as_ref()
            .map_or(0, |k| k.level(self.settings.levels));
        surface.set_cell(y, x, level)
    }

    /// Selects member `i` of its group, clearing and redrawing the others.
    fn select(&mut self, i: usize, group: usize, surface: &dyn LedSurface) -> Result<GridEventKind, ControlError> {
        let members = self
            .groups
            .get(group)
            .map(|g| g.members.clone())
            .unwrap_or_default();
        for &other in members.iter().filter(|&&m| m != i) {
            if let Some(key) = self.keys[other].as_mut() {
                if key.state() {
                    key.deselect();
                    self.draw_key(other, surface)?;
                }
            }
        }
        let selected = members.iter().position(|&m| m == i).unwrap_or_default();
        Ok(GridEventKind::Radio { group, selected })
    }
}

impl Page for KeyPage {
    type Event = GridEvent;
    type Settings = KeyPageSettings;

    /// A uniform `"radio"` spec puts every cell in group 0; per-cell specs
    /// put all their radio cells in group 0 too.
    fn build(
        index: usize,
        spec: &VariantSpec,
        geometry: Geometry,
        settings: &KeyPageSettings,
    ) -> Result<Self, ControlError> {
        if geometry.class() != DeviceClass::Grid {
            return Err(ControlError::InvalidArgument(format!(
                "button page needs a grid, device is an {}",
                geometry.class()
            )));
        }
        let modes = spec.resolve(geometry.control_count(), parse_tag)?;
        let mut page = Self {
            index,
            geometry,
            keys: vec![None; modes.len()],
            groups: Vec::new(),
            settings: settings.clone(),
            subscribers: Subscribers::new(),
        };
        if modes.contains(&Some(KeyMode::Radio)) {
            page.add_radio_group();
        }
        for (i, mode) in modes.into_iter().enumerate() {
            if let Some(mode) = mode {
                let (x, y) = geometry.control_position(i);
                let group = (mode == KeyMode::Radio).then_some(0);
                page.assign(x, y, mode, group)?;
            }
        }
        Ok(page)
    }

    fn index(&self) -> usize {
        self.index
    }

    fn route(
        &mut self,
        input: DeviceInput,
        ctx: RouteContext<'_>,
        events: &mut Vec<GridEvent>,
    ) -> Result<(), ControlError> {
        let DeviceInput::GridKey { x, y, down } = input else {
            debug!("button page ignoring {input:?}");
            return Ok(());
        };
        let i = self.geometry.control_index(x, y)?;
        let Some(key) = self.keys[i].as_mut() else {
            return Ok(());
        };
        let group = key.group();
        let kind = match key.press(down) {
            KeyOutcome::Ignored => return Ok(()),
            KeyOutcome::Momentary { down } => GridEventKind::Momentary { down },
            KeyOutcome::Toggled { state } => GridEventKind::Toggle { state },
            KeyOutcome::Selected => self.select(i, group.unwrap_or_default(), ctx.surface)?,
        };
        self.draw_key(i, ctx.surface)?;
        events.push(GridEvent {
            page: self.index,
            x,
            y,
            kind,
        });
        Ok(())
    }

    /// Writes every row in full: unassigned cells dark, keys at their level.
    fn draw(&self, surface: &dyn LedSurface) -> Result<(), ControlError> {
        let width = self.geometry.width();
        self.keys
            .chunks(width.max(1))
            .enumerate()
            .try_for_each(|(y, row)| {
                let levels: Vec<u8> = row
                    .iter()
                    .map(|k| k.as_ref().map_or(0, |k| k.level(self.settings.levels)))
                    .collect();
                surface.set_map(y, &levels)
            })
    }

    fn subscribers(&self) -> &Subscribers<GridEvent> {
        &self.subscribers
    }

    fn subscribers_mut(&mut self) -> &mut Subscribers<GridEvent> {
        &mut self.subscribers
    }
}
