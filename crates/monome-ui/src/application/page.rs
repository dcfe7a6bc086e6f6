//! The page abstraction shared by encoder and button devices.
//!
//! A page is one swappable set of per-control behaviours for a device. The
//! [`Controller`](super::controller::Controller) owns the pages, routes input
//! only to the current one, and redraws a page when it becomes current.
//! Pages never talk to the network directly: they draw through a
//! [`LedSurface`] and report what happened as events, which the controller
//! delivers to subscribers once its lock is released.

use monome_core::{ControlError, DeviceInput, Geometry, LedSurface};

use super::subscribers::Subscribers;

/// Tag used in a [`VariantSpec`] for a control with no behaviour bound.
pub const UNASSIGNED_TAG: &str = "none";

/// Which variant each control on a new page gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantSpec {
    /// One tag for every control.
    Uniform(String),
    /// One tag per control, in control order (rings, or grid cells row-major).
    PerUnit(Vec<String>),
}

impl VariantSpec {
    /// Expands the spec into exactly `count` parsed variants.
    ///
    /// # Errors
    ///
    /// [`ControlError::InvalidArgument`] when a per-unit spec has the wrong
    /// length or any tag fails to parse.
    pub fn resolve<M>(
        &self,
        count: usize,
        parse: impl Fn(&str) -> Result<M, ControlError>,
    ) -> Result<Vec<M>, ControlError>
    where
        M: Clone,
    {
        match self {
            VariantSpec::Uniform(tag) => Ok(vec![parse(tag.as_str())?; count]),
            VariantSpec::PerUnit(tags) => {
                if tags.len() != count {
                    return Err(ControlError::InvalidArgument(format!(
                        "variant list has {} entries, device has {count} controls",
                        tags.len()
                    )));
                }
                tags.iter().map(|t| parse(t.as_str())).collect()
            }
        }
    }
}

impl From<&str> for VariantSpec {
    fn from(tag: &str) -> Self {
        VariantSpec::Uniform(tag.to_string())
    }
}

impl From<String> for VariantSpec {
    fn from(tag: String) -> Self {
        VariantSpec::Uniform(tag)
    }
}

impl From<Vec<String>> for VariantSpec {
    fn from(tags: Vec<String>) -> Self {
        VariantSpec::PerUnit(tags)
    }
}

impl From<&[&str]> for VariantSpec {
    fn from(tags: &[&str]) -> Self {
        VariantSpec::PerUnit(tags.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for VariantSpec {
    fn from(tags: [&str; N]) -> Self {
        VariantSpec::from(&tags[..])
    }
}

/// What a page sees while routing one input.
#[derive(Clone, Copy)]
pub struct RouteContext<'a> {
    /// Where affected controls are redrawn.
    pub surface: &'a dyn LedSurface,
    /// Controller-wide sensitivity; a page may override it.
    pub sensitivity: f64,
}

/// One page of controls.
pub trait Page: Send + Sized + 'static {
    /// Event delivered to subscribers.
    type Event: Send + Sync + 'static;
    /// Drawing and behaviour options fixed when the page is built.
    type Settings: Clone + Send + 'static;

    /// Builds page `index` for a device of `geometry`.
    fn build(
        index: usize,
        spec: &VariantSpec,
        geometry: Geometry,
        settings: &Self::Settings,
    ) -> Result<Self, ControlError>;

    fn index(&self) -> usize;

    /// Applies one input, redraws what it changed, and appends the derived
    /// events to `events`.
    ///
    /// # Errors
    ///
    /// [`ControlError::IndexOutOfRange`] when the input names a control the
    /// page does not have; surface errors from the redraw.
    fn route(
        &mut self,
        input: DeviceInput,
        ctx: RouteContext<'_>,
        events: &mut Vec<Self::Event>,
    ) -> Result<(), ControlError>;

    /// Redraws every control on the page.
    fn draw(&self, surface: &dyn LedSurface) -> Result<(), ControlError>;

    fn subscribers(&self) -> &Subscribers<Self::Event>;

    fn subscribers_mut(&mut self) -> &mut Subscribers<Self::Event>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_flag(tag: &str) -> Result<bool, ControlError> {
        match tag {
            "on" => Ok(true),
            "off" => Ok(false),
            other => Err(ControlError::InvalidArgument(other.to_string())),
        }
    }

    #[test]
    fn test_uniform_spec_expands_to_count() {
        let spec = VariantSpec::from("on");
        assert_eq!(spec.resolve(3, parse_flag), Ok(vec![true, true, true]));
    }

    #[test]
    fn test_per_unit_spec_must_match_count() {
        // Arrange
        let spec = VariantSpec::from(["on", "off"]);

        // Act
        let short = spec.resolve(3, parse_flag);
        let exact = spec.resolve(2, parse_flag);

        // Assert
        assert!(matches!(short, Err(ControlError::InvalidArgument(_))));
        assert_eq!(exact, Ok(vec![true, false]));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let spec = VariantSpec::from(["on", "sideways"]);
        assert_eq!(
            spec.resolve(2, parse_flag),
            Err(ControlError::InvalidArgument("sideways".to_string()))
        );
    }
}
