//! Device identity as reported by the discovery service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ControlError;

/// The kind of physical controller a descriptor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// A ring of LED encoders ("arc").
    Arc,
    /// A matrix of backlit buttons ("grid").
    Grid,
}

impl DeviceClass {
    /// The model tag the discovery service reports for this class.
    pub fn model_tag(self) -> &'static str {
        match self {
            DeviceClass::Arc => "arc",
            DeviceClass::Grid => "grid",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_tag())
    }
}

impl FromStr for DeviceClass {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arc" | "encoder-array" => Ok(DeviceClass::Arc),
            "grid" | "button-grid" => Ok(DeviceClass::Grid),
            other => Err(ControlError::invalid(format!("unknown device class: {other}"))),
        }
    }
}

/// One device registered with the discovery service.
///
/// Built from the `(id, type, port)` triple of a `/serialosc/device`,
/// `/serialosc/add` or `/serialosc/remove` message. The type string is
/// `"<manufacturer> <model> <version>"`, e.g. `"monome arc 4"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub manufacturer: String,
    pub model: String,
    pub version: String,
    pub control_port: u16,
}

impl DeviceDescriptor {
    /// Parses the type string and builds a descriptor.
    ///
    /// Missing trailing fields are left empty rather than rejected; the
    /// descriptor is still listed but only binds if `model` is a known class.
    pub fn from_registration(id: &str, device_type: &str, control_port: u16) -> Self {
        let mut parts = device_type.split_whitespace();
        let manufacturer = parts.next().unwrap_or_default().to_string();
        let model = parts.next().unwrap_or_default().to_string();
        let version = parts.collect::<Vec<_>>().join(" ");
        Self {
            id: id.to_string(),
            manufacturer,
            model,
            version,
            control_port,
        }
    }

    /// The device class, if `model` is one of the known class tags.
    pub fn device_class(&self) -> Option<DeviceClass> {
        match self.model.as_str() {
            "arc" => Some(DeviceClass::Arc),
            "grid" => Some(DeviceClass::Grid),
            _ => None,
        }
    }

    /// The type string as the discovery service reports it.
    pub fn device_type(&self) -> String {
        [&self.manufacturer, &self.model, &self.version]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Identity used to match add/remove notifications: `(id, model, port)`.
    pub fn same_registration(&self, other: &DeviceDescriptor) -> bool {
        self.id == other.id && self.model == other.model && self.control_port == other.control_port
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, port {})", self.id, self.device_type(), self.control_port)
    }
}
