//! Template light: user templates map light intents to device payloads and
//! device payloads back to light state.
//!
//! Outbound: `turn_on`/`turn_off` → [`command`] renders the configured
//! command template → transport publishes it.
//! Inbound: payload on the state topic → [`parser`] renders each attribute
//! template → [`entity::LightEntity`] applies the result in one step.

pub mod command;
pub mod entity;
pub mod parser;
pub mod templates;

use serde::{Deserialize, Serialize};

pub use entity::LightEntity;
pub use templates::TemplateSet;

/// Supported feature bits, as exposed in `supported_features`.
pub const SUPPORT_BRIGHTNESS: u32 = 1;
pub const SUPPORT_FLASH: u32 = 8;
pub const SUPPORT_RGB_COLOR: u32 = 16;
pub const SUPPORT_TRANSITION: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    On,
    #[default]
    Off,
}

impl Power {
    pub fn as_str(&self) -> &'static str {
        match self {
            Power::On => "on",
            Power::Off => "off",
        }
    }

    /// Case-insensitive `on`/`off`.
    pub fn from_rendered(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("on") {
            Some(Power::On)
        } else if s.eq_ignore_ascii_case("off") {
            Some(Power::Off)
        } else {
            None
        }
    }
}

/// RGB color as parsed from the device. Channels are stored as received,
/// without clamping to 0–255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub red: i64,
    pub green: i64,
    pub blue: i64,
}

impl RgbColor {
    pub fn new(red: i64, green: i64, blue: i64) -> Self {
        Self { red, green, blue }
    }
}

impl From<[u8; 3]> for RgbColor {
    fn from([red, green, blue]: [u8; 3]) -> Self {
        Self::new(red.into(), green.into(), blue.into())
    }
}

impl Serialize for RgbColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.red, self.green, self.blue].serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flash {
    Short,
    Long,
}

impl Flash {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flash::Short => "short",
            Flash::Long => "long",
        }
    }
}

/// Current state of one light entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightAttributes {
    pub power: Power,
    pub brightness: Option<i64>,
    pub rgb_color: Option<RgbColor>,
    pub assumed_state: bool,
}

impl LightAttributes {
    pub fn new(assumed_state: bool) -> Self {
        Self {
            power: Power::Off,
            brightness: None,
            rgb_color: None,
            assumed_state,
        }
    }

    pub fn is_on(&self) -> bool {
        self.power == Power::On
    }
}

/// Attributes a caller asked for in a `turn_on`/`turn_off` call.
/// Fields the caller did not specify stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestedAttributes {
    #[serde(default)]
    pub brightness: Option<u8>,
    #[serde(default)]
    pub rgb_color: Option<[u8; 3]>,
    #[serde(default)]
    pub flash: Option<Flash>,
    /// Seconds.
    #[serde(default)]
    pub transition: Option<f64>,
    #[serde(default)]
    pub color_temp: Option<u16>,
    #[serde(default)]
    pub white_value: Option<u8>,
}

impl RequestedAttributes {
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_rgb_color(mut self, rgb: [u8; 3]) -> Self {
        self.rgb_color = Some(rgb);
        self
    }

    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }

    pub fn with_transition(mut self, seconds: f64) -> Self {
        self.transition = Some(seconds);
        self
    }
}
