use crate::template::Template;

use super::{SUPPORT_BRIGHTNESS, SUPPORT_FLASH, SUPPORT_RGB_COLOR, SUPPORT_TRANSITION};

/// Compiled templates of one light. Built at setup, never changed.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub command_on: Template,
    pub command_off: Template,
    pub state: Option<Template>,
    pub brightness: Option<Template>,
    pub red: Option<Template>,
    pub green: Option<Template>,
    pub blue: Option<Template>,
}

impl TemplateSet {
    /// Set with only the two command templates.
    pub fn new(command_on: Template, command_off: Template) -> Self {
        Self {
            command_on,
            command_off,
            state: None,
            brightness: None,
            red: None,
            green: None,
            blue: None,
        }
    }

    pub fn supports_brightness(&self) -> bool {
        self.brightness.is_some()
    }

    /// Color needs all three channel templates.
    pub fn supports_color(&self) -> bool {
        self.red.is_some() && self.green.is_some() && self.blue.is_some()
    }

    pub fn supported_features(&self) -> u32 {
        let mut features = SUPPORT_FLASH | SUPPORT_TRANSITION;
        if self.supports_brightness() {
            features |= SUPPORT_BRIGHTNESS;
        }
        if self.supports_color() {
            features |= SUPPORT_RGB_COLOR;
        }
        features
    }
}
