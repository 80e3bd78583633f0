//! Incoming state payloads → light attributes.
//!
//! Each attribute template is rendered against `{ value: payload }` on its
//! own. `Ok(None)` means "no update" (template not configured, or rendered
//! empty); `Err` means the rendered value was unusable and the attribute
//! keeps its previous value.

use crate::error::ParseError;
use crate::template::{payload_context, Template};

use super::{Power, RgbColor, TemplateSet};

/// Everything one payload changes. `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub power: Option<Power>,
    pub brightness: Option<i64>,
    pub rgb_color: Option<RgbColor>,
}

pub fn parse_state(templates: &TemplateSet, payload: &str) -> Result<Option<Power>, ParseError> {
    let Some(tmpl) = &templates.state else {
        return Ok(None);
    };
    let rendered = render_value(tmpl, payload);
    Power::from_rendered(&rendered)
        .map(Some)
        .ok_or(ParseError::UnrecognizedState(rendered))
}

pub fn parse_brightness(templates: &TemplateSet, payload: &str) -> Result<Option<i64>, ParseError> {
    let Some(tmpl) = &templates.brightness else {
        return Ok(None);
    };
    let rendered = render_value(tmpl, payload);
    if rendered.is_empty() {
        return Ok(None);
    }
    rendered
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ParseError::Brightness(rendered))
}

/// All three channels parse, or nothing is updated.
pub fn parse_color(templates: &TemplateSet, payload: &str) -> Result<Option<RgbColor>, ParseError> {
    let (Some(red), Some(green), Some(blue)) = (&templates.red, &templates.green, &templates.blue)
    else {
        return Ok(None);
    };

    let channels = [
        ("red", render_value(red, payload)),
        ("green", render_value(green, payload)),
        ("blue", render_value(blue, payload)),
    ];
    if channels.iter().all(|(_, v)| v.is_empty()) {
        return Ok(None);
    }

    let mut parsed = [0i64; 3];
    for (slot, (channel, value)) in parsed.iter_mut().zip(channels) {
        *slot = value
            .parse::<i64>()
            .map_err(|_| ParseError::Color { channel, value })?;
    }
    let [r, g, b] = parsed;
    Ok(Some(RgbColor::new(r, g, b)))
}

/// Render a state-side template. If rendering fails the raw payload is used
/// instead, and it then goes through the same validation as any other value.
fn render_value(tmpl: &Template, payload: &str) -> String {
    match tmpl.render(&payload_context(payload)) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!(template = %tmpl.source(), "{}, using raw payload", e);
            payload.trim().to_string()
        }
    }
}
