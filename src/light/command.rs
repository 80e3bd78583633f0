//! Command payloads for `turn_on` / `turn_off`.
//!
//! Only variables the caller actually requested are put into the render
//! context. Templates are expected to `default` anything optional:
//!
//! ```text
//! on,{{ brightness|d }},{{ red|d }}-{{ green|d }}-{{ blue|d }}
//! ```

use std::collections::BTreeMap;

use minijinja::Value;

use crate::error::TemplateError;

use super::{RequestedAttributes, TemplateSet};

pub fn render_on(templates: &TemplateSet, requested: &RequestedAttributes) -> Result<String, TemplateError> {
    templates.command_on.render(&render_context(requested))
}

pub fn render_off(templates: &TemplateSet, requested: &RequestedAttributes) -> Result<String, TemplateError> {
    templates.command_off.render(&render_context(requested))
}

/// Context with one entry per requested attribute. `red`/`green`/`blue`
/// are only present when a color was requested.
pub fn render_context(requested: &RequestedAttributes) -> Value {
    let mut ctx: BTreeMap<&str, Value> = BTreeMap::new();

    if let Some(brightness) = requested.brightness {
        ctx.insert("brightness", Value::from(brightness));
    }
    if let Some([red, green, blue]) = requested.rgb_color {
        ctx.insert("red", Value::from(red));
        ctx.insert("green", Value::from(green));
        ctx.insert("blue", Value::from(blue));
    }
    if let Some(flash) = requested.flash {
        ctx.insert("flash", Value::from(flash.as_str()));
    }
    if let Some(transition) = requested.transition {
        ctx.insert("transition", seconds(transition));
    }
    if let Some(color_temp) = requested.color_temp {
        ctx.insert("color_temp", Value::from(color_temp));
    }
    if let Some(white_value) = requested.white_value {
        ctx.insert("white_value", Value::from(white_value));
    }

    Value::from(ctx)
}

/// Whole seconds render without a fractional part (`10`, not `10.0`).
/// Values outside the `i64` range stay floats.
fn seconds(value: f64) -> Value {
    const I64_RANGE: std::ops::Range<f64> = i64::MIN as f64..i64::MAX as f64;
    if value.fract() == 0.0 && I64_RANGE.contains(&value) {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}
