//! Template engine powered by minijinja
//!
//! Light templates are Jinja2-compatible strings compiled once at setup and
//! rendered per message.
//!
//! Context variables:
//!   value       raw MQTT payload string (state side)
//!   brightness, red, green, blue, flash, transition,
//!   color_temp, white_value: requested attributes (command side)
//!
//! Undefined variables print as empty strings. Calling a method or reading
//! an attribute on an undefined value is a render error.
//!
//! Custom filters: default / d
//! String methods: split, rsplit, strip, lower, upper, replace, startswith, endswith

use minijinja::{context, Environment, Error, ErrorKind, State, Value};
use std::sync::OnceLock;

use crate::error::TemplateError;

/// Shared template environment (filters registered once).
static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn env() -> &'static Environment<'static> {
    ENV.get_or_init(|| {
        let mut env = Environment::new();

        env.add_filter("default", filter_default);
        env.add_filter("d", filter_default);

        // Python-style methods on strings, e.g. `value.split(",")[0]`
        env.set_unknown_method_callback(string_method);

        env
    })
}

/// Render a template string with the given context.
pub fn render(template: &str, ctx: &Value) -> Result<String, TemplateError> {
    let rendered = env().render_str(template, ctx)?;
    Ok(rendered.trim().to_string())
}

/// Context for state-side templates: exactly one variable, `value`.
pub fn payload_context(payload: &str) -> Value {
    context! { value => payload }
}

/// A template whose syntax was checked when it was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn compile(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        env().template_from_str(&source)?;
        Ok(Self { source })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &Value) -> Result<String, TemplateError> {
        render(&self.source, ctx)
    }
}

// ── Custom Filters ──────────────────────────────────────

fn filter_default(value: Value, default: Option<Value>) -> Value {
    if value.is_undefined() || value.is_none() {
        default.unwrap_or_else(|| Value::from(""))
    } else {
        value
    }
}

// ── String Methods ──────────────────────────────────────

fn string_method(_state: &State, value: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    let Some(s) = value.as_str() else {
        return Err(Error::new(
            ErrorKind::UnknownMethod,
            format!("{} has no method named {}", value.kind(), method),
        ));
    };

    match method {
        "split" => Ok(split(s, args, false)),
        "rsplit" => Ok(split(s, args, true)),
        "strip" => Ok(Value::from(match str_arg(args, 0) {
            Some(chars) => s.trim_matches(|c: char| chars.contains(c)),
            None => s.trim(),
        })),
        "lower" => Ok(Value::from(s.to_lowercase())),
        "upper" => Ok(Value::from(s.to_uppercase())),
        "replace" => match (str_arg(args, 0), str_arg(args, 1)) {
            (Some(old), Some(new)) => Ok(Value::from(s.replace(old, new))),
            _ => Err(Error::new(
                ErrorKind::MissingArgument,
                "replace expects two string arguments",
            )),
        },
        "startswith" => Ok(Value::from(str_arg(args, 0).is_some_and(|p| s.starts_with(p)))),
        "endswith" => Ok(Value::from(str_arg(args, 0).is_some_and(|p| s.ends_with(p)))),
        _ => Err(Error::new(
            ErrorKind::UnknownMethod,
            format!("string has no method named {}", method),
        )),
    }
}

/// `split(sep=None, maxsplit=-1)` with Python semantics.
fn split(s: &str, args: &[Value], from_right: bool) -> Value {
    let max = args
        .get(1)
        .and_then(|v| i64::try_from(v.clone()).ok())
        .filter(|n| *n >= 0)
        .map(|n| n as usize + 1);

    let parts: Vec<Value> = match (str_arg(args, 0), max, from_right) {
        (Some(sep), None, _) => s.split(sep).map(Value::from).collect(),
        (Some(sep), Some(n), false) => s.splitn(n, sep).map(Value::from).collect(),
        (Some(sep), Some(n), true) => {
            let mut parts: Vec<Value> = s.rsplitn(n, sep).map(Value::from).collect();
            parts.reverse();
            parts
        }
        (None, _, _) => s.split_whitespace().map(Value::from).collect(),
    };
    Value::from(parts)
}

fn str_arg(args: &[Value], idx: usize) -> Option<&str> {
    args.get(idx).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: &str = r#"{{ value.split(",")[2].split("-")[0] }}"#;

    #[test]
    fn test_basic_template() {
        let result = render("{{ value }}", &payload_context("42.5")).unwrap();
        assert_eq!(result, "42.5");
    }

    #[test]
    fn test_default_filter() {
        let result = render("{{ missing | default('N/A') }}", &context! {}).unwrap();
        assert_eq!(result, "N/A");
    }

    #[test]
    fn test_d_alias_renders_empty() {
        let result = render("on,{{ brightness|d }},{{ red|d }}-{{ green|d }}", &context! {}).unwrap();
        assert_eq!(result, "on,,-");
    }

    #[test]
    fn test_default_keeps_defined_value() {
        let result = render("{{ brightness|d(10) }}", &context! { brightness => 50 }).unwrap();
        assert_eq!(result, "50");
    }

    #[test]
    fn test_split_decomposes_payload() {
        let ctx = payload_context("on,255,10-20-30");
        assert_eq!(render(r#"{{ value.split(",")[0] }}"#, &ctx).unwrap(), "on");
        assert_eq!(render(r#"{{ value.split(",")[1] }}"#, &ctx).unwrap(), "255");
        assert_eq!(render(RED, &ctx).unwrap(), "10");
        assert_eq!(
            render(r#"{{ value.split(",")[2].split("-")[2] }}"#, &ctx).unwrap(),
            "30"
        );
    }

    #[test]
    fn test_index_past_end_is_empty() {
        let ctx = payload_context("off");
        assert_eq!(render(r#"{{ value.split(",")[1] }}"#, &ctx).unwrap(), "");
    }

    #[test]
    fn test_method_on_undefined_fails() {
        let ctx = payload_context("on,100");
        assert!(render(RED, &ctx).is_err());
    }

    #[test]
    fn test_split_maxsplit_and_whitespace() {
        let ctx = payload_context("a b  c");
        assert_eq!(render("{{ value.split()[2] }}", &ctx).unwrap(), "c");
        let ctx = payload_context("a-b-c");
        assert_eq!(render(r#"{{ value.split("-", 1)[1] }}"#, &ctx).unwrap(), "b-c");
        assert_eq!(render(r#"{{ value.rsplit("-", 1)[0] }}"#, &ctx).unwrap(), "a-b");
    }

    #[test]
    fn test_string_methods() {
        let ctx = payload_context(" On ");
        assert_eq!(render("{{ value.strip().lower() }}", &ctx).unwrap(), "on");
        assert_eq!(render("{{ value.upper() }}", &ctx).unwrap(), "ON");
        assert_eq!(render(r#"{{ value.replace("O", "0") }}"#, &ctx).unwrap(), "0n");
    }

    #[test]
    fn test_output_is_trimmed() {
        let result = render("  off\n", &context! {}).unwrap();
        assert_eq!(result, "off");
    }

    #[test]
    fn test_compile_rejects_bad_syntax() {
        assert!(Template::compile("{{ value.split(").is_err());
        assert!(Template::compile("{% if %}").is_err());
    }

    #[test]
    fn test_compiled_template_renders() {
        let tmpl = Template::compile(r#"{{ value.split(",")[0] }}"#).unwrap();
        assert_eq!(tmpl.render(&payload_context("ON,12")).unwrap(), "ON");
        assert_eq!(tmpl.source(), r#"{{ value.split(",")[0] }}"#);
    }
}
