//! YAML configuration.
//!
//! ```yaml
//! http_port: 8124
//! mqtt:
//!   host: localhost
//!   port: 1883
//! light:
//!   - platform: mqtt_template
//!     name: Kitchen
//!     state_topic: home/rgb1
//!     command_topic: home/rgb1/set
//!     command_on_template: "on,{{ brightness|d }},{{ red|d }}-{{ green|d }}-{{ blue|d }}"
//!     command_off_template: "off"
//!     state_template: '{{ value.split(",")[0] }}'
//! ```
//!
//! Light entries are read leniently and checked one by one in
//! [`LightConfig::validate`], so one bad light does not stop the others.

use std::path::Path;

use rumqttc::QoS;
use serde::Deserialize;

use crate::error::SetupError;
use crate::light::TemplateSet;
use crate::template::Template;
use crate::transport::qos_from_level;

pub const PLATFORM: &str = "mqtt_template";
pub const DEFAULT_NAME: &str = "MQTT Template Light";
pub const DEFAULT_HTTP_PORT: u16 = 8124;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default)]
    pub mqtt: MqttSettings,
    #[serde(default)]
    pub light: Vec<LightConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "marge-template-light".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

/// One `light:` entry as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LightConfig {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state_topic: Option<String>,
    #[serde(default)]
    pub command_topic: Option<String>,
    #[serde(default)]
    pub command_on_template: Option<String>,
    #[serde(default)]
    pub command_off_template: Option<String>,
    #[serde(default)]
    pub state_template: Option<String>,
    #[serde(default)]
    pub brightness_template: Option<String>,
    #[serde(default)]
    pub red_template: Option<String>,
    #[serde(default)]
    pub green_template: Option<String>,
    #[serde(default)]
    pub blue_template: Option<String>,
    #[serde(default)]
    pub qos: Option<u8>,
    #[serde(default)]
    pub retain: Option<bool>,
}

/// A validated light configuration.
#[derive(Debug, Clone)]
pub struct LightSettings {
    pub name: String,
    pub state_topic: Option<String>,
    pub command_topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub templates: TemplateSet,
}

impl LightConfig {
    pub fn is_template_light(&self) -> bool {
        self.platform.as_deref() == Some(PLATFORM)
    }

    pub fn validate(self) -> Result<LightSettings, SetupError> {
        let command_topic = self
            .command_topic
            .ok_or(SetupError::MissingOption("command_topic"))?;
        let command_on = required("command_on_template", self.command_on_template)?;
        let command_off = required("command_off_template", self.command_off_template)?;

        let level = self.qos.unwrap_or(0);
        let qos = qos_from_level(level).ok_or(SetupError::InvalidQos(level))?;

        let templates = TemplateSet {
            command_on,
            command_off,
            state: optional("state_template", self.state_template)?,
            brightness: optional("brightness_template", self.brightness_template)?,
            red: optional("red_template", self.red_template)?,
            green: optional("green_template", self.green_template)?,
            blue: optional("blue_template", self.blue_template)?,
        };

        Ok(LightSettings {
            name: self.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            state_topic: self.state_topic,
            command_topic,
            qos,
            retain: self.retain.unwrap_or(false),
            templates,
        })
    }
}

fn required(option: &'static str, source: Option<String>) -> Result<Template, SetupError> {
    let source = source.ok_or(SetupError::MissingOption(option))?;
    Template::compile(source).map_err(|source| SetupError::Template { option, source })
}

fn optional(option: &'static str, source: Option<String>) -> Result<Option<Template>, SetupError> {
    source
        .map(|s| Template::compile(s).map_err(|source| SetupError::Template { option, source }))
        .transpose()
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
http_port: 9000
mqtt:
  host: broker.lan
light:
  - platform: mqtt_template
    name: test
    state_topic: test_light_rgb
    command_topic: test_light_rgb/set
    command_on_template: "on,{{ brightness|d }},{{ red|d }}-{{ green|d }}-{{ blue|d }}"
    command_off_template: "off"
    state_template: '{{ value.split(",")[0] }}'
    brightness_template: '{{ value.split(",")[1] }}'
    qos: 2
    retain: true
  - platform: mqtt_template
    name: test
  - platform: mqtt_json
    name: other
"#;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.http_port, Some(9000));
        assert_eq!(config.mqtt.host, "broker.lan");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.light.len(), 3);
        assert!(config.light[0].is_template_light());
        assert!(!config.light[2].is_template_light());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("nope.yaml")).is_err());
    }

    #[test]
    fn test_validate_full_light() {
        let config: Config = serde_yaml::from_str(FULL).unwrap();
        let settings = config.light[0].clone().validate().unwrap();
        assert_eq!(settings.name, "test");
        assert_eq!(settings.state_topic.as_deref(), Some("test_light_rgb"));
        assert_eq!(settings.command_topic, "test_light_rgb/set");
        assert_eq!(settings.qos, QoS::ExactlyOnce);
        assert!(settings.retain);
        assert!(settings.templates.state.is_some());
        assert!(settings.templates.supports_brightness());
        assert!(!settings.templates.supports_color());
    }

    #[test]
    fn test_only_name_and_platform_is_rejected() {
        let config: Config = serde_yaml::from_str(FULL).unwrap();
        let err = config.light[1].clone().validate().unwrap_err();
        assert!(matches!(err, SetupError::MissingOption("command_topic")));
    }

    #[test]
    fn test_missing_command_template() {
        let light = LightConfig {
            command_topic: Some("t/set".to_string()),
            command_on_template: Some("on".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            light.validate(),
            Err(SetupError::MissingOption("command_off_template"))
        ));
    }

    #[test]
    fn test_bad_template_syntax() {
        let light = LightConfig {
            command_topic: Some("t/set".to_string()),
            command_on_template: Some("on".to_string()),
            command_off_template: Some("off".to_string()),
            red_template: Some("{{ value.split(".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            light.validate(),
            Err(SetupError::Template { option: "red_template", .. })
        ));
    }

    #[test]
    fn test_invalid_qos() {
        let light = LightConfig {
            command_topic: Some("t/set".to_string()),
            command_on_template: Some("on".to_string()),
            command_off_template: Some("off".to_string()),
            qos: Some(3),
            ..Default::default()
        };
        assert!(matches!(light.validate(), Err(SetupError::InvalidQos(3))));
    }

    #[test]
    fn test_defaults() {
        let light = LightConfig {
            command_topic: Some("t/set".to_string()),
            command_on_template: Some("on".to_string()),
            command_off_template: Some("off".to_string()),
            ..Default::default()
        };
        let settings = light.validate().unwrap();
        assert_eq!(settings.name, DEFAULT_NAME);
        assert_eq!(settings.qos, QoS::AtMostOnce);
        assert!(!settings.retain);
        assert!(settings.state_topic.is_none());
    }
}
