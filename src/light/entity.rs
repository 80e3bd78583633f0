use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{json, Map, Value};

use crate::config::LightSettings;
use crate::error::{ParseError, ServiceError};
use crate::state::{EntityState, StateMachine};
use crate::transport::{MqttPublish, Transport};

use super::command::{render_off, render_on};
use super::parser::{parse_brightness, parse_color, parse_state, StateUpdate};
use super::{LightAttributes, Power, RequestedAttributes, RgbColor};

/// One template light.
///
/// Attributes sit behind a single mutex. Every inbound message or command
/// computes its full update first, then swaps it in and mirrors the result
/// to the [`StateMachine`] while still holding the lock.
pub struct LightEntity {
    entity_id: String,
    settings: LightSettings,
    attributes: Mutex<LightAttributes>,
    transport: Arc<dyn Transport>,
    states: Arc<StateMachine>,
}

impl LightEntity {
    pub fn new(
        entity_id: String,
        settings: LightSettings,
        transport: Arc<dyn Transport>,
        states: Arc<StateMachine>,
    ) -> Self {
        let assumed_state = settings.state_topic.is_none();
        let entity = Self {
            entity_id,
            settings,
            attributes: Mutex::new(LightAttributes::new(assumed_state)),
            transport,
            states,
        };
        {
            let attrs = entity.lock();
            entity.publish_state(&attrs);
        }
        entity
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &LightSettings {
        &self.settings
    }

    /// No state topic means nothing ever reports back; commands update
    /// the state directly.
    pub fn assumed_state(&self) -> bool {
        self.settings.state_topic.is_none()
    }

    /// Snapshot of the current attributes.
    pub fn attributes(&self) -> LightAttributes {
        *self.lock()
    }

    /// Apply one payload received on the state topic.
    pub fn process_message(&self, payload: &str) -> LightAttributes {
        tracing::debug!(entity_id = %self.entity_id, payload = %payload, "State payload");

        let templates = &self.settings.templates;
        let update = StateUpdate {
            power: self.accept(parse_state(templates, payload)),
            brightness: self.accept(parse_brightness(templates, payload)),
            rgb_color: self.accept(parse_color(templates, payload)),
        };

        let mut attrs = self.lock();
        if let Some(power) = update.power {
            attrs.power = power;
        }
        if let Some(brightness) = update.brightness {
            attrs.brightness = Some(brightness);
        }
        if let Some(rgb) = update.rgb_color {
            attrs.rgb_color = Some(rgb);
        }
        self.publish_state(&attrs);
        *attrs
    }

    pub fn turn_on(&self, requested: &RequestedAttributes) -> Result<LightAttributes, ServiceError> {
        self.send_command(Some(Power::On), requested)
    }

    pub fn turn_off(&self, requested: &RequestedAttributes) -> Result<LightAttributes, ServiceError> {
        self.send_command(Some(Power::Off), requested)
    }

    pub fn toggle(&self, requested: &RequestedAttributes) -> Result<LightAttributes, ServiceError> {
        self.send_command(None, requested)
    }

    /// Observable attributes in the usual home automation shape.
    /// Brightness and color are only shown while the light is on.
    pub fn state_attributes(&self, attrs: &LightAttributes) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("friendly_name".to_string(), json!(self.settings.name));
        map.insert(
            "supported_features".to_string(),
            json!(self.settings.templates.supported_features()),
        );
        if attrs.assumed_state {
            map.insert("assumed_state".to_string(), json!(true));
        }
        if attrs.is_on() {
            if let Some(brightness) = attrs.brightness {
                map.insert("brightness".to_string(), json!(brightness));
            }
            if let Some(rgb) = attrs.rgb_color {
                map.insert("rgb_color".to_string(), json!(rgb));
            }
        }
        map
    }

    /// Current snapshot as held by the state machine.
    pub fn state(&self) -> Option<EntityState> {
        self.states.get(&self.entity_id)
    }

    /// `None` toggles, deciding the direction under the same lock that
    /// applies the optimistic update.
    fn send_command(
        &self,
        power: Option<Power>,
        requested: &RequestedAttributes,
    ) -> Result<LightAttributes, ServiceError> {
        let mut attrs = self.lock();

        let power = power.unwrap_or(if attrs.is_on() { Power::Off } else { Power::On });
        let payload = match power {
            Power::On => render_on(&self.settings.templates, requested)?,
            Power::Off => render_off(&self.settings.templates, requested)?,
        };

        if self.assumed_state() {
            self.apply_optimistic(&mut attrs, power, requested);
            self.publish_state(&attrs);
        }

        let message = MqttPublish {
            topic: self.settings.command_topic.clone(),
            payload,
            qos: self.settings.qos,
            retain: self.settings.retain,
        };
        if let Err(e) = self.transport.publish(message) {
            tracing::error!(entity_id = %self.entity_id, "Command publish failed: {}", e);
            return Err(e.into());
        }

        Ok(*attrs)
    }

    fn apply_optimistic(
        &self,
        attrs: &mut LightAttributes,
        power: Power,
        requested: &RequestedAttributes,
    ) {
        attrs.power = power;
        if power == Power::Off {
            return;
        }

        let templates = &self.settings.templates;
        if let (Some(brightness), true) = (requested.brightness, templates.supports_brightness()) {
            attrs.brightness = Some(brightness.into());
        }
        if let (Some(rgb), true) = (requested.rgb_color, templates.supports_color()) {
            attrs.rgb_color = Some(RgbColor::from(rgb));
        }
    }

    fn publish_state(&self, attrs: &LightAttributes) -> EntityState {
        self.states
            .set(&self.entity_id, attrs.power.as_str(), self.state_attributes(attrs))
    }

    fn accept<T>(&self, parsed: Result<Option<T>, ParseError>) -> Option<T> {
        match parsed {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(entity_id = %self.entity_id, "Ignoring {}", e);
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, LightAttributes> {
        self.attributes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
