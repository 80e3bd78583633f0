//! Template light platform.
//!
//! Creates a [`LightEntity`] per valid `light:` entry, subscribes their
//! state topics, routes inbound MQTT messages to every light listening on
//! the topic, and dispatches `light.*` service calls.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::LightConfig;
use crate::error::{ServiceError, SetupError};
use crate::light::{LightEntity, RequestedAttributes};
use crate::state::{EntityState, StateMachine};
use crate::transport::Transport;

pub struct LightPlatform {
    /// Lights keyed by entity_id
    entities: DashMap<String, Arc<LightEntity>>,
    /// State topic -> entity_ids listening on it
    topic_subscriptions: DashMap<String, Vec<String>>,
    transport: Arc<dyn Transport>,
    states: Arc<StateMachine>,
}

impl LightPlatform {
    pub fn new(transport: Arc<dyn Transport>, states: Arc<StateMachine>) -> Self {
        Self {
            entities: DashMap::new(),
            topic_subscriptions: DashMap::new(),
            transport,
            states,
        }
    }

    /// Set up every template light in `configs`. Entries for other
    /// platforms are skipped; invalid entries are logged and skipped.
    /// Returns the number of lights created.
    pub fn setup(&self, configs: Vec<LightConfig>) -> usize {
        let mut created = 0;
        for config in configs {
            if !config.is_template_light() {
                tracing::debug!("Skipping light platform {:?}", config.platform);
                continue;
            }
            let name = config.name.clone();
            match self.add_light(config) {
                Ok(_) => created += 1,
                Err(e) => tracing::error!(
                    "Invalid config for light {}: {}",
                    name.as_deref().unwrap_or("unnamed"),
                    e
                ),
            }
        }
        tracing::info!("Set up {} template light(s)", created);
        created
    }

    pub fn add_light(&self, config: LightConfig) -> Result<Arc<LightEntity>, SetupError> {
        let settings = config.validate()?;
        let entity_id = self.unique_entity_id(&settings.name);
        let state_topic = settings.state_topic.clone();
        let qos = settings.qos;

        let light = Arc::new(LightEntity::new(
            entity_id.clone(),
            settings,
            self.transport.clone(),
            self.states.clone(),
        ));
        self.entities.insert(entity_id.clone(), light.clone());

        if let Some(topic) = state_topic {
            self.topic_subscriptions
                .entry(topic.clone())
                .or_default()
                .push(entity_id.clone());
            // Retried on every (re)connect, see resubscribe()
            if let Err(e) = self.transport.subscribe(&topic, qos) {
                tracing::warn!(entity_id = %entity_id, "Subscribe to {} failed: {}", topic, e);
            }
        }

        tracing::info!(
            entity_id = %entity_id,
            "Template light {} on {}",
            light.name(),
            light.settings().state_topic.as_deref().unwrap_or("no state topic (assumed state)"),
        );
        Ok(light)
    }

    /// Remove a light and stop routing its state topic.
    pub fn remove(&self, entity_id: &str) -> bool {
        let Some((_, light)) = self.entities.remove(entity_id) else {
            return false;
        };
        if let Some(topic) = &light.settings().state_topic {
            if let Some(mut ids) = self.topic_subscriptions.get_mut(topic) {
                ids.retain(|id| id != entity_id);
                if ids.is_empty() {
                    drop(ids);
                    self.topic_subscriptions.remove(topic);
                }
            }
        }
        self.states.remove(entity_id);
        tracing::info!(entity_id = %entity_id, "Removed template light");
        true
    }

    /// Re-register every state topic, e.g. after the broker connection
    /// was re-established with a clean session.
    pub fn resubscribe(&self) {
        for entry in self.entities.iter() {
            let settings = entry.value().settings();
            if let Some(topic) = &settings.state_topic {
                if let Err(e) = self.transport.subscribe(topic, settings.qos) {
                    tracing::warn!("Resubscribe to {} failed: {}", topic, e);
                }
            }
        }
    }

    /// Route one inbound message to the lights listening on `topic`.
    pub fn process_message(&self, topic: &str, payload: &[u8]) {
        let entity_ids = match self.topic_subscriptions.get(topic) {
            Some(ids) => ids.clone(),
            None => return,
        };
        let payload = String::from_utf8_lossy(payload);

        for entity_id in &entity_ids {
            if let Some(light) = self.get(entity_id) {
                light.process_message(&payload);
            }
        }
    }

    /// Dispatch `light.<service>` for one entity.
    pub fn call_service(
        &self,
        service: &str,
        entity_id: &str,
        requested: &RequestedAttributes,
    ) -> Result<EntityState, ServiceError> {
        let light = self
            .get(entity_id)
            .ok_or_else(|| ServiceError::UnknownEntity(entity_id.to_string()))?;

        tracing::info!(entity_id = %entity_id, service = %service, "Service called");
        match service {
            "turn_on" => light.turn_on(requested)?,
            "turn_off" => light.turn_off(requested)?,
            "toggle" => light.toggle(requested)?,
            _ => return Err(ServiceError::UnknownService(service.to_string())),
        };

        light
            .state()
            .ok_or_else(|| ServiceError::UnknownEntity(entity_id.to_string()))
    }

    pub fn get(&self, entity_id: &str) -> Option<Arc<LightEntity>> {
        self.entities.get(entity_id).map(|e| e.value().clone())
    }

    pub fn is_subscribed_topic(&self, topic: &str) -> bool {
        self.topic_subscriptions.contains_key(topic)
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        self.topic_subscriptions
            .iter()
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// `light.<slug>`, with `_2`, `_3`... appended when taken.
    fn unique_entity_id(&self, name: &str) -> String {
        let base = format!("light.{}", slugify(name));
        let mut candidate = base.clone();
        let mut n = 2;
        while self.entities.contains_key(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        candidate
    }
}

/// Lowercase, runs of anything not alphanumeric collapsed to one `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("unnamed");
    }
    slug
}
