use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// HA-compatible state object, as read by observers and the REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub last_changed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub context: Context,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
}

impl Context {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Event fired when state changes
#[derive(Debug, Clone, Serialize)]
pub struct StateChangedEvent {
    pub entity_id: String,
    pub old_state: Option<EntityState>,
    pub new_state: EntityState,
}

/// Registry of observable entity states.
///
/// Lights write a complete snapshot here after every atomic update; readers
/// never see a half-applied message.
pub struct StateMachine {
    states: DashMap<String, EntityState>,
    event_tx: broadcast::Sender<StateChangedEvent>,
}

impl StateMachine {
    pub fn new(channel_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(channel_capacity);
        Self {
            states: DashMap::new(),
            event_tx,
        }
    }

    pub fn get_all(&self) -> Vec<EntityState> {
        let mut all: Vec<EntityState> = self.states.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        all
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.get(entity_id).map(|entry| entry.value().clone())
    }

    /// Store a new snapshot and fire `state_changed`.
    ///
    /// `last_changed` moves only when the state string changes,
    /// `last_updated` when the state or any attribute changes.
    pub fn set(
        &self,
        entity_id: &str,
        state: &str,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> EntityState {
        let now = Utc::now();

        let old_state = self.get(entity_id);
        let (last_changed, last_updated) = match &old_state {
            Some(prev) if prev.state == state => {
                let updated = if prev.attributes != attributes {
                    now
                } else {
                    prev.last_updated
                };
                (prev.last_changed, updated)
            }
            _ => (now, now),
        };

        let new_state = EntityState {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            attributes,
            last_changed,
            last_updated,
            context: Context::new(),
        };
        self.states.insert(entity_id.to_string(), new_state.clone());

        // No subscribers is fine
        let _ = self.event_tx.send(StateChangedEvent {
            entity_id: entity_id.to_string(),
            old_state,
            new_state: new_state.clone(),
        });

        new_state
    }

    /// Remove an entity. Returns true if it existed.
    pub fn remove(&self, entity_id: &str) -> bool {
        self.states.remove(entity_id).is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChangedEvent> {
        self.event_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
