//! Transport seam between lights and the MQTT client.
//!
//! Lights publish commands and register state topics through [`Transport`].
//! Inbound messages arrive via the event loop in `mqtt.rs`, which hands
//! them to the platform.

use rumqttc::{AsyncClient, QoS};

use crate::error::TransportError;

/// An outgoing MQTT message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttPublish {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

pub trait Transport: Send + Sync {
    /// Start delivering messages on `topic` to the event loop.
    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), TransportError>;

    /// Queue a message. Not retried on failure.
    fn publish(&self, message: MqttPublish) -> Result<(), TransportError>;
}

/// `rumqttc` backed transport. Calls never block: requests are queued for
/// the event loop and fail if the queue is full.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl Transport for MqttTransport {
    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), TransportError> {
        self.client.try_subscribe(topic, qos)?;
        Ok(())
    }

    fn publish(&self, message: MqttPublish) -> Result<(), TransportError> {
        tracing::debug!(topic = %message.topic, payload = %message.payload, "MQTT publish");
        self.client
            .try_publish(message.topic, message.qos, message.retain, message.payload)?;
        Ok(())
    }
}

/// Map a configured qos level to `rumqttc`.
pub fn qos_from_level(level: u8) -> Option<QoS> {
    match level {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Records everything published or subscribed for inspection.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        published: Mutex<Vec<MqttPublish>>,
        subscriptions: Mutex<Vec<(String, QoS)>>,
        fail_publish: AtomicBool,
    }

    impl RecordingTransport {
        pub(crate) fn published(&self) -> Vec<MqttPublish> {
            self.published.lock().unwrap().clone()
        }

        pub(crate) fn last_published(&self) -> Option<MqttPublish> {
            self.published.lock().unwrap().last().cloned()
        }

        pub(crate) fn subscriptions(&self) -> Vec<(String, QoS)> {
            self.subscriptions.lock().unwrap().clone()
        }

        pub(crate) fn set_fail_publish(&self, fail: bool) {
            self.fail_publish.store(fail, Ordering::SeqCst);
        }
    }

    impl Transport for RecordingTransport {
        fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), TransportError> {
            self.subscriptions.lock().unwrap().push((topic.to_string(), qos));
            Ok(())
        }

        fn publish(&self, message: MqttPublish) -> Result<(), TransportError> {
            if self.fail_publish.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }
            self.published.lock().unwrap().push(message);
            Ok(())
        }
    }
}
