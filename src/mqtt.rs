use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet};
use tokio::task::JoinHandle;

use crate::config::MqttSettings;
use crate::platform::LightPlatform;
use crate::transport::MqttTransport;

/// Pending requests the client may queue before `try_*` calls fail.
const REQUEST_CAPACITY: usize = 256;

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Create the MQTT client. Nothing is sent until the event loop is polled
/// by [`start_bridge`].
pub fn connect(settings: &MqttSettings) -> (MqttTransport, EventLoop) {
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
    options.set_clean_session(true);

    let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
    (MqttTransport::new(client), event_loop)
}

/// Drive the MQTT connection and feed incoming publishes to the platform.
///
/// Every ConnAck re-registers the state topics, since a clean session
/// forgets them.
pub fn start_bridge(mut event_loop: EventLoop, platform: Arc<LightPlatform>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                    tracing::info!(?connack, "MQTT connected");
                    platform.resubscribe();
                }
                Ok(Event::Incoming(Packet::SubAck(suback))) => {
                    tracing::debug!(?suback, "MQTT subscription acknowledged");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    tracing::debug!(topic = %publish.topic, "MQTT message");
                    platform.process_message(&publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "MQTT event loop error, retrying in {:?}", RECONNECT_DELAY);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    })
}
