//! Template-driven MQTT light.
//!
//! User templates turn light intents into device command payloads and
//! device state payloads back into light attributes. See [`light`] for the
//! translation core, [`platform`] for setup and message routing.

pub mod api;
pub mod config;
pub mod error;
pub mod light;
pub mod mqtt;
pub mod platform;
pub mod state;
pub mod template;
pub mod transport;
