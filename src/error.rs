//! Error types for the template light.
//!
//! Setup errors are fatal for a single entity. Parse errors never leave the
//! light module: they are logged and the affected attribute keeps its value.

use thiserror::Error;

/// A template failed to compile or render.
#[derive(Debug, Error)]
#[error("template error: {0}")]
pub struct TemplateError(#[from] pub minijinja::Error);

/// Entity could not be created from its configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),

    #[error("invalid qos {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    #[error("`{option}` does not compile: {source}")]
    Template {
        option: &'static str,
        #[source]
        source: TemplateError,
    },
}

/// A rendered state value could not be turned into an attribute.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid brightness value {0:?}")]
    Brightness(String),

    #[error("invalid {channel} value {value:?}")]
    Color { channel: &'static str, value: String },

    #[error("unrecognized state {0:?}")]
    UnrecognizedState(String),
}

/// Publishing or subscribing through the MQTT client failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[cfg(test)]
    #[error("transport closed")]
    Closed,
}

/// A service call could not be dispatched.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown entity {0}")]
    UnknownEntity(String),

    #[error("unknown service light.{0}")]
    UnknownService(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
