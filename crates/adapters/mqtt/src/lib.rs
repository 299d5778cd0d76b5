//! # relayhub-adapter-mqtt
//!
//! MQTT adapter. Publishes device commands to a broker through rumqttc and
//! owns the command topic naming scheme.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and keep the event loop driven
//! - Implement [`CommandPublisher`](relayhub_app::ports::CommandPublisher)
//! - Implement [`TopicScheme`](relayhub_app::ports::TopicScheme) via [`TopicTemplate`]
//!
//! ## Dependency rule
//! Same as other adapters: depends on `relayhub-app` and `relayhub-domain`.

pub mod config;
pub mod error;
pub mod publisher;
pub mod topic;

pub use config::MqttConfig;
pub use error::MqttError;
pub use publisher::MqttPublisher;
pub use topic::TopicTemplate;
