//! MQTT publisher configuration.

use serde::Deserialize;

/// Configuration for the MQTT publisher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Template for command topics. Supports `{kind}`, `{target}` and `{purpose}`.
    pub topic_template: String,
    /// Value substituted for `{kind}` in the topic template.
    pub topic_kind: String,
    /// Number of outgoing requests buffered between the client and the event loop.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "relayhub".to_string(),
            keep_alive_secs: 30,
            topic_template: "{kind}/{target}/{purpose}".to_string(),
            topic_kind: "device".to_string(),
            channel_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "relayhub");
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.topic_template, "{kind}/{target}/{purpose}");
        assert_eq!(config.topic_kind, "device");
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "mqtt.example.com"
            broker_port = 8883
            client_id = "relay-1"
            keep_alive_secs = 60
            topic_template = "fleet/{target}/{purpose}"
            topic_kind = "gateway"
            channel_capacity = 8
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "mqtt.example.com");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "relay-1");
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.topic_template, "fleet/{target}/{purpose}");
        assert_eq!(config.topic_kind, "gateway");
        assert_eq!(config.channel_capacity, 8);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"broker_host = "192.168.1.100""#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "192.168.1.100");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "relayhub");
        assert_eq!(config.topic_kind, "device");
    }
}
