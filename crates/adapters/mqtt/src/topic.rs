//! Template-driven command topic naming.

use relayhub_app::ports::TopicScheme;
use relayhub_domain::id::TargetIdentity;
use relayhub_domain::topic::TopicPurpose;

use crate::config::MqttConfig;

/// Builds topics by substituting `{kind}`, `{target}` and `{purpose}` in a template.
#[derive(Debug, Clone)]
pub struct TopicTemplate {
    template: String,
    kind: String,
}

impl TopicTemplate {
    #[must_use]
    pub fn new(template: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            kind: kind.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &MqttConfig) -> Self {
        Self::new(config.topic_template.clone(), config.topic_kind.clone())
    }
}

impl Default for TopicTemplate {
    fn default() -> Self {
        Self::from_config(&MqttConfig::default())
    }
}

impl TopicScheme for TopicTemplate {
    fn topic(&self, purpose: TopicPurpose, target: &TargetIdentity) -> String {
        self.template
            .replace("{kind}", &self.kind)
            .replace("{target}", target.as_str())
            .replace("{purpose}", purpose.as_str())
    }
}
