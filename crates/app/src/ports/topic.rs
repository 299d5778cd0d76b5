//! Topic naming port. The naming scheme is owned by the transport side.

use std::sync::Arc;

use relayhub_domain::id::TargetIdentity;
use relayhub_domain::topic::TopicPurpose;

/// Derives the concrete topic for a command purpose and a target identity.
pub trait TopicScheme {
    fn topic(&self, purpose: TopicPurpose, target: &TargetIdentity) -> String;
}

impl<T: TopicScheme> TopicScheme for Arc<T> {
    fn topic(&self, purpose: TopicPurpose, target: &TargetIdentity) -> String {
        (**self).topic(purpose, target)
    }
}
