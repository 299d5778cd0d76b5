//! Command topic purposes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a published command is for. Combined with a target identity by the
/// topic naming scheme to produce the concrete topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicPurpose {
    #[serde(rename = "control")]
    Control,
    #[serde(rename = "setting")]
    Setting,
    #[serde(rename = "slaveRequest")]
    SlaveRequest,
}

impl TopicPurpose {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Setting => "setting",
            Self::SlaveRequest => "slaveRequest",
        }
    }
}

impl fmt::Display for TopicPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
