use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::lead::{ExtractedFields, LeadField};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Greeting,
    Qualifying,
    Scheduling,
    Completed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Qualifying => "qualifying",
            Self::Scheduling => "scheduling",
            Self::Completed => "completed",
        }
    }

    /// Position along the conversation; stages only ever move to a higher rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Greeting => 0,
            Self::Qualifying => 1,
            Self::Scheduling => 2,
            Self::Completed => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "greeting" => Ok(Self::Greeting),
            "qualifying" => Ok(Self::Qualifying),
            "scheduling" => Ok(Self::Scheduling),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown conversation stage `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    ScoreThreshold,
    ExternalCompletion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    pub score: u8,
    pub trigger: TransitionTrigger,
}

/// Result of feeding one inbound message through the state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOutcome {
    pub extracted: ExtractedFields,
    pub changed: Vec<LeadField>,
    pub score: u8,
    pub stage: Stage,
    pub transition: Option<StageTransition>,
}
