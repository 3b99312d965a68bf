use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Greeting,
    Ordering,
    Confirming,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Ordering => "ordering",
            Self::Confirming => "confirming",
            Self::Complete => "complete",
        }
    }

    /// The only stage a call may move to from `self`, if any.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Self::Greeting => Some(Self::Ordering),
            Self::Ordering => Some(Self::Confirming),
            Self::Confirming => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    TopicMentioned,
    ActionCaptured,
    CallerAffirmed,
}

/// Facts about the current turn that drive stage transitions. Computed by the
/// caller from text; the flow itself never looks at text.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageSignals {
    pub topic_mentioned: bool,
    pub action_attached: bool,
    pub caller_affirmed: bool,
    pub turn_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: Stage,
    pub to: Stage,
    pub event: StageEvent,
}
