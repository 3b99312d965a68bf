use regex::Regex;
use tracing::info;

use phonedesk_core::domain::call::Session;
use phonedesk_core::errors::DomainError;
use phonedesk_core::flows::{CallFlow, FlowEngine, StageSignals, TransitionOutcome};

use crate::intent::{matches_any, tokenize};

const TOPIC_TRIGGERS: &[&str] =
    &["order", "biryani", "samosa", "curry", "food", "reservation", "reserve", "book", "appointment"];

const AFFIRMATIVE: &str = r"(?i)\b(?:yes|yeah|yep|confirm(?:ed)?|correct|that's right|that is right)\b";

#[derive(Clone, Debug)]
pub struct StageRules {
    pub topic_triggers: Vec<String>,
    affirmative: Regex,
}

impl StageRules {
    pub fn new(topic_triggers: &[&str], affirmative: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            topic_triggers: topic_triggers.iter().map(|trigger| trigger.to_string()).collect(),
            affirmative: Regex::new(affirmative)?,
        })
    }

    pub fn builtin() -> Result<Self, regex::Error> {
        Self::new(TOPIC_TRIGGERS, AFFIRMATIVE)
    }
}

/// Reads turn text into [`StageSignals`] and drives the call flow.
pub struct StageMachine {
    rules: StageRules,
    engine: FlowEngine<CallFlow>,
}

impl StageMachine {
    pub fn new(rules: StageRules, flow: CallFlow) -> Self {
        Self { rules, engine: FlowEngine::new(flow) }
    }

    /// Signals for the turn just recorded on `session`. The transcript already
    /// holds `utterance` as its last caller entry.
    pub fn signals(&self, session: &Session, utterance: &str) -> StageSignals {
        let tokens =
            session.transcript().iter().flat_map(|entry| tokenize(&entry.text)).collect::<Vec<_>>();

        StageSignals {
            topic_mentioned: matches_any(&tokens, &self.rules.topic_triggers)
                || matches_any(&tokenize(utterance), &self.rules.topic_triggers),
            action_attached: session.has_action(),
            caller_affirmed: self.rules.affirmative.is_match(utterance),
            turn_count: session.turn_count(),
        }
    }

    pub fn advance(
        &self,
        session: &mut Session,
        utterance: &str,
    ) -> Result<Option<TransitionOutcome>, DomainError> {
        let signals = self.signals(session, utterance);
        let outcome = self.engine.advance(session, &signals)?;

        if let Some(outcome) = &outcome {
            info!(
                event_name = "dialogue.stage.advanced",
                call_id = %session.call_id,
                from = %outcome.from,
                to = %outcome.to,
                turn = session.turn_count(),
                "stage advanced"
            );
        }
        Ok(outcome)
    }
}
