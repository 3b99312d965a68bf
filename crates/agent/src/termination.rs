use phonedesk_core::config::DialogueConfig;
use phonedesk_core::domain::call::{Session, TerminationReason};

use crate::intent::tokenize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminationRules {
    /// Whole utterances (after normalization) that end the call.
    pub exact_endings: Vec<String>,
    /// Phrases that end the call wherever they appear.
    pub ending_phrases: Vec<String>,
    /// Phrases in the assistant's reply that close the call.
    pub closing_phrases: Vec<String>,
    pub max_turns: u32,
    pub no_progress_turns: u32,
}

impl Default for TerminationRules {
    fn default() -> Self {
        Self {
            exact_endings: strings(&["no", "nope", "done", "bye", "goodbye", "thanks", "thank you"]),
            ending_phrases: strings(&[
                "that's all",
                "nothing else",
                "no thanks",
                "i'm done",
                "i'm good",
                "all set",
                "that is all",
                "finished",
                "no more",
            ]),
            closing_phrases: strings(&["thank you for calling", "have a great day"]),
            max_turns: 6,
            no_progress_turns: 4,
        }
    }
}

impl TerminationRules {
    pub fn from_config(config: &DialogueConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            no_progress_turns: config.no_progress_turns,
            ..Self::default()
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Decides, once per turn, whether the call should end and why.
#[derive(Clone, Debug, Default)]
pub struct TerminationPolicy {
    rules: TerminationRules,
}

impl TerminationPolicy {
    pub fn new(rules: TerminationRules) -> Self {
        Self { rules }
    }

    /// Reasons are checked in a fixed order and the first match wins.
    pub fn evaluate(
        &self,
        session: &Session,
        utterance: &str,
        reply: &str,
    ) -> Option<TerminationReason> {
        if self.caller_wants_to_end(utterance) {
            return Some(TerminationReason::CallerEnded);
        }
        if session.stage().is_terminal() {
            return Some(TerminationReason::OrderConfirmed);
        }
        if session.turn_count() >= self.rules.max_turns {
            return Some(TerminationReason::TurnCeiling);
        }

        let reply = reply.to_lowercase();
        if self.rules.closing_phrases.iter().any(|phrase| reply.contains(phrase.as_str())) {
            return Some(TerminationReason::AssistantClosed);
        }
        if session.turn_count() >= self.rules.no_progress_turns && !session.has_action() {
            return Some(TerminationReason::NoProgress);
        }
        None
    }

    pub fn caller_wants_to_end(&self, utterance: &str) -> bool {
        let lowered = utterance.to_lowercase();
        let normalized = lowered
            .trim()
            .trim_end_matches(|character: char| matches!(character, '.' | '!' | '?' | ','));

        if self.rules.exact_endings.iter().any(|ending| ending == normalized) {
            return true;
        }
        if self.rules.ending_phrases.iter().any(|phrase| lowered.contains(phrase.as_str())) {
            return true;
        }

        tokenize(&lowered).iter().any(|token| token == "no")
            && !lowered.contains("know")
            && !lowered.contains("another")
    }
}
