use phonedesk_core::domain::action::Intent;
use phonedesk_core::domain::call::TranscriptEntry;

/// Keyword sets for each intent. A keyword matches a token that equals it or
/// starts with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentRules {
    pub order_keywords: Vec<String>,
    pub info_keywords: Vec<String>,
    pub booking_keywords: Vec<String>,
}

impl Default for IntentRules {
    fn default() -> Self {
        Self {
            order_keywords: words(&["order", "biryani", "samosa", "chicken", "food", "menu"]),
            info_keywords: words(&["hour", "open", "close", "timing"]),
            booking_keywords: words(&["book", "appointment", "reservation", "table"]),
        }
    }
}

fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[derive(Clone, Debug, Default)]
pub struct IntentClassifier {
    rules: IntentRules,
}

impl IntentClassifier {
    pub fn new(rules: IntentRules) -> Self {
        Self { rules }
    }

    /// Order wins over info, info over booking. Order keywords also look at the
    /// transcript so a call that started as an order stays one.
    pub fn classify(&self, utterance: &str, transcript: &[TranscriptEntry]) -> Intent {
        let utterance_tokens = tokenize(utterance);
        let transcript_tokens =
            transcript.iter().flat_map(|entry| tokenize(&entry.text)).collect::<Vec<_>>();

        if matches_any(&utterance_tokens, &self.rules.order_keywords)
            || matches_any(&transcript_tokens, &self.rules.order_keywords)
        {
            Intent::Order
        } else if matches_any(&utterance_tokens, &self.rules.info_keywords) {
            Intent::Info
        } else if matches_any(&utterance_tokens, &self.rules.booking_keywords) {
            Intent::Booking
        } else {
            Intent::General
        }
    }
}

/// Deterministic reply used when the completion provider cannot answer.
pub fn fallback_reply(intent: Intent) -> &'static str {
    match intent {
        Intent::Order => "I'd be happy to take your order. What would you like?",
        Intent::Info => "We're open Monday through Sunday, 11AM to 10PM.",
        Intent::Booking => "I can help you with a reservation. What date and time?",
        // Worded to stay clear of the order and topic keywords, since fallbacks
        // land in the transcript.
        Intent::General => "I can help you place a pickup, check our hours, or set up a visit.",
    }
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|character: char| !(character.is_alphanumeric() || character == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn matches_any(tokens: &[String], keywords: &[String]) -> bool {
    tokens.iter().any(|token| keywords.iter().any(|keyword| token.starts_with(keyword.as_str())))
}

#[cfg(test)]
mod tests {
    use phonedesk_core::domain::action::Intent;
    use phonedesk_core::domain::call::{Speaker, TranscriptEntry};

    use super::{fallback_reply, tokenize, IntentClassifier};

    fn caller(text: &str) -> TranscriptEntry {
        TranscriptEntry { speaker: Speaker::Caller, text: text.to_string() }
    }

    #[test]
    fn order_keywords_take_precedence() {
        let classifier = IntentClassifier::default();
        assert_eq!(classifier.classify("Are you open? I want to order food", &[]), Intent::Order);
    }

    #[test]
    fn info_beats_booking() {
        let classifier = IntentClassifier::default();
        assert_eq!(
            classifier.classify("what hours are you open for a reservation", &[]),
            Intent::Info
        );
        assert_eq!(classifier.classify("can I book a table for four", &[]), Intent::Booking);
    }

    #[test]
    fn order_history_carries_into_later_turns() {
        let classifier = IntentClassifier::default();
        let transcript = vec![caller("I'd like two chicken biryani")];
        assert_eq!(classifier.classify("yes please", &transcript), Intent::Order);
    }

    #[test]
    fn info_and_booking_ignore_history() {
        let classifier = IntentClassifier::default();
        let transcript = vec![caller("what time do you close")];
        assert_eq!(classifier.classify("okay thanks", &transcript), Intent::General);
    }

    #[test]
    fn keywords_match_token_prefixes_only() {
        let classifier = IntentClassifier::default();
        assert_eq!(classifier.classify("are you closed on sundays", &[]), Intent::Info);
        assert_eq!(classifier.classify("I love vegetables", &[]), Intent::General);
        assert_eq!(classifier.classify("I'd like a booking", &[]), Intent::Booking);
    }

    #[test]
    fn fallback_replies_are_keyed_by_intent() {
        assert!(fallback_reply(Intent::Order).contains("take your order"));
        assert!(fallback_reply(Intent::Info).contains("11AM to 10PM"));
        assert!(fallback_reply(Intent::Booking).contains("reservation"));
        assert!(fallback_reply(Intent::General).contains("check our hours"));
    }

    #[test]
    fn general_fallback_in_history_keeps_later_turns_general() {
        let classifier = IntentClassifier::default();
        let transcript = vec![
            caller("hello"),
            TranscriptEntry {
                speaker: Speaker::Assistant,
                text: fallback_reply(Intent::General).to_string(),
            },
        ];
        assert_eq!(classifier.classify("hmm okay", &transcript), Intent::General);
    }

    #[test]
    fn tokenizer_keeps_contractions() {
        assert_eq!(tokenize("That's ALL, thanks!"), vec!["that's", "all", "thanks"]);
    }
}
