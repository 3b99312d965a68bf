use regex::Regex;

/// Phrases the assistant must not use to offer more help. Each pattern removes
/// the whole question it appears in.
const OFFER_MORE_HELP_PATTERNS: &[&str] = &[
    r"(?i)[^.!?]*\bis there anything else\b[^.!?]*\?",
    r"(?i)[^.!?]*\bwhat else can\b[^.!?]*\?",
    r"(?i)[^.!?]*\bcan i help you with anything else\b[^.!?]*\?",
    r"(?i)[^.!?]*\bhow else can i\b[^.!?]*\?",
    r"(?i)[^.!?]*\banything else\b[^.!?]*\?",
];

/// Substrings that disqualify a sentence even after pattern removal.
const RESIDUAL_TRIGGERS: &[&str] =
    &["anything else", "what else can i", "how else can i", "else i can help"];

#[derive(Clone, Debug)]
pub struct SanitizerRules {
    patterns: Vec<Regex>,
    residual_triggers: Vec<String>,
}

impl SanitizerRules {
    pub fn new(patterns: &[&str], residual_triggers: &[&str]) -> Result<Self, regex::Error> {
        let patterns =
            patterns.iter().map(|pattern| Regex::new(pattern)).collect::<Result<_, _>>()?;
        let residual_triggers =
            residual_triggers.iter().map(|trigger| trigger.to_ascii_lowercase()).collect();
        Ok(Self { patterns, residual_triggers })
    }

    pub fn builtin() -> Result<Self, regex::Error> {
        Self::new(OFFER_MORE_HELP_PATTERNS, RESIDUAL_TRIGGERS)
    }
}

/// Strips offer-more-help questions from generated replies.
#[derive(Clone, Debug)]
pub struct TextSanitizer {
    rules: SanitizerRules,
}

impl TextSanitizer {
    pub fn new(rules: SanitizerRules) -> Self {
        Self { rules }
    }

    /// Returns the cleaned reply, or an empty string when nothing survives.
    pub fn sanitize(&self, text: &str) -> String {
        let mut stripped = text.to_string();
        for pattern in &self.rules.patterns {
            stripped = pattern.replace_all(&stripped, "").into_owned();
        }

        let kept = split_sentences(&stripped)
            .into_iter()
            .filter(|sentence| {
                let lowered = sentence.to_ascii_lowercase();
                !self.rules.residual_triggers.iter().any(|trigger| lowered.contains(trigger))
            })
            .collect::<Vec<_>>();

        if kept.is_empty() {
            return String::new();
        }

        let mut joined = kept.join(" ");
        if !joined.ends_with(['.', '!', '?']) {
            joined.push('.');
        }
        joined
    }
}

/// Splits on `.`, `!` and `?`, keeping each terminator with its sentence and
/// dropping empty fragments.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for character in text.chars() {
        current.push(character);
        if matches!(character, '.' | '!' | '?') {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        sentences.push(trimmed.to_string());
    }
}
