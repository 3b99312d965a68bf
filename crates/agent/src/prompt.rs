use tera::{Context, Tera};
use thiserror::Error;

use phonedesk_core::domain::action::Order;
use phonedesk_core::domain::call::{Session, Speaker, TranscriptEntry};

use crate::llm::ChatMessage;

const SYSTEM_TEMPLATE: &str = "system_prompt";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template error: {0}")]
    Template(String),
}

/// Renders the per-turn message list sent to the completion provider.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    tera: Tera,
    pickup_eta: String,
}

impl PromptBuilder {
    pub fn new(pickup_eta: impl Into<String>) -> Result<Self, PromptError> {
        Self::with_template(include_str!("../templates/system_prompt.tera"), pickup_eta)
    }

    pub fn with_template(template: &str, pickup_eta: impl Into<String>) -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_template(SYSTEM_TEMPLATE, template)
            .map_err(|error| PromptError::Template(error.to_string()))?;
        Ok(Self { tera, pickup_eta: pickup_eta.into() })
    }

    pub fn system_prompt(&self, session: &Session) -> Result<String, PromptError> {
        let business = &session.business;
        let mut context = Context::new();
        context.insert("business_name", &business.name);
        context.insert("business_type", &business.business_type);
        context.insert("hours", business.hours_or_default());
        context.insert("menu", business.menu_or_default());
        context.insert("turn", &session.turn_count());
        context.insert("stage", session.stage().as_str());
        context.insert("has_action", &session.has_action());
        context.insert("order_summary", &session.order().map(order_summary).unwrap_or_default());
        context.insert("pickup_eta", &self.pickup_eta);

        self.tera
            .render(SYSTEM_TEMPLATE, &context)
            .map(|rendered| rendered.trim().to_string())
            .map_err(|error| PromptError::Template(error.to_string()))
    }

    /// System block, then the prior transcript as alternating turns, then the
    /// current utterance. The utterance is not repeated when it is already the
    /// last transcript entry.
    pub fn build(&self, session: &Session, utterance: &str) -> Result<Vec<ChatMessage>, PromptError> {
        let transcript = session.transcript();
        let prior = match transcript.split_last() {
            Some((last, rest)) if last.speaker == Speaker::Caller && last.text == utterance => rest,
            _ => transcript,
        };

        let mut messages = Vec::with_capacity(prior.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt(session)?));
        messages.extend(prior.iter().map(as_message));
        messages.push(ChatMessage::user(utterance));
        Ok(messages)
    }
}

fn as_message(entry: &TranscriptEntry) -> ChatMessage {
    match entry.speaker {
        Speaker::Caller => ChatMessage::user(entry.text.clone()),
        Speaker::Assistant => ChatMessage::assistant(entry.text.clone()),
    }
}

/// `2 chicken biryani, 1 vegetable samosa (total $35)`
pub fn order_summary(order: &Order) -> String {
    let items = order
        .items
        .iter()
        .map(|item| format!("{} {}", item.quantity, item.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{items} (total ${})", order.total)
}
