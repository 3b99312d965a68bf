use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::{Booking, Intent, Order};
use crate::domain::business::BusinessContext;
use crate::errors::DomainError;
use crate::flows::states::Stage;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Caller,
    Assistant,
}

impl Speaker {
    /// Prefix used when the transcript is flattened to text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Caller => "Customer",
            Self::Assistant => "AI",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    CallerEnded,
    OrderConfirmed,
    TurnCeiling,
    AssistantClosed,
    NoProgress,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallerEnded => "caller_ended",
            Self::OrderConfirmed => "order_confirmed",
            Self::TurnCeiling => "turn_ceiling",
            Self::AssistantClosed => "assistant_closed",
            Self::NoProgress => "no_progress",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderMerge {
    Attached,
    Extended,
    Unchanged,
}

/// Conversational state for one phone call.
///
/// The transcript and turn counter are only reachable through methods so that
/// `turn_count` always equals the number of caller entries and the stage can
/// only move forward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub call_id: CallId,
    pub business: BusinessContext,
    pub caller_number: String,
    started_at: DateTime<Utc>,
    transcript: Vec<TranscriptEntry>,
    turn_count: u32,
    stage: Stage,
    order: Option<Order>,
    booking: Option<Booking>,
}

impl Session {
    pub fn new(
        call_id: CallId,
        business: BusinessContext,
        caller_number: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            call_id,
            business,
            caller_number: caller_number.into(),
            started_at,
            transcript: Vec::new(),
            turn_count: 0,
            stage: Stage::Greeting,
            order: None,
            booking: None,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn booking(&self) -> Option<&Booking> {
        self.booking.as_ref()
    }

    pub fn has_action(&self) -> bool {
        self.order.is_some() || self.booking.is_some()
    }

    pub fn record_caller_turn(&mut self, text: impl Into<String>) -> u32 {
        self.transcript.push(TranscriptEntry { speaker: Speaker::Caller, text: text.into() });
        self.turn_count += 1;
        self.turn_count
    }

    pub fn record_assistant_turn(&mut self, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry { speaker: Speaker::Assistant, text: text.into() });
    }

    pub fn transition_to(&mut self, next: Stage) -> Result<(), DomainError> {
        if self.stage.successor() == Some(next) {
            self.stage = next;
            return Ok(());
        }

        Err(DomainError::InvalidStageTransition { from: self.stage, to: next })
    }

    pub fn merge_order(&mut self, extracted: Order) -> OrderMerge {
        match self.order.as_mut() {
            None => {
                self.order = Some(extracted);
                OrderMerge::Attached
            }
            Some(existing) => {
                if existing.merge(&extracted) {
                    OrderMerge::Extended
                } else {
                    OrderMerge::Unchanged
                }
            }
        }
    }

    /// Bookings are captured once; returns false when one is already held.
    pub fn attach_booking(&mut self, booking: Booking) -> bool {
        if self.booking.is_some() {
            return false;
        }
        self.booking = Some(booking);
        true
    }

    pub fn outcome_intent(&self) -> Intent {
        if self.order.is_some() {
            Intent::Order
        } else if self.booking.is_some() {
            Intent::Booking
        } else {
            Intent::General
        }
    }

    /// `Customer: ...` / `AI: ...` lines in call order.
    pub fn transcript_text(&self) -> String {
        self.transcript
            .iter()
            .map(|entry| format!("{}: {}", entry.speaker.label(), entry.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn duration_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}
