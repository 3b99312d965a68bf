//! JSON turn gateway: the speech-to-text front end posts each caller turn
//! here and speaks `reply_text` back.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use phonedesk_agent::runtime::UNKNOWN_BUSINESS;
use phonedesk_agent::{AgentRuntime, DialogueError, TurnInput, TurnReply};
use phonedesk_core::domain::action::Intent;
use phonedesk_core::domain::call::{CallId, TerminationReason};
use phonedesk_core::errors::{ApplicationError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Clone)]
pub struct GatewayState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IncomingCall {
    pub call_id: String,
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TurnPayload {
    #[serde(default)]
    pub speech: Option<String>,
    #[serde(default)]
    pub digits: Option<String>,
}

impl TurnPayload {
    /// Keypad digits take precedence over speech.
    fn into_input(self) -> TurnInput {
        match self.digits.filter(|digits| !digits.trim().is_empty()) {
            Some(digits) => TurnInput::Digit(digits),
            None => TurnInput::Speech(self.speech.unwrap_or_default()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReply {
    pub reply_text: String,
    pub continue_listening: bool,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<TerminationReason>,
}

impl GatewayReply {
    fn hang_up(reply_text: impl Into<String>) -> Self {
        Self {
            reply_text: reply_text.into(),
            continue_listening: false,
            intent: Intent::General,
            end_reason: None,
        }
    }
}

impl From<TurnReply> for GatewayReply {
    fn from(reply: TurnReply) -> Self {
        let reply_text = match reply.farewell {
            Some(farewell) => format!("{} {farewell}", reply.reply_text),
            None => reply.reply_text,
        };
        Self {
            reply_text,
            continue_listening: reply.continue_call,
            intent: reply.intent,
            end_reason: reply.termination,
        }
    }
}

type GatewayResult = Result<Json<GatewayReply>, (StatusCode, Json<GatewayReply>)>;

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/calls/incoming", post(incoming_call))
        .route("/calls/{call_id}/turns", post(call_turn))
        .with_state(GatewayState { runtime })
}

pub async fn incoming_call(
    State(state): State<GatewayState>,
    Json(body): Json<IncomingCall>,
) -> GatewayResult {
    let call_id = CallId(body.call_id.trim().to_string());
    if call_id.0.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(GatewayReply::hang_up("call_id is required")),
        ));
    }

    match state.runtime.open_call(call_id.clone(), body.to.trim(), body.from.trim()).await {
        Ok(opened) => Ok(Json(GatewayReply {
            reply_text: opened.greeting,
            continue_listening: true,
            intent: Intent::General,
            end_reason: None,
        })),
        Err(DialogueError::BusinessNotFound(routing_key)) => {
            warn!(
                event_name = "gateway.call.unrouted",
                correlation_id = %call_id,
                routing_key = %routing_key,
                "no business configured for dialed number"
            );
            Ok(Json(GatewayReply::hang_up(UNKNOWN_BUSINESS)))
        }
        Err(other) => Err(failure(&call_id, other)),
    }
}

pub async fn call_turn(
    Path(call_id): Path<String>,
    State(state): State<GatewayState>,
    Json(body): Json<TurnPayload>,
) -> GatewayResult {
    let call_id = CallId(call_id);
    state
        .runtime
        .resume_turn(&call_id, body.into_input())
        .await
        .map(|reply| Json(GatewayReply::from(reply)))
        .map_err(|error| failure(&call_id, error))
}

/// Maps a dialogue failure to a status code and an apology the caller can
/// hear before the line closes.
fn failure(call_id: &CallId, error: DialogueError) -> (StatusCode, Json<GatewayReply>) {
    error!(
        event_name = "gateway.turn.failed",
        correlation_id = %call_id,
        error = %error,
        "turn could not be handled"
    );

    let interface = ApplicationError::from(error).into_interface(call_id.to_string());
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(GatewayReply::hang_up(interface.user_message())))
}
