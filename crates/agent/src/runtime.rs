use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use phonedesk_core::config::DialogueConfig;
use phonedesk_core::domain::action::{Action, Intent};
use phonedesk_core::domain::business::BusinessContext;
use phonedesk_core::domain::call::{CallId, OrderMerge, Session, TerminationReason};
use phonedesk_core::errors::{ApplicationError, DomainError};
use phonedesk_core::flows::CallFlow;
use phonedesk_db::repositories::{RecordStore, RepositoryError};

use crate::extraction::{ActionExtractor, ExtractionRules};
use crate::intent::{fallback_reply, IntentClassifier, IntentRules};
use crate::llm::CompletionProvider;
use crate::prompt::{PromptBuilder, PromptError};
use crate::reconciler::{PersistenceReconciler, ReconcileReport};
use crate::sanitizer::{SanitizerRules, TextSanitizer};
use crate::session::{SessionHandle, SessionStore};
use crate::stage::{StageMachine, StageRules};
use crate::termination::{TerminationPolicy, TerminationRules};

pub const REPROMPT: &str =
    "I didn't catch that. Could you please speak more clearly or press 1 for menu, 2 for hours?";
pub const UNKNOWN_BUSINESS: &str =
    "Sorry, I cannot find the business information. Please try again later.";

const MENU_REQUEST: &str = "What is your menu?";
const HOURS_REQUEST: &str = "What are your hours?";

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("no active session for call {0}")]
    SessionNotFound(CallId),
    #[error("no business is routed to {0}")]
    BusinessNotFound(String),
    #[error("business lookup failed: {0}")]
    Lookup(#[from] RepositoryError),
    #[error(transparent)]
    Stage(#[from] DomainError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("dialogue rules failed to compile: {0}")]
    Rules(#[from] regex::Error),
}

impl From<DialogueError> for ApplicationError {
    fn from(error: DialogueError) -> Self {
        match error {
            DialogueError::SessionNotFound(call_id) => Self::NotFound(format!("session {call_id}")),
            DialogueError::BusinessNotFound(key) => Self::NotFound(format!("business for {key}")),
            DialogueError::Lookup(error) => Self::Persistence(error.to_string()),
            DialogueError::Stage(error) => Self::Domain(error),
            DialogueError::Prompt(error) => Self::Configuration(error.to_string()),
            DialogueError::Rules(error) => Self::Configuration(error.to_string()),
        }
    }
}

/// What the caller sent for one turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnInput {
    Speech(String),
    Digit(String),
}

impl TurnInput {
    /// Text to run through the pipeline, or `None` when the caller said
    /// nothing. Keypad digits are spoken back as questions.
    pub fn utterance(&self) -> Option<String> {
        match self {
            Self::Speech(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Self::Digit(digit) => match digit.trim() {
                "" => None,
                "1" => Some(MENU_REQUEST.to_string()),
                "2" => Some(HOURS_REQUEST.to_string()),
                other => Some(format!("User pressed {other}")),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub call_id: CallId,
    pub business: BusinessContext,
    pub caller_number: String,
    pub input: TurnInput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub reply_text: String,
    pub intent: Intent,
    pub continue_call: bool,
    pub action: Option<Action>,
    pub termination: Option<TerminationReason>,
    /// Spoken after `reply_text` when the call ends.
    pub farewell: Option<String>,
}

impl TurnReply {
    pub fn reprompt() -> Self {
        Self {
            reply_text: REPROMPT.to_string(),
            intent: Intent::General,
            continue_call: true,
            action: None,
            termination: None,
            farewell: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedCall {
    pub business: BusinessContext,
    pub greeting: String,
}

/// Result of the single completion attempt made per turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    Generated(String),
    Failed(String),
}

/// Every rule set the pipeline consults, bundled so callers can swap any of
/// them.
#[derive(Clone, Debug)]
pub struct DialogueRules {
    pub sanitizer: SanitizerRules,
    pub intent: IntentRules,
    pub extraction: ExtractionRules,
    pub stage: StageRules,
    pub termination: TerminationRules,
    pub flow: CallFlow,
}

impl DialogueRules {
    pub fn builtin(config: &DialogueConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            sanitizer: SanitizerRules::builtin()?,
            intent: IntentRules::default(),
            extraction: ExtractionRules::builtin()?,
            stage: StageRules::builtin()?,
            termination: TerminationRules::from_config(config),
            flow: CallFlow { min_turns_before_confirming: config.min_turns_before_confirming },
        })
    }
}

/// Runs phone calls turn by turn: session state, the completion call, action
/// capture, and the end-of-call write.
pub struct AgentRuntime {
    sessions: Arc<SessionStore>,
    completion: Arc<dyn CompletionProvider>,
    records: Arc<dyn RecordStore>,
    sanitizer: TextSanitizer,
    classifier: IntentClassifier,
    extractor: ActionExtractor,
    stages: StageMachine,
    termination: TerminationPolicy,
    prompts: PromptBuilder,
    reconciler: PersistenceReconciler,
    completion_timeout: Duration,
}

impl AgentRuntime {
    pub fn new(
        sessions: Arc<SessionStore>,
        completion: Arc<dyn CompletionProvider>,
        records: Arc<dyn RecordStore>,
        rules: DialogueRules,
        config: &DialogueConfig,
    ) -> Result<Self, DialogueError> {
        Ok(Self {
            sessions,
            completion,
            reconciler: PersistenceReconciler::new(Arc::clone(&records)),
            records,
            sanitizer: TextSanitizer::new(rules.sanitizer),
            classifier: IntentClassifier::new(rules.intent),
            extractor: ActionExtractor::new(rules.extraction, config.pickup_eta.clone()),
            stages: StageMachine::new(rules.stage, rules.flow),
            termination: TerminationPolicy::new(rules.termination),
            prompts: PromptBuilder::new(config.pickup_eta.clone())?,
            completion_timeout: Duration::from_secs(config.completion_timeout_secs),
        })
    }

    pub fn with_defaults(
        sessions: Arc<SessionStore>,
        completion: Arc<dyn CompletionProvider>,
        records: Arc<dyn RecordStore>,
        config: &DialogueConfig,
    ) -> Result<Self, DialogueError> {
        let rules = DialogueRules::builtin(config)?;
        Self::new(sessions, completion, records, rules, config)
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Resolves the business behind `routing_key`, starts a session and
    /// returns the greeting. The greeting is not part of the transcript.
    pub async fn open_call(
        &self,
        call_id: CallId,
        routing_key: &str,
        caller_number: &str,
    ) -> Result<OpenedCall, DialogueError> {
        let business = self
            .records
            .find_business_by_routing_key(routing_key)
            .await?
            .ok_or_else(|| DialogueError::BusinessNotFound(routing_key.to_string()))?;

        self.sessions.get_or_create(&call_id, &business, caller_number).await;
        info!(
            event_name = "dialogue.call.opened",
            call_id = %call_id,
            business_id = %business.id,
            "call opened"
        );

        let greeting = greeting(&business);
        Ok(OpenedCall { business, greeting })
    }

    /// Handles one turn, creating the session on first contact.
    pub async fn process_turn(&self, request: TurnRequest) -> Result<TurnReply, DialogueError> {
        let Some(utterance) = request.input.utterance() else {
            return Ok(TurnReply::reprompt());
        };

        let handle = self
            .sessions
            .get_or_create(&request.call_id, &request.business, &request.caller_number)
            .await;
        self.run_turn(handle, &utterance).await
    }

    /// Handles one turn of a call already opened with [`Self::open_call`].
    pub async fn resume_turn(
        &self,
        call_id: &CallId,
        input: TurnInput,
    ) -> Result<TurnReply, DialogueError> {
        let handle = self
            .sessions
            .get(call_id)
            .await
            .ok_or_else(|| DialogueError::SessionNotFound(call_id.clone()))?;

        let Some(utterance) = input.utterance() else {
            return Ok(TurnReply::reprompt());
        };
        self.run_turn(handle, &utterance).await
    }

    async fn run_turn(&self, handle: SessionHandle, utterance: &str) -> Result<TurnReply, DialogueError> {
        let mut session = handle.lock().await;

        // A turn queued behind the one that ended the call holds a handle the
        // store no longer owns.
        let live = self
            .sessions
            .get(&session.call_id)
            .await
            .is_some_and(|current| Arc::ptr_eq(&current, &handle));
        if !live {
            debug!(
                event_name = "dialogue.turn.stale",
                call_id = %session.call_id,
                "session ended while the turn was waiting"
            );
            return Err(DialogueError::SessionNotFound(session.call_id.clone()));
        }

        let turn = session.record_caller_turn(utterance);
        self.stages.advance(&mut session, utterance)?;

        let intent = self.classifier.classify(utterance, session.transcript());
        let reply_text = match self.generate(&session, utterance).await {
            CompletionOutcome::Generated(text) => text,
            CompletionOutcome::Failed(reason) => {
                warn!(
                    event_name = "dialogue.completion.fallback",
                    call_id = %session.call_id,
                    turn,
                    intent = %intent,
                    error = %reason,
                    "using fallback reply"
                );
                fallback_reply(intent).to_string()
            }
        };
        session.record_assistant_turn(reply_text.clone());

        let transcript = session.transcript();
        let prior = &transcript[..transcript.len().saturating_sub(2)];
        let action = self.extractor.extract(prior, utterance, &reply_text);
        if let Some(action) = &action {
            attach_action(&mut session, action.clone());
        }

        let termination = self.termination.evaluate(&session, utterance, &reply_text);
        info!(
            event_name = "dialogue.turn.completed",
            call_id = %session.call_id,
            turn,
            stage = %session.stage(),
            intent = %intent,
            has_action = session.has_action(),
            "turn completed"
        );

        let farewell = match termination {
            Some(reason) => {
                self.finish(&session, reason).await;
                Some(farewell(&session.business))
            }
            None => None,
        };

        Ok(TurnReply {
            reply_text,
            intent,
            continue_call: termination.is_none(),
            action,
            termination,
            farewell,
        })
    }

    /// One completion attempt, bounded by the configured timeout.
    async fn generate(&self, session: &Session, utterance: &str) -> CompletionOutcome {
        let messages = match self.prompts.build(session, utterance) {
            Ok(messages) => messages,
            Err(error) => return CompletionOutcome::Failed(error.to_string()),
        };

        match tokio::time::timeout(self.completion_timeout, self.completion.complete(&messages)).await
        {
            Ok(Ok(text)) => {
                let cleaned = self.sanitizer.sanitize(&text);
                if cleaned.is_empty() {
                    CompletionOutcome::Failed("reply was empty after sanitizing".to_string())
                } else {
                    CompletionOutcome::Generated(cleaned)
                }
            }
            Ok(Err(error)) => CompletionOutcome::Failed(error.to_string()),
            Err(_) => CompletionOutcome::Failed(format!(
                "completion timed out after {}s",
                self.completion_timeout.as_secs()
            )),
        }
    }

    async fn finish(&self, session: &Session, reason: TerminationReason) -> ReconcileReport {
        info!(
            event_name = "dialogue.call.terminated",
            call_id = %session.call_id,
            reason = %reason,
            turns = session.turn_count(),
            "call terminated"
        );
        let report = self.reconciler.reconcile(session, reason).await;
        self.sessions.discard(&session.call_id).await;
        report
    }
}

fn attach_action(session: &mut Session, action: Action) {
    let call_id = session.call_id.clone();
    match action {
        Action::Order(order) => {
            let merge = session.merge_order(order);
            if merge != OrderMerge::Unchanged {
                info!(
                    event_name = "dialogue.order.captured",
                    call_id = %call_id,
                    merge = ?merge,
                    "order captured"
                );
            }
        }
        Action::Booking(booking) => {
            let differs = session.booking().is_some_and(|held| *held != booking);
            if session.attach_booking(booking) {
                info!(event_name = "dialogue.booking.captured", call_id = %call_id, "booking captured");
            } else if differs {
                debug!(
                    event_name = "dialogue.booking.ignored",
                    call_id = %call_id,
                    "booking already held, later extraction ignored"
                );
            }
        }
    }
}

pub fn greeting(business: &BusinessContext) -> String {
    format!(
        "Thank you for calling {}. I'm Maya, your AI assistant. How can I help you today? \
         You can also press 1 for menu or 2 for hours.",
        business.name
    )
}

pub fn farewell(business: &BusinessContext) -> String {
    format!("Thank you for calling {}. Have a great day!", business.name)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use phonedesk_core::config::DialogueConfig;
    use phonedesk_core::domain::action::Intent;
    use phonedesk_core::domain::business::{BusinessContext, BusinessId};
    use phonedesk_core::domain::call::CallId;
    use phonedesk_core::flows::Stage;
    use phonedesk_db::repositories::InMemoryRecordStore;

    use crate::intent::fallback_reply;
    use crate::llm::{ChatMessage, CompletionError, CompletionProvider};
    use crate::session::SessionStore;

    use super::{AgentRuntime, DialogueError, TurnInput, TurnRequest, REPROMPT};

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self { replies: Mutex::new(replies.into()) }
        }
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, CompletionError> {
            self.replies
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Ok("Sure.".to_string()))
        }
    }

    fn business() -> BusinessContext {
        let mut business = BusinessContext::new(BusinessId("biz-1".to_string()), "Spice Route");
        business.routing_key = "+15550009999".to_string();
        business
    }

    fn runtime(replies: Vec<Result<String, CompletionError>>) -> (AgentRuntime, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        let runtime = AgentRuntime::with_defaults(
            Arc::new(SessionStore::new()),
            Arc::new(Scripted::new(replies)),
            store.clone(),
            &DialogueConfig::default(),
        )
        .expect("runtime builds");
        (runtime, store)
    }

    fn speech(text: &str) -> TurnRequest {
        TurnRequest {
            call_id: CallId("CA-runtime".to_string()),
            business: business(),
            caller_number: "+15550001111".to_string(),
            input: TurnInput::Speech(text.to_string()),
        }
    }

    #[test]
    fn digits_map_to_questions() {
        assert_eq!(TurnInput::Digit("1".to_string()).utterance().as_deref(), Some("What is your menu?"));
        assert_eq!(TurnInput::Digit("2".to_string()).utterance().as_deref(), Some("What are your hours?"));
        assert_eq!(TurnInput::Digit("7".to_string()).utterance().as_deref(), Some("User pressed 7"));
        assert_eq!(TurnInput::Speech("   ".to_string()).utterance(), None);
    }

    #[tokio::test]
    async fn blank_speech_reprompts_without_touching_state() {
        let (runtime, _) = runtime(vec![]);

        let reply = runtime.process_turn(speech("  ")).await.expect("turn");

        assert_eq!(reply.reply_text, REPROMPT);
        assert!(reply.continue_call);
        assert!(runtime.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn provider_error_falls_back_by_intent() {
        let (runtime, _) = runtime(vec![Err(CompletionError::Empty)]);

        let reply = runtime.process_turn(speech("what time do you open?")).await.expect("turn");

        assert_eq!(reply.intent, Intent::Info);
        assert_eq!(reply.reply_text, "We're open Monday through Sunday, 11AM to 10PM.");
        assert!(reply.continue_call);
    }

    #[tokio::test]
    async fn general_fallback_does_not_pull_the_call_into_ordering() {
        let (runtime, _) = runtime(vec![Err(CompletionError::Empty)]);

        let first = runtime.process_turn(speech("hello")).await.expect("first turn");
        assert_eq!(first.reply_text, fallback_reply(Intent::General));

        let second = runtime.process_turn(speech("hmm okay")).await.expect("second turn");
        assert_eq!(second.intent, Intent::General);
        let handle = runtime.sessions().get(&CallId("CA-runtime".to_string())).await.expect("session");
        assert_eq!(handle.lock().await.stage(), Stage::Greeting);
    }

    #[tokio::test]
    async fn sanitized_reply_is_what_the_caller_hears() {
        let (runtime, _) = runtime(vec![Ok(
            "Great choice! Is there anything else I can help you with? Have a good day.".to_string(),
        )]);

        let reply = runtime.process_turn(speech("hello there")).await.expect("turn");
        assert_eq!(reply.reply_text, "Great choice! Have a good day.");

        let handle = runtime.sessions().get(&CallId("CA-runtime".to_string())).await.expect("session");
        let session = handle.lock().await;
        assert_eq!(session.transcript()[1].text, "Great choice! Have a good day.");
    }

    #[tokio::test]
    async fn open_call_greets_with_business_name() {
        let (runtime, store) = runtime(vec![]);
        store.register_business(business()).await;

        let opened = runtime
            .open_call(CallId("CA-open".to_string()), "+15550009999", "+15550001111")
            .await
            .expect("open call");

        assert!(opened.greeting.starts_with("Thank you for calling Spice Route. I'm Maya"));
        let handle = runtime.sessions().get(&CallId("CA-open".to_string())).await.expect("session");
        assert!(handle.lock().await.transcript().is_empty());
    }

    #[tokio::test]
    async fn unknown_routing_key_is_reported() {
        let (runtime, _) = runtime(vec![]);
        let error = runtime
            .open_call(CallId("CA-lost".to_string()), "+15550000000", "+15550001111")
            .await
            .expect_err("no business");
        assert!(matches!(error, DialogueError::BusinessNotFound(key) if key == "+15550000000"));
    }

    #[tokio::test]
    async fn resume_without_session_is_not_found() {
        let (runtime, _) = runtime(vec![]);
        let error = runtime
            .resume_turn(&CallId("CA-gone".to_string()), TurnInput::Speech("hi".to_string()))
            .await
            .expect_err("no session");
        assert!(matches!(error, DialogueError::SessionNotFound(_)));
    }
}
