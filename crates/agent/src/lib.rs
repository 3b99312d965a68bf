//! Dialogue runtime for inbound phone calls.
//!
//! Each caller turn goes through [`runtime::AgentRuntime`]:
//! 1. the session for the call is loaded or created (`session`)
//! 2. the stage machine advances (`stage`)
//! 3. a prompt is rendered and the completion provider is asked once
//!    (`prompt`, `llm`), falling back to a fixed reply per intent (`intent`)
//! 4. the reply is cleaned (`sanitizer`) and orders or bookings are read
//!    from the conversation (`extraction`)
//! 5. the termination policy decides whether the call is over
//!    (`termination`); a finished call is written out once (`reconciler`)
//!
//! The language model only produces the spoken reply. Prices, totals and
//! stage changes come from the rule sets in this crate.

pub mod extraction;
pub mod intent;
pub mod llm;
pub mod prompt;
pub mod reconciler;
pub mod runtime;
pub mod sanitizer;
pub mod session;
pub mod stage;
pub mod termination;

pub use llm::{ChatMessage, ChatRole, CompletionError, CompletionProvider, OpenAiChatClient};
pub use reconciler::{PersistenceReconciler, ReconcileReport, WriteOutcome};
pub use runtime::{
    AgentRuntime, CompletionOutcome, DialogueError, DialogueRules, OpenedCall, TurnInput,
    TurnReply, TurnRequest,
};
pub use session::{spawn_sweeper, SessionHandle, SessionStore};
