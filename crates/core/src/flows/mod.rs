pub mod engine;
pub mod states;

pub use engine::{CallFlow, FlowDefinition, FlowEngine};
pub use states::{Stage, StageEvent, StageSignals, TransitionOutcome};
