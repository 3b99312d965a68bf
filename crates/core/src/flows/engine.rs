use crate::domain::call::Session;
use crate::errors::DomainError;
use crate::flows::states::{Stage, StageEvent, StageSignals, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_stage(&self) -> Stage;
    fn transition(&self, current: Stage, signals: &StageSignals) -> Option<TransitionOutcome>;
}

/// Greeting → ordering → confirming → complete. At most one step per turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFlow {
    pub min_turns_before_confirming: u32,
}

impl Default for CallFlow {
    fn default() -> Self {
        Self { min_turns_before_confirming: 2 }
    }
}

impl FlowDefinition for CallFlow {
    fn initial_stage(&self) -> Stage {
        Stage::Greeting
    }

    fn transition(&self, current: Stage, signals: &StageSignals) -> Option<TransitionOutcome> {
        let (to, event) = match current {
            Stage::Greeting if signals.topic_mentioned => {
                (Stage::Ordering, StageEvent::TopicMentioned)
            }
            Stage::Ordering
                if signals.action_attached
                    && signals.turn_count >= self.min_turns_before_confirming =>
            {
                (Stage::Confirming, StageEvent::ActionCaptured)
            }
            Stage::Confirming if signals.caller_affirmed => {
                (Stage::Complete, StageEvent::CallerAffirmed)
            }
            _ => return None,
        };

        Some(TransitionOutcome { from: current, to, event })
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_stage(&self) -> Stage {
        self.flow.initial_stage()
    }

    pub fn apply(&self, current: Stage, signals: &StageSignals) -> Option<TransitionOutcome> {
        self.flow.transition(current, signals)
    }

    /// Evaluates the flow against the session's current stage and moves the
    /// session forward when a transition fires.
    pub fn advance(
        &self,
        session: &mut Session,
        signals: &StageSignals,
    ) -> Result<Option<TransitionOutcome>, DomainError> {
        let Some(outcome) = self.apply(session.stage(), signals) else {
            return Ok(None);
        };
        session.transition_to(outcome.to)?;
        Ok(Some(outcome))
    }
}

impl Default for FlowEngine<CallFlow> {
    fn default() -> Self {
        Self::new(CallFlow::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::business::{BusinessContext, BusinessId};
    use crate::domain::call::{CallId, Session};
    use crate::flows::engine::{CallFlow, FlowDefinition, FlowEngine};
    use crate::flows::states::{Stage, StageEvent, StageSignals};

    fn signals(turn_count: u32) -> StageSignals {
        StageSignals { turn_count, ..StageSignals::default() }
    }

    fn session() -> Session {
        Session::new(
            CallId("CA-flow-1".to_string()),
            BusinessContext::new(BusinessId("rec-biz-1".to_string()), "Spice Route"),
            "+15550001111",
            Utc::now(),
        )
    }

    #[test]
    fn call_flow_happy_path() {
        let engine = FlowEngine::default();
        let mut stage = engine.initial_stage();
        assert_eq!(stage, Stage::Greeting);

        stage = engine
            .apply(stage, &StageSignals { topic_mentioned: true, ..signals(1) })
            .expect("greeting -> ordering")
            .to;
        assert_eq!(stage, Stage::Ordering);

        let confirming = engine
            .apply(stage, &StageSignals { action_attached: true, ..signals(2) })
            .expect("ordering -> confirming");
        assert_eq!(confirming.to, Stage::Confirming);
        assert_eq!(confirming.event, StageEvent::ActionCaptured);

        let complete = engine
            .apply(confirming.to, &StageSignals { caller_affirmed: true, ..signals(3) })
            .expect("confirming -> complete");
        assert_eq!(complete.to, Stage::Complete);
        assert!(complete.to.is_terminal());
    }

    #[test]
    fn confirming_requires_minimum_turns() {
        let engine = FlowEngine::default();
        let outcome =
            engine.apply(Stage::Ordering, &StageSignals { action_attached: true, ..signals(1) });
        assert!(outcome.is_none());
    }

    #[test]
    fn only_one_transition_fires_per_turn() {
        let engine = FlowEngine::default();
        let everything = StageSignals {
            topic_mentioned: true,
            action_attached: true,
            caller_affirmed: true,
            turn_count: 5,
        };

        let outcome = engine.apply(Stage::Greeting, &everything).expect("greeting moves");
        assert_eq!(outcome.to, Stage::Ordering);
    }

    #[test]
    fn complete_is_terminal() {
        let engine = FlowEngine::default();
        let everything = StageSignals {
            topic_mentioned: true,
            action_attached: true,
            caller_affirmed: true,
            turn_count: 5,
        };
        assert!(engine.apply(Stage::Complete, &everything).is_none());
    }

    #[test]
    fn affirmation_outside_confirming_is_ignored() {
        let engine = FlowEngine::default();
        let affirmed = StageSignals { caller_affirmed: true, ..signals(3) };
        assert!(engine.apply(Stage::Greeting, &affirmed).is_none());
        assert!(engine.apply(Stage::Ordering, &affirmed).is_none());
    }

    #[test]
    fn advance_moves_session_forward() {
        let engine = FlowEngine::default();
        let mut session = session();

        let outcome = engine
            .advance(&mut session, &StageSignals { topic_mentioned: true, ..signals(1) })
            .expect("advance should succeed")
            .expect("transition should fire");

        assert_eq!(outcome.from, Stage::Greeting);
        assert_eq!(session.stage(), Stage::Ordering);

        let unchanged = engine.advance(&mut session, &signals(2)).expect("no-op advance");
        assert!(unchanged.is_none());
        assert_eq!(session.stage(), Stage::Ordering);
    }

    #[test]
    fn custom_threshold_is_respected() {
        let flow = CallFlow { min_turns_before_confirming: 3 };
        let signals = StageSignals { action_attached: true, ..signals(2) };
        assert!(flow.transition(Stage::Ordering, &signals).is_none());
    }
}
