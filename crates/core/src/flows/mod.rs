pub mod engine;
pub mod states;

pub use engine::{
    ConversationStateMachine, FlowTransitionError, ScoreThresholdRule, StageRule,
    QUALIFYING_THRESHOLD, SCHEDULING_THRESHOLD,
};
pub use states::{MessageOutcome, Stage, StageTransition, TransitionTrigger};
