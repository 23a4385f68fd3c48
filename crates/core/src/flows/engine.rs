use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::conversation::{ConversationId, ConversationState};
use crate::extraction::{extract_fields, ExtractionOptions};
use crate::flows::states::{MessageOutcome, Stage, StageTransition, TransitionTrigger};
use crate::scoring;

pub const QUALIFYING_THRESHOLD: u8 = 40;
pub const SCHEDULING_THRESHOLD: u8 = 80;

pub trait StageRule {
    /// Stage the conversation should hold after scoring; returning `current` means no change.
    fn next_stage(&self, current: Stage, score: u8) -> Stage;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScoreThresholdRule;

impl StageRule for ScoreThresholdRule {
    fn next_stage(&self, current: Stage, score: u8) -> Stage {
        let target = if score >= SCHEDULING_THRESHOLD {
            Stage::Scheduling
        } else if score >= QUALIFYING_THRESHOLD {
            Stage::Qualifying
        } else {
            current
        };

        if target.rank() > current.rank() {
            target
        } else {
            current
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("conversation {id} is already completed")]
    AlreadyCompleted { id: ConversationId },
}

/// Owns the state of a single conversation and advances it one inbound message at a time.
///
/// Callers must not drive two machines for the same conversation concurrently; the
/// merge-score-transition sequence is not atomic across fields.
#[derive(Clone, Debug)]
pub struct ConversationStateMachine<R = ScoreThresholdRule> {
    state: ConversationState,
    rule: R,
}

impl ConversationStateMachine<ScoreThresholdRule> {
    pub fn new(state: ConversationState) -> Self {
        Self::with_rule(state, ScoreThresholdRule)
    }

    pub fn start(id: ConversationId, now: DateTime<Utc>) -> Self {
        Self::new(ConversationState::new(id, now))
    }
}

impl<R> ConversationStateMachine<R>
where
    R: StageRule,
{
    pub fn with_rule(state: ConversationState, rule: R) -> Self {
        Self { state, rule }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn into_state(self) -> ConversationState {
        self.state
    }

    pub fn process_message(&mut self, text: &str, now: DateTime<Utc>) -> MessageOutcome {
        let options = ExtractionOptions { attempt_name: self.state.lead.name.is_none() };
        let extracted = extract_fields(text, options);
        let changed = self.state.lead.merge(extracted.clone());

        self.state.message_count = self.state.message_count.saturating_add(1);
        self.state.last_activity = now;
        self.state.score = scoring::score(&self.state.lead);

        let transition = self.apply_score_rule();

        MessageOutcome {
            extracted,
            changed,
            score: self.state.score,
            stage: self.state.stage,
            transition,
        }
    }

    /// Marks the conversation finished, e.g. once a viewing has been booked.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<StageTransition, FlowTransitionError> {
        if self.state.stage == Stage::Completed {
            return Err(FlowTransitionError::AlreadyCompleted { id: self.state.id.clone() });
        }

        let transition = StageTransition {
            from: self.state.stage,
            to: Stage::Completed,
            score: self.state.score,
            trigger: TransitionTrigger::ExternalCompletion,
        };
        self.state.stage = Stage::Completed;
        self.state.last_activity = now;
        Ok(transition)
    }

    fn apply_score_rule(&mut self) -> Option<StageTransition> {
        let current = self.state.stage;
        let next = self.rule.next_stage(current, self.state.score);
        if next == current {
            return None;
        }

        self.state.stage = next;
        Some(StageTransition {
            from: current,
            to: next,
            score: self.state.score,
            trigger: TransitionTrigger::ScoreThreshold,
        })
    }
}
