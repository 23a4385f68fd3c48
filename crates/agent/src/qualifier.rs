use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::info;

use leadline_core::domain::conversation::{ConversationId, ConversationState};
use leadline_core::domain::lead::{ExtractedFields, LeadField, LeadProfile};
use leadline_core::errors::ApplicationError;
use leadline_core::flows::{ConversationStateMachine, Stage, StageTransition};
use leadline_db::{ConversationRepository, RepositoryError};

/// Result of qualifying one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundOutcome {
    pub extracted: ExtractedFields,
    pub changed: Vec<LeadField>,
    pub previous_score: u8,
    pub transition: Option<StageTransition>,
    pub state: ConversationState,
}

impl InboundOutcome {
    pub fn profile(&self) -> &LeadProfile {
        &self.state.lead
    }

    pub fn score(&self) -> u8 {
        self.state.score
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }
}

type ConversationLock = Arc<tokio::sync::Mutex<()>>;
type LockMap = Mutex<HashMap<ConversationId, ConversationLock>>;

/// One caller's share of a conversation lock. The map entry is removed when the last lease
/// drops, including when the owning future is cancelled mid-await.
struct LockLease<'a> {
    locks: &'a LockMap,
    id: ConversationId,
    lock: ConversationLock,
}

impl LockLease<'_> {
    async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only made under the map mutex, so two owners means the map and this lease.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.id);
        }
    }
}

/// Runs the load, merge and save cycle for inbound messages.
///
/// Messages for the same conversation are applied one at a time so a field extracted from one
/// message is never lost to a concurrent save of another.
pub struct LeadQualifier {
    store: Arc<dyn ConversationRepository>,
    locks: LockMap,
}

impl LeadQualifier {
    pub fn new(store: Arc<dyn ConversationRepository>) -> Self {
        Self { store, locks: Mutex::new(HashMap::new()) }
    }

    pub async fn process_inbound_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<InboundOutcome, ApplicationError> {
        let id = ConversationId::parse(conversation_id)?;
        let lease = self.lease(&id);
        let _guard = lease.acquire().await;
        self.qualify(&id, text).await
    }

    pub async fn get_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationState>, ApplicationError> {
        let id = ConversationId::parse(conversation_id)?;
        self.store.find_by_id(&id).await.map_err(persistence)
    }

    /// Returns the stored state, creating and saving a fresh one when absent.
    pub async fn init_state(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationState, ApplicationError> {
        let id = ConversationId::parse(conversation_id)?;
        let lease = self.lease(&id);
        let _guard = lease.acquire().await;
        self.load_or_create(&id).await
    }

    /// Moves a conversation to `completed`, e.g. after a viewing was booked.
    pub async fn complete(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationState>, ApplicationError> {
        let id = ConversationId::parse(conversation_id)?;
        let lease = self.lease(&id);
        let _guard = lease.acquire().await;
        self.complete_locked(&id).await
    }

    async fn qualify(
        &self,
        id: &ConversationId,
        text: &str,
    ) -> Result<InboundOutcome, ApplicationError> {
        let state = self.load_or_create(id).await?;
        let previous_score = state.score;

        let mut machine = ConversationStateMachine::new(state);
        let outcome = machine.process_message(text, Utc::now());
        let state = machine.into_state();
        self.store.save(state.clone()).await.map_err(persistence)?;

        info!(
            event_name = "lead.message_qualified",
            conversation_id = %id,
            score = state.score,
            stage = %state.stage,
            changed = ?outcome.changed,
            "inbound message qualified"
        );
        if let Some(transition) = &outcome.transition {
            info!(
                event_name = "lead.stage_transition",
                conversation_id = %id,
                from = %transition.from,
                to = %transition.to,
                score = transition.score,
                "conversation advanced"
            );
        }

        Ok(InboundOutcome {
            extracted: outcome.extracted,
            changed: outcome.changed,
            previous_score,
            transition: outcome.transition,
            state,
        })
    }

    async fn load_or_create(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationState, ApplicationError> {
        if let Some(state) = self.store.find_by_id(id).await.map_err(persistence)? {
            return Ok(state);
        }

        let state = ConversationState::new(id.clone(), Utc::now());
        self.store.save(state.clone()).await.map_err(persistence)?;
        info!(event_name = "lead.conversation_started", conversation_id = %id, "new conversation");
        Ok(state)
    }

    async fn complete_locked(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ConversationState>, ApplicationError> {
        let Some(state) = self.store.find_by_id(id).await.map_err(persistence)? else {
            return Ok(None);
        };

        let mut machine = ConversationStateMachine::new(state);
        let transition = machine.complete(Utc::now()).map_err(leadline_core::DomainError::from)?;
        let state = machine.into_state();
        self.store.save(state.clone()).await.map_err(persistence)?;

        info!(
            event_name = "lead.stage_transition",
            conversation_id = %id,
            from = %transition.from,
            to = %transition.to,
            score = transition.score,
            "conversation completed"
        );
        Ok(Some(state))
    }

    fn lease(&self, id: &ConversationId) -> LockLease<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(id.clone()).or_default().clone();
        LockLease { locks: &self.locks, id: id.clone(), lock }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}
