use chrono::{DateTime, Utc};
use sqlx::Row;

use leadline_core::domain::conversation::{ConversationId, ConversationState};
use leadline_core::domain::lead::LeadProfile;
use leadline_core::flows::Stage;

use super::{ConversationRepository, ConversationStats, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<E: ToString>(error: E) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationState, RepositoryError> {
    let id: String = row.try_get("conversation_id").map_err(decode)?;
    let stage: String = row.try_get("stage").map_err(decode)?;
    let lead_profile: String = row.try_get("lead_profile").map_err(decode)?;
    let lead_score: i64 = row.try_get("lead_score").map_err(decode)?;
    let message_count: i64 = row.try_get("message_count").map_err(decode)?;
    let last_activity: String = row.try_get("last_activity").map_err(decode)?;

    let lead: LeadProfile = serde_json::from_str(&lead_profile).map_err(decode)?;
    let last_activity = DateTime::parse_from_rfc3339(&last_activity)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(decode)?;

    Ok(ConversationState {
        id: ConversationId(id),
        stage: stage.parse::<Stage>().map_err(RepositoryError::Decode)?,
        lead,
        score: u8::try_from(lead_score).map_err(decode)?,
        message_count: u32::try_from(message_count).map_err(decode)?,
        last_activity,
    })
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let row = sqlx::query(
            "SELECT conversation_id, stage, lead_profile, lead_score, message_count, last_activity
             FROM conversation_state WHERE conversation_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_state(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, state: ConversationState) -> Result<(), RepositoryError> {
        let lead_profile = serde_json::to_string(&state.lead).map_err(decode)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO conversation_state (conversation_id, stage, lead_profile, lead_score,
                                             message_count, last_activity, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(conversation_id) DO UPDATE SET
                 stage = excluded.stage,
                 lead_profile = excluded.lead_profile,
                 lead_score = excluded.lead_score,
                 message_count = excluded.message_count,
                 last_activity = excluded.last_activity,
                 updated_at = excluded.updated_at",
        )
        .bind(&state.id.0)
        .bind(state.stage.as_str())
        .bind(&lead_profile)
        .bind(i64::from(state.score))
        .bind(i64::from(state.message_count))
        .bind(state.last_activity.to_rfc3339())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM conversation_state WHERE conversation_id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_leads(&self, min_score: u8) -> Result<Vec<ConversationState>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT conversation_id, stage, lead_profile, lead_score, message_count, last_activity
             FROM conversation_state
             WHERE lead_score >= ?
             ORDER BY lead_score DESC, last_activity DESC",
        )
        .bind(i64::from(min_score))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_state).collect::<Result<Vec<_>, _>>()
    }

    async fn stats(
        &self,
        high_quality_threshold: u8,
    ) -> Result<ConversationStats, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(CASE WHEN lead_score > 0 THEN 1 ELSE 0 END), 0) AS leads,
                    COALESCE(SUM(CASE WHEN lead_score >= ? THEN 1 ELSE 0 END), 0) AS high_quality
             FROM conversation_state",
        )
        .bind(i64::from(high_quality_threshold))
        .fetch_one(&self.pool)
        .await?;

        let count = |column: &str| -> Result<u64, RepositoryError> {
            let value: i64 = row.try_get(column).map_err(decode)?;
            u64::try_from(value).map_err(decode)
        };

        Ok(ConversationStats {
            total_conversations: count("total")?,
            total_leads: count("leads")?,
            high_quality_leads: count("high_quality")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use leadline_core::domain::conversation::{ConversationId, ConversationState};
    use leadline_core::domain::lead::{BudgetValue, PropertyType};
    use leadline_core::flows::Stage;

    use super::SqlConversationRepository;
    use crate::repositories::ConversationRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlConversationRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlConversationRepository::new(pool)
    }

    fn state(id: &str, score: u8) -> ConversationState {
        let mut state = ConversationState::new(ConversationId(id.to_owned()), Utc::now());
        state.score = score;
        state
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let repo = setup().await;
        let mut state = state("whatsapp:+971501234567", 55);
        state.stage = Stage::Qualifying;
        state.message_count = 4;
        state.lead.name = Some("Sara Khan".to_owned());
        state.lead.budget = Some(BudgetValue::Range { min: 800_000, max: 1_200_000 });
        state.lead.property_type = Some(PropertyType::Apartment);

        repo.save(state.clone()).await.expect("save");
        let found = repo.find_by_id(&state.id).await.expect("find").expect("state exists");

        assert_eq!(found.stage, Stage::Qualifying);
        assert_eq!(found.lead, state.lead);
        assert_eq!(found.score, 55);
        assert_eq!(found.message_count, 4);
        assert_eq!(found.last_activity.timestamp(), state.last_activity.timestamp());
    }

    #[tokio::test]
    async fn save_upserts_existing_state() {
        let repo = setup().await;
        let mut state = state("c-1", 10);
        repo.save(state.clone()).await.expect("first save");

        state.score = 90;
        state.stage = Stage::Scheduling;
        repo.save(state.clone()).await.expect("second save");

        let found = repo.find_by_id(&state.id).await.expect("find").expect("state exists");
        assert_eq!(found.score, 90);
        assert_eq!(found.stage, Stage::Scheduling);
        assert_eq!(repo.stats(70).await.expect("stats").total_conversations, 1);
    }

    #[tokio::test]
    async fn missing_state_is_none() {
        let repo = setup().await;
        let found = repo.find_by_id(&ConversationId("unknown".to_owned())).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let repo = setup().await;
        let state = state("c-2", 25);
        repo.save(state.clone()).await.expect("save");

        assert!(repo.delete(&state.id).await.expect("delete"));
        assert!(!repo.delete(&state.id).await.expect("second delete"));
        assert!(repo.find_by_id(&state.id).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn leads_are_ordered_by_score_then_recency() {
        let repo = setup().await;
        let mut older = state("older", 50);
        older.last_activity = Utc::now() - Duration::hours(2);
        let newer = state("newer", 50);
        let best = state("best", 95);
        let cold = state("cold", 0);

        for state in [older, newer, best, cold] {
            repo.save(state).await.expect("save");
        }

        let leads = repo.list_leads(1).await.expect("list");
        let ids: Vec<&str> = leads.iter().map(|lead| lead.id.as_str()).collect();
        assert_eq!(ids, vec!["best", "newer", "older"]);
    }

    #[tokio::test]
    async fn stats_count_leads_and_high_quality_leads() {
        let repo = setup().await;
        assert_eq!(repo.stats(70).await.expect("empty stats").total_conversations, 0);

        for (id, score) in [("a", 0), ("b", 35), ("c", 70), ("d", 100)] {
            repo.save(state(id, score)).await.expect("save");
        }

        let stats = repo.stats(70).await.expect("stats");
        assert_eq!(stats.total_conversations, 4);
        assert_eq!(stats.total_leads, 3);
        assert_eq!(stats.high_quality_leads, 2);
    }
}
