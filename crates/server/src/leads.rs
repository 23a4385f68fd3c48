//! Operator endpoints over qualified leads.
//!
//! - `GET    /leads`                             leads above a score, best first
//! - `GET    /leads/export`                      the same list as CSV
//! - `GET    /conversations/{phone}`             state plus recent messages
//! - `DELETE /conversations/{phone}`             drop state and history
//! - `POST   /conversations/{phone}/complete`    close a conversation after a booking
//! - `GET    /conversation-summary/{phone}`      model-written hand-over summary
//! - `GET    /stats`                             headline counters

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use leadline_agent::SUMMARY_HISTORY_LIMIT;
use leadline_core::domain::conversation::{ConversationMessage, ConversationState};
use leadline_core::errors::{ApplicationError, InterfaceError};
use leadline_core::export::leads_csv;
use leadline_core::scoring::HIGH_QUALITY_THRESHOLD;
use leadline_db::RepositoryError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::routes::{
    application_error, conversation_id_for, correlation_id, interface_error, ApiError, AppState,
};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// Leads with a score of zero have told us nothing yet.
const DEFAULT_MIN_SCORE: u8 = 1;

#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    pub min_score: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct LeadSummary {
    pub conversation_id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub budget: Option<String>,
    pub location_preference: Option<String>,
    pub property_type: Option<String>,
    pub score: u8,
    pub stage: String,
    pub message_count: u32,
    pub last_activity: DateTime<Utc>,
}

impl From<&ConversationState> for LeadSummary {
    fn from(state: &ConversationState) -> Self {
        let lead = &state.lead;
        Self {
            conversation_id: state.id.to_string(),
            name: lead.name.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            budget: lead.budget.map(|budget| budget.to_string()),
            location_preference: lead.location_preference.clone(),
            property_type: lead.property_type.map(|kind| kind.label().to_string()),
            score: state.score,
            stage: state.stage.to_string(),
            message_count: state.message_count,
            last_activity: state.last_activity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub count: usize,
    pub leads: Vec<LeadSummary>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub lead: LeadSummary,
    pub validated_fields: Vec<String>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub role: &'static str,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ConversationMessage> for MessageView {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummaryResponse {
    pub lead: LeadSummary,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_conversations: u64,
    pub total_leads: u64,
    pub high_quality_leads: u64,
    pub total_messages: u64,
    pub high_quality_threshold: u8,
}

pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadQuery>,
) -> ApiResult<Json<LeadListResponse>> {
    let correlation_id = correlation_id();
    let min_score = query.min_score.unwrap_or(DEFAULT_MIN_SCORE);

    let leads = state
        .conversations
        .list_leads(min_score)
        .await
        .map_err(|error| storage_error(error, &correlation_id))?;
    let leads: Vec<LeadSummary> = leads.iter().map(LeadSummary::from).collect();

    Ok(Json(LeadListResponse { count: leads.len(), leads }))
}

pub async fn export_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadQuery>,
) -> ApiResult<Response> {
    let correlation_id = correlation_id();
    let min_score = query.min_score.unwrap_or(DEFAULT_MIN_SCORE);

    let leads = state
        .conversations
        .list_leads(min_score)
        .await
        .map_err(|error| storage_error(error, &correlation_id))?;

    info!(
        event_name = "leads.exported",
        correlation_id = %correlation_id,
        count = leads.len(),
        min_score,
        "lead export generated"
    );

    let filename = format!("leads_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        leads_csv(&leads),
    )
        .into_response())
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> ApiResult<Json<ConversationResponse>> {
    let correlation_id = correlation_id();
    let conversation_id = conversation_id_for(&phone);

    let snapshot = state
        .runtime
        .conversation(&conversation_id)
        .await
        .map_err(|error| application_error(error, correlation_id.clone()))?
        .ok_or_else(|| {
            interface_error(InterfaceError::not_found(
                format!("conversation `{conversation_id}`"),
                correlation_id.clone(),
            ))
        })?;

    Ok(Json(ConversationResponse {
        lead: LeadSummary::from(&snapshot.state),
        validated_fields: snapshot
            .state
            .lead
            .validated_fields
            .iter()
            .map(|field| field.as_str().to_string())
            .collect(),
        messages: snapshot.messages.iter().map(MessageView::from).collect(),
    }))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let correlation_id = correlation_id();
    let conversation_id = conversation_id_for(&phone);

    let deleted = state
        .runtime
        .delete_conversation(&conversation_id)
        .await
        .map_err(|error| application_error(error, correlation_id.clone()))?;
    if !deleted {
        return Err(interface_error(InterfaceError::not_found(
            format!("conversation `{conversation_id}`"),
            correlation_id,
        )));
    }

    Ok(Json(DeleteResponse { deleted, conversation_id }))
}

pub async fn complete_conversation(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> ApiResult<Json<LeadSummary>> {
    let correlation_id = correlation_id();
    let conversation_id = conversation_id_for(&phone);

    let completed = state
        .runtime
        .qualifier()
        .complete(&conversation_id)
        .await
        .map_err(|error| application_error(error, correlation_id.clone()))?
        .ok_or_else(|| {
            interface_error(InterfaceError::not_found(
                format!("conversation `{conversation_id}`"),
                correlation_id.clone(),
            ))
        })?;

    Ok(Json(LeadSummary::from(&completed)))
}

pub async fn conversation_summary(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> ApiResult<Json<ConversationSummaryResponse>> {
    let correlation_id = correlation_id();
    let conversation_id = conversation_id_for(&phone);
    let not_found = || {
        interface_error(InterfaceError::not_found(
            format!("conversation `{conversation_id}`"),
            correlation_id.clone(),
        ))
    };

    let conversation = state
        .runtime
        .qualifier()
        .get_state(&conversation_id)
        .await
        .map_err(|error| application_error(error, correlation_id.clone()))?
        .ok_or_else(not_found)?;
    let transcript = state
        .messages
        .recent(&conversation.id, SUMMARY_HISTORY_LIMIT)
        .await
        .map_err(|error| storage_error(error, &correlation_id))?;
    if transcript.is_empty() {
        return Err(not_found());
    }

    let summary = state.summarizer.summarize(&transcript).await.map_err(|error| {
        let error = ApplicationError::Integration(format!("{error:#}"));
        application_error(error, correlation_id.clone())
    })?;
    info!(
        event_name = "lead.summary_generated",
        correlation_id = %correlation_id,
        conversation_id = %conversation.id,
        messages = transcript.len(),
        "conversation summary generated"
    );

    Ok(Json(ConversationSummaryResponse { lead: LeadSummary::from(&conversation), summary }))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let correlation_id = correlation_id();

    let counters = state
        .conversations
        .stats(HIGH_QUALITY_THRESHOLD)
        .await
        .map_err(|error| storage_error(error, &correlation_id))?;
    let total_messages =
        state.messages.count().await.map_err(|error| storage_error(error, &correlation_id))?;

    Ok(Json(StatsResponse {
        total_conversations: counters.total_conversations,
        total_leads: counters.total_leads,
        high_quality_leads: counters.high_quality_leads,
        total_messages,
        high_quality_threshold: HIGH_QUALITY_THRESHOLD,
    }))
}

fn storage_error(error: RepositoryError, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    application_error(ApplicationError::Persistence(error.to_string()), correlation_id.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::to_bytes,
        extract::{Path, Query, State},
        http::{header, StatusCode},
        Json,
    };
    use leadline_core::flows::Stage;

    use super::{
        complete_conversation, conversation_summary, delete_conversation, export_leads,
        get_conversation, list_leads, stats, LeadQuery,
    };
    use crate::routes::{test_support, AppState};

    async fn seeded() -> AppState {
        let state = test_support::state();
        let runtime = &state.runtime;
        runtime
            .handle_message("whatsapp:+971501111111", "villa in Arabian Ranches, budget 5M")
            .await
            .expect("reply");
        runtime
            .handle_message("whatsapp:+971501111111", "email me at amal@example.ae")
            .await
            .expect("reply");
        runtime
            .handle_message("whatsapp:+971502222222", "studio please")
            .await
            .expect("reply");
        runtime.handle_message("whatsapp:+971503333333", "hmm ok?").await.expect("reply");
        state
    }

    #[tokio::test]
    async fn leads_are_listed_best_first() {
        let state = seeded().await;

        let Json(response) =
            list_leads(State(state), Query(LeadQuery::default())).await.expect("leads");

        assert_eq!(response.count, 2);
        assert_eq!(response.leads[0].conversation_id, "whatsapp:+971501111111");
        assert_eq!(response.leads[0].score, 65);
        assert_eq!(response.leads[0].budget.as_deref(), Some("AED 5,000,000"));
        assert_eq!(response.leads[1].property_type.as_deref(), Some("Studio"));
    }

    #[tokio::test]
    async fn min_score_filters_the_list() {
        let state = seeded().await;

        let Json(response) =
            list_leads(State(state), Query(LeadQuery { min_score: Some(60) })).await.expect("leads");

        assert_eq!(response.count, 1);
    }

    #[tokio::test]
    async fn export_is_served_as_csv_attachment() {
        let state = seeded().await;

        let response =
            export_leads(State(state), Query(LeadQuery::default())).await.expect("export");

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/csv; charset=utf-8")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let csv = String::from_utf8(bytes.to_vec()).expect("utf8");
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Phone,Name,Email,Budget,Location,Property Type,Lead Score,Stage,Message Count,Last Activity")
        );
        let first = lines.next().expect("first lead");
        assert!(first.contains(",amal@example.ae,\"AED 5,000,000\",Arabian Ranches,Villa,65,qualifying,2,"));
    }

    #[tokio::test]
    async fn conversation_lookup_accepts_bare_numbers() {
        let state = seeded().await;

        let Json(response) = get_conversation(State(state), Path("+971501111111".to_string()))
            .await
            .expect("conversation");

        assert_eq!(response.lead.email.as_deref(), Some("amal@example.ae"));
        assert_eq!(response.validated_fields, vec!["email".to_string(), "budget".to_string()]);
        assert_eq!(response.messages.len(), 4);
        assert_eq!(response.messages[0].role, "user");
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let state = test_support::state();

        let error = get_conversation(State(state), Path("+971509999999".to_string()))
            .await
            .expect_err("missing");

        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_then_lookup_is_not_found() {
        let state = seeded().await;

        let Json(deleted) =
            delete_conversation(State(state.clone()), Path("+971502222222".to_string()))
                .await
                .expect("deleted");
        assert!(deleted.deleted);

        let error = delete_conversation(State(state), Path("+971502222222".to_string()))
            .await
            .expect_err("already gone");
        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn completion_closes_the_conversation_once() {
        let state = seeded().await;

        let Json(summary) =
            complete_conversation(State(state.clone()), Path("+971502222222".to_string()))
                .await
                .expect("completed");
        assert_eq!(summary.stage, Stage::Completed.to_string());

        let error = complete_conversation(State(state), Path("+971502222222".to_string()))
            .await
            .expect_err("already completed");
        assert_eq!(error.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summary_covers_the_stored_transcript() {
        let state = seeded().await;

        let Json(response) = conversation_summary(State(state), Path("+971501111111".to_string()))
            .await
            .expect("summary");

        assert_eq!(response.summary, "Summary of 4 messages.");
        assert_eq!(response.lead.email.as_deref(), Some("amal@example.ae"));
        assert_eq!(response.lead.score, 65);
    }

    #[tokio::test]
    async fn summary_of_unknown_or_empty_conversation_is_not_found() {
        let state = test_support::state();
        state.runtime.qualifier().init_state("whatsapp:+971504444444").await.expect("created");

        for phone in ["+971509999999", "+971504444444"] {
            let error = conversation_summary(State(state.clone()), Path(phone.to_string()))
                .await
                .expect_err("nothing to summarize");
            assert_eq!(error.0, StatusCode::NOT_FOUND, "{phone}");
        }
    }

    #[tokio::test]
    async fn stats_combine_conversation_and_message_counters() {
        let state = seeded().await;

        let Json(stats) = stats(State(state)).await.expect("stats");

        assert_eq!(stats.total_conversations, 3);
        assert_eq!(stats.total_leads, 2);
        assert_eq!(stats.high_quality_leads, 0);
        assert_eq!(stats.total_messages, 8);
        assert_eq!(stats.high_quality_threshold, 70);
    }
}
