use chrono::Utc;
use leadline_core::domain::conversation::ConversationId;
use leadline_core::domain::lead::{ExtractedFields, LeadField};
use leadline_core::flows::{ConversationStateMachine, Stage};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ExtractReport {
    command: &'static str,
    status: &'static str,
    extracted: ExtractedFields,
    missing: Vec<LeadField>,
    score: u8,
    stage: Stage,
}

/// Shows what a first message from a new lead would yield, without storage or a model.
pub fn run(text: &str) -> CommandResult {
    if text.trim().is_empty() {
        return CommandResult::failure("extract", "invalid_input", "message text is empty", 2);
    }

    let mut machine =
        ConversationStateMachine::start(ConversationId("cli".to_string()), Utc::now());
    let outcome = machine.process_message(text, Utc::now());

    let report = ExtractReport {
        command: "extract",
        status: "ok",
        extracted: outcome.extracted,
        missing: machine.state().lead.missing_fields(),
        score: outcome.score,
        stage: outcome.stage,
    };

    match serde_json::to_string(&report) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("extract", "serialization", error.to_string(), 3),
    }
}
