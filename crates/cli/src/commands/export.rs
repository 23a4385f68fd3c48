use std::fs;
use std::path::Path;

use leadline_core::export::leads_csv;
use leadline_db::{ConversationRepository, SqlConversationRepository};

use crate::commands::{open_pool, prepare, CommandResult};

/// Renders leads as CSV. Without `output` the CSV itself is the command output.
pub fn run(min_score: u8, output: Option<&Path>) -> CommandResult {
    let (config, runtime) = match prepare("export") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let leads = SqlConversationRepository::new(pool.clone())
            .list_leads(min_score)
            .await
            .map_err(|error| ("lead_query", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(leads)
    });

    let leads = match result {
        Ok(leads) => leads,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("export", error_class, message, exit_code);
        }
    };

    let csv = leads_csv(&leads);
    let Some(path) = output else {
        return CommandResult { exit_code: 0, output: csv.trim_end().to_string() };
    };

    match fs::write(path, csv) {
        Ok(()) => CommandResult::success(
            "export",
            format!("wrote {} leads to {}", leads.len(), path.display()),
        ),
        Err(error) => CommandResult::failure(
            "export",
            "write_output",
            format!("failed to write {}: {error}", path.display()),
            4,
        ),
    }
}
