//! CSV rendering of qualified leads for spreadsheet tools.

use crate::domain::conversation::ConversationState;

pub const CSV_HEADER: [&str; 10] = [
    "Phone",
    "Name",
    "Email",
    "Budget",
    "Location",
    "Property Type",
    "Lead Score",
    "Stage",
    "Message Count",
    "Last Activity",
];

/// Renders one row per conversation, in the order given, with CRLF line endings.
pub fn leads_csv(leads: &[ConversationState]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|column| column.to_string()));

    for state in leads {
        let lead = &state.lead;
        push_row(
            &mut out,
            [
                lead.phone.clone().unwrap_or_default(),
                lead.name.clone().unwrap_or_default(),
                lead.email.clone().unwrap_or_default(),
                lead.budget.map(|budget| budget.to_string()).unwrap_or_default(),
                lead.location_preference.clone().unwrap_or_default(),
                lead.property_type.map(|kind| kind.label().to_string()).unwrap_or_default(),
                state.score.to_string(),
                state.stage.to_string(),
                state.message_count.to_string(),
                state.last_activity.to_rfc3339(),
            ],
        );
    }

    out
}

fn push_row(out: &mut String, cells: impl IntoIterator<Item = String>) {
    let row: Vec<String> = cells.into_iter().map(|cell| escape(&cell)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::leads_csv;
    use crate::domain::conversation::{ConversationId, ConversationState};
    use crate::domain::lead::{BudgetValue, PropertyType};
    use crate::flows::Stage;

    #[test]
    fn header_only_for_no_leads() {
        assert_eq!(
            leads_csv(&[]),
            "Phone,Name,Email,Budget,Location,Property Type,Lead Score,Stage,Message Count,Last Activity\r\n"
        );
    }

    #[test]
    fn full_row_is_rendered_in_column_order() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("timestamp");
        let mut state = ConversationState::new(ConversationId("whatsapp:+971501234567".into()), at);
        state.lead.name = Some("Sara Khan".to_string());
        state.lead.phone = Some("+971501234567".to_string());
        state.lead.email = Some("sara@example.com".to_string());
        state.lead.budget = Some(BudgetValue::Fixed { amount: 2_000_000 });
        state.lead.location_preference = Some("JVC".to_string());
        state.lead.property_type = Some(PropertyType::Villa);
        state.score = 100;
        state.stage = Stage::Scheduling;
        state.message_count = 6;

        let csv = leads_csv(&[state]);

        assert_eq!(
            csv.lines().nth(1),
            Some(
                "+971501234567,Sara Khan,sara@example.com,\"AED 2,000,000\",JVC,Villa,100,scheduling,6,2026-03-14T09:30:00+00:00"
            )
        );
    }

    #[test]
    fn cells_with_delimiters_are_quoted() {
        let mut state = ConversationState::new(ConversationId("c-1".into()), Utc::now());
        state.lead.name = Some("Khan, \"Sam\"".to_string());
        state.lead.budget = Some(BudgetValue::Range { min: 500_000, max: 1_000_000 });

        let csv = leads_csv(&[state]);

        let row = csv.lines().nth(1).expect("row");
        assert!(row.starts_with(",\"Khan, \"\"Sam\"\"\",,\"AED 500,000 - 1,000,000\","));
    }
}
