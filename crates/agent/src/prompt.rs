use leadline_core::domain::conversation::ConversationState;
use leadline_core::domain::lead::{LeadField, LeadProfile};
use leadline_core::flows::Stage;

pub const SYSTEM_PROMPT: &str = "\
You are Layla, a warm and knowledgeable property consultant for a Dubai real estate agency, \
chatting with prospective buyers and tenants on WhatsApp.

Your goals:
- Make the lead feel welcome and understood.
- Learn what they are looking for: property type, preferred area and budget in AED.
- Collect their name, phone number and email so an agent can follow up.
- Once the lead is well qualified, offer to arrange a viewing or a call with an agent.

Style rules:
- Keep replies short, two to four sentences, like a real chat message.
- Ask for at most one missing detail per reply and never repeat a question that was already answered.
- Use plain text only. No markdown, no bullet lists, no headings.
- An occasional emoji is fine, never more than one per reply.
- Never invent listings, prices or availability. Offer to have an agent confirm specifics.
- If the lead writes in another language, answer in that language.

When a detail could not be understood:
- A detail the lead seems to have just given but that is still listed under Missing details \
could not be read. Ask for it again warmly and give an example, such as \
\"Just to make sure I can reach you, could you share your number with the country code? \
For example +971 50 123 4567\" or \"Just a ballpark is fine, more like 500K, 1 million or \
2 million AED?\"
- Never say a detail was invalid or that there was an error.

Handling hesitation:
- Just browsing or need to think: no pressure, offer to send a few options to look at.
- Too expensive: acknowledge it and ask what range feels comfortable.
- Working with another agent: offer a second opinion with no obligation.
- Too busy or not right now: offer a short summary or a check-in in a few weeks.
- Always end with one clear next step or question.";

/// Summarises what is known about the lead so the model does not ask twice.
pub fn build_context_message(state: &ConversationState) -> String {
    let mut lines = vec![
        format!("Conversation stage: {}", state.stage),
        format!("Messages exchanged: {}", state.message_count),
        format!("Lead score: {}/100", state.score),
    ];

    let collected = collected_fields(&state.lead);
    if collected.is_empty() {
        lines.push("Collected details: none yet".to_string());
    } else {
        lines.push(format!("Collected details: {}", collected.join("; ")));
    }

    let missing = state.lead.missing_fields();
    if missing.is_empty() {
        lines.push("Missing details: none".to_string());
    } else {
        let labels: Vec<&str> = missing.iter().map(|field| field.label()).collect();
        lines.push(format!("Missing details: {}", labels.join(", ")));
    }

    lines.push(format!("Guidance: {}", stage_guidance(state.stage)));
    lines.join("\n")
}

fn collected_fields(lead: &LeadProfile) -> Vec<String> {
    lead.present_fields()
        .into_iter()
        .filter_map(|field| {
            let value = match field {
                LeadField::Name => lead.name.clone(),
                LeadField::Phone => lead.phone.clone(),
                LeadField::Email => lead.email.clone(),
                LeadField::Budget => lead.budget.map(|budget| budget.to_string()),
                LeadField::LocationPreference => lead.location_preference.clone(),
                LeadField::PropertyType => lead.property_type.map(|kind| kind.label().to_string()),
            }?;
            Some(format!("{} = {}", field.label(), value))
        })
        .collect()
}

fn stage_guidance(stage: Stage) -> &'static str {
    match stage {
        Stage::Greeting => "Welcome the lead and find out what kind of property they want.",
        Stage::Qualifying => "Gather the missing details naturally, one question at a time.",
        Stage::Scheduling => "The lead is qualified. Offer a viewing or a call with an agent.",
        Stage::Completed => "Thank the lead and help with any follow-up questions.",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use leadline_core::domain::conversation::{ConversationId, ConversationState};
    use leadline_core::domain::lead::{BudgetValue, PropertyType};
    use leadline_core::flows::Stage;

    use super::{build_context_message, SYSTEM_PROMPT};

    #[test]
    fn persona_reasks_unread_details_without_blaming_the_lead() {
        assert!(SYSTEM_PROMPT.contains("still listed under Missing details"));
        assert!(SYSTEM_PROMPT.contains("+971 50 123 4567"));
        assert!(SYSTEM_PROMPT.contains("Never say a detail was invalid"));
        assert!(SYSTEM_PROMPT.contains("Too expensive"));
    }

    #[test]
    fn fresh_conversation_lists_everything_as_missing() {
        let state = ConversationState::new(ConversationId("c-1".to_string()), Utc::now());

        let context = build_context_message(&state);

        assert!(context.contains("Conversation stage: greeting"));
        assert!(context.contains("Collected details: none yet"));
        assert!(context.contains(
            "Missing details: name, phone number, email address, budget, location preference, property type"
        ));
    }

    #[test]
    fn collected_values_are_rendered_for_the_model() {
        let mut state = ConversationState::new(ConversationId("c-1".to_string()), Utc::now());
        state.stage = Stage::Qualifying;
        state.score = 50;
        state.lead.name = Some("Sara Khan".to_string());
        state.lead.budget = Some(BudgetValue::Fixed { amount: 1_500_000 });
        state.lead.property_type = Some(PropertyType::Villa);

        let context = build_context_message(&state);

        assert!(context.contains("Lead score: 50/100"));
        assert!(context.contains("name = Sara Khan"));
        assert!(context.contains("budget = AED 1,500,000"));
        assert!(context.contains("property type = Villa"));
        assert!(context.contains("Missing details: phone number, email address, location preference"));
        assert!(context.contains("one question at a time"));
    }
}
