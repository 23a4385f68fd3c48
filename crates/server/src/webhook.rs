//! Inbound WhatsApp webhook.
//!
//! The messaging provider posts each inbound message as a form (`Body`, `From`, `To`) and
//! expects a TwiML document back whose `<Message>` is delivered to the sender.

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::{info, warn};

use crate::routes::{application_error, correlation_id, AppState, ApiError};

pub const EMPTY_MESSAGE_REPLY: &str =
    "I didn't catch that. Could you send your message again? 😊";

const REPLY_TEMPLATE: &str = "reply.xml";

#[derive(Debug, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
}

pub fn templates() -> Arc<Tera> {
    let mut tera = Tera::default();
    if let Err(error) =
        tera.add_raw_template(REPLY_TEMPLATE, include_str!("../../../templates/twiml/reply.xml"))
    {
        warn!(error = %error, "failed to register reply template");
    }
    Arc::new(tera)
}

pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(inbound): Form<InboundMessage>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let correlation_id = correlation_id();

    if inbound.body.trim().is_empty() {
        info!(
            event_name = "webhook.inbound.empty",
            correlation_id = %correlation_id,
            from = %inbound.from,
            "empty inbound message"
        );
        return render_reply(&state.templates, EMPTY_MESSAGE_REPLY, &correlation_id);
    }

    info!(
        event_name = "webhook.inbound.received",
        correlation_id = %correlation_id,
        from = %inbound.from,
        to = %inbound.to,
        length = inbound.body.chars().count(),
        "inbound message received"
    );

    let reply = state
        .runtime
        .handle_message(&inbound.from, &inbound.body)
        .await
        .map_err(|error| application_error(error.into(), correlation_id.clone()))?;

    info!(
        event_name = "webhook.reply.sent",
        correlation_id = %correlation_id,
        from = %inbound.from,
        degraded = reply.degraded.unwrap_or("none"),
        score = reply.state.as_ref().map(|state| state.score),
        "reply rendered"
    );

    render_reply(&state.templates, &reply.text, &correlation_id)
}

fn render_reply(
    templates: &Tera,
    text: &str,
    correlation_id: &str,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let mut context = Context::new();
    context.insert("reply", text);

    let document = templates.render(REPLY_TEMPLATE, &context).map_err(|error| {
        warn!(
            event_name = "webhook.reply.render_failed",
            correlation_id = %correlation_id,
            error = %error,
            "failed to render reply"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: "reply could not be rendered".to_string(),
                correlation_id: correlation_id.to_string(),
            }),
        )
    })?;

    Ok(([(header::CONTENT_TYPE, "application/xml")], document).into_response())
}
