//! HTTP entrypoint for Slack.
//!
//! Every request is answered `200 OK`, whatever happens downstream, so the platform never
//! redelivers because of our own failures. Events are handed to a background task so the
//! response goes out within the platform's deadline.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use picpost_application::EventIntake;
use picpost_infrastructure::dto::slack::{
    SlackInbound, parse_events_body, parse_interaction_payload,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Clone)]
pub struct HttpState {
    intake: Arc<EventIntake>,
}

pub fn router(intake: Arc<EventIntake>) -> Router {
    Router::new()
        .route("/slack/events", post(events_handler))
        .route("/slack/actions", post(actions_handler))
        .route("/healthz", get(healthz))
        .with_state(HttpState { intake })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn events_handler(State(state): State<HttpState>, body: Bytes) -> Response {
    match parse_events_body(&body) {
        Ok(SlackInbound::UrlVerification { challenge }) => {
            tracing::info!("[Http] answering url_verification");
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(inbound) => {
            dispatch(&state, inbound);
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "[Http] unreadable events payload");
            StatusCode::OK.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct InteractionForm {
    payload: String,
}

async fn actions_handler(
    State(state): State<HttpState>,
    form: Result<Form<InteractionForm>, FormRejection>,
) -> StatusCode {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            tracing::warn!(error = %e, "[Http] interaction request without payload");
            return StatusCode::OK;
        }
    };
    match parse_interaction_payload(&form.payload) {
        Ok(inbound) => dispatch(&state, inbound),
        Err(e) => tracing::warn!(error = %e, "[Http] unreadable interaction payload"),
    }
    StatusCode::OK
}

fn dispatch(state: &HttpState, inbound: SlackInbound) {
    match inbound {
        SlackInbound::Event(event) => {
            tracing::debug!(event_id = %event.id, session_id = %event.session_id, "[Http] event received");
            let intake = state.intake.clone();
            tokio::spawn(async move {
                intake.accept(event).await;
            });
        }
        SlackInbound::Ignored(reason) => {
            tracing::debug!(reason = %reason, "[Http] ignored");
        }
        SlackInbound::UrlVerification { .. } => {
            tracing::debug!("[Http] url_verification on the wrong endpoint");
        }
    }
}
