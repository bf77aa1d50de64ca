//! Slack Events API and interactivity payloads.
//!
//! Converts the platform JSON into [`InboundEvent`]. The thread timestamp is the session id:
//! a top-level message starts a thread at its own `ts`, and every reply carries `thread_ts`.

use picpost_core::event::{ActionId, Attachment, EventKind, InboundEvent};
use serde::Deserialize;

/// Result of decoding one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackInbound {
    /// Ownership handshake; the challenge must be echoed back
    UrlVerification { challenge: String },
    Event(InboundEvent),
    /// Well-formed but irrelevant (bot echo, edits, unknown action, ...)
    Ignored(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventsEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event_id: String,
        event: MessageEvent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    files: Vec<SlackFile>,
}

#[derive(Debug, Deserialize)]
struct SlackFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    mimetype: String,
    #[serde(default)]
    url_private_download: Option<String>,
    #[serde(default)]
    url_private: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    trigger_id: Option<String>,
    user: IdOnly,
    channel: IdOnly,
    #[serde(default)]
    container: Option<Container>,
    #[serde(default)]
    message: Option<Container>,
    #[serde(default)]
    actions: Vec<BlockAction>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default, alias = "message_ts")]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockAction {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    action_ts: Option<String>,
}

/// Decodes an Events API request body.
pub fn parse_events_body(body: &[u8]) -> Result<SlackInbound, serde_json::Error> {
    let envelope: EventsEnvelope = serde_json::from_slice(body)?;
    Ok(match envelope {
        EventsEnvelope::UrlVerification { challenge } => SlackInbound::UrlVerification { challenge },
        EventsEnvelope::EventCallback { event_id, event } => message_event(event_id, event),
        EventsEnvelope::Other => SlackInbound::Ignored("unsupported envelope type".to_string()),
    })
}

fn message_event(event_id: String, event: MessageEvent) -> SlackInbound {
    if event.kind != "message" {
        return SlackInbound::Ignored(format!("event type '{}'", event.kind));
    }
    if event.bot_id.is_some() {
        return SlackInbound::Ignored("bot message".to_string());
    }
    if let Some(subtype) = event.subtype.as_deref()
        && subtype != "file_share"
    {
        return SlackInbound::Ignored(format!("message subtype '{subtype}'"));
    }

    let attachment = event.files.into_iter().find_map(|file| {
        let source_ref = file.url_private_download.or(file.url_private)?;
        Some(Attachment {
            source_ref,
            display_name: file.name,
            media_type: file.mimetype,
        })
    });

    SlackInbound::Event(InboundEvent {
        id: event_id,
        kind: EventKind::Message,
        session_id: event.thread_ts.unwrap_or(event.ts),
        channel: event.channel,
        author: event.user,
        text: event.text,
        attachment,
    })
}

/// Decodes the JSON carried in the `payload` form field of an interactivity request.
pub fn parse_interaction_payload(payload: &str) -> Result<SlackInbound, serde_json::Error> {
    let payload: InteractionPayload = serde_json::from_str(payload)?;
    if payload.kind != "block_actions" {
        return Ok(SlackInbound::Ignored(format!(
            "interaction type '{}'",
            payload.kind
        )));
    }
    let Some(action) = payload.actions.into_iter().next() else {
        return Ok(SlackInbound::Ignored("no actions".to_string()));
    };
    let Ok(action_id) = action.action_id.parse::<ActionId>() else {
        return Ok(SlackInbound::Ignored(format!(
            "unknown action '{}'",
            action.action_id
        )));
    };

    let thread = [payload.container.as_ref(), payload.message.as_ref()]
        .into_iter()
        .flatten()
        .find_map(|c| c.thread_ts.clone().or_else(|| c.ts.clone()));
    let Some(session_id) = thread else {
        return Ok(SlackInbound::Ignored("action without thread".to_string()));
    };

    let id = payload
        .trigger_id
        .or(action.action_ts)
        .unwrap_or_else(|| format!("{session_id}:{action_id}"));

    Ok(SlackInbound::Event(InboundEvent {
        id,
        kind: EventKind::Action {
            action: action_id,
            value: action.value,
        },
        session_id,
        channel: payload.channel.id,
        author: payload.user.id,
        text: String::new(),
        attachment: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_verification() {
        let parsed =
            parse_events_body(br#"{"type":"url_verification","challenge":"abc","token":"t"}"#)
                .unwrap();
        assert_eq!(
            parsed,
            SlackInbound::UrlVerification {
                challenge: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_file_share_message() {
        let body = br#"{
            "type": "event_callback",
            "event_id": "Ev1",
            "event": {
                "type": "message",
                "subtype": "file_share",
                "channel": "C1",
                "user": "U1",
                "text": "",
                "ts": "1700000000.000100",
                "files": [{
                    "id": "F1",
                    "name": "cat.png",
                    "mimetype": "image/png",
                    "url_private_download": "https://files.slack.com/cat.png"
                }]
            }
        }"#;
        let SlackInbound::Event(event) = parse_events_body(body).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.id, "Ev1");
        assert_eq!(event.session_id, "1700000000.000100");
        let attachment = event.attachment.unwrap();
        assert_eq!(attachment.display_name, "cat.png");
        assert_eq!(attachment.source_ref, "https://files.slack.com/cat.png");
    }

    #[test]
    fn test_thread_reply_uses_thread_ts() {
        let body = br#"{
            "type": "event_callback",
            "event_id": "Ev2",
            "event": {"type": "message", "channel": "C1", "user": "U1", "text": "20241225",
                      "ts": "1700000001.000200", "thread_ts": "1700000000.000100"}
        }"#;
        let SlackInbound::Event(event) = parse_events_body(body).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.session_id, "1700000000.000100");
        assert_eq!(event.text, "20241225");
        assert!(event.attachment.is_none());
    }

    #[test]
    fn test_bot_and_edit_messages_ignored() {
        let bot = br#"{"type":"event_callback","event_id":"Ev3","event":{"type":"message","bot_id":"B1","ts":"1.0"}}"#;
        assert!(matches!(parse_events_body(bot).unwrap(), SlackInbound::Ignored(_)));

        let edit = br#"{"type":"event_callback","event_id":"Ev4","event":{"type":"message","subtype":"message_changed","ts":"1.0"}}"#;
        assert!(matches!(parse_events_body(edit).unwrap(), SlackInbound::Ignored(_)));
    }

    #[test]
    fn test_block_action() {
        let payload = r#"{
            "type": "block_actions",
            "trigger_id": "trig-1",
            "user": {"id": "U1"},
            "channel": {"id": "C1"},
            "container": {"type": "message", "message_ts": "1700000002.0", "thread_ts": "1700000000.000100"},
            "actions": [{"action_id": "confirm_delete", "value": "7", "action_ts": "1700000003.0"}]
        }"#;
        let SlackInbound::Event(event) = parse_interaction_payload(payload).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.id, "trig-1");
        assert_eq!(event.session_id, "1700000000.000100");
        assert_eq!(event.action(), Some(ActionId::ConfirmDelete));
        assert_eq!(event.payload_entry_id(), Some(7));
    }

    #[test]
    fn test_unknown_action_ignored() {
        let payload = r#"{
            "type": "block_actions",
            "user": {"id": "U1"},
            "channel": {"id": "C1"},
            "message": {"ts": "1700000000.000100"},
            "actions": [{"action_id": "launch_rocket"}]
        }"#;
        assert!(matches!(
            parse_interaction_payload(payload).unwrap(),
            SlackInbound::Ignored(_)
        ));
    }
}
