//! SlackNotifier - posts outbound messages through `chat.postMessage`.

use async_trait::async_trait;
use picpost_core::error::{PicpostError, Result};
use picpost_core::notify::{Button, Destination, Notifier, OutboundMessage};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Notifier implementation that talks to the Slack Web API.
#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    token: String,
    api_base: String,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Overrides the Web API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds the `chat.postMessage` body for a message.
    pub fn build_payload(to: &Destination, message: &OutboundMessage) -> Value {
        let mut payload = json!({
            "channel": to.channel,
            "thread_ts": to.thread,
            "text": message.plain_text(),
        });

        match message {
            OutboundMessage::Text { .. } => {}
            OutboundMessage::ColorBar { color, text } => {
                payload["attachments"] = json!([{ "color": color.as_str(), "text": text }]);
            }
            OutboundMessage::Interactive { text, buttons } => {
                let elements: Vec<Value> = buttons.iter().map(button_element).collect();
                payload["blocks"] = json!([
                    { "type": "section", "text": { "type": "mrkdwn", "text": text } },
                    { "type": "actions", "elements": elements },
                ]);
            }
        }
        payload
    }
}

fn button_element(button: &Button) -> Value {
    let mut element = json!({
        "type": "button",
        "action_id": button.action.as_str(),
        "text": { "type": "plain_text", "text": button.label },
    });
    if let Some(value) = &button.value {
        element["value"] = json!(value);
    }
    element
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, to: &Destination, message: &OutboundMessage) -> Result<()> {
        let payload = Self::build_payload(to, message);
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| PicpostError::notifier(format!("chat.postMessage failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PicpostError::notifier(format!(
                "chat.postMessage returned HTTP {status}"
            )));
        }

        let parsed: SlackApiResponse = response.json().await.map_err(|err| {
            PicpostError::notifier(format!("failed to parse chat.postMessage response: {err}"))
        })?;
        if !parsed.ok {
            return Err(PicpostError::notifier(format!(
                "chat.postMessage rejected: {}",
                parsed.error.unwrap_or_else(|| "unknown_error".to_string())
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picpost_core::event::ActionId;

    fn destination() -> Destination {
        Destination::new("C1", "1700000000.000100")
    }

    #[test]
    fn test_plain_text_payload() {
        let payload = SlackNotifier::build_payload(&destination(), &OutboundMessage::text("hi"));
        assert_eq!(payload["channel"], "C1");
        assert_eq!(payload["thread_ts"], "1700000000.000100");
        assert_eq!(payload["text"], "hi");
        assert!(payload.get("attachments").is_none());
    }

    #[test]
    fn test_color_bar_payload() {
        let payload =
            SlackNotifier::build_payload(&destination(), &OutboundMessage::danger("failed"));
        assert_eq!(payload["attachments"][0]["color"], "danger");
        assert_eq!(payload["attachments"][0]["text"], "failed");
    }

    #[test]
    fn test_interactive_payload_carries_values() {
        let message = OutboundMessage::interactive(
            "Posted",
            vec![
                Button::new(ActionId::Edit, "Edit").with_value("7"),
                Button::new(ActionId::Cancel, "Cancel"),
            ],
        );
        let payload = SlackNotifier::build_payload(&destination(), &message);
        let elements = &payload["blocks"][1]["elements"];
        assert_eq!(elements[0]["action_id"], "edit");
        assert_eq!(elements[0]["value"], "7");
        assert!(elements[1].get("value").is_none());
    }
}
