use std::sync::Arc;

use async_trait::async_trait;
use promptbot_core::{ApplicationError, PromptRequest, RegeneratePayload, RequestOrigin};
use serde_json::Value;
use tracing::{debug, info};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    UrlVerification { challenge: String },
    BlockAction(BlockActionEvent),
    Message(MessageEvent),
    Ignored { reason: IgnoreReason, delivery_key: Option<String> },
}

impl SlackEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UrlVerification { .. } => "url_verification",
            Self::BlockAction(_) => "block_actions",
            Self::Message(_) => "message",
            Self::Ignored { .. } => "ignored",
        }
    }

    /// Identifier Slack reuses when it redelivers the same payload.
    pub fn delivery_key(&self) -> Option<String> {
        match self {
            Self::UrlVerification { .. } => None,
            Self::BlockAction(action) => action
                .trigger_id
                .as_ref()
                .map(|id| format!("trigger:{id}"))
                .or_else(|| action.action_ts.as_ref().map(|ts| format!("action:{ts}"))),
            Self::Message(message) => message.event_id.as_ref().map(|id| format!("event:{id}")),
            Self::Ignored { delivery_key, .. } => delivery_key.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    MessageSubtype,
    BotMessage,
    UnsupportedEvent,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageSubtype => "message_subtype",
            Self::BotMessage => "bot_message",
            Self::UnsupportedEvent => "unsupported_event",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub actor_id: Option<String>,
    pub action_id: Option<String>,
    pub trigger_id: Option<String>,
    pub action_ts: Option<String>,
    pub regenerate: RegeneratePayload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub event_id: Option<String>,
    pub channel_id: Option<String>,
    pub user_id: String,
    pub text: String,
}

/// Decodes a webhook body. Interactions arrive form-encoded with the JSON in a
/// `payload` field; everything else is a JSON body.
pub fn parse_payload(content_type: Option<&str>, body: &[u8]) -> Result<SlackEvent, ApplicationError> {
    let is_form = content_type
        .map(|value| value.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false);

    let root: Value = if is_form {
        let payload = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| malformed("form body has no `payload` field"))?;
        serde_json::from_str(&payload).map_err(|_| malformed("`payload` field is not valid JSON"))?
    } else {
        serde_json::from_slice(body).map_err(|_| malformed("body is not valid JSON"))?
    };

    classify(&root)
}

fn classify(root: &Value) -> Result<SlackEvent, ApplicationError> {
    match root.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge = str_field(root, "challenge")
                .ok_or_else(|| malformed("url_verification payload has no `challenge`"))?;
            return Ok(SlackEvent::UrlVerification { challenge: challenge.to_owned() });
        }
        Some("block_actions") => return parse_block_action(root).map(SlackEvent::BlockAction),
        _ => {}
    }

    let event_id = str_field(root, "event_id").map(ToOwned::to_owned);
    let Some(event) = root.get("event").filter(|event| event.is_object()) else {
        return Ok(ignored(IgnoreReason::UnsupportedEvent, event_id));
    };
    if event.get("type").and_then(Value::as_str) != Some("message") {
        return Ok(ignored(IgnoreReason::UnsupportedEvent, event_id));
    }
    if event.get("subtype").is_some() {
        return Ok(ignored(IgnoreReason::MessageSubtype, event_id));
    }
    if event.get("bot_id").is_some() {
        return Ok(ignored(IgnoreReason::BotMessage, event_id));
    }

    let text = str_field(event, "text").ok_or_else(|| malformed("message event has no `text`"))?;
    let user = str_field(event, "user").ok_or_else(|| malformed("message event has no `user`"))?;

    Ok(SlackEvent::Message(MessageEvent {
        event_id,
        channel_id: str_field(event, "channel").map(ToOwned::to_owned),
        user_id: user.to_owned(),
        text: text.to_owned(),
    }))
}

fn parse_block_action(root: &Value) -> Result<BlockActionEvent, ApplicationError> {
    let action = root
        .get("actions")
        .and_then(Value::as_array)
        .and_then(|actions| actions.first())
        .ok_or_else(|| malformed("block_actions payload has no actions"))?;
    let value =
        str_field(action, "value").ok_or_else(|| malformed("block action has no `value`"))?;
    let regenerate = RegeneratePayload::from_value(value)
        .map_err(|_| malformed("block action value is not a {text, user} object"))?;

    Ok(BlockActionEvent {
        actor_id: root
            .get("user")
            .and_then(|user| str_field(user, "id"))
            .map(ToOwned::to_owned),
        action_id: str_field(action, "action_id").map(ToOwned::to_owned),
        trigger_id: str_field(root, "trigger_id").map(ToOwned::to_owned),
        action_ts: str_field(action, "action_ts").map(ToOwned::to_owned),
        regenerate,
    })
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn ignored(reason: IgnoreReason, event_id: Option<String>) -> SlackEvent {
    SlackEvent::Ignored { reason, delivery_key: event_id.map(|id| format!("event:{id}")) }
}

fn malformed(message: &str) -> ApplicationError {
    ApplicationError::MalformedPayload(message.to_owned())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Challenge(String),
    Processed,
    Ignored,
}

/// Runs the generate, score, record and notify sequence for one request.
#[async_trait]
pub trait PromptRequestService: Send + Sync {
    async fn handle_prompt_request(
        &self,
        request: &PromptRequest,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;
}

#[derive(Clone)]
pub struct EventRouter {
    service: Arc<dyn PromptRequestService>,
}

impl EventRouter {
    pub fn new(service: Arc<dyn PromptRequestService>) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        event: SlackEvent,
        ctx: &EventContext,
    ) -> Result<RouteOutcome, ApplicationError> {
        let request = match event {
            SlackEvent::UrlVerification { challenge } => {
                debug!(
                    event_name = "slack.event.url_verification",
                    correlation_id = %ctx.correlation_id,
                    "answering url verification handshake"
                );
                return Ok(RouteOutcome::Challenge(challenge));
            }
            SlackEvent::Ignored { reason, .. } => {
                debug!(
                    event_name = "slack.event.ignored",
                    correlation_id = %ctx.correlation_id,
                    reason = reason.as_str(),
                    "event ignored"
                );
                return Ok(RouteOutcome::Ignored);
            }
            SlackEvent::BlockAction(action) => {
                info!(
                    event_name = "slack.event.accepted",
                    correlation_id = %ctx.correlation_id,
                    origin = RequestOrigin::Regenerate.as_str(),
                    user = %action.regenerate.user,
                    actor_id = action.actor_id.as_deref(),
                    action_id = action.action_id.as_deref(),
                    "regenerate request accepted"
                );
                PromptRequest {
                    text: action.regenerate.text,
                    user: action.regenerate.user,
                    origin: RequestOrigin::Regenerate,
                }
            }
            SlackEvent::Message(message) => {
                info!(
                    event_name = "slack.event.accepted",
                    correlation_id = %ctx.correlation_id,
                    origin = RequestOrigin::Message.as_str(),
                    user = %message.user_id,
                    channel_id = message.channel_id.as_deref(),
                    "message request accepted"
                );
                PromptRequest {
                    text: message.text,
                    user: message.user_id,
                    origin: RequestOrigin::Message,
                }
            }
        };

        self.service.handle_prompt_request(&request, ctx).await?;
        Ok(RouteOutcome::Processed)
    }
}
