use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use promptbot_core::{
    signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
    ApplicationError, InterfaceError, SignatureVerifier,
};
use promptbot_slack::{parse_payload, EventContext, EventRouter, RouteOutcome};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{dedup::DeliveryGuard, health};

pub const SLACK_EVENTS_PATH: &str = "/slack/events";

#[derive(Clone)]
pub struct WebhookState {
    pub verifier: Arc<SignatureVerifier>,
    pub router: EventRouter,
    pub guard: Option<Arc<DeliveryGuard>>,
}

pub fn router(state: WebhookState, recorder_kind: &'static str) -> Router {
    Router::new()
        .route(SLACK_EVENTS_PATH, post(slack_events))
        .with_state(state)
        .merge(health::router(recorder_kind))
}

pub async fn slack_events(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    if let Err(error) = state.verifier.verify(timestamp, &body, signature) {
        warn!(
            event_name = "ingress.slack.signature_rejected",
            reason = %error,
            "rejected slack request"
        );
        return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
    }

    let event = match parse_payload(header_str(&headers, CONTENT_TYPE.as_str()), &body) {
        Ok(event) => event,
        Err(error) => {
            return failure_response(error, &Uuid::new_v4().to_string());
        }
    };

    let delivery_key = event.delivery_key();
    let ctx = EventContext {
        correlation_id: delivery_key.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
    };
    info!(
        event_name = "ingress.slack.event_received",
        correlation_id = %ctx.correlation_id,
        kind = event.kind(),
        "slack event received"
    );

    let claimed = match (&state.guard, &delivery_key) {
        (Some(guard), Some(key)) => {
            if !guard.claim(key).await {
                info!(
                    event_name = "ingress.slack.duplicate_delivery",
                    correlation_id = %ctx.correlation_id,
                    "redelivered event acknowledged without processing"
                );
                return StatusCode::OK.into_response();
            }
            Some((guard, key))
        }
        _ => None,
    };

    match state.router.route(event, &ctx).await {
        Ok(RouteOutcome::Challenge(challenge)) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(RouteOutcome::Processed | RouteOutcome::Ignored) => StatusCode::OK.into_response(),
        Err(error) => {
            if let Some((guard, key)) = claimed {
                guard.release(key).await;
            }
            failure_response(error, &ctx.correlation_id)
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn failure_response(error: ApplicationError, correlation_id: &str) -> Response {
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(
        event_name = "ingress.slack.request_failed",
        correlation_id = %interface.correlation_id(),
        status = status.as_u16(),
        error = %interface,
        "slack request failed"
    );
    (status, interface.user_message()).into_response()
}
