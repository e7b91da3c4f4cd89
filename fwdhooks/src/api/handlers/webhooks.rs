//! HTTP handlers for webhook management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::instrument;

use crate::{
    AppState,
    api::models::webhooks::{
        EventTypeInfo, PositionPathParams, WebhookCreate, WebhookPathParams, WebhookResponse, WebhookTestResponse, WebhookUpdate,
    },
    errors::{Error, Result},
    webhooks::{
        WebhookEventType,
        delivery::{DeliveryRecord, validate_endpoint_url},
    },
};

fn validate_url(url: &str, require_https: bool) -> Result<()> {
    validate_endpoint_url(url, require_https).map_err(|message| Error::BadRequest { message })
}

fn validate_events(events: &[String]) -> Result<()> {
    if events.is_empty() {
        return Err(Error::BadRequest {
            message: "At least one event type is required".to_string(),
        });
    }
    for event in events {
        event.parse::<WebhookEventType>().map_err(|message| Error::BadRequest { message })?;
    }
    Ok(())
}

/// Look a subscription up by id along with its current position.
fn find(state: &AppState, id: &str) -> Result<WebhookResponse> {
    let registry = state.dispatcher.registry();
    let not_found = || Error::NotFound {
        resource: "Webhook".to_string(),
        id: id.to_string(),
    };
    let subscription = registry.get(id).ok_or_else(not_found)?;
    let position = registry.position(id).ok_or_else(not_found)?;
    Ok(WebhookResponse::new(subscription, position))
}

/// List all registered webhooks.
#[utoipa::path(
    get,
    path = "/webhooks",
    tag = "webhooks",
    summary = "List webhooks",
    description = "List all registered webhooks in registration order. Secrets are never returned.",
    responses(
        (status = 200, description = "List of webhooks", body = [WebhookResponse]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn list_webhooks(State(state): State<AppState>) -> Json<Vec<WebhookResponse>> {
    let webhooks = state
        .dispatcher
        .registry()
        .list()
        .into_iter()
        .enumerate()
        .map(|(position, subscription)| WebhookResponse::new(subscription, position))
        .collect();
    Json(webhooks)
}

/// Register a webhook.
#[utoipa::path(
    post,
    path = "/webhooks",
    tag = "webhooks",
    summary = "Create webhook",
    description = "Register a new webhook endpoint for one or more event types.",
    request_body = WebhookCreate,
    responses(
        (status = 201, description = "Webhook created", body = WebhookResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn create_webhook(
    State(state): State<AppState>,
    Json(request): Json<WebhookCreate>,
) -> Result<(StatusCode, Json<WebhookResponse>)> {
    validate_url(&request.url, state.config.webhooks.require_https)?;
    validate_events(&request.events)?;

    let id = state.dispatcher.registry().register(request.into());
    tracing::info!(subscription_id = %id, "Webhook registered");

    Ok((StatusCode::CREATED, Json(find(&state, &id)?)))
}

/// Get a specific webhook.
#[utoipa::path(
    get,
    path = "/webhooks/{id}",
    tag = "webhooks",
    summary = "Get webhook",
    params(
        ("id" = String, Path, description = "Webhook ID"),
    ),
    responses(
        (status = 200, description = "Webhook details", body = WebhookResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Webhook not found"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn get_webhook(State(state): State<AppState>, Path(params): Path<WebhookPathParams>) -> Result<Json<WebhookResponse>> {
    Ok(Json(find(&state, &params.id)?))
}

#[utoipa::path(
    patch,
    path = "/webhooks/{id}",
    tag = "webhooks",
    summary = "Update webhook",
    description = "Update a webhook's URL, events, secret, active flag, or description.",
    params(
        ("id" = String, Path, description = "Webhook ID"),
    ),
    request_body = WebhookUpdate,
    responses(
        (status = 200, description = "Webhook updated", body = WebhookResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Webhook not found"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn update_webhook(
    State(state): State<AppState>,
    Path(params): Path<WebhookPathParams>,
    Json(request): Json<WebhookUpdate>,
) -> Result<Json<WebhookResponse>> {
    if let Some(ref url) = request.url {
        validate_url(url, state.config.webhooks.require_https)?;
    }
    if let Some(ref events) = request.events {
        validate_events(events)?;
    }

    state.dispatcher.registry().update_by_id(&params.id, request.into())?;
    Ok(Json(find(&state, &params.id)?))
}

#[utoipa::path(
    delete,
    path = "/webhooks/{id}",
    tag = "webhooks",
    summary = "Delete webhook",
    params(
        ("id" = String, Path, description = "Webhook ID"),
    ),
    responses(
        (status = 204, description = "Webhook deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Webhook not found"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn delete_webhook(State(state): State<AppState>, Path(params): Path<WebhookPathParams>) -> Result<StatusCode> {
    state.dispatcher.registry().remove_by_id(&params.id)?;
    tracing::info!(subscription_id = %params.id, "Webhook deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the webhook at a list position.
#[utoipa::path(
    delete,
    path = "/webhooks/positions/{index}",
    tag = "webhooks",
    summary = "Delete webhook by position",
    description = "Remove the webhook at a zero-based list position. Out-of-range positions leave the list untouched.",
    params(
        ("index" = usize, Path, description = "Zero-based list position"),
    ),
    responses(
        (status = 204, description = "Webhook deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No webhook at that position"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn delete_webhook_at_position(
    State(state): State<AppState>,
    Path(params): Path<PositionPathParams>,
) -> Result<StatusCode> {
    let removed = state.dispatcher.registry().remove(params.index)?;
    tracing::info!(subscription_id = %removed.id, position = params.index, "Webhook deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Send a test event to a webhook.
#[utoipa::path(
    post,
    path = "/webhooks/{id}/test",
    tag = "webhooks",
    summary = "Test webhook",
    description = "Send a `test.webhook` event to the endpoint and report the result of a single attempt. \
                   The webhook's event filter and active flag are ignored.",
    params(
        ("id" = String, Path, description = "Webhook ID"),
    ),
    responses(
        (status = 200, description = "Test result", body = WebhookTestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Webhook not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn test_webhook(State(state): State<AppState>, Path(params): Path<WebhookPathParams>) -> Result<Json<WebhookTestResponse>> {
    let subscription = state.dispatcher.registry().get(&params.id).ok_or_else(|| Error::NotFound {
        resource: "Webhook".to_string(),
        id: params.id.clone(),
    })?;

    let record = state.dispatcher.send_test(&subscription).await?;

    Ok(Json(record.into()))
}

/// Recent delivery outcomes, newest first.
#[utoipa::path(
    get,
    path = "/webhooks/deliveries",
    tag = "webhooks",
    summary = "List recent deliveries",
    responses(
        (status = 200, description = "Recent deliveries", body = [DeliveryRecord]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn list_deliveries(State(state): State<AppState>) -> Json<Vec<DeliveryRecord>> {
    Json(state.dispatcher.delivery_log().recent())
}

#[utoipa::path(
    get,
    path = "/webhooks/event-types",
    tag = "webhooks",
    summary = "List event types",
    responses(
        (status = 200, description = "Recognized events", body = [EventTypeInfo]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn list_event_types() -> Json<Vec<EventTypeInfo>> {
    Json(
        WebhookEventType::ALL
            .iter()
            .map(|event| EventTypeInfo {
                name: event.to_string(),
                description: event.description().to_string(),
            })
            .collect(),
    )
}
