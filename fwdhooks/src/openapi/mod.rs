//! OpenAPI documentation for the management API at `/api/v1/*`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;
use crate::webhooks::{delivery, events, payloads};

/// Security scheme for the optional API token.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Required only when the service is configured with an `api_token`:\n\n\
                            ```\nAuthorization: Bearer YOUR_API_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "fwdhooks API",
        description = "Webhook subscriptions and domain event ingest for the freight back office. \
                       Deliveries are `POST`ed to subscribers as `{event, timestamp, data}` with \
                       `X-<Product>-Event`, `X-<Product>-Timestamp` and, when a secret is set, \
                       `X-<Product>-Signature: sha256=<hex>` headers."
    ),
    servers(
        (url = "/api/v1", description = "Management API")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::webhooks::list_webhooks,
        api::handlers::webhooks::create_webhook,
        api::handlers::webhooks::get_webhook,
        api::handlers::webhooks::update_webhook,
        api::handlers::webhooks::delete_webhook,
        api::handlers::webhooks::delete_webhook_at_position,
        api::handlers::webhooks::test_webhook,
        api::handlers::webhooks::list_deliveries,
        api::handlers::webhooks::list_event_types,
        api::handlers::events::ingest_event,
    ),
    components(
        schemas(
            api::models::webhooks::WebhookCreate,
            api::models::webhooks::WebhookUpdate,
            api::models::webhooks::WebhookResponse,
            api::models::webhooks::WebhookTestResponse,
            api::models::webhooks::EventTypeInfo,
            api::models::events::EventIngest,
            api::models::events::EventAccepted,
            delivery::DeliveryRecord,
            events::Envelope,
            events::WebhookEventType,
            payloads::Shipment,
            payloads::Booking,
            payloads::Invoice,
            payloads::CommunicationMessage,
            payloads::Ticket,
            payloads::ShipmentPayload,
            payloads::BookingPayload,
            payloads::InvoicePayload,
            payloads::MessagePayload,
            payloads::TicketPayload,
        )
    ),
    tags(
        (name = "webhooks", description = "Webhook subscription management"),
        (name = "events", description = "Domain event ingest"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_lists_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/webhooks",
            "/webhooks/{id}",
            "/webhooks/{id}/test",
            "/webhooks/positions/{index}",
            "/webhooks/deliveries",
            "/webhooks/event-types",
            "/events",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(doc["components"]["securitySchemes"]["BearerAuth"].is_object());
    }
}
