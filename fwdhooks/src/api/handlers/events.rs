//! Domain event ingest.

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::instrument;

use crate::{
    AppState,
    api::models::events::{EventAccepted, EventIngest},
    errors::Result,
};

/// Report a domain event.
#[utoipa::path(
    post,
    path = "/events",
    tag = "events",
    summary = "Ingest domain event",
    description = "Report that a domain event happened. `data` is the back-office record (camelCase fields); \
                   it is shaped into the event's public payload and delivered to every active subscriber of the \
                   event. Delivery happens in the background; the response only reports how many deliveries \
                   were scheduled.",
    request_body = EventIngest,
    responses(
        (status = 202, description = "Event accepted", body = EventAccepted),
        (status = 400, description = "Unknown or reserved event, or malformed data"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn ingest_event(State(state): State<AppState>, Json(request): Json<EventIngest>) -> Result<(StatusCode, Json<EventAccepted>)> {
    let (event, scheduled) = state.triggers.ingest(&request.event, request.data)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            event: event.to_string(),
            scheduled,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_app;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test_log::test(tokio::test)]
    async fn test_ingest_delivers_to_subscribers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Freightdesk-Event", "shipment.status_changed"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let (app, _bg_services) = create_test_app().await;
        app.post("/api/v1/webhooks")
            .json(&json!({"url": mock_server.uri(), "events": ["shipment.status_changed"], "secret": "s3cr3t"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = app
            .post("/api/v1/events")
            .json(&json!({
                "event": "shipment.status_changed",
                "data": {"shipmentNo": "X1", "status": "In Transit", "arrivalPort": "Rotterdam"}
            }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        let accepted: EventAccepted = response.json();
        assert_eq!(accepted.event, "shipment.status_changed");
        assert_eq!(accepted.scheduled, 1);

        let body = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(request) = mock_server.received_requests().await.and_then(|r| r.into_iter().next()) {
                    return serde_json::from_slice::<serde_json::Value>(&request.body).unwrap();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("webhook should arrive");

        assert_eq!(
            body["data"],
            json!({"shipment_no": "X1", "status": "In Transit", "arrival_port": "Rotterdam"})
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_ingest_without_subscribers() {
        let (app, _bg_services) = create_test_app().await;

        let accepted: EventAccepted = app
            .post("/api/v1/events")
            .json(&json!({"event": "booking.confirmed", "data": {"bookingNo": "BK-1"}}))
            .await
            .json();
        assert_eq!(accepted.scheduled, 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_ingest_rejects_unknown_and_test_events() {
        let (app, _bg_services) = create_test_app().await;

        app.post("/api/v1/events")
            .json(&json!({"event": "shipment.deleted", "data": {}}))
            .await
            .assert_status_bad_request();
        app.post("/api/v1/events")
            .json(&json!({"event": "test.webhook", "data": {}}))
            .await
            .assert_status_bad_request();
        app.post("/api/v1/events")
            .json(&json!({"event": "invoice.paid", "data": "not a record"}))
            .await
            .assert_status_bad_request();

        // Field types are not checked
        app.post("/api/v1/events")
            .json(&json!({"event": "invoice.paid", "data": {"invoiceRef": "INV-1", "amount": "1250.00"}}))
            .await
            .assert_status(StatusCode::ACCEPTED);
    }
}
