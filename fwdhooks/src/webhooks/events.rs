//! Webhook event types and the envelope that carries them.
//!
//! Event names are namespaced `entity.verb` strings and must match exactly what existing
//! subscribers filter on.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Every event a subscription can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum WebhookEventType {
    #[serde(rename = "shipment.created")]
    ShipmentCreated,
    #[serde(rename = "shipment.updated")]
    ShipmentUpdated,
    #[serde(rename = "shipment.status_changed")]
    ShipmentStatusChanged,
    #[serde(rename = "booking.created")]
    BookingCreated,
    #[serde(rename = "booking.updated")]
    BookingUpdated,
    #[serde(rename = "booking.confirmed")]
    BookingConfirmed,
    #[serde(rename = "invoice.created")]
    InvoiceCreated,
    #[serde(rename = "invoice.paid")]
    InvoicePaid,
    #[serde(rename = "invoice.overdue")]
    InvoiceOverdue,
    #[serde(rename = "communication.message")]
    CommunicationMessage,
    #[serde(rename = "ticket.created")]
    TicketCreated,
    #[serde(rename = "ticket.updated")]
    TicketUpdated,
    #[serde(rename = "container.loaded")]
    ContainerLoaded,
    #[serde(rename = "container.discharged")]
    ContainerDischarged,
    #[serde(rename = "customs.cleared")]
    CustomsCleared,
    #[serde(rename = "delivery.completed")]
    DeliveryCompleted,
    /// Synthetic event used only for manual connectivity checks
    #[serde(rename = "test.webhook")]
    TestWebhook,
}

/// Which payload builder shapes the `data` of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Shipment,
    Booking,
    Invoice,
    Message,
    Ticket,
    Test,
}

impl WebhookEventType {
    pub const ALL: [WebhookEventType; 17] = [
        Self::ShipmentCreated,
        Self::ShipmentUpdated,
        Self::ShipmentStatusChanged,
        Self::BookingCreated,
        Self::BookingUpdated,
        Self::BookingConfirmed,
        Self::InvoiceCreated,
        Self::InvoicePaid,
        Self::InvoiceOverdue,
        Self::CommunicationMessage,
        Self::TicketCreated,
        Self::TicketUpdated,
        Self::ContainerLoaded,
        Self::ContainerDischarged,
        Self::CustomsCleared,
        Self::DeliveryCompleted,
        Self::TestWebhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShipmentCreated => "shipment.created",
            Self::ShipmentUpdated => "shipment.updated",
            Self::ShipmentStatusChanged => "shipment.status_changed",
            Self::BookingCreated => "booking.created",
            Self::BookingUpdated => "booking.updated",
            Self::BookingConfirmed => "booking.confirmed",
            Self::InvoiceCreated => "invoice.created",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoiceOverdue => "invoice.overdue",
            Self::CommunicationMessage => "communication.message",
            Self::TicketCreated => "ticket.created",
            Self::TicketUpdated => "ticket.updated",
            Self::ContainerLoaded => "container.loaded",
            Self::ContainerDischarged => "container.discharged",
            Self::CustomsCleared => "customs.cleared",
            Self::DeliveryCompleted => "delivery.completed",
            Self::TestWebhook => "test.webhook",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ShipmentCreated => "A new shipment was created",
            Self::ShipmentUpdated => "Shipment details were updated",
            Self::ShipmentStatusChanged => "Shipment status changed",
            Self::BookingCreated => "A new booking was created",
            Self::BookingUpdated => "Booking details were updated",
            Self::BookingConfirmed => "A booking was confirmed",
            Self::InvoiceCreated => "A new invoice was created",
            Self::InvoicePaid => "An invoice was paid",
            Self::InvoiceOverdue => "An invoice became overdue",
            Self::CommunicationMessage => "A new message was posted in a conversation",
            Self::TicketCreated => "A new support ticket was created",
            Self::TicketUpdated => "A support ticket was updated",
            Self::ContainerLoaded => "A container was loaded",
            Self::ContainerDischarged => "A container was discharged",
            Self::CustomsCleared => "A shipment cleared customs",
            Self::DeliveryCompleted => "Final delivery was completed",
            Self::TestWebhook => "Manual connectivity check",
        }
    }

    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            Self::ShipmentCreated
            | Self::ShipmentUpdated
            | Self::ShipmentStatusChanged
            | Self::ContainerLoaded
            | Self::ContainerDischarged
            | Self::CustomsCleared
            | Self::DeliveryCompleted => PayloadKind::Shipment,
            Self::BookingCreated | Self::BookingUpdated | Self::BookingConfirmed => PayloadKind::Booking,
            Self::InvoiceCreated | Self::InvoicePaid | Self::InvoiceOverdue => PayloadKind::Invoice,
            Self::CommunicationMessage => PayloadKind::Message,
            Self::TicketCreated | Self::TicketUpdated => PayloadKind::Ticket,
            Self::TestWebhook => PayloadKind::Test,
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WebhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("Unknown event type: {}", s))
    }
}

/// Canonical `{event, timestamp, data}` object sent to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Envelope {
    /// Event name (e.g. "shipment.status_changed")
    pub event: String,
    /// ISO-8601 UTC time the envelope was built, millisecond precision
    pub timestamp: String,
    /// Event-specific public fields
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Wrap event data with the event name and the current UTC time.
    pub fn new(event: WebhookEventType, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(
            "shipment.status_changed".parse::<WebhookEventType>().unwrap(),
            WebhookEventType::ShipmentStatusChanged
        );
        assert!("shipment.deleted".parse::<WebhookEventType>().is_err());
        assert!("".parse::<WebhookEventType>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for event in WebhookEventType::ALL {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event));
            assert_eq!(event.as_str().parse::<WebhookEventType>().unwrap(), event);
        }
    }

    #[test]
    fn test_payload_kinds() {
        assert_eq!(WebhookEventType::CustomsCleared.payload_kind(), PayloadKind::Shipment);
        assert_eq!(WebhookEventType::BookingConfirmed.payload_kind(), PayloadKind::Booking);
        assert_eq!(WebhookEventType::InvoiceOverdue.payload_kind(), PayloadKind::Invoice);
        assert_eq!(WebhookEventType::CommunicationMessage.payload_kind(), PayloadKind::Message);
        assert_eq!(WebhookEventType::TicketUpdated.payload_kind(), PayloadKind::Ticket);
        assert_eq!(WebhookEventType::TestWebhook.payload_kind(), PayloadKind::Test);
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope::new(WebhookEventType::InvoicePaid, serde_json::json!({"invoice_ref": "INV-1"}));
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["event"], "invoice.paid");
        assert_eq!(obj["data"]["invoice_ref"], "INV-1");

        let timestamp = obj["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
}
