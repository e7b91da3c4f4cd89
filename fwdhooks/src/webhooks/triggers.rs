//! Typed entry points for application code reporting domain events.
//!
//! Each helper shapes an internal record into its public payload and hands it to the dispatcher.
//! Event names carry a payload kind; a helper refuses events of another kind instead of sending a
//! mis-shaped payload.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::webhooks::dispatcher::WebhookDispatcher;
use crate::webhooks::events::{PayloadKind, WebhookEventType};
use crate::webhooks::payloads::{
    Booking, BookingPayload, CommunicationMessage, Invoice, InvoicePayload, MessagePayload, Shipment, ShipmentPayload, Ticket,
    TicketPayload,
};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("Event {event} does not carry a {expected} payload")]
    PayloadMismatch { event: WebhookEventType, expected: &'static str },

    #[error("Event {0} is reserved for connectivity tests")]
    Reserved(WebhookEventType),

    #[error("Invalid payload for {event}: {source}")]
    InvalidPayload {
        event: WebhookEventType,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct WebhookTriggers {
    dispatcher: WebhookDispatcher,
}

impl WebhookTriggers {
    pub fn new(dispatcher: WebhookDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn shipment(&self, event: WebhookEventType, shipment: &Shipment) -> Result<usize, TriggerError> {
        expect_kind(event, PayloadKind::Shipment, "shipment")?;
        self.send(event, &ShipmentPayload::from(shipment))
    }

    pub fn booking(&self, event: WebhookEventType, booking: &Booking) -> Result<usize, TriggerError> {
        expect_kind(event, PayloadKind::Booking, "booking")?;
        self.send(event, &BookingPayload::from(booking))
    }

    pub fn invoice(&self, event: WebhookEventType, invoice: &Invoice) -> Result<usize, TriggerError> {
        expect_kind(event, PayloadKind::Invoice, "invoice")?;
        self.send(event, &InvoicePayload::from(invoice))
    }

    /// Always sent as `communication.message`.
    pub fn message(&self, message: &CommunicationMessage) -> Result<usize, TriggerError> {
        self.send(WebhookEventType::CommunicationMessage, &MessagePayload::from(message))
    }

    pub fn ticket(&self, event: WebhookEventType, ticket: &Ticket) -> Result<usize, TriggerError> {
        expect_kind(event, PayloadKind::Ticket, "ticket")?;
        self.send(event, &TicketPayload::from(ticket))
    }

    /// Route a raw internal record to the builder for `event`'s payload kind.
    ///
    /// Used by the ingest endpoint. `test.webhook` is rejected.
    pub fn ingest(&self, event: &str, data: serde_json::Value) -> Result<(WebhookEventType, usize), TriggerError> {
        let event: WebhookEventType = event.parse().map_err(|_| TriggerError::UnknownEvent(event.to_string()))?;

        let scheduled = match event.payload_kind() {
            PayloadKind::Shipment => self.shipment(event, &parse(event, data)?)?,
            PayloadKind::Booking => self.booking(event, &parse(event, data)?)?,
            PayloadKind::Invoice => self.invoice(event, &parse(event, data)?)?,
            PayloadKind::Message => self.message(&parse(event, data)?)?,
            PayloadKind::Ticket => self.ticket(event, &parse(event, data)?)?,
            PayloadKind::Test => return Err(TriggerError::Reserved(event)),
        };
        Ok((event, scheduled))
    }

    fn send<P: Serialize>(&self, event: WebhookEventType, payload: &P) -> Result<usize, TriggerError> {
        let data = serde_json::to_value(payload).map_err(|source| TriggerError::InvalidPayload { event, source })?;
        Ok(self.dispatcher.dispatch(event, data))
    }
}

fn expect_kind(event: WebhookEventType, kind: PayloadKind, expected: &'static str) -> Result<(), TriggerError> {
    if event.payload_kind() == kind {
        Ok(())
    } else {
        Err(TriggerError::PayloadMismatch { event, expected })
    }
}

/// Absent data is treated as an empty record.
fn parse<T: DeserializeOwned>(event: WebhookEventType, data: serde_json::Value) -> Result<T, TriggerError> {
    let data = if data.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|source| TriggerError::InvalidPayload { event, source })
}
