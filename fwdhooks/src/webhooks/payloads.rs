//! Payload builders: internal domain objects to public webhook fields.
//!
//! The back office stores records with camelCase field names. Subscribers see a flat snake_case
//! shape that is decoupled from those internal names. Builders are pure and never validate: values
//! are copied through with whatever JSON type the back office sent, and a field missing (or null)
//! on the internal object is simply absent from the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Shipment record as the back office holds it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub shipment_no: Option<Value>,
    pub status: Option<Value>,
    pub container_no: Option<Value>,
    pub shipper: Option<Value>,
    pub consignee: Option<Value>,
    pub departure: Option<Value>,
    pub arrival_port: Option<Value>,
    pub etd: Option<Value>,
    pub eta: Option<Value>,
    pub transport: Option<Value>,
    #[serde(rename = "type")]
    pub shipment_type: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_no: Option<Value>,
    pub booking_date: Option<Value>,
    pub shipper: Option<Value>,
    pub consignee: Option<Value>,
    pub origin: Option<Value>,
    pub destination: Option<Value>,
    pub transport: Option<Value>,
    pub service_type: Option<Value>,
    pub status: Option<Value>,
    pub requested_etd: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_ref: Option<Value>,
    pub amount: Option<Value>,
    pub currency: Option<Value>,
    pub status: Option<Value>,
    pub due_date: Option<Value>,
    pub shipment_ref: Option<Value>,
    pub vendor: Option<Value>,
    pub description: Option<Value>,
}

/// A message posted in a shipment conversation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationMessage {
    pub conversation_id: Option<Value>,
    pub sender: Option<Value>,
    pub content: Option<Value>,
    pub timestamp: Option<Value>,
    pub shipment_id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(alias = "ticketId")]
    pub id: Option<Value>,
    pub title: Option<Value>,
    pub priority: Option<Value>,
    pub status: Option<Value>,
    pub category: Option<Value>,
    pub assignee: Option<Value>,
    pub shipment_ref: Option<Value>,
}

// --- Public payloads ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShipmentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_no: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_no: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipper: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignee: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_port: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etd: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub shipment_type: Option<Value>,
}

impl From<&Shipment> for ShipmentPayload {
    fn from(s: &Shipment) -> Self {
        Self {
            shipment_no: s.shipment_no.clone(),
            status: s.status.clone(),
            container_no: s.container_no.clone(),
            shipper: s.shipper.clone(),
            consignee: s.consignee.clone(),
            departure: s.departure.clone(),
            arrival_port: s.arrival_port.clone(),
            etd: s.etd.clone(),
            eta: s.eta.clone(),
            transport: s.transport.clone(),
            shipment_type: s.shipment_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_no: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipper: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignee: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_etd: Option<Value>,
}

impl From<&Booking> for BookingPayload {
    fn from(b: &Booking) -> Self {
        Self {
            booking_no: b.booking_no.clone(),
            booking_date: b.booking_date.clone(),
            shipper: b.shipper.clone(),
            consignee: b.consignee.clone(),
            origin: b.origin.clone(),
            destination: b.destination.clone(),
            transport: b.transport.clone(),
            service_type: b.service_type.clone(),
            status: b.status.clone(),
            requested_etd: b.requested_etd.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvoicePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_ref: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
}

impl From<&Invoice> for InvoicePayload {
    fn from(i: &Invoice) -> Self {
        Self {
            invoice_ref: i.invoice_ref.clone(),
            amount: i.amount.clone(),
            currency: i.currency.clone(),
            status: i.status.clone(),
            due_date: i.due_date.clone(),
            shipment_ref: i.shipment_ref.clone(),
            vendor: i.vendor.clone(),
            description: i.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<Value>,
}

impl From<&CommunicationMessage> for MessagePayload {
    fn from(m: &CommunicationMessage) -> Self {
        Self {
            conversation_id: m.conversation_id.clone(),
            sender: m.sender.clone(),
            content: m.content.clone(),
            timestamp: m.timestamp.clone(),
            shipment_id: m.shipment_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TicketPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_ref: Option<Value>,
}

impl From<&Ticket> for TicketPayload {
    fn from(t: &Ticket) -> Self {
        Self {
            ticket_id: t.id.clone(),
            title: t.title.clone(),
            priority: t.priority.clone(),
            status: t.status.clone(),
            category: t.category.clone(),
            assignee: t.assignee.clone(),
            shipment_ref: t.shipment_ref.clone(),
        }
    }
}
