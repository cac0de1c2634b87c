//! Order domain events to integration events.

use serde::Serialize;

use crate::bus::{Message, PublishError};
use crate::router::{DomainEvent, DomainEventRouter, Translation};

use super::contracts::{
    OrderCompletedMessage, OrderCreatedMessage, OrderItemMessage, OrderReadiedMessage,
    OrderStatusMessage, ORDER_AGGREGATE_CHANNEL, ORDER_APPROVED_EVENT, ORDER_CANCELED_EVENT,
    ORDER_COMPLETED_EVENT, ORDER_CREATED_EVENT, ORDER_READIED_EVENT, ORDER_REJECTED_EVENT,
};
use super::events::{
    OrderApproved, OrderCanceled, OrderCompleted, OrderCreated, OrderReadied, OrderRejected,
    ORDER_APPROVED, ORDER_CANCELED, ORDER_COMPLETED, ORDER_CREATED, ORDER_READIED,
    ORDER_REJECTED,
};

/// Every Order domain event becomes one message on the order aggregate channel.
pub fn domain_events() -> DomainEventRouter {
    DomainEventRouter::new()
        .on(ORDER_CREATED, |event| {
            let payload: OrderCreated = event.decode()?;
            to_channel(
                event,
                ORDER_CREATED_EVENT,
                &OrderCreatedMessage {
                    id: event.aggregate_id().to_string(),
                    customer_id: payload.customer_id,
                    payment_id: payload.payment_id,
                    shopping_id: payload.shopping_id,
                    items: payload.items.iter().map(OrderItemMessage::from).collect(),
                },
            )
        })
        .on(ORDER_REJECTED, |event| {
            let payload: OrderRejected = event.decode()?;
            to_channel(
                event,
                ORDER_REJECTED_EVENT,
                &OrderStatusMessage {
                    id: event.aggregate_id().to_string(),
                    customer_id: payload.customer_id,
                    payment_id: payload.payment_id,
                },
            )
        })
        .on(ORDER_APPROVED, |event| {
            let payload: OrderApproved = event.decode()?;
            to_channel(
                event,
                ORDER_APPROVED_EVENT,
                &OrderStatusMessage {
                    id: event.aggregate_id().to_string(),
                    customer_id: payload.customer_id,
                    payment_id: payload.payment_id,
                },
            )
        })
        .on(ORDER_CANCELED, |event| {
            let payload: OrderCanceled = event.decode()?;
            to_channel(
                event,
                ORDER_CANCELED_EVENT,
                &OrderStatusMessage {
                    id: event.aggregate_id().to_string(),
                    customer_id: payload.customer_id,
                    payment_id: payload.payment_id,
                },
            )
        })
        .on(ORDER_READIED, |event| {
            let payload: OrderReadied = event.decode()?;
            to_channel(
                event,
                ORDER_READIED_EVENT,
                &OrderReadiedMessage {
                    id: event.aggregate_id().to_string(),
                    customer_id: payload.customer_id,
                    payment_id: payload.payment_id,
                    total: payload.total,
                },
            )
        })
        .on(ORDER_COMPLETED, |event| {
            let payload: OrderCompleted = event.decode()?;
            to_channel(
                event,
                ORDER_COMPLETED_EVENT,
                &OrderCompletedMessage {
                    id: event.aggregate_id().to_string(),
                    customer_id: payload.customer_id,
                    invoice_id: payload.invoice_id,
                },
            )
        })
}

fn to_channel<T: Serialize>(
    event: &DomainEvent<'_>,
    message_type: &str,
    payload: &T,
) -> Result<Option<Translation>, PublishError> {
    let message = Message::json(event.message_id(), message_type, payload)?;
    Ok(Some(Translation::new(ORDER_AGGREGATE_CHANNEL, message)))
}
