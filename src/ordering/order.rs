use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Snapshottable;
use crate::entity::{Entity, EventRecord, PayloadError};

use super::events::{
    OrderApproved, OrderCanceled, OrderCompleted, OrderCreated, OrderReadied, OrderRejected,
    ORDER_APPROVED, ORDER_CANCELED, ORDER_COMPLETED, ORDER_CREATED, ORDER_READIED,
    ORDER_REJECTED,
};

/// A line item in an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub store_id: String,
    pub product_id: String,
    pub store_name: String,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Unknown,
    Pending,
    Rejected,
    Approved,
    Canceled,
    Ready,
    Completed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Unknown => "unknown",
            OrderStatus::Pending => "pending",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Approved => "approved",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Rule violations raised by Order commands. No event is recorded.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("the order must have items")]
    NoItems,
    #[error("the order must have a customer")]
    NoCustomer,
    #[error("the order must have a payment")]
    NoPayment,
    #[error("the order must have an invoice")]
    NoInvoice,
    #[error("order {0} already exists")]
    AlreadyExists(String),
    #[error("cannot {action} an order that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: OrderStatus,
    },
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Order aggregate.
///
/// ```text
/// Pending ──approve──▶ Approved ──ready──▶ Ready ──complete──▶ Completed
///    │  │                 │
///    │  └─reject─▶ Rejected
///    └────────cancel──────┴──▶ Canceled
/// ```
#[derive(Debug, Default)]
pub struct Order {
    pub entity: Entity,
    customer_id: String,
    payment_id: String,
    shopping_id: String,
    invoice_id: String,
    items: Vec<Item>,
    status: OrderStatus,
}

impl Order {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    pub fn shopping_id(&self) -> &str {
        &self.shopping_id
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.price * f64::from(item.quantity))
            .sum()
    }

    pub fn create(
        &mut self,
        id: &str,
        customer_id: &str,
        payment_id: &str,
        items: Vec<Item>,
    ) -> Result<(), OrderError> {
        if self.status != OrderStatus::Unknown {
            return Err(OrderError::AlreadyExists(id.to_string()));
        }
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if customer_id.is_empty() {
            return Err(OrderError::NoCustomer);
        }
        if payment_id.is_empty() {
            return Err(OrderError::NoPayment);
        }

        let event = OrderCreated {
            customer_id: customer_id.to_string(),
            payment_id: payment_id.to_string(),
            shopping_id: String::new(),
            items,
        };
        self.entity.set_id(id);
        self.entity.digest(ORDER_CREATED, &event)?;
        self.on_created(event);
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), OrderError> {
        self.require("reject", &[OrderStatus::Pending])?;
        let event = OrderRejected {
            customer_id: self.customer_id.clone(),
            payment_id: self.payment_id.clone(),
        };
        self.entity.digest(ORDER_REJECTED, &event)?;
        self.status = OrderStatus::Rejected;
        Ok(())
    }

    pub fn approve(&mut self, shopping_id: &str) -> Result<(), OrderError> {
        self.require("approve", &[OrderStatus::Pending])?;
        let event = OrderApproved {
            customer_id: self.customer_id.clone(),
            payment_id: self.payment_id.clone(),
            shopping_id: shopping_id.to_string(),
        };
        self.entity.digest(ORDER_APPROVED, &event)?;
        self.on_approved(event);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.require("cancel", &[OrderStatus::Pending, OrderStatus::Approved])?;
        let event = OrderCanceled {
            customer_id: self.customer_id.clone(),
            payment_id: self.payment_id.clone(),
        };
        self.entity.digest(ORDER_CANCELED, &event)?;
        self.status = OrderStatus::Canceled;
        Ok(())
    }

    pub fn ready(&mut self) -> Result<(), OrderError> {
        self.require("ready", &[OrderStatus::Approved])?;
        let event = OrderReadied {
            customer_id: self.customer_id.clone(),
            payment_id: self.payment_id.clone(),
            total: self.total(),
        };
        self.entity.digest(ORDER_READIED, &event)?;
        self.status = OrderStatus::Ready;
        Ok(())
    }

    pub fn complete(&mut self, invoice_id: &str) -> Result<(), OrderError> {
        self.require("complete", &[OrderStatus::Ready])?;
        if invoice_id.is_empty() {
            return Err(OrderError::NoInvoice);
        }
        let event = OrderCompleted {
            customer_id: self.customer_id.clone(),
            invoice_id: invoice_id.to_string(),
        };
        self.entity.digest(ORDER_COMPLETED, &event)?;
        self.on_completed(event);
        Ok(())
    }

    fn require(&self, action: &'static str, allowed: &[OrderStatus]) -> Result<(), OrderError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                action,
                status: self.status,
            })
        }
    }

    fn on_created(&mut self, event: OrderCreated) {
        self.customer_id = event.customer_id;
        self.payment_id = event.payment_id;
        self.shopping_id = event.shopping_id;
        self.items = event.items;
        self.status = OrderStatus::Pending;
    }

    fn on_approved(&mut self, event: OrderApproved) {
        self.shopping_id = event.shopping_id;
        self.status = OrderStatus::Approved;
    }

    fn on_completed(&mut self, event: OrderCompleted) {
        self.invoice_id = event.invoice_id;
        self.status = OrderStatus::Completed;
    }

    fn replay(&mut self, event: &EventRecord) -> Result<(), PayloadError> {
        match event.event_name.as_str() {
            ORDER_CREATED => self.on_created(event.decode()?),
            ORDER_REJECTED => self.status = OrderStatus::Rejected,
            ORDER_APPROVED => self.on_approved(event.decode()?),
            ORDER_CANCELED => self.status = OrderStatus::Canceled,
            ORDER_READIED => self.status = OrderStatus::Ready,
            ORDER_COMPLETED => self.on_completed(event.decode()?),
            other => return Err(PayloadError::new(format!("unknown order event {other}"))),
        }
        Ok(())
    }
}

crate::impl_aggregate!(Order, "Order", entity, replay);

/// Persisted snapshot shape of an [`Order`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderV1 {
    pub customer_id: String,
    pub payment_id: String,
    pub shopping_id: String,
    pub invoice_id: String,
    pub items: Vec<Item>,
    pub status: OrderStatus,
}

impl Snapshottable for Order {
    type Snapshot = OrderV1;

    fn create_snapshot(&self) -> OrderV1 {
        OrderV1 {
            customer_id: self.customer_id.clone(),
            payment_id: self.payment_id.clone(),
            shopping_id: self.shopping_id.clone(),
            invoice_id: self.invoice_id.clone(),
            items: self.items.clone(),
            status: self.status,
        }
    }

    fn restore_from_snapshot(&mut self, snapshot: OrderV1) {
        self.customer_id = snapshot.customer_id;
        self.payment_id = snapshot.payment_id;
        self.shopping_id = snapshot.shopping_id;
        self.invoice_id = snapshot.invoice_id;
        self.items = snapshot.items;
        self.status = snapshot.status;
    }
}
