//! Domain event payloads of the Order aggregate.
//!
//! Each payload carries everything its translator needs, so translation never
//! reloads the aggregate.

use serde::{Deserialize, Serialize};

use super::order::Item;

pub const ORDER_CREATED: &str = "ordering.OrderCreated";
pub const ORDER_REJECTED: &str = "ordering.OrderRejected";
pub const ORDER_APPROVED: &str = "ordering.OrderApproved";
pub const ORDER_CANCELED: &str = "ordering.OrderCanceled";
pub const ORDER_READIED: &str = "ordering.OrderReadied";
pub const ORDER_COMPLETED: &str = "ordering.OrderCompleted";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub customer_id: String,
    pub payment_id: String,
    pub shopping_id: String,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRejected {
    pub customer_id: String,
    pub payment_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderApproved {
    pub customer_id: String,
    pub payment_id: String,
    pub shopping_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderCanceled {
    pub customer_id: String,
    pub payment_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderReadied {
    pub customer_id: String,
    pub payment_id: String,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub customer_id: String,
    pub invoice_id: String,
}
