//! Integration contracts: channels, message types, consumer groups and
//! the JSON payloads exchanged with other services.

use serde::{Deserialize, Serialize};

use super::order::Item;

pub const ORDER_AGGREGATE_CHANNEL: &str = "mallbots.ordering.events.Order";
pub const COMMAND_CHANNEL: &str = "mallbots.ordering.commands";
pub const BASKET_AGGREGATE_CHANNEL: &str = "mallbots.baskets.events.Basket";
pub const SHOPPING_LIST_AGGREGATE_CHANNEL: &str = "mallbots.depot.events.ShoppingList";

pub const ORDER_CREATED_EVENT: &str = "ordersapi.OrderCreated";
pub const ORDER_REJECTED_EVENT: &str = "ordersapi.OrderRejected";
pub const ORDER_APPROVED_EVENT: &str = "ordersapi.OrderApproved";
pub const ORDER_CANCELED_EVENT: &str = "ordersapi.OrderCanceled";
pub const ORDER_READIED_EVENT: &str = "ordersapi.OrderReadied";
pub const ORDER_COMPLETED_EVENT: &str = "ordersapi.OrderCompleted";

pub const REJECT_ORDER_COMMAND: &str = "ordersapi.RejectOrder";
pub const APPROVE_ORDER_COMMAND: &str = "ordersapi.ApproveOrder";

pub const BASKET_CHECKED_OUT_EVENT: &str = "basketsapi.BasketCheckedOut";
pub const SHOPPING_LIST_COMPLETED_EVENT: &str = "depotapi.ShoppingListCompleted";

pub const COMMAND_GROUP: &str = "ordering-commands";
pub const BASKETS_GROUP: &str = "ordering-baskets";
pub const DEPOT_GROUP: &str = "ordering-depot";

// Outbound events.

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItemMessage {
    pub product_id: String,
    pub store_id: String,
    pub price: f64,
    pub quantity: u32,
}

impl From<&Item> for OrderItemMessage {
    fn from(item: &Item) -> Self {
        Self {
            product_id: item.product_id.clone(),
            store_id: item.store_id.clone(),
            price: item.price,
            quantity: item.quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedMessage {
    pub id: String,
    pub customer_id: String,
    pub payment_id: String,
    pub shopping_id: String,
    pub items: Vec<OrderItemMessage>,
}

/// Shared shape of `OrderRejected`, `OrderApproved` and `OrderCanceled`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusMessage {
    pub id: String,
    pub customer_id: String,
    pub payment_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderReadiedMessage {
    pub id: String,
    pub customer_id: String,
    pub payment_id: String,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletedMessage {
    pub id: String,
    pub customer_id: String,
    pub invoice_id: String,
}

// Inbound commands.

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectOrder {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApproveOrder {
    pub id: String,
    pub shopping_id: String,
}

// Inbound events.

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub store_id: String,
    pub product_id: String,
    pub store_name: String,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
}

impl From<BasketItem> for Item {
    fn from(item: BasketItem) -> Self {
        Item {
            store_id: item.store_id,
            product_id: item.product_id,
            store_name: item.store_name,
            product_name: item.product_name,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasketCheckedOut {
    pub id: String,
    pub customer_id: String,
    pub payment_id: String,
    pub items: Vec<BasketItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListCompleted {
    pub id: String,
    pub order_id: String,
}
