//! Command handlers, shared by the RPC surface and the async command channel.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::microsvc::{Context, HandlerError};
use crate::store::Transaction;

use super::contracts::{ApproveOrder, RejectOrder};
use super::order::{Item, Order, OrderError, OrderStatus};

pub const CREATE_ORDER: &str = "ordering.CreateOrder";
pub const GET_ORDER: &str = "ordering.GetOrder";
pub const CANCEL_ORDER: &str = "ordering.CancelOrder";
pub const READY_ORDER: &str = "ordering.ReadyOrder";
pub const COMPLETE_ORDER: &str = "ordering.CompleteOrder";

impl From<OrderError> for HandlerError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Payload(payload) => HandlerError::Other(payload.to_string()),
            other => HandlerError::Validation(other.to_string()),
        }
    }
}

/// Input of `CreateOrder`. Without an `id` the service generates one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub customer_id: String,
    pub payment_id: String,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderId {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompleteOrder {
    pub id: String,
    pub invoice_id: String,
}

/// Read model returned by `GetOrder`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: String,
    pub customer_id: String,
    pub payment_id: String,
    pub shopping_id: String,
    pub invoice_id: String,
    pub items: Vec<Item>,
    pub status: OrderStatus,
    pub total: f64,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            payment_id: order.payment_id().to_string(),
            shopping_id: order.shopping_id().to_string(),
            invoice_id: order.invoice_id().to_string(),
            items: order.items().to_vec(),
            status: order.status(),
            total: order.total(),
        }
    }
}

/// Create an order and reply with its ID, a fresh v4 UUID unless the caller
/// supplied one.
pub fn create_order<T: Transaction>(ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
    let input = ctx.input::<CreateOrder>()?;
    let id = input.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    create(ctx, &id, &input.customer_id, &input.payment_id, input.items)?;
    Ok(Some(json!({ "id": id })))
}

pub(crate) fn create<T: Transaction>(
    ctx: &Context<'_, T>,
    id: &str,
    customer_id: &str,
    payment_id: &str,
    items: Vec<Item>,
) -> Result<(), HandlerError> {
    if id.is_empty() {
        return Err(HandlerError::Validation("the order must have an id".into()));
    }

    let orders = ctx.repository::<Order>();
    if orders.exists(id)? {
        return Err(OrderError::AlreadyExists(id.to_string()).into());
    }

    let mut order = Order::new();
    order.create(id, customer_id, payment_id, items)?;
    orders.save(&mut order)?;
    info!(order_id = id, customer_id, "order created");
    Ok(())
}

pub fn get_order<T: Transaction>(ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
    let input = ctx.input::<OrderId>()?;
    let order = ctx.repository::<Order>().load(&input.id)?;
    Ok(Some(serde_json::to_value(OrderView::from(&order))?))
}

pub fn cancel_order<T: Transaction>(ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
    let input = ctx.input::<OrderId>()?;
    change(ctx, &input.id, Order::cancel)
}

pub fn ready_order<T: Transaction>(ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
    let input = ctx.input::<OrderId>()?;
    change(ctx, &input.id, Order::ready)
}

pub fn complete_order<T: Transaction>(
    ctx: &Context<'_, T>,
) -> Result<Option<Value>, HandlerError> {
    let input = ctx.input::<CompleteOrder>()?;
    change(ctx, &input.id, |order| order.complete(&input.invoice_id))
}

pub fn reject_order<T: Transaction>(ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
    let input = ctx.input::<RejectOrder>()?;
    change(ctx, &input.id, Order::reject)
}

pub fn approve_order<T: Transaction>(ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
    let input = ctx.input::<ApproveOrder>()?;
    change(ctx, &input.id, |order| order.approve(&input.shopping_id))
}

/// Load, apply one transition, save.
pub(crate) fn change<T, F>(ctx: &Context<'_, T>, id: &str, transition: F) -> Result<Option<Value>, HandlerError>
where
    T: Transaction,
    F: FnOnce(&mut Order) -> Result<(), OrderError>,
{
    let orders = ctx.repository::<Order>();
    let mut order = orders.load(id)?;
    transition(&mut order)?;
    orders.save(&mut order)?;
    Ok(None)
}
