//! Handlers for integration events from the baskets and depot services.

use tracing::debug;

use crate::microsvc::{Context, HandlerError};
use crate::store::Transaction;

use super::commands::{change, create};
use super::contracts::{BasketCheckedOut, ShoppingListCompleted};
use super::order::{Item, Order};

/// A checked-out basket becomes an order with the basket's ID.
pub fn on_basket_checked_out<T: Transaction>(ctx: &Context<'_, T>) -> Result<(), HandlerError> {
    let event = ctx.input::<BasketCheckedOut>()?;
    debug!(basket_id = %event.id, "basket checked out");
    let items = event.items.into_iter().map(Item::from).collect();
    create(ctx, &event.id, &event.customer_id, &event.payment_id, items)
}

/// A completed shopping list means the order is ready for pickup, so this
/// readies the order rather than approving it. Approval arrives earlier as
/// the `ordersapi.ApproveOrder` command, which carries the shopping list ID.
pub fn on_shopping_list_completed<T: Transaction>(
    ctx: &Context<'_, T>,
) -> Result<(), HandlerError> {
    let event = ctx.input::<ShoppingListCompleted>()?;
    debug!(shopping_id = %event.id, order_id = %event.order_id, "shopping list completed");
    change(ctx, &event.order_id, Order::ready).map(|_| ())
}
