//! The ordering service: Order aggregate, its integration contracts, and the
//! handlers wired onto a [`Service`](crate::microsvc::Service).
//!
//! ```text
//!  CreateOrder / CancelOrder / ... (RPC) ─┐
//!  ordersapi.RejectOrder / ApproveOrder ──┼──▶ Order ──▶ ordering.Order* ──▶ ordersapi.Order*
//!  basketsapi.BasketCheckedOut ───────────┤             (domain events)     (outbox, order channel)
//!  depotapi.ShoppingListCompleted ────────┘
//! ```

mod app;
pub mod commands;
pub mod contracts;
pub mod events;
mod integration;
mod order;
mod translate;

#[cfg(feature = "grpc")]
pub mod grpc;

pub use app::{ordering_service, OrderingRuntime, RuntimeStats};
pub use commands::{CompleteOrder, CreateOrder, OrderId, OrderView};
pub use integration::{on_basket_checked_out, on_shopping_list_completed};
pub use order::{Item, Order, OrderError, OrderStatus, OrderV1};
pub use translate::domain_events;
