//! microsvc: entry points and transports for a message-driven service.
//!
//! A [`Service`] owns a unit of work plus static command and event tables.
//! Every entry point runs exactly one scope:
//!
//! ```text
//! RPC ──────────────▶ Service::dispatch
//! command channel ──▶ listen_commands ──▶ Service::handle_command_message
//! event channel ────▶ subscribe_events ─▶ Service::handle_event_message
//! ```
//!
//! ## Handler Convention
//!
//! ```ignore
//! pub fn cancel_order<T: Transaction>(
//!     ctx: &microsvc::Context<'_, T>,
//! ) -> Result<Option<Value>, microsvc::HandlerError> {
//!     let input = ctx.input::<CancelOrderInput>()?;
//!     let orders = ctx.repository::<Order>();
//!     let mut order = orders.load(&input.id)?;
//!     order.cancel()?;
//!     orders.save(&mut order)?;
//!     Ok(None)
//! }
//! ```

mod context;
mod error;
mod service;
mod transport;

pub use context::Context;
pub use error::HandlerError;
pub use service::{Delivery, Service, REPLY_SUCCESS};
pub use transport::{listen_commands, subscribe_events, TransportHandle, TransportStats};
