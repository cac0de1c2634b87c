//! Unit of work: one transaction per request, committed on success and
//! rolled back on error, deadline expiry, or panic.

mod context;
mod error;
mod scope;
mod unit_of_work;

pub use context::RequestContext;
pub use error::UowError;
pub use scope::Scope;
pub use unit_of_work::{UnitOfWork, DEFAULT_SNAPSHOT_FREQUENCY};
