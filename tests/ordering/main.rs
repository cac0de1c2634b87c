//! Ordering service integration tests.

mod support;
mod concurrency;
mod inbox;
mod rollback;
mod scenario;
mod transports;
