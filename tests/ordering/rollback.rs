use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use serde_json::json;
use sourced_ordering::ordering::commands::CREATE_ORDER;
use sourced_ordering::ordering::{Order, OrderStatus};
use sourced_ordering::{HandlerError, RequestContext};

use crate::support::{create_input, items, service, service_with_order, stream};

#[test]
fn handler_error_after_buffering_events_stores_nothing() {
    let service = service();

    let result: Result<(), HandlerError> = service.run(RequestContext::new(), |_scope| {
        let mut order = Order::new();
        order.create("o-1", "c-1", "p-1", items())?;
        order.approve("sh-1")?;
        // Fails before the order is saved.
        Err(HandlerError::Other("payment service down".into()))
    });
    assert!(result.is_err());

    let db = service.database();
    assert!(db.events(&stream("o-1")).is_empty());
    assert!(db.outbox().is_empty());
}

#[test]
fn handler_error_after_save_rolls_the_save_back() {
    let service = service();

    let result: Result<(), HandlerError> = service.run(RequestContext::new(), |scope| {
        let mut order = Order::new();
        order.create("o-1", "c-1", "p-1", items())?;
        scope.repository::<Order>().save(&mut order)?;
        Err(HandlerError::Validation("rejected after save".into()))
    });
    assert!(matches!(result, Err(HandlerError::Validation(_))));

    let db = service.database();
    assert!(db.events(&stream("o-1")).is_empty());
    assert!(db.outbox().is_empty());
}

#[test]
fn panic_inside_a_scope_rolls_back_and_keeps_unwinding() {
    let service = service();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), HandlerError> = service.run(RequestContext::new(), |scope| {
            let mut order = Order::new();
            order.create("o-1", "c-1", "p-1", items())?;
            scope.repository::<Order>().save(&mut order)?;
            panic!("handler bug");
        });
    }));
    assert!(outcome.is_err());

    let db = service.database();
    assert!(db.events(&stream("o-1")).is_empty());
    assert!(db.outbox().is_empty());

    // The service keeps working afterwards.
    service
        .dispatch(CREATE_ORDER, create_input("o-1"), RequestContext::new())
        .unwrap();
    assert_eq!(db.events(&stream("o-1")).len(), 1);
}

#[test]
fn commit_failure_surfaces_as_transport_error() {
    let service = service();
    service.database().fail_next_commits(1);

    let err = service
        .dispatch(CREATE_ORDER, create_input("o-1"), RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, HandlerError::Transport(_)));
    assert_eq!(err.status_code(), 503);
    assert!(service.database().events(&stream("o-1")).is_empty());

    // The next attempt goes through.
    service
        .dispatch(CREATE_ORDER, create_input("o-1"), RequestContext::new())
        .unwrap();
}

#[test]
fn unavailable_database_fails_before_the_handler_runs() {
    let service = service();
    service.database().set_available(false);

    let err = service
        .dispatch(CREATE_ORDER, create_input("o-1"), RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, HandlerError::Transport(_)));

    service.database().set_available(true);
    assert!(service.database().events(&stream("o-1")).is_empty());
}

#[test]
fn expired_deadline_rolls_back() {
    let service = service_with_order("o-1");
    let expired = RequestContext::new().with_timeout(Duration::ZERO);

    let err = service
        .dispatch(
            "ordersapi.ApproveOrder",
            json!({ "id": "o-1", "shopping_id": "sh-1" }),
            expired,
        )
        .unwrap_err();
    assert!(matches!(err, HandlerError::DeadlineExceeded));

    let order: Order = service.get("o-1").unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(service.database().outbox().len(), 1);
}
