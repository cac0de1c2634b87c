use std::sync::{Arc, Barrier};
use std::thread;

use serde_json::json;
use sourced_ordering::ordering::commands::CANCEL_ORDER;
use sourced_ordering::ordering::contracts::REJECT_ORDER_COMMAND;
use sourced_ordering::ordering::Order;
use sourced_ordering::{HandlerError, RequestContext};

use crate::support::{service_with_order, stream};

#[test]
fn racing_saves_on_one_aggregate_have_a_single_winner() {
    let service = service_with_order("o-1");
    let uow = service.unit_of_work();

    let first = uow.begin(RequestContext::new()).unwrap();
    let second = uow.begin(RequestContext::new()).unwrap();

    let mut a: Order = first.repository::<Order>().load("o-1").unwrap();
    let mut b: Order = second.repository::<Order>().load("o-1").unwrap();
    a.approve("sh-1").unwrap();
    b.cancel().unwrap();
    first.repository::<Order>().save(&mut a).unwrap();
    second.repository::<Order>().save(&mut b).unwrap();

    first.close::<(), HandlerError>(Ok(())).unwrap();
    let err = second.close::<(), HandlerError>(Ok(())).unwrap_err();
    assert!(matches!(err, HandlerError::Conflict(_)));
    assert!(err.is_retryable());

    let db = service.database();
    let events = db.events(&stream("o-1"));
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_name, "ordering.OrderApproved");
    // Only the winner's translation reached the outbox.
    assert_eq!(db.outbox().len(), 2);
}

#[test]
fn concurrent_requests_on_threads_commit_at_most_once_per_version() {
    let service = Arc::new(service_with_order("o-1"));
    let contenders = 8;
    let barrier = Arc::new(Barrier::new(contenders));

    let handles: Vec<_> = (0..contenders)
        .map(|i| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let command = if i % 2 == 0 {
                    CANCEL_ORDER
                } else {
                    REJECT_ORDER_COMMAND
                };
                service.dispatch(command, json!({ "id": "o-1" }), RequestContext::new())
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, HandlerError::Conflict(_) | HandlerError::Validation(_)),
                "unexpected error {err}"
            );
        }
    }

    let db = service.database();
    assert_eq!(db.events(&stream("o-1")).len(), 2);
    assert_eq!(db.outbox().len(), 2);
}
