use std::sync::{Arc, Barrier};
use std::thread;

use serde_json::json;
use sourced_ordering::bus::REPLY_CHANNEL;
use sourced_ordering::microsvc::REPLY_SUCCESS;
use sourced_ordering::ordering::contracts::{
    APPROVE_ORDER_COMMAND, BASKETS_GROUP, BASKET_AGGREGATE_CHANNEL, BASKET_CHECKED_OUT_EVENT,
    COMMAND_GROUP, DEPOT_GROUP, SHOPPING_LIST_AGGREGATE_CHANNEL, SHOPPING_LIST_COMPLETED_EVENT,
};
use sourced_ordering::ordering::{Order, OrderStatus};
use sourced_ordering::{Delivery, Message};

use crate::support::{items, service, service_with_order, stream};

fn basket_checked_out(message_id: &str, basket_id: &str) -> Message {
    Message::json(
        message_id,
        BASKET_CHECKED_OUT_EVENT,
        &json!({
            "id": basket_id,
            "customer_id": "customer-1",
            "payment_id": "payment-1",
            "items": items(),
        }),
    )
    .unwrap()
}

#[test]
fn redelivered_event_is_applied_once() {
    let service = service();
    let message = basket_checked_out("evt-1", "b-1");

    let first = service
        .handle_event_message(BASKET_AGGREGATE_CHANNEL, BASKETS_GROUP, &message)
        .unwrap();
    let second = service
        .handle_event_message(BASKET_AGGREGATE_CHANNEL, BASKETS_GROUP, &message)
        .unwrap();

    assert_eq!(first, Delivery::Handled);
    assert_eq!(second, Delivery::Duplicate);

    let db = service.database();
    assert_eq!(db.events(&stream("b-1")).len(), 1);
    assert_eq!(db.outbox().len(), 1);
    let inbox = db.inbox();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].group, BASKETS_GROUP);
    assert_eq!(inbox[0].message_id, "evt-1");
}

#[test]
fn other_groups_see_the_same_message_independently() {
    let service = service();
    let message = basket_checked_out("evt-1", "b-1");

    service
        .handle_event_message(BASKET_AGGREGATE_CHANNEL, BASKETS_GROUP, &message)
        .unwrap();
    // A second group reaching the same handler fails on the existing order,
    // which proves the inbox did not short-circuit it.
    let err = service
        .handle_event_message(BASKET_AGGREGATE_CHANNEL, "another-group", &message)
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert_eq!(service.database().inbox().len(), 1);
}

#[test]
fn failed_handling_records_nothing_and_can_be_retried() {
    let service = service_with_order("o-1");
    let message = Message::json(
        "evt-9",
        SHOPPING_LIST_COMPLETED_EVENT,
        &json!({ "id": "sh-1", "order_id": "o-1" }),
    )
    .unwrap();

    // Pending orders cannot be readied yet.
    assert!(service
        .handle_event_message(SHOPPING_LIST_AGGREGATE_CHANNEL, DEPOT_GROUP, &message)
        .is_err());
    assert!(service.database().inbox().is_empty());

    let approve = Message::json(
        "cmd-1",
        APPROVE_ORDER_COMMAND,
        &json!({ "id": "o-1", "shopping_id": "sh-1" }),
    )
    .unwrap();
    service
        .handle_command_message(COMMAND_GROUP, &approve)
        .unwrap();

    // The redelivery now succeeds.
    assert_eq!(
        service
            .handle_event_message(SHOPPING_LIST_AGGREGATE_CHANNEL, DEPOT_GROUP, &message)
            .unwrap(),
        Delivery::Handled
    );
    let order: Order = service.get("o-1").unwrap();
    assert_eq!(order.status(), OrderStatus::Ready);
}

#[test]
fn duplicate_command_replies_once() {
    let service = service_with_order("o-1");
    let command = Message::json(
        "cmd-1",
        APPROVE_ORDER_COMMAND,
        &json!({ "id": "o-1", "shopping_id": "sh-1" }),
    )
    .unwrap()
    .with_metadata(REPLY_CHANNEL, "mallbots.cosec.replies");

    assert_eq!(
        service.handle_command_message(COMMAND_GROUP, &command).unwrap(),
        Delivery::Handled
    );
    assert_eq!(
        service.handle_command_message(COMMAND_GROUP, &command).unwrap(),
        Delivery::Duplicate
    );

    let replies: Vec<_> = service
        .database()
        .outbox()
        .into_iter()
        .filter(|row| row.channel == "mallbots.cosec.replies")
        .collect();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].message_id(), "cmd-1:reply");
    assert_eq!(replies[0].message_type(), REPLY_SUCCESS);
    assert_eq!(replies[0].message.meta("causation_id"), Some("cmd-1"));
}

#[test]
fn unsubscribed_message_types_are_ignored() {
    let service = service();
    let message = Message::new("evt-1", "basketsapi.BasketStarted", b"{}".to_vec());
    assert_eq!(
        service
            .handle_event_message(BASKET_AGGREGATE_CHANNEL, BASKETS_GROUP, &message)
            .unwrap(),
        Delivery::Ignored
    );
    assert!(service.database().inbox().is_empty());
}

#[test]
fn concurrent_deliveries_of_one_message_apply_it_once() {
    let service = Arc::new(service());
    let message = basket_checked_out("evt-1", "b-1");
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            let message = message.clone();
            thread::spawn(move || {
                barrier.wait();
                service.handle_event_message(BASKET_AGGREGATE_CHANNEL, BASKETS_GROUP, &message)
            })
        })
        .collect();

    let mut outcomes: Vec<Delivery> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();
    outcomes.sort_by_key(|delivery| *delivery != Delivery::Handled);
    assert_eq!(outcomes, vec![Delivery::Handled, Delivery::Duplicate]);

    let db = service.database();
    assert_eq!(db.events(&stream("b-1")).len(), 1);
    assert_eq!(db.outbox().len(), 1);
    assert_eq!(db.inbox().len(), 1);
}
