use serde_json::json;
use sourced_ordering::ordering::commands::{
    CANCEL_ORDER, COMPLETE_ORDER, CREATE_ORDER, GET_ORDER, READY_ORDER,
};
use sourced_ordering::ordering::contracts::{
    APPROVE_ORDER_COMMAND, ORDER_AGGREGATE_CHANNEL, ORDER_APPROVED_EVENT, ORDER_COMPLETED_EVENT,
    ORDER_CREATED_EVENT, ORDER_READIED_EVENT,
};
use sourced_ordering::ordering::{Order, OrderStatus, OrderView};
use sourced_ordering::{HandlerError, RequestContext};

use crate::support::{create_input, items, service, service_with_order, stream};

#[test]
fn order_lifecycle_produces_one_event_and_one_outbox_row_per_transition() {
    let service = service();
    let ctx = RequestContext::new;

    let reply = service
        .dispatch(CREATE_ORDER, create_input("o-1"), ctx())
        .unwrap();
    assert_eq!(reply, Some(json!({ "id": "o-1" })));

    service
        .dispatch(
            APPROVE_ORDER_COMMAND,
            json!({ "id": "o-1", "shopping_id": "sh-1" }),
            ctx(),
        )
        .unwrap();
    service
        .dispatch(READY_ORDER, json!({ "id": "o-1" }), ctx())
        .unwrap();
    service
        .dispatch(
            COMPLETE_ORDER,
            json!({ "id": "o-1", "invoice_id": "inv-1" }),
            ctx(),
        )
        .unwrap();

    let db = service.database();
    let events: Vec<String> = db
        .events(&stream("o-1"))
        .into_iter()
        .map(|event| event.event_name)
        .collect();
    assert_eq!(
        events,
        vec![
            "ordering.OrderCreated",
            "ordering.OrderApproved",
            "ordering.OrderReadied",
            "ordering.OrderCompleted",
        ]
    );

    let outbox = db.outbox();
    assert_eq!(outbox.len(), 4);
    assert!(outbox.iter().all(|row| row.channel == ORDER_AGGREGATE_CHANNEL));
    let types: Vec<&str> = outbox.iter().map(|row| row.message_type()).collect();
    assert_eq!(
        types,
        vec![
            ORDER_CREATED_EVENT,
            ORDER_APPROVED_EVENT,
            ORDER_READIED_EVENT,
            ORDER_COMPLETED_EVENT,
        ]
    );
    assert_eq!(outbox[0].message_id(), "o-1:ordering.OrderCreated:1");
    assert_eq!(outbox[3].message_id(), "o-1:ordering.OrderCompleted:4");

    let order: Order = service.get("o-1").unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
    assert_eq!(order.invoice_id(), "inv-1");
}

#[test]
fn canceling_a_completed_order_is_rejected_without_side_effects() {
    let service = service_with_order("o-1");
    let ctx = RequestContext::new;
    service
        .dispatch(
            APPROVE_ORDER_COMMAND,
            json!({ "id": "o-1", "shopping_id": "sh-1" }),
            ctx(),
        )
        .unwrap();
    service
        .dispatch(READY_ORDER, json!({ "id": "o-1" }), ctx())
        .unwrap();
    service
        .dispatch(
            COMPLETE_ORDER,
            json!({ "id": "o-1", "invoice_id": "inv-1" }),
            ctx(),
        )
        .unwrap();

    let db = service.database();
    let events_before = db.events(&stream("o-1")).len();
    let outbox_before = db.outbox().len();

    let err = service
        .dispatch(CANCEL_ORDER, json!({ "id": "o-1" }), ctx())
        .unwrap_err();
    assert!(matches!(err, HandlerError::Validation(_)));
    assert_eq!(err.status_code(), 422);

    assert_eq!(db.events(&stream("o-1")).len(), events_before);
    assert_eq!(db.outbox().len(), outbox_before);
}

#[test]
fn get_order_returns_the_current_state() {
    let service = service_with_order("o-1");

    let reply = service
        .dispatch(GET_ORDER, json!({ "id": "o-1" }), RequestContext::new())
        .unwrap()
        .unwrap();
    let view: OrderView = serde_json::from_value(reply).unwrap();

    assert_eq!(view.id, "o-1");
    assert_eq!(view.status, OrderStatus::Pending);
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.total, 5.0);
}

#[test]
fn unknown_order_is_not_found() {
    let service = service();
    let err = service
        .dispatch(GET_ORDER, json!({ "id": "missing" }), RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, HandlerError::NotFound(ref m) if m == "Order missing not found"));
}

#[test]
fn creating_an_existing_order_fails() {
    let service = service_with_order("o-1");
    let err = service
        .dispatch(CREATE_ORDER, create_input("o-1"), RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, HandlerError::Validation(_)));
    assert_eq!(service.database().events(&stream("o-1")).len(), 1);
}

#[test]
fn invalid_input_is_rejected() {
    let service = service();

    let err = service
        .dispatch(
            CREATE_ORDER,
            json!({ "id": "o-1", "customer_id": "c-1", "payment_id": "p-1", "items": [] }),
            RequestContext::new(),
        )
        .unwrap_err();
    assert!(matches!(err, HandlerError::Validation(ref m) if m == "the order must have items"));

    let err = service
        .dispatch(CREATE_ORDER, json!({ "id": 7 }), RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, HandlerError::DecodeFailed(_)));

    assert!(service.database().outbox().is_empty());
}

#[test]
fn unregistered_command_is_an_error() {
    let service = service();
    let err = service
        .dispatch("ordering.RefundOrder", json!({}), RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, HandlerError::UnknownCommand(_)));
    assert_eq!(err.status_code(), 404);
}

#[test]
fn correlation_id_is_stamped_on_outbox_messages() {
    let service = service();
    service
        .dispatch(
            CREATE_ORDER,
            create_input("o-1"),
            RequestContext::new().with_correlation_id("req-42"),
        )
        .unwrap();

    let outbox = service.database().outbox();
    assert_eq!(outbox[0].message.meta("correlation_id"), Some("req-42"));
}

#[test]
fn create_without_an_id_generates_one() {
    let service = service();
    let reply = service
        .dispatch(
            CREATE_ORDER,
            json!({ "customer_id": "customer-1", "payment_id": "payment-1", "items": items() }),
            RequestContext::new(),
        )
        .unwrap()
        .unwrap();

    let id = reply["id"].as_str().unwrap();
    assert_eq!(uuid::Uuid::parse_str(id).unwrap().get_version_num(), 4);
    let order: Order = service.get(id).unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(service.database().events(&stream(id)).len(), 1);
}
