use std::sync::Arc;

use serde_json::json;
use sourced_ordering::bus::REPLY_CHANNEL;
use sourced_ordering::outbox::BackoffConfig;
use sourced_ordering::ordering::commands::CREATE_ORDER;
use sourced_ordering::ordering::contracts::{
    APPROVE_ORDER_COMMAND, REJECT_ORDER_COMMAND, BASKET_AGGREGATE_CHANNEL, BASKET_CHECKED_OUT_EVENT, COMMAND_CHANNEL,
    ORDER_AGGREGATE_CHANNEL, ORDER_APPROVED_EVENT, ORDER_CREATED_EVENT, ORDER_READIED_EVENT,
    SHOPPING_LIST_AGGREGATE_CHANNEL, SHOPPING_LIST_COMPLETED_EVENT,
};
use sourced_ordering::ordering::{Order, OrderStatus, OrderingRuntime};
use sourced_ordering::{
    Broker, InMemoryBroker, Message, ProcessorConfig, RequestContext, ServiceConfig,
};

use crate::support::{create_input, items, service_with, stream, wait_until};

fn fast_config() -> ServiceConfig {
    ServiceConfig {
        transport_poll_ms: 5,
        processor: ProcessorConfig {
            batch_size: 10,
            poll_interval_ms: 5,
            backoff: BackoffConfig::default(),
        },
        ..ServiceConfig::default()
    }
}

fn checked_out(message_id: &str, basket_id: &str) -> Message {
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
fn messages_flow_from_the_bus_through_the_service_and_back_out() {
    let config = fast_config();
    let service = Arc::new(service_with(&config));
    let broker = InMemoryBroker::new();
    let runtime = OrderingRuntime::start(Arc::clone(&service), broker.clone(), &config).unwrap();

    broker
        .publish(BASKET_AGGREGATE_CHANNEL, checked_out("basket-evt-1", "b-1"))
        .unwrap();
    assert!(wait_until(|| broker
        .message_types(ORDER_AGGREGATE_CHANNEL)
        .contains(&ORDER_CREATED_EVENT.to_string())));

    broker
        .publish(
            COMMAND_CHANNEL,
            Message::json(
                "cmd-1",
                APPROVE_ORDER_COMMAND,
                &json!({ "id": "b-1", "shopping_id": "sh-1" }),
            )
            .unwrap()
            .with_metadata(REPLY_CHANNEL, "mallbots.cosec.replies"),
        )
        .unwrap();
    assert!(wait_until(|| !broker.messages("mallbots.cosec.replies").is_empty()));

    broker
        .publish(
            SHOPPING_LIST_AGGREGATE_CHANNEL,
            Message::json(
                "depot-evt-1",
                SHOPPING_LIST_COMPLETED_EVENT,
                &json!({ "id": "sh-1", "order_id": "b-1" }),
            )
            .unwrap(),
        )
        .unwrap();
    assert!(wait_until(|| broker
        .message_types(ORDER_AGGREGATE_CHANNEL)
        .contains(&ORDER_READIED_EVENT.to_string())));

    let stats = runtime.stop();
    assert_eq!(stats.baskets.handled, 1);
    assert_eq!(stats.commands.handled, 1);
    assert_eq!(stats.depot.handled, 1);
    assert_eq!(stats.processor.published, 4);

    assert_eq!(
        broker.message_types(ORDER_AGGREGATE_CHANNEL),
        vec![ORDER_CREATED_EVENT, ORDER_APPROVED_EVENT, ORDER_READIED_EVENT]
    );
    let reply = &broker.messages("mallbots.cosec.replies")[0];
    assert_eq!(reply.id, "cmd-1:reply");
    assert_eq!(reply.meta("correlation_id"), Some("cmd-1"));

    let order: Order = service.get("b-1").unwrap();
    assert_eq!(order.status(), OrderStatus::Ready);
    assert_eq!(service.database().events(&stream("b-1")).len(), 3);
}

#[test]
fn redelivered_bus_message_is_acknowledged_without_effects() {
    let config = fast_config();
    let service = Arc::new(service_with(&config));
    let broker = InMemoryBroker::new();
    let runtime = OrderingRuntime::start(Arc::clone(&service), broker.clone(), &config).unwrap();

    let message = checked_out("basket-evt-1", "b-1");
    broker
        .publish(BASKET_AGGREGATE_CHANNEL, message.clone())
        .unwrap();
    broker.publish(BASKET_AGGREGATE_CHANNEL, message).unwrap();
    // One consumer handles the group in order, so once b-2 exists the
    // redelivered copy has been dealt with.
    broker
        .publish(BASKET_AGGREGATE_CHANNEL, checked_out("basket-evt-2", "b-2"))
        .unwrap();

    assert!(wait_until(|| service.database().events(&stream("b-2")).len() == 1));

    let stats = runtime.stop();
    assert_eq!(stats.baskets.handled, 2);
    assert_eq!(stats.baskets.duplicates, 1);
    assert_eq!(stats.baskets.failed, 0);
    assert_eq!(service.database().events(&stream("b-1")).len(), 1);
}

#[test]
fn failed_messages_are_redelivered_until_they_succeed() {
    let config = fast_config();
    let service = Arc::new(service_with(&config));
    let broker = InMemoryBroker::new();
    service.database().fail_next_commits(2);

    let runtime = OrderingRuntime::start(Arc::clone(&service), broker.clone(), &config).unwrap();
    broker
        .publish(BASKET_AGGREGATE_CHANNEL, checked_out("basket-evt-1", "b-1"))
        .unwrap();

    assert!(wait_until(|| service.database().events(&stream("b-1")).len() == 1));
    let stats = runtime.stop();
    assert_eq!(stats.baskets.failed, 2);
    assert_eq!(stats.baskets.handled, 1);
}

#[test]
fn permanently_failing_command_does_not_block_the_group() {
    let config = fast_config();
    let service = Arc::new(service_with(&config));
    service
        .dispatch(CREATE_ORDER, create_input("o-1"), RequestContext::new())
        .unwrap();
    let broker = InMemoryBroker::new();
    let runtime = OrderingRuntime::start(Arc::clone(&service), broker.clone(), &config).unwrap();

    broker
        .publish(
            COMMAND_CHANNEL,
            Message::json("cmd-1", REJECT_ORDER_COMMAND, &json!({ "id": "missing" })).unwrap(),
        )
        .unwrap();
    broker
        .publish(
            COMMAND_CHANNEL,
            Message::json(
                "cmd-2",
                APPROVE_ORDER_COMMAND,
                &json!({ "id": "o-1", "shopping_id": "sh-1" }),
            )
            .unwrap(),
        )
        .unwrap();

    assert!(wait_until(|| service
        .get::<Order>("o-1")
        .map(|order| order.status() == OrderStatus::Approved)
        .unwrap_or(false)));

    let stats = runtime.stop();
    assert_eq!(stats.commands.rejected, 1);
    assert_eq!(stats.commands.handled, 1);
    assert_eq!(stats.commands.failed, 0);
    assert_eq!(broker.in_flight(COMMAND_CHANNEL, &config.command_group), 0);
}

#[test]
fn retried_message_does_not_hold_back_newer_ones() {
    let config = fast_config();
    let service = Arc::new(service_with(&config));
    let broker = InMemoryBroker::new();
    service.database().fail_next_commits(1);

    broker
        .publish(BASKET_AGGREGATE_CHANNEL, checked_out("basket-evt-1", "b-1"))
        .unwrap();
    broker
        .publish(BASKET_AGGREGATE_CHANNEL, checked_out("basket-evt-2", "b-2"))
        .unwrap();
    let runtime = OrderingRuntime::start(Arc::clone(&service), broker.clone(), &config).unwrap();

    assert!(wait_until(|| {
        let db = service.database();
        db.events(&stream("b-1")).len() == 1 && db.events(&stream("b-2")).len() == 1
    }));
    let stats = runtime.stop();
    assert_eq!(stats.baskets.failed, 1);
    assert_eq!(stats.baskets.handled, 2);

    // b-2 was handled while b-1 waited for redelivery.
    let handled: Vec<String> = service
        .database()
        .inbox()
        .into_iter()
        .map(|row| row.message_id)
        .collect();
    assert_eq!(handled, vec!["basket-evt-2", "basket-evt-1"]);
}
