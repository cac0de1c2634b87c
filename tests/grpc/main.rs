//! gRPC transport integration tests.
//!
//! Starts a tonic server on an ephemeral port and drives it with the
//! generated client.

#![cfg(feature = "grpc")]

use std::sync::Arc;

use sourced_ordering::ordering::grpc::{
    grpc_server, CancelOrderRequest, CompleteOrderRequest, CreateOrderRequest, GetOrderRequest,
    ItemMessage, OrderingServiceClient, ReadyOrderRequest, CORRELATION_HEADER,
};
use sourced_ordering::ordering::{ordering_service, Order, OrderStatus};
use sourced_ordering::{InMemoryDatabase, RequestContext, Service, ServiceConfig};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::Code;

fn service() -> Arc<Service<InMemoryDatabase>> {
    Arc::new(ordering_service(
        InMemoryDatabase::new(),
        &ServiceConfig::default(),
    ))
}

/// Bind to port 0, spawn the gRPC server, and return a connected client.
async fn start_server(
    service: Arc<Service<InMemoryDatabase>>,
) -> OrderingServiceClient<tonic::transport::Channel> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let grpc_svc = grpc_server(service);
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(grpc_svc)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    OrderingServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap()
}

fn create_request() -> CreateOrderRequest {
    CreateOrderRequest {
        customer_id: "customer-1".into(),
        payment_id: "payment-1".into(),
        items: vec![ItemMessage {
            store_id: "store-1".into(),
            product_id: "apple".into(),
            store_name: "Fruit Stand".into(),
            product_name: "Apple".into(),
            price: 0.5,
            quantity: 4,
        }],
    }
}

#[tokio::test]
async fn create_and_get_order() {
    let mut client = start_server(service()).await;

    let created = client
        .create_order(create_request())
        .await
        .unwrap()
        .into_inner();
    assert_eq!(uuid::Uuid::parse_str(&created.id).unwrap().get_version_num(), 4);

    let order = client
        .get_order(GetOrderRequest {
            id: created.id.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .order
        .unwrap();
    assert_eq!(order.id, created.id);
    assert_eq!(order.customer_id, "customer-1");
    assert_eq!(order.status, "pending");
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.total, 2.0);
}

#[tokio::test]
async fn lifecycle_and_error_codes() {
    let service = service();
    let mut client = start_server(Arc::clone(&service)).await;
    let id = client
        .create_order(create_request())
        .await
        .unwrap()
        .into_inner()
        .id;

    // Not approved yet.
    let status = client
        .ready_order(ReadyOrderRequest { id: id.clone() })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);

    service
        .dispatch(
            "ordersapi.ApproveOrder",
            serde_json::json!({ "id": id, "shopping_id": "sh-1" }),
            RequestContext::new(),
        )
        .unwrap();
    client
        .ready_order(ReadyOrderRequest { id: id.clone() })
        .await
        .unwrap();
    client
        .complete_order(CompleteOrderRequest {
            id: id.clone(),
            invoice_id: "inv-1".into(),
        })
        .await
        .unwrap();

    let status = client
        .cancel_order(CancelOrderRequest { id: id.clone() })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);

    let order: Order = service.get(&id).unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let mut client = start_server(service()).await;
    let status = client
        .get_order(GetOrderRequest {
            id: "missing".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn correlation_header_reaches_the_outbox() {
    let service = service();
    let mut client = start_server(Arc::clone(&service)).await;

    let mut request = tonic::Request::new(create_request());
    request
        .metadata_mut()
        .insert(CORRELATION_HEADER, "req-7".parse().unwrap());
    client.create_order(request).await.unwrap();

    let outbox = service.database().outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].message.meta("correlation_id"), Some("req-7"));
}
