//! gRPC transport for the ordering RPC surface.
//!
//! Requires the `grpc` feature. Messages are prost structs (standard protobuf
//! wire format, no `.proto` file); the service trait is generated by
//! `build.rs`. Every RPC is one [`Service::dispatch`], so one scope.
//!
//! ## Example
//!
//! ```ignore
//! let service = Arc::new(ordering_service(db.clone(), &config));
//! ordering::grpc::serve_grpc(service, "[::1]:50051").await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tonic::{Request, Response, Status};

use crate::microsvc::{HandlerError, Service};
use crate::store::Database;
use crate::uow::RequestContext;

use super::commands::{
    CompleteOrder, CreateOrder, OrderId, OrderView, CANCEL_ORDER, COMPLETE_ORDER, CREATE_ORDER,
    GET_ORDER, READY_ORDER,
};
use super::order::Item;

/// Metadata key carrying the caller's correlation ID.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone, PartialEq, prost::Message)]
pub struct ItemMessage {
    #[prost(string, tag = "1")]
    pub store_id: String,
    #[prost(string, tag = "2")]
    pub product_id: String,
    #[prost(string, tag = "3")]
    pub store_name: String,
    #[prost(string, tag = "4")]
    pub product_name: String,
    #[prost(double, tag = "5")]
    pub price: f64,
    #[prost(uint32, tag = "6")]
    pub quantity: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderMessage {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub customer_id: String,
    #[prost(string, tag = "3")]
    pub payment_id: String,
    #[prost(message, repeated, tag = "4")]
    pub items: Vec<ItemMessage>,
    #[prost(string, tag = "5")]
    pub status: String,
    #[prost(string, tag = "6")]
    pub shopping_id: String,
    #[prost(string, tag = "7")]
    pub invoice_id: String,
    #[prost(double, tag = "8")]
    pub total: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrderRequest {
    #[prost(message, repeated, tag = "2")]
    pub items: Vec<ItemMessage>,
    #[prost(string, tag = "3")]
    pub customer_id: String,
    #[prost(string, tag = "4")]
    pub payment_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrderResponse {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetOrderRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetOrderResponse {
    #[prost(message, optional, tag = "1")]
    pub order: Option<OrderMessage>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CancelOrderRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CancelOrderResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadyOrderRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadyOrderResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CompleteOrderRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub invoice_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CompleteOrderResponse {}

include!(concat!(env!("OUT_DIR"), "/ordering.OrderingService.rs"));

pub use ordering_service_client::OrderingServiceClient;
pub use ordering_service_server::{OrderingService, OrderingServiceServer};

impl From<ItemMessage> for Item {
    fn from(item: ItemMessage) -> Self {
        Item {
            store_id: item.store_id,
            product_id: item.product_id,
            store_name: item.store_name,
            product_name: item.product_name,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

impl From<Item> for ItemMessage {
    fn from(item: Item) -> Self {
        ItemMessage {
            store_id: item.store_id,
            product_id: item.product_id,
            store_name: item.store_name,
            product_name: item.product_name,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

impl From<OrderView> for OrderMessage {
    fn from(view: OrderView) -> Self {
        OrderMessage {
            id: view.id,
            customer_id: view.customer_id,
            payment_id: view.payment_id,
            items: view.items.into_iter().map(ItemMessage::from).collect(),
            status: view.status.to_string(),
            shopping_id: view.shopping_id,
            invoice_id: view.invoice_id,
            total: view.total,
        }
    }
}

impl From<HandlerError> for Status {
    fn from(err: HandlerError) -> Self {
        let message = err.to_string();
        match err {
            HandlerError::UnknownCommand(_) => Status::unimplemented(message),
            HandlerError::DecodeFailed(_) => Status::invalid_argument(message),
            HandlerError::Validation(_) => Status::failed_precondition(message),
            HandlerError::NotFound(_) => Status::not_found(message),
            HandlerError::Conflict(_) => Status::aborted(message),
            HandlerError::Duplicate { .. } => Status::already_exists(message),
            HandlerError::Transport(_) => Status::unavailable(message),
            HandlerError::DeadlineExceeded => Status::deadline_exceeded(message),
            HandlerError::Other(_) => Status::internal(message),
        }
    }
}

/// Implements the generated `OrderingService` trait over a shared [`Service`].
pub struct GrpcHandler<D: Database> {
    service: Arc<Service<D>>,
}

impl<D: Database> GrpcHandler<D> {
    pub fn new(service: Arc<Service<D>>) -> Self {
        Self { service }
    }

    fn dispatch<T: serde::Serialize>(
        &self,
        command: &str,
        metadata: &tonic::metadata::MetadataMap,
        input: &T,
    ) -> Result<Option<Value>, Status> {
        let input = serde_json::to_value(input).map_err(HandlerError::from)?;
        Ok(self
            .service
            .dispatch(command, input, request_context(metadata))?)
    }
}

#[tonic::async_trait]
impl<D: Database> OrderingService for GrpcHandler<D> {
    async fn create_order(
        &self,
        request: Request<CreateOrderRequest>,
    ) -> Result<Response<CreateOrderResponse>, Status> {
        let metadata = request.metadata().clone();
        let req = request.into_inner();
        let input = CreateOrder {
            id: None,
            customer_id: req.customer_id,
            payment_id: req.payment_id,
            items: req.items.into_iter().map(Item::from).collect(),
        };
        let reply = self
            .dispatch(CREATE_ORDER, &metadata, &input)?
            .ok_or_else(|| Status::internal("CreateOrder returned no id"))?;
        let id = reply
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Status::internal("CreateOrder reply has no id"))?;
        Ok(Response::new(CreateOrderResponse { id: id.to_string() }))
    }

    async fn get_order(
        &self,
        request: Request<GetOrderRequest>,
    ) -> Result<Response<GetOrderResponse>, Status> {
        let metadata = request.metadata().clone();
        let input = OrderId {
            id: request.into_inner().id,
        };
        let reply = self
            .dispatch(GET_ORDER, &metadata, &input)?
            .ok_or_else(|| Status::internal("GetOrder returned no order"))?;
        let view: OrderView = serde_json::from_value(reply).map_err(HandlerError::from)?;
        Ok(Response::new(GetOrderResponse {
            order: Some(view.into()),
        }))
    }

    async fn cancel_order(
        &self,
        request: Request<CancelOrderRequest>,
    ) -> Result<Response<CancelOrderResponse>, Status> {
        let metadata = request.metadata().clone();
        let input = OrderId {
            id: request.into_inner().id,
        };
        self.dispatch(CANCEL_ORDER, &metadata, &input)?;
        Ok(Response::new(CancelOrderResponse {}))
    }

    async fn ready_order(
        &self,
        request: Request<ReadyOrderRequest>,
    ) -> Result<Response<ReadyOrderResponse>, Status> {
        let metadata = request.metadata().clone();
        let input = OrderId {
            id: request.into_inner().id,
        };
        self.dispatch(READY_ORDER, &metadata, &input)?;
        Ok(Response::new(ReadyOrderResponse {}))
    }

    async fn complete_order(
        &self,
        request: Request<CompleteOrderRequest>,
    ) -> Result<Response<CompleteOrderResponse>, Status> {
        let metadata = request.metadata().clone();
        let req = request.into_inner();
        let input = CompleteOrder {
            id: req.id,
            invoice_id: req.invoice_id,
        };
        self.dispatch(COMPLETE_ORDER, &metadata, &input)?;
        Ok(Response::new(CompleteOrderResponse {}))
    }
}

/// Build the request context from gRPC metadata.
fn request_context(metadata: &tonic::metadata::MetadataMap) -> RequestContext {
    let context = RequestContext::new();
    match metadata
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(correlation_id) => context.with_correlation_id(correlation_id),
        None => context,
    }
}

/// Create an `OrderingServiceServer` from a shared `Service<D>`.
pub fn grpc_server<D: Database>(service: Arc<Service<D>>) -> OrderingServiceServer<GrpcHandler<D>> {
    OrderingServiceServer::new(GrpcHandler::new(service))
}

/// Error starting the gRPC transport.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid gRPC address {0}")]
    Address(String),
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
}

/// Bind and serve the gRPC transport at the given address (e.g. `"[::1]:50051"`).
pub async fn serve_grpc<D: Database>(service: Arc<Service<D>>, addr: &str) -> Result<(), ServeError> {
    let addr = addr
        .parse()
        .map_err(|_| ServeError::Address(addr.to_string()))?;
    tonic::transport::Server::builder()
        .add_service(grpc_server(service))
        .serve(addr)
        .await?;
    Ok(())
}
