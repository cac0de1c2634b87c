fn main() {
    // gRPC codegen only runs with --features grpc.
    if std::env::var("CARGO_FEATURE_GRPC").is_err() {
        return;
    }

    let method = |name: &str, route: &str, input: &str, output: &str| {
        tonic_build::manual::Method::builder()
            .name(name)
            .route_name(route)
            .input_type(format!("crate::ordering::grpc::{input}"))
            .output_type(format!("crate::ordering::grpc::{output}"))
            .codec_path("tonic::codec::ProstCodec")
            .build()
    };

    let service = tonic_build::manual::Service::builder()
        .name("OrderingService")
        .package("ordering")
        .method(method(
            "create_order",
            "CreateOrder",
            "CreateOrderRequest",
            "CreateOrderResponse",
        ))
        .method(method(
            "get_order",
            "GetOrder",
            "GetOrderRequest",
            "GetOrderResponse",
        ))
        .method(method(
            "cancel_order",
            "CancelOrder",
            "CancelOrderRequest",
            "CancelOrderResponse",
        ))
        .method(method(
            "ready_order",
            "ReadyOrder",
            "ReadyOrderRequest",
            "ReadyOrderResponse",
        ))
        .method(method(
            "complete_order",
            "CompleteOrder",
            "CompleteOrderRequest",
            "CompleteOrderResponse",
        ))
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
