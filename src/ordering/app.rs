//! Wiring of the ordering service: handler tables, transports, processor.

use std::sync::Arc;

use tracing::info;

use crate::bus::{Broker, PublishError};
use crate::config::ServiceConfig;
use crate::microsvc::{
    listen_commands, subscribe_events, Service, TransportHandle, TransportStats,
};
use crate::outbox::{OutboxProcessorThread, ProcessorStats};
use crate::store::{Database, OutboxSource};

use super::commands::{
    approve_order, cancel_order, complete_order, create_order, get_order, ready_order,
    reject_order, CANCEL_ORDER, COMPLETE_ORDER, CREATE_ORDER, GET_ORDER, READY_ORDER,
};
use super::contracts::{
    APPROVE_ORDER_COMMAND, BASKET_AGGREGATE_CHANNEL, BASKET_CHECKED_OUT_EVENT, COMMAND_CHANNEL,
    REJECT_ORDER_COMMAND, SHOPPING_LIST_AGGREGATE_CHANNEL, SHOPPING_LIST_COMPLETED_EVENT,
};
use super::integration::{on_basket_checked_out, on_shopping_list_completed};
use super::translate::domain_events;

/// Build the ordering service over `db`.
pub fn ordering_service<D: Database>(db: D, config: &ServiceConfig) -> Service<D> {
    Service::new(db, domain_events())
        .named(config.service_name.clone())
        .with_snapshot_frequency(config.snapshot_frequency)
        .command(CREATE_ORDER, create_order)
        .command(GET_ORDER, get_order)
        .command(CANCEL_ORDER, cancel_order)
        .command(READY_ORDER, ready_order)
        .command(COMPLETE_ORDER, complete_order)
        .command(REJECT_ORDER_COMMAND, reject_order)
        .command(APPROVE_ORDER_COMMAND, approve_order)
        .on_event(
            BASKET_AGGREGATE_CHANNEL,
            BASKET_CHECKED_OUT_EVENT,
            on_basket_checked_out,
        )
        .on_event(
            SHOPPING_LIST_AGGREGATE_CHANNEL,
            SHOPPING_LIST_COMPLETED_EVENT,
            on_shopping_list_completed,
        )
}

/// Stats collected from a stopped [`OrderingRuntime`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuntimeStats {
    pub commands: TransportStats,
    pub baskets: TransportStats,
    pub depot: TransportStats,
    pub processor: ProcessorStats,
}

/// The background side of the service: three bus transports and the outbox
/// processor, all on their own threads.
pub struct OrderingRuntime {
    commands: TransportHandle,
    baskets: TransportHandle,
    depot: TransportHandle,
    processor: OutboxProcessorThread,
}

impl OrderingRuntime {
    pub fn start<D, B>(
        service: Arc<Service<D>>,
        broker: B,
        config: &ServiceConfig,
    ) -> Result<Self, PublishError>
    where
        D: Database + OutboxSource + Clone,
        B: Broker + Clone + 'static,
    {
        let poll = config.transport_poll_interval();

        let commands = listen_commands(
            Arc::clone(&service),
            &config.command_group,
            broker.subscribe(COMMAND_CHANNEL, &config.command_group)?,
            poll,
        );
        let baskets = subscribe_events(
            Arc::clone(&service),
            BASKET_AGGREGATE_CHANNEL,
            &config.baskets_group,
            broker.subscribe(BASKET_AGGREGATE_CHANNEL, &config.baskets_group)?,
            poll,
        );
        let depot = subscribe_events(
            Arc::clone(&service),
            SHOPPING_LIST_AGGREGATE_CHANNEL,
            &config.depot_group,
            broker.subscribe(SHOPPING_LIST_AGGREGATE_CHANNEL, &config.depot_group)?,
            poll,
        );
        let processor = OutboxProcessorThread::spawn(
            service.database().clone(),
            broker,
            config.processor.clone(),
        );

        info!(service = service.name(), "ordering runtime started");
        Ok(Self {
            commands,
            baskets,
            depot,
            processor,
        })
    }

    /// Stop every thread and wait for them.
    pub fn stop(self) -> RuntimeStats {
        let Self {
            commands,
            baskets,
            depot,
            processor,
        } = self;

        commands.signal_stop();
        baskets.signal_stop();
        depot.signal_stop();
        processor.signal_stop();

        let stats = RuntimeStats {
            commands: commands.stop(),
            baskets: baskets.stop(),
            depot: depot.stop(),
            processor: processor.stop(),
        };
        info!(?stats, "ordering runtime stopped");
        stats
    }
}
