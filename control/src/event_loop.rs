//! Event loop
//!
//! The single consumer of the event channel. Every event is applied to
//! the store and followed by one full reconciliation: graph, routing
//! configuration, status intents, artifact emission, status reporting.
//! All of it runs strictly serially; there is no batching or coalescing,
//! and a failed cycle is not retried. The next event rebuilds everything
//! from the store anyway.

use crate::apis::metrics::record_reconciliation;
use crate::config::ControllerConfig;
use crate::dataplane::artifact::{generate, Warnings};
use crate::dataplane::emitter::{ConfigEmitter, ReloadHandle};
use crate::events::{Event, NsName};
use crate::state::configuration::build_configuration;
use crate::state::graph::{build_graph, Graph};
use crate::state::statuses::build_statuses;
use crate::state::store::ResourceStore;
use crate::status::StatusUpdater;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct EventLoop<R> {
    events: UnboundedReceiver<Event>,
    store: ResourceStore,
    config: ControllerConfig,
    emitter: ConfigEmitter<R>,
    status_updater: StatusUpdater,
}

impl<R: ReloadHandle> EventLoop<R> {
    pub fn new(
        events: UnboundedReceiver<Event>,
        config: ControllerConfig,
        emitter: ConfigEmitter<R>,
        status_updater: StatusUpdater,
    ) -> Self {
        Self {
            events,
            store: ResourceStore::new(),
            config,
            emitter,
            status_updater,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Starting event loop");

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let kind = event.kind();
            let start = Instant::now();

            self.store.apply(event);
            let result = if self.reconcile(&cancel).await {
                "success"
            } else {
                "error"
            };

            record_reconciliation(kind.as_str(), start.elapsed().as_secs_f64(), result);
        }

        info!("Event loop stopped");
    }

    /// One reconciliation over the current store snapshot. Returns false
    /// when emission failed; status is reported either way.
    async fn reconcile(&self, cancel: &CancellationToken) -> bool {
        let graph = build_graph(&self.store, &self.config);
        let configuration = build_configuration(&graph);
        let statuses = build_statuses(&graph);

        let (artifact, warnings) = generate(&configuration, &self.store);
        log_warnings(&warnings);

        let secrets = referenced_secrets(&graph, &self.store);
        let emitted = match self.emitter.emit(&artifact, &secrets).await {
            Ok(()) => true,
            Err(err) => {
                warn!("Failed to emit configuration: {}", err);
                false
            }
        };

        self.status_updater.update(&statuses, cancel).await;

        emitted
    }
}

fn log_warnings(warnings: &Warnings) {
    for (route, messages) in warnings {
        for message in messages {
            warn!("Rendering warning for HTTPRoute {}: {}", route, message);
        }
    }
}

/// The secrets backing valid HTTPS listeners, deduplicated by identity.
fn referenced_secrets(graph: &Graph, store: &ResourceStore) -> Vec<(NsName, Arc<Secret>)> {
    let mut secrets: BTreeMap<NsName, Arc<Secret>> = BTreeMap::new();

    for listener in graph.gateway.iter().flat_map(|gw| gw.listeners.values()) {
        let Some(secret_use) = &listener.secret else {
            continue;
        };
        if let Some(secret) = store.secret(&secret_use.nsname) {
            secrets.insert(secret_use.nsname.clone(), secret.clone());
        }
    }

    secrets.into_iter().collect()
}
