//! In-memory resource store
//!
//! Maps (kind, namespace, name) to the latest observed object. The store
//! is owned and mutated only by the event loop; builders read a snapshot
//! during one reconciliation. Ordered maps keep every derived artifact
//! deterministic.

use crate::events::{Event, NsName, Resource, ResourceKind};
use gateway_api::apis::standard::gatewayclasses::GatewayClass;
use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::standard::httproutes::HTTPRoute;
use k8s_openapi::api::core::v1::{Secret, Service};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Latest observed objects, one map per tracked kind.
#[derive(Debug, Default)]
pub struct ResourceStore {
    gateway_classes: BTreeMap<String, Arc<GatewayClass>>,
    gateways: BTreeMap<NsName, Arc<Gateway>>,
    http_routes: BTreeMap<NsName, Arc<HTTPRoute>>,
    secrets: BTreeMap<NsName, Arc<Secret>>,
    services: BTreeMap<NsName, Arc<Service>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event: upsert overwrites, delete removes.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Upsert(resource) => {
                let nsname = resource.nsname();
                debug!("Store upsert: {} {}", resource.kind(), nsname);
                match resource {
                    Resource::GatewayClass(obj) => {
                        self.gateway_classes.insert(nsname.name, obj);
                    }
                    Resource::Gateway(obj) => {
                        self.gateways.insert(nsname, obj);
                    }
                    Resource::HttpRoute(obj) => {
                        self.http_routes.insert(nsname, obj);
                    }
                    Resource::Secret(obj) => {
                        self.secrets.insert(nsname, obj);
                    }
                    Resource::Service(obj) => {
                        self.services.insert(nsname, obj);
                    }
                }
            }
            Event::Delete { kind, nsname } => {
                debug!("Store delete: {} {}", kind, nsname);
                match kind {
                    ResourceKind::GatewayClass => {
                        self.gateway_classes.remove(&nsname.name);
                    }
                    ResourceKind::Gateway => {
                        self.gateways.remove(&nsname);
                    }
                    ResourceKind::HttpRoute => {
                        self.http_routes.remove(&nsname);
                    }
                    ResourceKind::Secret => {
                        self.secrets.remove(&nsname);
                    }
                    ResourceKind::Service => {
                        self.services.remove(&nsname);
                    }
                }
            }
        }
    }

    pub fn gateway_class(&self, name: &str) -> Option<&Arc<GatewayClass>> {
        self.gateway_classes.get(name)
    }

    pub fn gateways(&self) -> &BTreeMap<NsName, Arc<Gateway>> {
        &self.gateways
    }

    pub fn http_routes(&self) -> &BTreeMap<NsName, Arc<HTTPRoute>> {
        &self.http_routes
    }

    pub fn secret(&self, nsname: &NsName) -> Option<&Arc<Secret>> {
        self.secrets.get(nsname)
    }

    pub fn service(&self, nsname: &NsName) -> Option<&Arc<Service>> {
        self.services.get(nsname)
    }
}
