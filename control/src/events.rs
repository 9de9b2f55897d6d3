//! Event model for the reconciliation pipeline
//!
//! Watchers translate cluster changes into [`Event`]s on a single ordered
//! channel. Each event carries either the full object (upsert) or the
//! identity of a removed object (delete). The event loop is the only
//! consumer.

use gateway_api::apis::standard::gatewayclasses::GatewayClass;
use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::standard::httproutes::HTTPRoute;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;

/// Key for namespaced resource lookup: (namespace, name)
///
/// Ordering is lexicographic on (namespace, name), which is also the
/// tie-break order for Gateway selection. Cluster-scoped resources use an
/// empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NsName {
    pub namespace: String,
    pub name: String,
}

impl NsName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a resource as observed from the cluster.
    pub fn of<K: ResourceExt>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for NsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// The resource kinds the control plane tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    GatewayClass,
    Gateway,
    HttpRoute,
    Secret,
    Service,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::GatewayClass => "GatewayClass",
            ResourceKind::Gateway => "Gateway",
            ResourceKind::HttpRoute => "HTTPRoute",
            ResourceKind::Secret => "Secret",
            ResourceKind::Service => "Service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked object, tagged by kind.
///
/// Builders switch on the tag; no further type dispatch happens after
/// ingestion.
#[derive(Debug, Clone)]
pub enum Resource {
    GatewayClass(Arc<GatewayClass>),
    Gateway(Arc<Gateway>),
    HttpRoute(Arc<HTTPRoute>),
    Secret(Arc<Secret>),
    Service(Arc<Service>),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::GatewayClass(_) => ResourceKind::GatewayClass,
            Resource::Gateway(_) => ResourceKind::Gateway,
            Resource::HttpRoute(_) => ResourceKind::HttpRoute,
            Resource::Secret(_) => ResourceKind::Secret,
            Resource::Service(_) => ResourceKind::Service,
        }
    }

    pub fn nsname(&self) -> NsName {
        match self {
            Resource::GatewayClass(o) => NsName::of(o.as_ref()),
            Resource::Gateway(o) => NsName::of(o.as_ref()),
            Resource::HttpRoute(o) => NsName::of(o.as_ref()),
            Resource::Secret(o) => NsName::of(o.as_ref()),
            Resource::Service(o) => NsName::of(o.as_ref()),
        }
    }
}

/// A resource change observed from the cluster.
///
/// A delete for a resource never overtakes a previously emitted upsert
/// for the same resource: each kind is fed by a single watcher task and
/// the channel is FIFO.
#[derive(Debug, Clone)]
pub enum Event {
    Upsert(Resource),
    Delete { kind: ResourceKind, nsname: NsName },
}

impl Event {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Event::Upsert(resource) => resource.kind(),
            Event::Delete { kind, .. } => *kind,
        }
    }

    pub fn nsname(&self) -> NsName {
        match self {
            Event::Upsert(resource) => resource.nsname(),
            Event::Delete { nsname, .. } => nsname.clone(),
        }
    }
}
