//! Status collector
//!
//! Maps graph decisions to per-resource status intents. The collector
//! never touches the cluster; the status reporter applies the intents.

use crate::events::NsName;
use crate::state::graph::Graph;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Status intents for one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statuses {
    pub gateway_class: Option<GatewayClassStatus>,
    pub gateway: Option<GatewayStatus>,
    pub ignored_gateways: BTreeMap<NsName, IgnoredGatewayStatus>,
    pub http_routes: BTreeMap<NsName, HttpRouteStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayClassStatus {
    pub valid: bool,
    pub error_msg: String,
    pub observed_generation: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayStatus {
    pub nsname: NsName,
    pub observed_generation: i64,
    pub listeners: BTreeMap<String, ListenerStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerStatus {
    pub valid: bool,
    pub attached_routes: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredGatewayStatus {
    pub observed_generation: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRouteStatus {
    pub observed_generation: i64,
    /// Section name to attachment outcome, one entry per section ref.
    pub parents: BTreeMap<String, ParentStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentStatus {
    pub attached: bool,
}

/// Collect status intents from the graph.
pub fn build_statuses(graph: &Graph) -> Statuses {
    let mut statuses = Statuses::default();

    if let Some(gc) = &graph.gateway_class {
        statuses.gateway_class = Some(GatewayClassStatus {
            valid: gc.valid,
            error_msg: gc.error_msg.clone(),
            observed_generation: generation(&gc.source.metadata),
        });
    }

    if let Some(gateway) = &graph.gateway {
        let listeners = gateway
            .listeners
            .iter()
            .map(|(name, listener)| {
                (
                    name.clone(),
                    ListenerStatus {
                        valid: listener.valid,
                        attached_routes: listener.routes.len() as i32,
                    },
                )
            })
            .collect();

        statuses.gateway = Some(GatewayStatus {
            nsname: gateway.nsname.clone(),
            observed_generation: generation(&gateway.source.metadata),
            listeners,
        });
    }

    for (nsname, gateway) in &graph.ignored_gateways {
        statuses.ignored_gateways.insert(
            nsname.clone(),
            IgnoredGatewayStatus {
                observed_generation: generation(&gateway.metadata),
            },
        );
    }

    for (nsname, route) in &graph.routes {
        let mut parents = BTreeMap::new();
        for section in &route.valid_section_refs {
            parents.insert(section.clone(), ParentStatus { attached: true });
        }
        for section in &route.invalid_section_refs {
            parents.insert(section.clone(), ParentStatus { attached: false });
        }

        statuses.http_routes.insert(
            nsname.clone(),
            HttpRouteStatus {
                observed_generation: generation(&route.source.metadata),
                parents,
            },
        );
    }

    statuses
}

fn generation(meta: &ObjectMeta) -> i64 {
    meta.generation.unwrap_or_default()
}
