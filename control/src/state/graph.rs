//! Resource graph builder
//!
//! One reconciliation builds the graph from scratch out of the store
//! snapshot: admit the managed GatewayClass, choose a single Gateway,
//! judge each of its listeners, and bind HTTPRoutes to listeners through
//! their section refs. Nothing survives between cycles.

use crate::config::ControllerConfig;
use crate::events::NsName;
use crate::state::store::ResourceStore;
use gateway_api::apis::standard::gatewayclasses::GatewayClass;
use gateway_api::apis::standard::gateways::{
    Gateway, GatewayListeners, GatewayListenersTlsMode,
};
use gateway_api::apis::standard::httproutes::{HTTPRoute, HTTPRouteParentRefs};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const GATEWAY_GROUP: &str = "gateway.networking.k8s.io";

/// Everything one reconciliation derived from the store.
#[derive(Debug, Default)]
pub struct Graph {
    /// The managed GatewayClass, if present in the store.
    pub gateway_class: Option<GatewayClassNode>,
    /// The single Gateway being programmed this cycle.
    pub gateway: Option<GatewayNode>,
    /// Gateways referencing the managed class that lost the tie-break.
    pub ignored_gateways: BTreeMap<NsName, Arc<Gateway>>,
    /// Every route with at least one parent ref to the chosen Gateway.
    pub routes: BTreeMap<NsName, RouteNode>,
}

#[derive(Debug, Clone)]
pub struct GatewayClassNode {
    pub source: Arc<GatewayClass>,
    pub valid: bool,
    pub error_msg: String,
}

#[derive(Debug)]
pub struct GatewayNode {
    pub source: Arc<Gateway>,
    pub nsname: NsName,
    pub listeners: BTreeMap<String, ListenerNode>,
}

#[derive(Debug)]
pub struct ListenerNode {
    pub source: GatewayListeners,
    pub valid: bool,
    /// The secret backing an HTTPS listener, with its on-disk path.
    pub secret: Option<SecretUse>,
    /// Routes attached through a valid section ref.
    pub routes: BTreeSet<NsName>,
    /// Union of the hostname intersections of every attached route.
    pub accepted_hostnames: BTreeSet<String>,
}

impl ListenerNode {
    pub fn secret_path(&self) -> Option<&str> {
        self.secret.as_ref().map(|s| s.path.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretUse {
    pub nsname: NsName,
    pub path: String,
}

#[derive(Debug)]
pub struct RouteNode {
    pub source: Arc<HTTPRoute>,
    pub valid_section_refs: BTreeSet<String>,
    pub invalid_section_refs: BTreeSet<String>,
}

/// Build the graph for one reconciliation.
pub fn build_graph(store: &ResourceStore, cfg: &ControllerConfig) -> Graph {
    let gateway_class = store.gateway_class(&cfg.gateway_class_name).map(|gc| {
        let valid = gc.spec.controller_name == cfg.controller_name;
        let error_msg = if valid {
            String::new()
        } else {
            format!("spec.controllerName must be {}", cfg.controller_name)
        };
        GatewayClassNode {
            source: gc.clone(),
            valid,
            error_msg,
        }
    });

    let mut graph = Graph {
        gateway_class,
        ..Graph::default()
    };

    // An absent or foreign-controller class means nothing is programmed.
    if !graph.gateway_class.as_ref().is_some_and(|gc| gc.valid) {
        return graph;
    }

    let mut managed = store
        .gateways()
        .iter()
        .filter(|(_, gw)| gw.spec.gateway_class_name == cfg.gateway_class_name);

    // The lexicographically first (namespace, name) wins; the store map is
    // already in that order.
    let Some((chosen_key, chosen_gw)) = managed.next() else {
        return graph;
    };

    graph.ignored_gateways = managed
        .map(|(key, gw)| (key.clone(), gw.clone()))
        .collect();

    let mut listeners: BTreeMap<String, ListenerNode> = chosen_gw
        .spec
        .listeners
        .iter()
        .map(|l| (l.name.clone(), build_listener(l, chosen_key, store, cfg)))
        .collect();

    for (route_key, route) in store.http_routes() {
        let parent_refs: Vec<&HTTPRouteParentRefs> = route
            .spec
            .parent_refs
            .iter()
            .flatten()
            .filter(|parent_ref| refs_gateway(parent_ref, &route_key.namespace, chosen_key))
            .collect();

        if parent_refs.is_empty() {
            continue;
        }

        let hostnames = route.spec.hostnames.clone().unwrap_or_default();
        let has_rules = route.spec.rules.as_ref().is_some_and(|r| !r.is_empty());

        let mut node = RouteNode {
            source: route.clone(),
            valid_section_refs: BTreeSet::new(),
            invalid_section_refs: BTreeSet::new(),
        };

        for parent_ref in parent_refs {
            match &parent_ref.section_name {
                Some(section) => {
                    // Duplicate refs to the same section collapse into one.
                    if node.valid_section_refs.contains(section)
                        || node.invalid_section_refs.contains(section)
                    {
                        continue;
                    }

                    let attached = listeners.get_mut(section).is_some_and(|listener| {
                        try_attach(listener, route_key, &hostnames, has_rules)
                    });

                    if attached {
                        node.valid_section_refs.insert(section.clone());
                    } else {
                        node.invalid_section_refs.insert(section.clone());
                    }
                }
                None => {
                    // A ref without a section name binds to every valid
                    // listener the hostnames intersect with.
                    for (name, listener) in listeners.iter_mut() {
                        if try_attach(listener, route_key, &hostnames, has_rules) {
                            node.valid_section_refs.insert(name.clone());
                        }
                    }
                }
            }
        }

        graph.routes.insert(route_key.clone(), node);
    }

    graph.gateway = Some(GatewayNode {
        source: chosen_gw.clone(),
        nsname: chosen_key.clone(),
        listeners,
    });

    graph
}

fn build_listener(
    listener: &GatewayListeners,
    gateway_key: &NsName,
    store: &ResourceStore,
    cfg: &ControllerConfig,
) -> ListenerNode {
    let (valid, secret) = match listener.protocol.as_str() {
        "HTTP" => (true, None),
        "HTTPS" => match resolve_listener_secret(listener, gateway_key, store, cfg) {
            Some(secret) => (true, Some(secret)),
            None => (false, None),
        },
        _ => (false, None),
    };

    ListenerNode {
        source: listener.clone(),
        valid,
        secret,
        routes: BTreeSet::new(),
        accepted_hostnames: BTreeSet::new(),
    }
}

/// An HTTPS listener is valid only with terminate-mode TLS and a Secret
/// reference resolvable in the store. The secret lands at
/// `<secrets-dir>/<secret-name>`.
fn resolve_listener_secret(
    listener: &GatewayListeners,
    gateway_key: &NsName,
    store: &ResourceStore,
    cfg: &ControllerConfig,
) -> Option<SecretUse> {
    let tls = listener.tls.as_ref()?;

    // The mode defaults to Terminate; passthrough is unsupported.
    if let Some(mode) = &tls.mode {
        if !matches!(mode, GatewayListenersTlsMode::Terminate) {
            return None;
        }
    }

    let cert_ref = tls.certificate_refs.as_ref()?.first()?;
    if let Some(kind) = &cert_ref.kind {
        if kind != "Secret" {
            return None;
        }
    }

    let namespace = cert_ref
        .namespace
        .clone()
        .unwrap_or_else(|| gateway_key.namespace.clone());
    let nsname = NsName::new(namespace, cert_ref.name.clone());

    store.secret(&nsname)?;

    let path = cfg
        .secrets_dir
        .join(&cert_ref.name)
        .to_string_lossy()
        .into_owned();

    Some(SecretUse { nsname, path })
}

fn try_attach(
    listener: &mut ListenerNode,
    route_key: &NsName,
    route_hostnames: &[String],
    has_rules: bool,
) -> bool {
    if !listener.valid || !has_rules {
        return false;
    }

    let accepted =
        route_hostname_intersections(route_hostnames, listener.source.hostname.as_deref());
    if accepted.is_empty() {
        return false;
    }

    listener.routes.insert(route_key.clone());
    listener.accepted_hostnames.extend(accepted);
    true
}

/// Does this parent ref point at the chosen Gateway? The group and kind
/// default to the Gateway API Gateway; the namespace defaults to the
/// route's own.
fn refs_gateway(parent_ref: &HTTPRouteParentRefs, route_namespace: &str, gateway: &NsName) -> bool {
    if let Some(kind) = &parent_ref.kind {
        if kind != "Gateway" {
            return false;
        }
    }
    if let Some(group) = &parent_ref.group {
        if !group.is_empty() && group != GATEWAY_GROUP {
            return false;
        }
    }

    let namespace = parent_ref.namespace.as_deref().unwrap_or(route_namespace);
    namespace == gateway.namespace && parent_ref.name == gateway.name
}

/// Intersections of every route hostname with the listener hostname.
/// No hostnames on either side means unrestricted, written `*`. These
/// are the hostnames the route contributes to the listener's accepted
/// set, and to any virtual server built for the pair.
pub fn route_hostname_intersections(
    route_hostnames: &[String],
    listener_hostname: Option<&str>,
) -> BTreeSet<String> {
    let listener = match listener_hostname {
        Some(h) if !h.is_empty() => h,
        _ => "*",
    };

    if route_hostnames.is_empty() {
        return hostname_intersection(listener, "*").into_iter().collect();
    }

    route_hostnames
        .iter()
        .filter_map(|h| hostname_intersection(listener, h))
        .collect()
}

/// Intersection of two hostname patterns. `*` is unrestricted;
/// `*.suffix` covers exactly one extra label. Returns the pattern
/// describing the overlap, or None when the overlap is empty.
pub fn hostname_intersection(a: &str, b: &str) -> Option<String> {
    if a == "*" || a.is_empty() {
        return Some(b.to_string());
    }
    if b == "*" || b.is_empty() {
        return Some(a.to_string());
    }
    if a == b {
        return Some(a.to_string());
    }

    match (a.strip_prefix("*."), b.strip_prefix("*.")) {
        // Distinct wildcards never overlap: each fixes the label count of
        // its suffix, so equal sets require equal patterns.
        (Some(_), Some(_)) => None,
        (Some(suffix), None) if wildcard_covers(suffix, b) => Some(b.to_string()),
        (None, Some(suffix)) if wildcard_covers(suffix, a) => Some(a.to_string()),
        _ => None,
    }
}

/// Does `*.suffix` cover `host`? Exactly one non-empty label may precede
/// the suffix.
fn wildcard_covers(suffix: &str, host: &str) -> bool {
    host.strip_suffix(suffix)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .map(|label| !label.is_empty() && !label.contains('.'))
        .unwrap_or(false)
}
