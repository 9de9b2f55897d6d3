//! Configuration builder
//!
//! Projects the graph into an ordered set of virtual servers. Output
//! order is fully deterministic: servers ascend by hostname, path rules
//! ascend by path, and match rules within a path follow (route
//! namespace/name, rule index, match index).

use crate::events::NsName;
use crate::state::graph::{route_hostname_intersections, Graph};
use gateway_api::apis::standard::httproutes::{
    HTTPRoute, HTTPRouteRulesBackendRefs, HTTPRouteRulesMatches, HTTPRouteRulesMatchesPath,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The routing configuration for one reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub http_servers: Vec<VirtualServer>,
    pub ssl_servers: Vec<VirtualServer>,
}

#[derive(Debug, Clone)]
pub struct VirtualServer {
    pub hostname: String,
    pub path_rules: Vec<PathRule>,
    pub ssl: Option<Ssl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ssl {
    pub certificate_path: String,
}

#[derive(Debug, Clone)]
pub struct PathRule {
    pub path: String,
    pub match_rules: Vec<MatchRule>,
}

/// A (route, rule, match) triple. Indices point back into the source
/// route so the renderer can read match details without copying them.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub rule_idx: usize,
    pub match_idx: usize,
    pub source: Arc<HTTPRoute>,
}

impl MatchRule {
    /// The match this rule points at.
    pub fn http_match(&self) -> Option<&HTTPRouteRulesMatches> {
        self.source
            .spec
            .rules
            .as_ref()?
            .get(self.rule_idx)?
            .matches
            .as_ref()?
            .get(self.match_idx)
    }

    /// The backend refs of the rule this match belongs to.
    pub fn backend_refs(&self) -> Option<&Vec<HTTPRouteRulesBackendRefs>> {
        self.source
            .spec
            .rules
            .as_ref()?
            .get(self.rule_idx)?
            .backend_refs
            .as_ref()
    }

    /// Identity of the source route.
    pub fn source_nsname(&self) -> NsName {
        NsName::new(
            self.source.metadata.namespace.clone().unwrap_or_default(),
            self.source.metadata.name.clone().unwrap_or_default(),
        )
    }
}

/// The path a match applies to; absent or empty values fall back to `/`.
pub fn match_path(path: Option<&HTTPRouteRulesMatchesPath>) -> String {
    path.and_then(|p| p.value.as_deref())
        .filter(|v| !v.is_empty())
        .unwrap_or("/")
        .to_string()
}

/// Build the configuration from the graph. Without a valid class and a
/// chosen Gateway the configuration is empty.
pub fn build_configuration(graph: &Graph) -> Configuration {
    if !graph.gateway_class.as_ref().is_some_and(|gc| gc.valid) {
        return Configuration::default();
    }
    let Some(gateway) = &graph.gateway else {
        return Configuration::default();
    };

    // First pass: group attached routes by (protocol, hostname). A route
    // attached through two listeners contributes once per hostname.
    let mut http_groups: BTreeMap<String, BTreeSet<NsName>> = BTreeMap::new();
    let mut ssl_groups: BTreeMap<String, (BTreeSet<NsName>, Option<Ssl>)> = BTreeMap::new();

    for listener in gateway.listeners.values() {
        if !listener.valid {
            continue;
        }

        let is_ssl = listener.source.protocol == "HTTPS";
        for route_key in &listener.routes {
            let Some(route) = graph.routes.get(route_key) else {
                continue;
            };

            // The route serves exactly its hostname intersections with
            // this listener, the same set it fed into acceptedHostnames.
            let route_hostnames = route.source.spec.hostnames.clone().unwrap_or_default();
            let hostnames = route_hostname_intersections(
                &route_hostnames,
                listener.source.hostname.as_deref(),
            );

            for hostname in hostnames {
                if is_ssl {
                    let entry = ssl_groups.entry(hostname).or_default();
                    entry.0.insert(route_key.clone());
                    if entry.1.is_none() {
                        entry.1 = listener.secret_path().map(|path| Ssl {
                            certificate_path: path.to_string(),
                        });
                    }
                } else {
                    http_groups
                        .entry(hostname)
                        .or_default()
                        .insert(route_key.clone());
                }
            }
        }
    }

    // Second pass: expand every rule/match of each grouped route into
    // path buckets, routes in (namespace, name) order.
    let http_servers = http_groups
        .into_iter()
        .map(|(hostname, routes)| build_server(graph, hostname, &routes, None))
        .collect();

    let ssl_servers = ssl_groups
        .into_iter()
        .map(|(hostname, (routes, ssl))| build_server(graph, hostname, &routes, ssl))
        .collect();

    Configuration {
        http_servers,
        ssl_servers,
    }
}

fn build_server(
    graph: &Graph,
    hostname: String,
    routes: &BTreeSet<NsName>,
    ssl: Option<Ssl>,
) -> VirtualServer {
    let mut paths: BTreeMap<String, Vec<MatchRule>> = BTreeMap::new();

    for route_key in routes {
        let Some(route) = graph.routes.get(route_key) else {
            continue;
        };

        for (rule_idx, rule) in route.source.spec.rules.iter().flatten().enumerate() {
            for (match_idx, m) in rule.matches.iter().flatten().enumerate() {
                paths
                    .entry(match_path(m.path.as_ref()))
                    .or_default()
                    .push(MatchRule {
                        rule_idx,
                        match_idx,
                        source: route.source.clone(),
                    });
            }
        }
    }

    VirtualServer {
        hostname,
        path_rules: paths
            .into_iter()
            .map(|(path, match_rules)| PathRule { path, match_rules })
            .collect(),
        ssl,
    }
}
