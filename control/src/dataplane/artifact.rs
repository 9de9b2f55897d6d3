//! Configuration artifact rendering
//!
//! Expands each virtual server's path rules into locations:
//!
//! - one *internal match location* per expanded match, at
//!   `<path>_route<N>`, proxying to the rule's backend;
//! - one *dispatch location* at the path itself, carrying the serialized
//!   descriptor list the sidecar dispatcher evaluates;
//! - a *direct location* instead, when a path has exactly one match and
//!   that match is path-only.
//!
//! Backend resolution failures downgrade to a placeholder address that
//! answers 502, and are reported as per-route warnings.

use crate::events::NsName;
use crate::state::configuration::{Configuration, MatchRule, PathRule, VirtualServer};
use crate::state::services::ServiceResolver;
use common::HttpMatch;
use gateway_api::apis::standard::httproutes::{
    HTTPRouteRulesMatches, HTTPRouteRulesMatchesHeadersType, HTTPRouteRulesMatchesMethod,
    HTTPRouteRulesMatchesQueryParamsType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

/// Address every unresolvable backend proxies to. The data plane serves
/// an immediate 502 on this socket.
pub const BACKEND_502_ADDR: &str = "unix:/var/run/silta/502-server.sock";

/// The rendered artifact handed to the data plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPlaneConfig {
    #[serde(default)]
    pub http_servers: Vec<Server>,
    #[serde(default)]
    pub ssl_servers: Vec<Server>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub server_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<Ssl>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ssl {
    pub certificate: String,
    pub certificate_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub path: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub internal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_match_var: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !b
}

/// Per-route rendering warnings, keyed by the route's identity.
pub type Warnings = BTreeMap<NsName, Vec<String>>;

/// Render the configuration into the data-plane artifact.
pub fn generate(
    configuration: &Configuration,
    resolver: &dyn ServiceResolver,
) -> (DataPlaneConfig, Warnings) {
    let mut warnings = Warnings::new();

    let http_servers = configuration
        .http_servers
        .iter()
        .map(|server| generate_server(server, resolver, &mut warnings))
        .collect();
    let ssl_servers = configuration
        .ssl_servers
        .iter()
        .map(|server| generate_server(server, resolver, &mut warnings))
        .collect();

    (
        DataPlaneConfig {
            http_servers,
            ssl_servers,
        },
        warnings,
    )
}

fn generate_server(
    server: &VirtualServer,
    resolver: &dyn ServiceResolver,
    warnings: &mut Warnings,
) -> Server {
    let mut locations = Vec::new();

    for path_rule in &server.path_rules {
        generate_locations(path_rule, resolver, warnings, &mut locations);
    }

    Server {
        server_name: server.hostname.clone(),
        ssl: server.ssl.as_ref().map(|ssl| Ssl {
            certificate: ssl.certificate_path.clone(),
            certificate_key: ssl.certificate_path.clone(),
        }),
        locations,
    }
}

fn generate_locations(
    path_rule: &PathRule,
    resolver: &dyn ServiceResolver,
    warnings: &mut Warnings,
    locations: &mut Vec<Location>,
) {
    if let [only] = path_rule.match_rules.as_slice() {
        if only.http_match().is_some_and(is_path_only_match) {
            locations.push(Location {
                path: path_rule.path.clone(),
                proxy_pass: Some(proxy_pass(only, resolver, warnings)),
                ..Location::default()
            });
            return;
        }
    }

    let mut matches = Vec::with_capacity(path_rule.match_rules.len());

    for (idx, match_rule) in path_rule.match_rules.iter().enumerate() {
        let Some(m) = match_rule.http_match() else {
            // A match rule always indexes into its own source route; a
            // miss here is a builder bug, not a user error.
            error!(
                "Match rule ({}, {}, {}) does not resolve into its route",
                match_rule.source_nsname(),
                match_rule.rule_idx,
                match_rule.match_idx
            );
            continue;
        };

        let redirect_path = path_for_match(&path_rule.path, idx);
        locations.push(Location {
            path: redirect_path.clone(),
            internal: true,
            proxy_pass: Some(proxy_pass(match_rule, resolver, warnings)),
            ..Location::default()
        });
        matches.push(create_http_match(m, &redirect_path));
    }

    let http_match_var = match serde_json::to_string(&matches) {
        Ok(json) => json,
        Err(err) => {
            error!("Failed to serialize match descriptors: {err}");
            return;
        }
    };

    locations.push(Location {
        path: path_rule.path.clone(),
        http_match_var: Some(http_match_var),
        ..Location::default()
    });
}

/// Internal location name for the match at `idx` within a path.
pub fn path_for_match(path: &str, idx: usize) -> String {
    format!("{path}_route{idx}")
}

/// A match with nothing but a path.
fn is_path_only_match(m: &HTTPRouteRulesMatches) -> bool {
    m.method.is_none()
        && m.headers.as_ref().map_or(true, |h| h.is_empty())
        && m.query_params.as_ref().map_or(true, |q| q.is_empty())
}

fn proxy_pass(
    match_rule: &MatchRule,
    resolver: &dyn ServiceResolver,
    warnings: &mut Warnings,
) -> String {
    match backend_address(match_rule, resolver) {
        Ok(address) => format!("http://{address}"),
        Err(message) => {
            warnings
                .entry(match_rule.source_nsname())
                .or_default()
                .push(message);
            format!("http://{BACKEND_502_ADDR}")
        }
    }
}

/// Address of the first backend ref of the rule the match belongs to.
/// The ref kind defaults to Service; its namespace defaults to the
/// route's own; the port is required.
fn backend_address(
    match_rule: &MatchRule,
    resolver: &dyn ServiceResolver,
) -> Result<String, String> {
    let refs = match_rule
        .backend_refs()
        .filter(|refs| !refs.is_empty())
        .ok_or_else(|| "empty backend refs".to_string())?;

    let backend = &refs[0];

    if let Some(kind) = &backend.kind {
        if kind != "Service" {
            return Err(format!("unsupported backend kind {kind}"));
        }
    }

    let route = match_rule.source_nsname();
    let namespace = backend.namespace.clone().unwrap_or(route.namespace);
    let address = resolver
        .resolve(&NsName::new(namespace, backend.name.clone()))
        .map_err(|err| err.to_string())?;

    let port = backend
        .port
        .ok_or_else(|| format!("backend {} has no port", backend.name))?;

    Ok(format!("{address}:{port}"))
}

/// Build the descriptor for one match. Regex-typed header and query
/// matches are dropped; duplicate header names (case-insensitive) keep
/// their first occurrence. A match that ends up with no conditions
/// becomes an unconditional `any` descriptor.
fn create_http_match(m: &HTTPRouteRulesMatches, redirect_path: &str) -> HttpMatch {
    let mut result = HttpMatch {
        redirect_path: redirect_path.to_string(),
        ..HttpMatch::default()
    };

    if let Some(method) = &m.method {
        result.method = Some(method_name(method).to_string());
    }

    let mut seen_names: Vec<String> = Vec::new();
    for header in m.headers.iter().flatten() {
        if matches!(
            header.r#type,
            Some(HTTPRouteRulesMatchesHeadersType::RegularExpression)
        ) {
            continue;
        }
        let lower = header.name.to_ascii_lowercase();
        if seen_names.contains(&lower) {
            continue;
        }
        seen_names.push(lower);
        result.headers.push(format!("{}:{}", header.name, header.value));
    }

    for param in m.query_params.iter().flatten() {
        if matches!(
            param.r#type,
            Some(HTTPRouteRulesMatchesQueryParamsType::RegularExpression)
        ) {
            continue;
        }
        result
            .query_params
            .push(format!("{}={}", param.name, param.value));
    }

    if result.method.is_none() && result.headers.is_empty() && result.query_params.is_empty() {
        result.any = true;
    }

    result
}

fn method_name(method: &HTTPRouteRulesMatchesMethod) -> &'static str {
    match method {
        HTTPRouteRulesMatchesMethod::Get => "GET",
        HTTPRouteRulesMatchesMethod::Head => "HEAD",
        HTTPRouteRulesMatchesMethod::Post => "POST",
        HTTPRouteRulesMatchesMethod::Put => "PUT",
        HTTPRouteRulesMatchesMethod::Delete => "DELETE",
        HTTPRouteRulesMatchesMethod::Connect => "CONNECT",
        HTTPRouteRulesMatchesMethod::Options => "OPTIONS",
        HTTPRouteRulesMatchesMethod::Trace => "TRACE",
        HTTPRouteRulesMatchesMethod::Patch => "PATCH",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::configuration::Ssl as ConfigSsl;
    use crate::state::services::ResolveError;
    use gateway_api::apis::standard::httproutes::{
        HTTPRoute, HTTPRouteRules, HTTPRouteRulesBackendRefs, HTTPRouteRulesMatchesHeaders,
        HTTPRouteRulesMatchesPath, HTTPRouteRulesMatchesQueryParams, HTTPRouteSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::cell::RefCell;
    use std::sync::Arc;

    struct FakeResolver {
        address: Option<&'static str>,
        calls: RefCell<Vec<NsName>>,
    }

    impl FakeResolver {
        fn returning(address: &'static str) -> Self {
            Self {
                address: Some(address),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                address: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ServiceResolver for FakeResolver {
        fn resolve(&self, nsname: &NsName) -> Result<String, ResolveError> {
            self.calls.borrow_mut().push(nsname.clone());
            self.address
                .map(str::to_string)
                .ok_or_else(|| ResolveError::NotFound(nsname.clone()))
        }
    }

    fn backend_ref(name: &str, port: Option<i32>) -> HTTPRouteRulesBackendRefs {
        HTTPRouteRulesBackendRefs {
            kind: Some("Service".to_string()),
            name: name.to_string(),
            namespace: Some("test".to_string()),
            port,
            ..Default::default()
        }
    }

    fn path_match(value: &str) -> HTTPRouteRulesMatches {
        HTTPRouteRulesMatches {
            path: Some(HTTPRouteRulesMatchesPath {
                value: Some(value.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn route_with_rules(rules: Vec<HTTPRouteRules>) -> Arc<HTTPRoute> {
        Arc::new(HTTPRoute {
            metadata: ObjectMeta {
                name: Some("route1".to_string()),
                namespace: Some("test".to_string()),
                ..Default::default()
            },
            spec: HTTPRouteSpec {
                hostnames: Some(vec!["cafe.example.com".to_string()]),
                rules: Some(rules),
                ..Default::default()
            },
            status: None,
        })
    }

    fn match_rule(source: &Arc<HTTPRoute>, rule_idx: usize, match_idx: usize) -> MatchRule {
        MatchRule {
            rule_idx,
            match_idx,
            source: source.clone(),
        }
    }

    /// The kitchen-sink server: a shared path with method matches and a
    /// trailing path-only match, a header/query match without backends,
    /// and a direct path-only location.
    #[test]
    fn test_generate_server_locations() {
        let mut slash_post = path_match("/");
        slash_post.method = Some(HTTPRouteRulesMatchesMethod::Post);
        let mut slash_patch = path_match("/");
        slash_patch.method = Some(HTTPRouteRulesMatchesMethod::Patch);

        let mut test_match = path_match("/test");
        test_match.method = Some(HTTPRouteRulesMatchesMethod::Get);
        test_match.headers = Some(vec![HTTPRouteRulesMatchesHeaders {
            name: "Version".to_string(),
            value: "V1".to_string(),
            ..Default::default()
        }]);
        test_match.query_params = Some(vec![HTTPRouteRulesMatchesQueryParams {
            name: "GrEat".to_string(),
            value: "EXAMPLE".to_string(),
            ..Default::default()
        }]);

        let hr = route_with_rules(vec![
            HTTPRouteRules {
                matches: Some(vec![slash_post, slash_patch, path_match("/")]),
                backend_refs: Some(vec![backend_ref("service1", Some(80))]),
                ..Default::default()
            },
            HTTPRouteRules {
                matches: Some(vec![test_match]),
                backend_refs: None,
                ..Default::default()
            },
            HTTPRouteRules {
                matches: Some(vec![path_match("/path-only")]),
                backend_refs: Some(vec![backend_ref("service2", Some(80))]),
                ..Default::default()
            },
        ]);

        let server = VirtualServer {
            hostname: "example.com".to_string(),
            path_rules: vec![
                PathRule {
                    path: "/".to_string(),
                    match_rules: vec![
                        match_rule(&hr, 0, 0),
                        match_rule(&hr, 0, 1),
                        match_rule(&hr, 0, 2),
                    ],
                },
                PathRule {
                    path: "/path-only".to_string(),
                    match_rules: vec![match_rule(&hr, 2, 0)],
                },
                PathRule {
                    path: "/test".to_string(),
                    match_rules: vec![match_rule(&hr, 1, 0)],
                },
            ],
            ssl: None,
        };

        let resolver = FakeResolver::returning("10.0.0.1");
        let mut warnings = Warnings::new();
        let result = generate_server(&server, &resolver, &mut warnings);

        let slash_matches = serde_json::to_string(&vec![
            HttpMatch {
                method: Some("POST".to_string()),
                redirect_path: "/_route0".to_string(),
                ..HttpMatch::default()
            },
            HttpMatch {
                method: Some("PATCH".to_string()),
                redirect_path: "/_route1".to_string(),
                ..HttpMatch::default()
            },
            HttpMatch::any("/_route2"),
        ])
        .unwrap();

        let test_matches = serde_json::to_string(&vec![HttpMatch {
            method: Some("GET".to_string()),
            headers: vec!["Version:V1".to_string()],
            query_params: vec!["GrEat=EXAMPLE".to_string()],
            redirect_path: "/test_route0".to_string(),
            ..HttpMatch::default()
        }])
        .unwrap();

        let backend = "http://10.0.0.1:80".to_string();
        let placeholder = format!("http://{BACKEND_502_ADDR}");

        let expected = Server {
            server_name: "example.com".to_string(),
            ssl: None,
            locations: vec![
                Location {
                    path: "/_route0".to_string(),
                    internal: true,
                    proxy_pass: Some(backend.clone()),
                    ..Location::default()
                },
                Location {
                    path: "/_route1".to_string(),
                    internal: true,
                    proxy_pass: Some(backend.clone()),
                    ..Location::default()
                },
                Location {
                    path: "/_route2".to_string(),
                    internal: true,
                    proxy_pass: Some(backend.clone()),
                    ..Location::default()
                },
                Location {
                    path: "/".to_string(),
                    http_match_var: Some(slash_matches),
                    ..Location::default()
                },
                Location {
                    path: "/path-only".to_string(),
                    proxy_pass: Some(backend.clone()),
                    ..Location::default()
                },
                Location {
                    path: "/test_route0".to_string(),
                    internal: true,
                    proxy_pass: Some(placeholder),
                    ..Location::default()
                },
                Location {
                    path: "/test".to_string(),
                    http_match_var: Some(test_matches),
                    ..Location::default()
                },
            ],
        };

        assert_eq!(result, expected);
        assert_eq!(
            warnings[&NsName::new("test", "route1")],
            vec!["empty backend refs".to_string()]
        );
    }

    #[test]
    fn test_ssl_server_carries_certificate_paths() {
        let hr = route_with_rules(vec![HTTPRouteRules {
            matches: Some(vec![path_match("/")]),
            backend_refs: Some(vec![backend_ref("service1", Some(80))]),
            ..Default::default()
        }]);
        let server = VirtualServer {
            hostname: "example.com".to_string(),
            path_rules: vec![PathRule {
                path: "/".to_string(),
                match_rules: vec![match_rule(&hr, 0, 0)],
            }],
            ssl: Some(ConfigSsl {
                certificate_path: "/etc/silta/secrets/cert".to_string(),
            }),
        };

        let resolver = FakeResolver::returning("10.0.0.1");
        let mut warnings = Warnings::new();
        let result = generate_server(&server, &resolver, &mut warnings);

        assert_eq!(
            result.ssl,
            Some(Ssl {
                certificate: "/etc/silta/secrets/cert".to_string(),
                certificate_key: "/etc/silta/secrets/cert".to_string(),
            })
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_backend_address_normal_case() {
        let hr = route_with_rules(vec![HTTPRouteRules {
            matches: Some(vec![path_match("/")]),
            backend_refs: Some(vec![backend_ref("service1", Some(80))]),
            ..Default::default()
        }]);
        let resolver = FakeResolver::returning("10.0.0.1");

        let address = backend_address(&match_rule(&hr, 0, 0), &resolver).unwrap();
        assert_eq!(address, "10.0.0.1:80");
        assert_eq!(
            resolver.calls.borrow().as_slice(),
            &[NsName::new("test", "service1")]
        );
    }

    #[test]
    fn test_backend_address_defaults_namespace_and_kind() {
        let mut backend = backend_ref("service1", Some(80));
        backend.namespace = None;
        backend.kind = None;
        let hr = route_with_rules(vec![HTTPRouteRules {
            matches: Some(vec![path_match("/")]),
            backend_refs: Some(vec![backend]),
            ..Default::default()
        }]);
        let resolver = FakeResolver::returning("10.0.0.1");

        let address = backend_address(&match_rule(&hr, 0, 0), &resolver).unwrap();
        assert_eq!(address, "10.0.0.1:80");
        // Namespace fell back to the route's.
        assert_eq!(
            resolver.calls.borrow().as_slice(),
            &[NsName::new("test", "service1")]
        );
    }

    #[test]
    fn test_backend_address_uses_first_ref_only() {
        let hr = route_with_rules(vec![HTTPRouteRules {
            matches: Some(vec![path_match("/")]),
            backend_refs: Some(vec![
                backend_ref("service1", Some(80)),
                backend_ref("service2", Some(80)),
            ]),
            ..Default::default()
        }]);
        let resolver = FakeResolver::returning("10.0.0.1");

        backend_address(&match_rule(&hr, 0, 0), &resolver).unwrap();
        assert_eq!(resolver.calls.borrow().len(), 1);
        assert_eq!(resolver.calls.borrow()[0], NsName::new("test", "service1"));
    }

    #[test]
    fn test_backend_address_rejects_non_service_kind_without_resolving() {
        let mut backend = backend_ref("service1", Some(80));
        backend.kind = Some("NotService".to_string());
        let hr = route_with_rules(vec![HTTPRouteRules {
            matches: Some(vec![path_match("/")]),
            backend_refs: Some(vec![backend]),
            ..Default::default()
        }]);
        let resolver = FakeResolver::returning("10.0.0.1");

        let result = backend_address(&match_rule(&hr, 0, 0), &resolver);
        assert!(result.is_err());
        assert!(resolver.calls.borrow().is_empty());
    }

    #[test]
    fn test_backend_address_requires_port_after_resolving() {
        let hr = route_with_rules(vec![HTTPRouteRules {
            matches: Some(vec![path_match("/")]),
            backend_refs: Some(vec![backend_ref("service1", None)]),
            ..Default::default()
        }]);
        let resolver = FakeResolver::returning("10.0.0.1");

        let result = backend_address(&match_rule(&hr, 0, 0), &resolver);
        assert!(result.is_err());
        assert_eq!(resolver.calls.borrow().len(), 1);
    }

    #[test]
    fn test_resolver_failure_renders_502_placeholder() {
        let hr = route_with_rules(vec![HTTPRouteRules {
            matches: Some(vec![path_match("/")]),
            backend_refs: Some(vec![backend_ref("service1", Some(80))]),
            ..Default::default()
        }]);
        let server = VirtualServer {
            hostname: "example.com".to_string(),
            path_rules: vec![PathRule {
                path: "/".to_string(),
                match_rules: vec![match_rule(&hr, 0, 0)],
            }],
            ssl: None,
        };

        let resolver = FakeResolver::failing();
        let mut warnings = Warnings::new();
        let result = generate_server(&server, &resolver, &mut warnings);

        assert_eq!(
            result.locations[0].proxy_pass,
            Some(format!("http://{BACKEND_502_ADDR}"))
        );
        assert_eq!(warnings[&NsName::new("test", "route1")].len(), 1);
    }

    #[test]
    fn test_create_http_match_path_only_becomes_any() {
        let m = path_match("/");
        let result = create_http_match(&m, "/internal_loc");

        assert_eq!(result, HttpMatch::any("/internal_loc"));
    }

    #[test]
    fn test_create_http_match_method_is_not_any() {
        let mut m = path_match("/");
        m.method = Some(HTTPRouteRulesMatchesMethod::Put);
        let result = create_http_match(&m, "/internal_loc");

        assert!(!result.any);
        assert_eq!(result.method.as_deref(), Some("PUT"));
    }

    #[test]
    fn test_create_http_match_drops_regex_headers_and_params() {
        let mut m = path_match("/");
        m.headers = Some(vec![
            HTTPRouteRulesMatchesHeaders {
                name: "header-1".to_string(),
                value: "val-1".to_string(),
                ..Default::default()
            },
            HTTPRouteRulesMatchesHeaders {
                name: "ignore-this-header".to_string(),
                value: "val".to_string(),
                r#type: Some(HTTPRouteRulesMatchesHeadersType::RegularExpression),
            },
            HTTPRouteRulesMatchesHeaders {
                name: "header-2".to_string(),
                value: "val-2".to_string(),
                r#type: Some(HTTPRouteRulesMatchesHeadersType::Exact),
            },
        ]);
        m.query_params = Some(vec![
            HTTPRouteRulesMatchesQueryParams {
                name: "arg1".to_string(),
                value: "val1".to_string(),
                ..Default::default()
            },
            HTTPRouteRulesMatchesQueryParams {
                name: "ignore-this-arg".to_string(),
                value: "val".to_string(),
                r#type: Some(HTTPRouteRulesMatchesQueryParamsType::RegularExpression),
            },
            HTTPRouteRulesMatchesQueryParams {
                name: "arg2".to_string(),
                value: "val2=another-val".to_string(),
                ..Default::default()
            },
        ]);

        let result = create_http_match(&m, "/internal_loc");
        assert_eq!(result.headers, vec!["header-1:val-1", "header-2:val-2"]);
        assert_eq!(
            result.query_params,
            vec!["arg1=val1", "arg2=val2=another-val"]
        );
    }

    #[test]
    fn test_create_http_match_drops_duplicate_header_names() {
        let mut m = path_match("/");
        m.headers = Some(vec![
            HTTPRouteRulesMatchesHeaders {
                name: "header-2".to_string(),
                value: "val-2".to_string(),
                ..Default::default()
            },
            // Header names are case-insensitive; the first wins.
            HTTPRouteRulesMatchesHeaders {
                name: "HEADER-2".to_string(),
                value: "other".to_string(),
                ..Default::default()
            },
        ]);

        let result = create_http_match(&m, "/internal_loc");
        assert_eq!(result.headers, vec!["header-2:val-2"]);
    }

    #[test]
    fn test_dispatch_descriptor_json_shape() {
        // Two rules sharing /test: GET with headers, then bare POST.
        let mut first = path_match("/test");
        first.method = Some(HTTPRouteRulesMatchesMethod::Get);
        first.headers = Some(vec![
            HTTPRouteRulesMatchesHeaders {
                name: "Version".to_string(),
                value: "V1".to_string(),
                ..Default::default()
            },
            HTTPRouteRulesMatchesHeaders {
                name: "X".to_string(),
                value: "y".to_string(),
                ..Default::default()
            },
        ]);
        let mut second = path_match("/test");
        second.method = Some(HTTPRouteRulesMatchesMethod::Post);

        let hr = route_with_rules(vec![
            HTTPRouteRules {
                matches: Some(vec![first]),
                backend_refs: Some(vec![backend_ref("service1", Some(80))]),
                ..Default::default()
            },
            HTTPRouteRules {
                matches: Some(vec![second]),
                backend_refs: Some(vec![backend_ref("service1", Some(80))]),
                ..Default::default()
            },
        ]);

        let server = VirtualServer {
            hostname: "cafe.example.com".to_string(),
            path_rules: vec![PathRule {
                path: "/test".to_string(),
                match_rules: vec![match_rule(&hr, 0, 0), match_rule(&hr, 1, 0)],
            }],
            ssl: None,
        };

        let resolver = FakeResolver::returning("10.0.0.1");
        let mut warnings = Warnings::new();
        let result = generate_server(&server, &resolver, &mut warnings);

        let dispatch = result
            .locations
            .iter()
            .find(|l| l.path == "/test")
            .expect("dispatch location should exist");

        assert_eq!(
            dispatch.http_match_var.as_deref(),
            Some(
                r#"[{"method":"GET","headers":["Version:V1","X:y"],"redirectPath":"/test_route0"},{"method":"POST","redirectPath":"/test_route1"}]"#
            )
        );
    }

    #[test]
    fn test_path_for_match() {
        assert_eq!(path_for_match("/path", 1), "/path_route1");
        assert_eq!(path_for_match("/", 0), "/_route0");
    }

    #[test]
    fn test_artifact_json_round_trip() {
        let config = DataPlaneConfig {
            http_servers: vec![Server {
                server_name: "example.com".to_string(),
                ssl: None,
                locations: vec![Location {
                    path: "/".to_string(),
                    proxy_pass: Some("http://10.0.0.1:80".to_string()),
                    ..Location::default()
                }],
            }],
            ssl_servers: vec![],
        };

        let first = serde_json::to_string(&config).unwrap();
        let parsed: DataPlaneConfig = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&parsed).unwrap();

        assert_eq!(first, second);
        assert_eq!(parsed, config);
    }
}
