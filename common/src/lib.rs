//! SILTA Common Types
//!
//! The match-dispatch contract shared between the control plane and the
//! data-plane sidecar. The control plane serializes an ordered list of
//! [`HttpMatch`] descriptors into each dispatch location; the sidecar
//! deserializes the list and runs [`dispatch`] against the incoming
//! request to pick the internal location to redirect to.

use serde::{Deserialize, Serialize};

/// A single match descriptor within a dispatch location.
///
/// Descriptors are evaluated in list order; the first one that matches
/// wins. Empty fields are omitted from the wire format so that the
/// serialized list stays byte-stable across round trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMatch {
    /// Matches any request unconditionally. Set for path-only matches
    /// that share their path with more specific matches.
    #[serde(default, skip_serializing_if = "is_false")]
    pub any: bool,

    /// Uppercase HTTP method, compared case-sensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Required headers as "Name:Value" pairs. Names compare
    /// case-insensitively, values exactly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    /// Required query parameters as "name=value" pairs. Both sides
    /// compare case-sensitively.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_params: Vec<String>,

    /// Internal location the sidecar redirects to on a match.
    pub redirect_path: String,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl HttpMatch {
    /// A descriptor that matches every request.
    pub fn any(redirect_path: impl Into<String>) -> Self {
        Self {
            any: true,
            redirect_path: redirect_path.into(),
            ..Self::default()
        }
    }
}

/// The request fields the dispatcher inspects.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Uppercase method, e.g. "GET".
    pub method: String,
    /// Header (name, value) pairs as received.
    pub headers: Vec<(String, String)>,
    /// Query parameter (name, value) pairs as received.
    pub query_params: Vec<(String, String)>,
}

/// Outcome of dispatching a request against a descriptor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<'a> {
    /// Redirect internally to the given location.
    Redirect(&'a str),
    /// No descriptor matched.
    NotFound,
    /// Every descriptor requires a method and none matched the request's.
    MethodNotAllowed,
}

/// Select the first matching descriptor for `request`.
///
/// Returns [`Dispatch::MethodNotAllowed`] only when every descriptor
/// pins a method and none of those methods equals the request method;
/// all other misses are [`Dispatch::NotFound`].
pub fn dispatch<'a>(matches: &'a [HttpMatch], request: &Request) -> Dispatch<'a> {
    for m in matches {
        if descriptor_matches(m, request) {
            return Dispatch::Redirect(&m.redirect_path);
        }
    }

    let all_pin_method = !matches.is_empty() && matches.iter().all(|m| !m.any && m.method.is_some());
    let method_matched = matches
        .iter()
        .any(|m| m.method.as_deref() == Some(request.method.as_str()));

    if all_pin_method && !method_matched {
        Dispatch::MethodNotAllowed
    } else {
        Dispatch::NotFound
    }
}

fn descriptor_matches(m: &HttpMatch, request: &Request) -> bool {
    if m.any {
        return true;
    }

    if let Some(method) = &m.method {
        if method != &request.method {
            return false;
        }
    }

    for spec in &m.headers {
        let Some((name, value)) = spec.split_once(':') else {
            return false;
        };
        let present = request
            .headers
            .iter()
            .any(|(n, v)| n.eq_ignore_ascii_case(name) && v == value);
        if !present {
            return false;
        }
    }

    for spec in &m.query_params {
        let Some((name, value)) = spec.split_once('=') else {
            return false;
        };
        let present = request
            .query_params
            .iter()
            .any(|(n, v)| n == name && v == value);
        if !present {
            return false;
        }
    }

    true
}
