//! Status reporting
//!
//! Applies the collector's intents to the cluster: one read-modify-write
//! per resource, the read refreshing the resource before the status
//! patch. Failures are logged per resource and never block the rest.
//!
//! Known limitations, carried deliberately:
//! - no leader election: every replica would report;
//! - statuses are written even when unchanged;
//! - writes are synchronous and can slow the event loop;
//! - no retry on transient failures;
//! - statuses are not cleared when a route drops its parent ref;
//! - a third party overwriting a status is not corrected until the next
//!   resource event.

use crate::events::NsName;
use crate::state::statuses::{
    GatewayClassStatus, GatewayStatus, HttpRouteStatus, IgnoredGatewayStatus, Statuses,
};
use chrono::{DateTime, SecondsFormat, Utc};
use gateway_api::apis::standard::gatewayclasses::GatewayClass;
use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::standard::httproutes::HTTPRoute;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const FIELD_MANAGER: &str = "silta-control";

pub const GATEWAY_CONFLICT_MESSAGE: &str = "The Gateway is ignored by the controller";

/// Source of condition transition times, pinned in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Writes resource statuses derived from one reconciliation.
pub struct StatusUpdater {
    client: Client,
    controller_name: String,
    gateway_class_name: String,
    clock: Box<dyn Clock>,
}

impl StatusUpdater {
    pub fn new(client: Client, controller_name: String, gateway_class_name: String) -> Self {
        Self::with_clock(client, controller_name, gateway_class_name, Box::new(SystemClock))
    }

    pub fn with_clock(
        client: Client,
        controller_name: String,
        gateway_class_name: String,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            client,
            controller_name,
            gateway_class_name,
            clock,
        }
    }

    /// Apply all intents. The cancellation token is polled between
    /// resources; an in-flight write always completes, so a cancelled
    /// call still delivers the leading updates.
    pub async fn update(&self, statuses: &Statuses, cancel: &CancellationToken) {
        let now = timestamp(self.clock.now());

        if let Some(gc) = &statuses.gateway_class {
            let api: Api<GatewayClass> = Api::all(self.client.clone());
            self.apply(&api, &self.gateway_class_name, gateway_class_conditions(gc, &now))
                .await;
        }

        if let Some(gw) = &statuses.gateway {
            let api: Api<Gateway> = Api::namespaced(self.client.clone(), &gw.nsname.namespace);
            self.apply(&api, &gw.nsname.name, gateway_listeners_status(gw, &now))
                .await;
        }

        for (nsname, status) in &statuses.ignored_gateways {
            if cancel.is_cancelled() {
                debug!("Status update cancelled");
                return;
            }

            let api: Api<Gateway> = Api::namespaced(self.client.clone(), &nsname.namespace);
            self.apply(&api, &nsname.name, ignored_gateway_conditions(status, &now))
                .await;
        }

        let Some(gateway) = &statuses.gateway else {
            // Route parent statuses echo the chosen Gateway; without one
            // there is nothing to report.
            return;
        };

        for (nsname, status) in &statuses.http_routes {
            if cancel.is_cancelled() {
                debug!("Status update cancelled");
                return;
            }

            let api: Api<HTTPRoute> = Api::namespaced(self.client.clone(), &nsname.namespace);
            let payload =
                http_route_parents(status, &gateway.nsname, &self.controller_name, &now);
            self.apply(&api, &nsname.name, payload).await;
        }
    }

    /// Read-modify-write one resource's status. The read refreshes the
    /// stored version; a resource deleted in the meantime is skipped.
    async fn apply<K>(&self, api: &Api<K>, name: &str, status: Value)
    where
        K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
    {
        if let Err(err) = api.get(name).await {
            match err {
                kube::Error::Api(ref response) if response.code == 404 => {
                    debug!("Skipping status of {}: resource is gone", name);
                }
                err => {
                    warn!("Failed to get the recent version of {}: {}", name, err);
                }
            }
            return;
        }

        let patch = json!({ "status": status });
        if let Err(err) = api
            .patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
        {
            warn!("Failed to update status of {}: {}", name, err);
        }
    }
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// GatewayClass `Accepted` condition.
pub fn gateway_class_conditions(status: &GatewayClassStatus, now: &str) -> Value {
    let (state, message) = if status.valid {
        ("True", "GatewayClass has been accepted".to_string())
    } else {
        (
            "False",
            format!("GatewayClass has been rejected: {}", status.error_msg),
        )
    };

    json!({
        "conditions": [{
            "type": "Accepted",
            "status": state,
            "reason": "Accepted",
            "message": message,
            "observedGeneration": status.observed_generation,
            "lastTransitionTime": now,
        }]
    })
}

/// Per-listener `Ready` conditions of the chosen Gateway.
pub fn gateway_listeners_status(status: &GatewayStatus, now: &str) -> Value {
    let listeners: Vec<Value> = status
        .listeners
        .iter()
        .map(|(name, listener)| {
            let (state, reason) = if listener.valid {
                ("True", "Ready")
            } else {
                ("False", "Invalid")
            };

            json!({
                "name": name,
                "supportedKinds": [{"kind": "HTTPRoute"}],
                "attachedRoutes": listener.attached_routes,
                "conditions": [{
                    "type": "Ready",
                    "status": state,
                    "reason": reason,
                    "message": "",
                    "observedGeneration": status.observed_generation,
                    "lastTransitionTime": now,
                }],
            })
        })
        .collect();

    json!({ "listeners": listeners })
}

/// `Ready: False / GatewayConflict` for a Gateway that lost the
/// tie-break.
pub fn ignored_gateway_conditions(status: &IgnoredGatewayStatus, now: &str) -> Value {
    json!({
        "conditions": [{
            "type": "Ready",
            "status": "False",
            "reason": "GatewayConflict",
            "message": GATEWAY_CONFLICT_MESSAGE,
            "observedGeneration": status.observed_generation,
            "lastTransitionTime": now,
        }]
    })
}

/// Parent statuses of a route: one `Accepted` entry per attached
/// section ref. Sections that failed validation are omitted.
pub fn http_route_parents(
    status: &HttpRouteStatus,
    gateway: &NsName,
    controller_name: &str,
    now: &str,
) -> Value {
    let parents: Vec<Value> = status
        .parents
        .iter()
        .filter(|(_, parent)| parent.attached)
        .map(|(section, _)| {
            json!({
                "controllerName": controller_name,
                "parentRef": {
                    "namespace": gateway.namespace,
                    "name": gateway.name,
                    "sectionName": section,
                },
                "conditions": [{
                    "type": "Accepted",
                    "status": "True",
                    "reason": "Accepted",
                    "message": "",
                    "observedGeneration": status.observed_generation,
                    "lastTransitionTime": now,
                }],
            })
        })
        .collect();

    json!({ "parents": parents })
}
