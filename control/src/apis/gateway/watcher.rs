//! Resource watchers
//!
//! Translates `kube` watch streams into typed upsert/delete events on
//! the shared channel. Each kind runs in its own task; per-resource
//! ordering is preserved because a kind has exactly one watcher and the
//! channel is FIFO.

use crate::events::{Event, NsName, Resource, ResourceKind};
use futures::StreamExt;
use gateway_api::apis::standard::gatewayclasses::GatewayClass;
use gateway_api::apis::standard::gateways::Gateway;
use gateway_api::apis::standard::httproutes::HTTPRoute;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::runtime::watcher;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A kind the event source adapter ingests.
pub trait Watched:
    kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static
{
    const KIND: ResourceKind;

    fn into_resource(obj: Arc<Self>) -> Resource;
}

impl Watched for GatewayClass {
    const KIND: ResourceKind = ResourceKind::GatewayClass;

    fn into_resource(obj: Arc<Self>) -> Resource {
        Resource::GatewayClass(obj)
    }
}

impl Watched for Gateway {
    const KIND: ResourceKind = ResourceKind::Gateway;

    fn into_resource(obj: Arc<Self>) -> Resource {
        Resource::Gateway(obj)
    }
}

impl Watched for HTTPRoute {
    const KIND: ResourceKind = ResourceKind::HttpRoute;

    fn into_resource(obj: Arc<Self>) -> Resource {
        Resource::HttpRoute(obj)
    }
}

impl Watched for Secret {
    const KIND: ResourceKind = ResourceKind::Secret;

    fn into_resource(obj: Arc<Self>) -> Resource {
        Resource::Secret(obj)
    }
}

impl Watched for Service {
    const KIND: ResourceKind = ResourceKind::Service;

    fn into_resource(obj: Arc<Self>) -> Resource {
        Resource::Service(obj)
    }
}

/// Watch one kind across all namespaces and forward its changes.
///
/// Runs until the watch stream ends or the consumer side of the channel
/// is dropped. Watch errors are logged and the stream resumes.
pub async fn watch_resources<K: Watched>(client: Client, events: UnboundedSender<Event>) {
    let api: Api<K> = Api::all(client);
    let stream = watcher(api, WatcherConfig::default());
    futures::pin_mut!(stream);

    info!("Starting {} watcher", K::KIND);

    while let Some(item) = stream.next().await {
        match item {
            Ok(watcher::Event::Apply(obj)) | Ok(watcher::Event::InitApply(obj)) => {
                let resource = K::into_resource(Arc::new(obj));
                info!("{} was upserted: {}", K::KIND, resource.nsname());
                if events.send(Event::Upsert(resource)).is_err() {
                    break;
                }
            }
            Ok(watcher::Event::Delete(obj)) => {
                let nsname = NsName::of(&obj);
                info!("{} was removed: {}", K::KIND, nsname);
                let event = Event::Delete {
                    kind: K::KIND,
                    nsname,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(watcher::Event::Init) => {
                debug!("{} watcher initialized", K::KIND);
            }
            Ok(watcher::Event::InitDone) => {
                info!("{} watcher initial sync complete", K::KIND);
            }
            Err(err) => {
                warn!("{} watcher error: {}", K::KIND, err);
            }
        }
    }

    debug!("{} watcher stopped", K::KIND);
}

/// Spawn a watcher per tracked kind, all feeding `events`.
pub fn spawn_watchers(client: &Client, events: &UnboundedSender<Event>) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(watch_resources::<GatewayClass>(
            client.clone(),
            events.clone(),
        )),
        tokio::spawn(watch_resources::<Gateway>(client.clone(), events.clone())),
        tokio::spawn(watch_resources::<HTTPRoute>(client.clone(), events.clone())),
        tokio::spawn(watch_resources::<Secret>(client.clone(), events.clone())),
        tokio::spawn(watch_resources::<Service>(client.clone(), events.clone())),
    ]
}
