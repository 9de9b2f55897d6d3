//! Service resolution
//!
//! The configuration renderer asks a resolver for one backend address per
//! Service. The store-backed implementation answers with the Service's
//! cluster IP; anything fancier (endpoints, slices, weighting) lives
//! behind this seam.

use crate::events::NsName;
use crate::state::store::ResourceStore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("service {0} does not exist")]
    NotFound(NsName),

    #[error("service {0} has no cluster IP")]
    NoClusterIp(NsName),
}

/// Resolves a Service reference to a single address string.
pub trait ServiceResolver {
    fn resolve(&self, nsname: &NsName) -> Result<String, ResolveError>;
}

impl ServiceResolver for ResourceStore {
    fn resolve(&self, nsname: &NsName) -> Result<String, ResolveError> {
        let service = self
            .service(nsname)
            .ok_or_else(|| ResolveError::NotFound(nsname.clone()))?;

        let cluster_ip = service
            .spec
            .as_ref()
            .and_then(|spec| spec.cluster_ip.clone())
            .filter(|ip| !ip.is_empty() && ip != "None");

        cluster_ip.ok_or_else(|| ResolveError::NoClusterIp(nsname.clone()))
    }
}
