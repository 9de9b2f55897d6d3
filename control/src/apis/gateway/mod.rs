//! Gateway API ingestion
//!
//! One watcher task per tracked kind:
//! - GatewayClass: controller identity
//! - Gateway: listeners and TLS references
//! - HTTPRoute: routing rules
//! - Secret: TLS certificate material
//! - Service: backend identities
//!
//! Every watcher feeds the same ordered event channel consumed by the
//! event loop.

pub mod watcher;
