//! Reconciliation state
//!
//! The resource store holds the latest observed objects; the builders in
//! this module derive from it, in order, the resource graph, the routing
//! configuration, and the status intents. The builders are pure: they
//! never touch the cluster and never fail, encoding every decision as
//! graph annotations or collector intents.

pub mod configuration;
pub mod graph;
pub mod services;
pub mod statuses;
pub mod store;
