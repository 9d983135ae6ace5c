//! Dynamic service discovery for the campus services.
//!
//! A central registry tracks every live service instance, pushes incremental
//! provider patches to the instances that depend on it, and evicts instances
//! that stop answering heartbeats. Each service process embeds a
//! [`DiscoveryClient`] that registers the process, hosts the endpoints the
//! registry probes and pushes to, and keeps a local [`ProviderCache`] in sync
//! for load-balanced lookups.

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod error;
pub mod registration;
pub mod registry;

pub use client::{DiscoveryClient, ProviderCache};
pub use config::HeartbeatConfig;
pub use error::{Error, Result};
pub use registration::{Patch, PatchEntry, Registration, ServiceName};
pub use registry::{HeartbeatMonitor, ServiceRegistry};
