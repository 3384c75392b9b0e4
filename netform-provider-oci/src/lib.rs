//! Netform OCI Provider
//!
//! Networking and identity resources for Oracle Cloud Infrastructure.
//!
//! ## Module Structure
//!
//! - `client` - API client traits, request/response models and an in-memory client
//! - `config` - Provider credentials and timeouts
//! - `provider` - OciProvider implementation
//! - `resources` - Typed resource data, mapping functions and lifecycle handlers
//! - `schemas` - Attribute schemas of every resource and data source

pub mod client;
pub mod config;
pub mod provider;
pub mod resources;
pub mod schemas;

// Re-export main types
pub use client::{ClientError, MemoryClient, OciClients};
pub use config::{ConfigError, ProviderConfig};
pub use provider::OciProvider;
pub use resources::build_request;
