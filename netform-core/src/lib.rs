//! Netform Core
//!
//! Core library shared by netform providers: attribute schemas, the provider
//! trait, lifecycle states and the CRUD driver that runs resource handlers.

pub mod crud;
pub mod provider;
pub mod resource;
pub mod schema;
