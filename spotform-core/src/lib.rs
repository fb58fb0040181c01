//! Spotform Core
//!
//! Core library for translating declared resources into remote API objects.
//! Resource types are described field by field in a registry; a wrapper
//! runs the registry to build, read back and update remote objects.

pub mod data;
pub mod differ;
pub mod effect;
pub mod expand;
pub mod field;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod wrapper;
