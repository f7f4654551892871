//! Artifact generation for Hive cluster requests
//!
//! Turns a [`Generator`] describing one cluster into the ordered set of
//! Kubernetes objects that request (or adopt) it. Generation is pure: no
//! object store is contacted.

#![deny(missing_docs)]

pub mod generator;
pub mod install_config;
pub mod objects;
pub mod provider;
pub mod sample;

pub use generator::{AdoptionSpec, Generator};
pub use objects::GeneratedObject;
pub use provider::{AwsProvider, AzureProvider, CloudProvider, GcpProvider};
