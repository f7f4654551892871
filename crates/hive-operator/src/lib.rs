//! Hive operator: controller wiring and the `create-cluster` command

#![deny(missing_docs)]

pub mod controller_runner;
pub mod create_cluster;
