/*!

Provides utilities for testing the provisioner against a real cluster using `kind` and `docker`.
We call this testing modality `selftest` to distinguish it from tests that run against the fake
platform.

!*/

pub mod cluster;
mod test_settings;

pub use cluster::Cluster;
