//! Workspace root of FileImporter-RS. Hosts the end-to-end tests and
//! benchmarks; the functionality lives in the `fi_*` crates.

pub use fi_domain;
pub use fi_engine;
