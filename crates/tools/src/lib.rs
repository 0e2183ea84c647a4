//! Developer tooling: engine inspector, probe read-out, time formatting.
//!
//! # Invariants
//! - Tools only read engine state; they never mutate it.

pub mod inspector;
pub mod probes;

pub use inspector::{EngineInspector, EngineSummary, ObjectInfo, format_millis};
pub use probes::{ProbeReading, read_probe, read_probes};

pub fn crate_info() -> &'static str {
    concat!("planar-tools v", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
