//! Rendering adapter: text output behind the kernel's [`RenderPass`] seam.
//!
//! # Invariants
//! - Renderers read a [`RenderView`]; they cannot mutate engine state.
//!
//! A windowed backend implements the same trait without changing the engine.

mod renderer;

pub use planar_kernel::{RenderPass, RenderView};
pub use renderer::{DebugTextRenderer, TextOutput, render_text};

pub fn crate_info() -> &'static str {
    concat!("planar-render v", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
