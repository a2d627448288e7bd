//! Latch Engine Core
//!
//! Contains the fundamental frame-level systems:
//! - Memory management (per-frame host buffers for GPU uploads)

pub mod memory;

pub use bytemuck;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
