//! revm inspectors
//!
//! - [`hook_inspector`]: bridges revm's `Inspector` callbacks to the hook protocol

pub mod hook_inspector;

pub use hook_inspector::{HookInspector, RevmState};
