//! Block environment utilities for EVM simulation
//!
//! Helper functions to turn a trace context into the interpreter's block environment.

use crate::types::TraceContext;
use revm::context::BlockEnv;

/// Create a block environment for EVM execution
///
/// Copies the block fields of the trace context; everything else keeps the
/// interpreter defaults.
///
/// # Example
/// ```rust
/// # use revm_tracers::{types::TraceContext, utils::block_utils::create_block_env};
/// let context = TraceContext { number: 8_000_000, timestamp: 5, ..Default::default() };
/// let block = create_block_env(&context);
/// assert_eq!(block.number, 8_000_000);
/// ```
pub fn create_block_env(context: &TraceContext) -> BlockEnv {
    BlockEnv {
        number: context.number,
        timestamp: context.timestamp,
        difficulty: context.difficulty,
        gas_limit: context.gas_limit,
        beneficiary: context.miner,
        ..Default::default()
    }
}
