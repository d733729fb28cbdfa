//! Utility functions shared by the tracer programs and the execution harness
//!
//! # Modules
//!
//! - [`address_utils`]: Contract address derivation
//!   - CREATE2 addresses
//!   - Stack word to address conversion
//!   - Precompile detection
//!
//! - [`hex_utils`]: Serde helpers for trace JSON
//!   - Lower-case `0x` addresses
//!   - Minimal `0x` hex quantities
//!   - Hex-or-decimal numbers for fixtures
//!
//! - [`error_utils`]: Smart contract error handling
//!   - Revert reason extraction
//!   - Solidity panic code interpretation
//!   - Halt reason messages
//!
//! - [`block_utils`]: Block environment construction

/// Contract address derivation
pub mod address_utils;

/// Block environment utilities
pub mod block_utils;

/// Error parsing utilities
pub mod error_utils;

/// Serde helpers for hex encoded values
pub mod hex_utils;
