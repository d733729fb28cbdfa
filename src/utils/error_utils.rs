//! Error handling utilities for Ethereum transactions
//!
//! This module provides utilities for parsing and handling various types of errors:
//! - Custom Solidity errors (Error(string))
//! - Solidity panic codes (Panic(uint256))
//! - Custom error selectors
//!
//! It also maps interpreter results to the frame errors recorded in traces:
//! reverts become `"execution reverted"`, exceptional halts carry a short
//! reason such as `"out of gas"` or `"invalid opcode"`.

use crate::types::FrameError;
use alloy::dyn_abi::{DynSolType, DynSolValue};
use revm::{
    context_interface::result::{HaltReason, OutOfGasError},
    interpreter::{InstructionResult, SuccessOrHalt},
};

/// Parse custom error output from a failed transaction
///
/// Handles two main types of errors:
/// 1. Error(string) - Standard revert with message (selector: 0x08c379a0)
/// 2. Panic(uint256) - Solidity panic with error code (selector: 0x4e487b71)
///
/// # Arguments
/// * `output` - Raw error output bytes from the failed transaction
///
/// # Returns
/// * `Some(String)` - Decoded error message or panic reason
/// * `None` - If the error format is not recognized or cannot be decoded
///
/// # Example
/// ```no_run
/// # use revm_tracers::utils::error_utils::parse_custom_error;
/// # use alloy::primitives::hex;
/// let error_output = hex::decode("08c379a000000000000000000000000000000000000000000000000000000000000000200000000000000000000000000000000000000000000000000000000000000014496e73756666696369656e742062616c616e636500000000000000000000000000").unwrap();
/// let error_message = parse_custom_error(&error_output);
/// assert_eq!(error_message, Some("Insufficient balance".to_string()));
/// ```
pub fn parse_custom_error(output: &[u8]) -> Option<String> {
    if output.len() < 4 {
        return None;
    }

    let selector = &output[0..4];
    match selector {
        // Error(string) - 0x08c379a0
        [0x08, 0xc3, 0x79, 0xa0] => {
            if let Ok(DynSolValue::String(reason)) = DynSolType::String.abi_decode(&output[4..]) {
                Some(reason)
            } else {
                None
            }
        },
        // Panic(uint256) - 0x4e487b71
        [0x4e, 0x48, 0x7b, 0x71] => {
            if let Ok(DynSolValue::Uint(code, _)) = DynSolType::Uint(256).abi_decode(&output[4..]) {
                let Ok(code) = u64::try_from(code) else {
                    return Some(format!("Panic: Unknown error code (0x{code:x})"));
                };
                return Some(match code {
                    0x01 => "Panic: Assertion failed".to_string(),
                    0x11 => "Panic: Arithmetic overflow".to_string(),
                    0x12 => "Panic: Division by zero".to_string(),
                    0x21 => "Panic: Invalid array access".to_string(),
                    0x22 => "Panic: Array access out of bounds".to_string(),
                    0x31 => "Panic: Invalid enum value".to_string(),
                    0x32 => "Panic: Invalid storage access".to_string(),
                    0x41 => "Panic: Zero initialization".to_string(),
                    0x51 => "Panic: Invalid calldata access".to_string(),
                    code => format!("Panic: Unknown error code (0x{:x})", code),
                });
            }
            None
        },
        _ => None,
    }
}

/// Classifies an interpreter result for a finished frame
///
/// Returns `None` for success, `FrameError::Reverted` for REVERT and
/// `FrameError::Halted` with a short reason for exceptional halts.
pub fn frame_error(result: InstructionResult) -> Option<FrameError> {
    match SuccessOrHalt::<HaltReason>::from(result) {
        SuccessOrHalt::Success(_) | SuccessOrHalt::Internal(_) => None,
        SuccessOrHalt::Revert => Some(FrameError::Reverted),
        SuccessOrHalt::Halt(reason) => Some(FrameError::Halted(halt_message(&reason))),
        SuccessOrHalt::FatalExternalError => {
            Some(FrameError::Halted("fatal external error".to_string()))
        }
    }
}

/// Short, stable message for a halt reason
pub fn halt_message(reason: &HaltReason) -> String {
    match reason {
        HaltReason::OutOfGas(OutOfGasError::Basic) => "out of gas".to_string(),
        HaltReason::OutOfGas(kind) => format!("out of gas: {kind:?}"),
        HaltReason::OpcodeNotFound | HaltReason::InvalidFEOpcode => "invalid opcode".to_string(),
        HaltReason::InvalidJump => "invalid jump destination".to_string(),
        HaltReason::StackUnderflow => "stack underflow".to_string(),
        HaltReason::StackOverflow => "stack limit reached 1024".to_string(),
        HaltReason::StateChangeDuringStaticCall => "write protection".to_string(),
        HaltReason::CallTooDeep => "max call depth exceeded".to_string(),
        HaltReason::OutOfFunds => "insufficient balance for transfer".to_string(),
        HaltReason::CreateCollision => "contract address collision".to_string(),
        HaltReason::CreateContractSizeLimit => "max code size exceeded".to_string(),
        other => format!("{other:?}"),
    }
}
