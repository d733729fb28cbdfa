//! Tracing protocol traits
//!
//! This module provides the three seams of the tracing engine:
//! - `Hooks`: events pushed by an execution source (the revm bridge, or a
//!   recorded stream) into a tracer
//! - `StateView`: read-only account access handed to every hook
//! - `TracerProgram`: the capability set a tracer program implements
//!
//! # Hook protocol
//! For one transaction the source emits exactly one root `on_start`, then any
//! interleaving of `on_step`, nested `on_start`/`on_end` pairs, `on_fault` and
//! `on_self_destruct`, and finally the root `on_end`. A faulting opcode is
//! reported through `on_fault`, in place of its `on_step` when the source
//! detects the fault before executing it (the revm bridge detects it after,
//! so there the opcode's `on_step` precedes the fault). The frame's `on_end`
//! still follows. Hooks never return errors to the source: failures are kept
//! by the tracer and surfaced from `get_result()`.

use crate::{
    errors::{ProgramError, StateError},
    host::HostContext,
    types::{AccountSnapshot, Address, ExecutionStep, FrameEnd, FrameStart, U256},
};

/// Receiver of execution events
pub trait Hooks {
    /// A call frame begins; the first call is the transaction root
    fn on_start(&mut self, state: &mut dyn StateView, frame: FrameStart<'_>);

    /// An opcode is about to execute
    fn on_step(&mut self, state: &mut dyn StateView, step: &ExecutionStep<'_>);

    /// An opcode failed; terminal for the current frame
    fn on_fault(&mut self, state: &mut dyn StateView, step: &ExecutionStep<'_>, reason: &str);

    /// A call frame ends
    fn on_end(&mut self, state: &mut dyn StateView, frame: FrameEnd<'_>);

    /// The executing contract self-destructed
    fn on_self_destruct(
        &mut self,
        state: &mut dyn StateView,
        address: Address,
        beneficiary: Address,
        value: U256,
    );
}

/// Read-only access to account state during a hook
///
/// `account`/`storage` reflect the current point in execution. The
/// `original_*` accessors return the state before the transaction started.
/// Accounts that do not exist (EIP-161 empty) are `None`.
pub trait StateView {
    fn account(&mut self, address: Address) -> Result<Option<AccountSnapshot>, StateError>;

    fn storage(&mut self, address: Address, slot: U256) -> Result<U256, StateError>;

    fn original_account(&mut self, address: Address)
        -> Result<Option<AccountSnapshot>, StateError>;

    fn original_storage(&mut self, address: Address, slot: U256) -> Result<U256, StateError>;
}

/// A tracer program run inside the program host
///
/// Every hook has a no-op default so programs only implement what they
/// observe. `result` is called once, after the root frame ended, and must
/// return the JSON artifact.
pub trait TracerProgram: Send {
    fn on_start(
        &mut self,
        _ctx: &mut HostContext<'_>,
        _frame: &FrameStart<'_>,
    ) -> Result<(), ProgramError> {
        Ok(())
    }

    fn on_step(
        &mut self,
        _ctx: &mut HostContext<'_>,
        _step: &ExecutionStep<'_>,
    ) -> Result<(), ProgramError> {
        Ok(())
    }

    fn on_fault(
        &mut self,
        _ctx: &mut HostContext<'_>,
        _step: &ExecutionStep<'_>,
        _reason: &str,
    ) -> Result<(), ProgramError> {
        Ok(())
    }

    fn on_end(&mut self, _ctx: &mut HostContext<'_>, _frame: &FrameEnd<'_>) -> Result<(), ProgramError> {
        Ok(())
    }

    fn on_self_destruct(
        &mut self,
        _ctx: &mut HostContext<'_>,
        _address: Address,
        _beneficiary: Address,
        _value: U256,
    ) -> Result<(), ProgramError> {
        Ok(())
    }

    /// Produces the artifact
    fn result(&mut self) -> Result<serde_json::Value, ProgramError>;
}
