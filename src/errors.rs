//! Error types for EVM tracing
//!
//! This module defines the error taxonomy of the tracing engine and of the
//! in-memory execution harness that drives it:
//! - Tracer errors surfaced by `get_result()`
//! - Hook protocol violations raised by the dispatcher
//! - Faults caught at the sandboxed program boundary
//! - EVM initialization and runtime errors
//!
//! A failed trace is never the same thing as a reverted transaction: the
//! latter is a successful trace whose artifact records the revert.

use alloy::primitives::Address;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the execution harness
///
/// Encompasses everything that can go wrong while setting up state,
/// executing a transaction or obtaining its trace.
#[derive(Debug, Error)]
pub enum EvmError {
    /// Errors occurring while building the EVM and its state
    #[error("Failed to initialize EVM: {0}")]
    Init(#[from] InitError),

    /// Errors occurring during transaction execution
    #[error("Error during execution: {0}")]
    Runtime(#[from] RuntimeError),

    /// The tracer could not be created
    #[error("Tracer error: {0}")]
    Tracer(#[from] TracerError),
}

/// Initialization-specific errors
#[derive(Debug, Error)]
pub enum InitError {
    /// Genesis allocation could not be loaded into the database
    #[error("Database initialization failed: {0}")]
    Database(String),

    /// Fixture or genesis content is malformed
    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),
}

/// Runtime execution errors
///
/// These are failures of the interpreter or of the harness, not of the
/// traced transaction: reverts and halts are reported in the execution result.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The interpreter rejected or failed to execute the transaction
    #[error("Transaction execution failed: {0}")]
    ExecutionFailed(String),

    /// Errors accessing account information
    #[error("Account access error: {0}")]
    AccountAccess(String),

    /// A worker task running a trace failed to join
    #[error("Trace task failed: {0}")]
    Task(String),
}

/// Errors returned to the tracing caller
///
/// `Lookup` and `NotReady` are immediate caller mistakes; `Protocol` and
/// `HostFault` are recovered at the trace boundary and never reach the
/// interpreter; `Serialization` means the trace succeeded but its artifact
/// could not be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TracerError {
    /// No tracer is registered under the requested name
    #[error("tracer not found: {0}")]
    Lookup(String),

    /// The event source broke the hook protocol
    #[error("hook protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// The tracer program failed or ran out of budget
    #[error("tracer program fault: {0}")]
    HostFault(#[from] HostFault),

    /// The artifact could not be encoded
    #[error("failed to serialize trace result: {0}")]
    Serialization(String),

    /// The result was requested before the transaction finished
    #[error("trace result requested before execution completed")]
    NotReady,

    /// The result was already handed out
    #[error("trace result already retrieved")]
    AlreadyFinalized,

    /// The tracer options or program config were rejected
    #[error("invalid tracer config: {0}")]
    InvalidConfig(String),

    /// The caller cancelled the trace
    #[error("trace aborted: {0}")]
    Aborted(String),
}

/// Ordering and depth rules of the hook protocol
///
/// Each variant names a transition the event source must never produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// An event arrived before the root `on_start`
    #[error("{event} received before on_start")]
    EventBeforeStart { event: &'static str },

    /// An event arrived after the root frame ended
    #[error("{event} received after the root frame ended")]
    EventAfterEnd { event: &'static str },

    /// A step or fault reported a depth other than the open frame's
    #[error("event depth {actual} does not match open frame depth {expected}")]
    DepthMismatch { expected: usize, actual: usize },

    /// `on_end` with no open frame
    #[error("on_end without a matching on_start")]
    UnbalancedEnd,

    /// A second fault for the same frame
    #[error("frame at depth {depth} faulted twice")]
    DuplicateFault { depth: usize },

    /// A step was reported for a frame that already faulted
    #[error("on_step after on_fault at depth {depth}")]
    StepAfterFault { depth: usize },

    /// A nested call was started from a frame that already faulted
    #[error("on_start from a faulted frame at depth {depth}")]
    StartAfterFault { depth: usize },

    /// The address reported for a created contract differs from its derivation
    #[error("created address {reported} differs from derived address {derived}")]
    CreatedAddressMismatch { derived: Address, reported: Address },

    /// A call frame was started without a target address
    #[error("{kind} frame started without a target address")]
    MissingTarget { kind: &'static str },
}

/// Faults caught at the sandboxed program boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostFault {
    /// The program returned an error from a hook
    #[error("{hook} failed: {message}")]
    Program { hook: &'static str, message: String },

    /// The program panicked inside a hook
    #[error("{hook} panicked: {message}")]
    Panicked { hook: &'static str, message: String },

    /// The per-trace event budget was exhausted
    #[error("step limit of {limit} events exceeded")]
    StepLimit { limit: u64 },

    /// The per-trace time budget was exhausted
    #[error("execution timeout after {limit:?}")]
    Timeout { limit: Duration },
}

/// Errors a tracer program may return from its hooks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// The program detected a hook protocol violation
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// A host state query failed
    #[error("state access failed: {0}")]
    State(String),

    /// The program config could not be parsed
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The program result could not be encoded
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Any other program-defined failure
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by host state views
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The event source provides no state access for this hook
    #[error("state is not available in this hook")]
    Unavailable,

    /// The underlying database failed
    #[error("database error: {0}")]
    Database(String),
}

impl From<StateError> for ProgramError {
    fn from(err: StateError) -> Self {
        ProgramError::State(err.to_string())
    }
}

/// Errors decoding conformance fixtures
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The fixture document is not valid JSON for the schema
    #[error("invalid fixture: {0}")]
    Json(#[from] serde_json::Error),

    /// The raw transaction could not be decoded
    #[error("invalid transaction: {0}")]
    Transaction(String),

    /// The transaction signer could not be recovered
    #[error("failed to recover sender: {0}")]
    Signer(String),
}
