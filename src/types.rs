//! Core types for EVM tracing
//!
//! This module defines the data structures shared by the event source, the
//! dispatcher and the tracer programs:
//! - Frame boundaries (`FrameStart`, `FrameEnd`) and per-opcode steps
//! - Borrowed views over the interpreter's stack and memory
//! - Block/transaction context and simulation inputs
//! - Genesis allocations used to seed in-memory state

use crate::utils::hex_utils;
pub use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use revm::context_interface::result::ExecutionResult;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a call frame
///
/// Serialized as the upper-case opcode name used by the call tracer schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallKind {
    Call,
    CallCode,
    StaticCall,
    DelegateCall,
    Create,
    Create2,
    SelfDestruct,
}

impl CallKind {
    /// Whether the frame deploys a contract
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }

    /// Opcode name as it appears in traces
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Call => "CALL",
            CallKind::CallCode => "CALLCODE",
            CallKind::StaticCall => "STATICCALL",
            CallKind::DelegateCall => "DELEGATECALL",
            CallKind::Create => "CREATE",
            CallKind::Create2 => "CREATE2",
            CallKind::SelfDestruct => "SELFDESTRUCT",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a frame did not complete successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The frame executed REVERT; state changes are rolled back, output is kept
    Reverted,
    /// Exceptional halt (out of gas, invalid opcode, ...)
    Halted(String),
}

impl FrameError {
    pub fn is_revert(&self) -> bool {
        matches!(self, FrameError::Reverted)
    }
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Reverted => f.write_str("execution reverted"),
            FrameError::Halted(reason) => f.write_str(reason),
        }
    }
}

/// Entry of a call frame
///
/// `to` is `None` for CREATE and CREATE2, whose target is derived (CREATE2,
/// from `salt`) or reported by the matching `FrameEnd::created`.
#[derive(Debug, Clone, Copy)]
pub struct FrameStart<'a> {
    pub kind: CallKind,
    pub from: Address,
    pub to: Option<Address>,
    pub input: &'a [u8],
    /// Gas offered to the frame; the transaction gas limit for the root
    pub gas: u64,
    pub value: U256,
    pub salt: Option<B256>,
}

/// Exit of a call frame
#[derive(Debug, Clone, Copy)]
pub struct FrameEnd<'a> {
    pub output: &'a [u8],
    pub gas_used: u64,
    pub error: Option<&'a FrameError>,
    /// Address of the account deployed by a CREATE/CREATE2 frame
    pub created: Option<Address>,
}

/// Read-only view over the interpreter stack
///
/// Index 0 of `peek` is the top of the stack.
#[derive(Debug, Clone, Copy)]
pub struct StackView<'a> {
    data: &'a [U256],
}

impl<'a> StackView<'a> {
    /// Wraps a stack slice ordered bottom to top
    pub fn new(data: &'a [U256]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the n-th item from the top, if present
    pub fn peek(&self, n: usize) -> Option<U256> {
        let index = self.data.len().checked_sub(n + 1)?;
        self.data.get(index).copied()
    }

    /// Interprets the n-th item from the top as an address (low 20 bytes)
    pub fn peek_address(&self, n: usize) -> Option<Address> {
        self.peek(n).map(crate::utils::address_utils::word_to_address)
    }

    /// Copies the stack, top first
    pub fn to_vec(&self) -> Vec<U256> {
        self.data.iter().rev().copied().collect()
    }
}

/// Read-only view over the interpreter memory
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    data: &'a [u8],
}

impl<'a> MemoryView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrows `len` bytes at `offset`, `None` when the range is not allocated
    pub fn slice(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        self.data.get(offset..end)
    }

    /// Copies `len` bytes at `offset`, `None` when the range is not allocated
    pub fn copy_range(&self, offset: usize, len: usize) -> Option<Vec<u8>> {
        self.slice(offset, len).map(<[u8]>::to_vec)
    }
}

/// One interpreter step, delivered before the opcode executes
#[derive(Debug, Clone, Copy)]
pub struct ExecutionStep<'a> {
    pub pc: u64,
    pub op: u8,
    /// Gas remaining before the opcode
    pub gas: u64,
    pub cost: u64,
    pub depth: usize,
    /// Storage context of the executing frame
    pub address: Address,
    pub stack: StackView<'a>,
    pub memory: MemoryView<'a>,
    pub return_data: &'a [u8],
    pub error: Option<&'a str>,
}

/// Account fields visible through a state view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
}

/// Block and transaction context of a trace
///
/// Deserializes from the fixture `context` object, whose numbers may be
/// decimal strings or `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceContext {
    #[serde(with = "hex_utils::hex_or_decimal_u64")]
    pub number: u64,
    #[serde(with = "hex_utils::hex_or_decimal_u64")]
    pub timestamp: u64,
    #[serde(default, with = "hex_utils::hex_or_decimal_u256")]
    pub difficulty: U256,
    #[serde(with = "hex_utils::hex_or_decimal_u64")]
    pub gas_limit: u64,
    #[serde(default)]
    pub miner: Address,
    #[serde(default, skip_serializing)]
    pub tx_index: usize,
    #[serde(default = "default_chain_id", skip_serializing)]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    1
}

impl Default for TraceContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            difficulty: U256::ZERO,
            gas_limit: 30_000_000,
            miner: Address::ZERO,
            tx_index: 0,
            chain_id: default_chain_id(),
        }
    }
}

/// Genesis account entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisAccount {
    #[serde(default, with = "hex_utils::hex_or_decimal_u256")]
    pub balance: U256,
    #[serde(default, with = "hex_utils::hex_or_decimal_u64")]
    pub nonce: u64,
    #[serde(default)]
    pub code: Bytes,
    #[serde(default)]
    pub storage: BTreeMap<B256, B256>,
}

/// Pre-transaction accounts keyed by address
pub type GenesisAlloc = BTreeMap<Address, GenesisAccount>;

/// Transaction parameters for simulation
#[derive(Debug, Clone)]
pub struct SimulationTx {
    /// Transaction sender
    pub caller: Address,
    /// Native token value to send
    pub value: U256,
    /// Transaction input data
    pub data: Bytes,
    /// Transaction target (address or contract creation)
    pub transact_to: TxKind,
    /// Gas limit of the transaction
    pub gas_limit: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Explicit nonce; the sender's current nonce when `None`
    pub nonce: Option<u64>,
}

impl SimulationTx {
    /// Plain call with a generous gas limit and zero gas price
    pub fn call(caller: Address, to: Address, data: Bytes) -> Self {
        Self {
            caller,
            value: U256::ZERO,
            data,
            transact_to: TxKind::Call(to),
            gas_limit: 5_000_000,
            gas_price: 0,
            nonce: None,
        }
    }

    /// Contract deployment with the given init code
    pub fn create(caller: Address, init_code: Bytes) -> Self {
        Self {
            transact_to: TxKind::Create,
            ..Self::call(caller, Address::ZERO, init_code)
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas(mut self, gas_limit: u64, gas_price: u128) -> Self {
        self.gas_limit = gas_limit;
        self.gas_price = gas_price;
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Result of tracing one transaction
#[derive(Debug)]
pub struct TraceOutcome {
    /// Interpreter result of the transaction
    pub execution: ExecutionResult,
    /// Encoded artifact or the reason the trace failed
    pub trace: Result<Bytes, crate::errors::TracerError>,
}

impl TraceOutcome {
    /// Decodes the artifact into a concrete schema
    pub fn artifact<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let bytes = self.trace.as_ref().map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(serde_json::from_slice(bytes)?)
    }
}
