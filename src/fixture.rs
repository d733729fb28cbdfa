//! Trace fixtures
//!
//! A fixture pairs a genesis allocation and block context with a raw signed
//! transaction and the trace it is expected to produce:
//!
//! ```json
//! {
//!   "genesis": { "alloc": { "0x…": { "balance": "0x…", "code": "0x…" } }, "config": { "chainId": 1 } },
//!   "context": { "number": "2", "timestamp": "1479891545", "gasLimit": "4712388", "miner": "0x…" },
//!   "input": "0xf8…",
//!   "result": { "type": "CALL", … }
//! }
//! ```

use crate::{
    config::TraceOptions,
    errors::FixtureError,
    evm::create_evm,
    host::create_tracer_with_options,
    types::{Bytes, GenesisAlloc, SimulationTx, TraceContext, TraceOutcome},
};
use alloy::{
    consensus::{transaction::SignerRecoverable, Transaction, TxEnvelope},
    eips::eip2718::Decodable2718,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Chain parameters of the genesis; everything but the chain id is ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureGenesis {
    pub alloc: GenesisAlloc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ChainConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub genesis: FixtureGenesis,
    pub context: TraceContext,
    /// Raw EIP-2718 encoded signed transaction
    pub input: Bytes,
    /// Expected artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Fixture {
    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&raw)?)
    }

    /// Block context with the genesis chain id applied
    pub fn trace_context(&self) -> TraceContext {
        let mut context = self.context.clone();
        if let Some(chain_id) = self.genesis.config.as_ref().and_then(|config| config.chain_id) {
            context.chain_id = chain_id;
        }
        context
    }

    /// Decodes the raw transaction and recovers its sender
    pub fn decode_transaction(&self) -> Result<SimulationTx, FixtureError> {
        let mut buf = self.input.as_ref();
        let envelope = TxEnvelope::decode_2718(&mut buf)
            .map_err(|e| FixtureError::Transaction(e.to_string()))?;
        if !buf.is_empty() {
            return Err(FixtureError::Transaction(format!("{} trailing bytes", buf.len())));
        }
        let caller = envelope.recover_signer().map_err(|e| FixtureError::Signer(e.to_string()))?;

        Ok(SimulationTx {
            caller,
            value: envelope.value(),
            data: envelope.input().clone(),
            transact_to: envelope.kind(),
            gas_limit: envelope.gas_limit(),
            gas_price: envelope.gas_price().unwrap_or_else(|| envelope.max_fee_per_gas()),
            nonce: Some(envelope.nonce()),
        })
    }

    /// Executes the transaction on the fixture state with the given tracer
    pub fn run(&self, options: &TraceOptions) -> anyhow::Result<TraceOutcome> {
        let context = self.trace_context();
        let tx = self.decode_transaction()?;
        debug!(target: "revm_tracers::fixture", caller = %tx.caller, tracer = options.tracer_name(), "running fixture");

        let mut evm = create_evm(&self.genesis.alloc, &context)?;
        let tracer = create_tracer_with_options(options, context)?;
        Ok(evm.trace_transaction(tx, tracer)?)
    }

    /// Whether `artifact` matches the expected result under schema `T`
    pub fn matches<T>(&self, artifact: &[u8]) -> bool
    where
        T: DeserializeOwned + PartialEq,
    {
        let Ok(actual) = serde_json::from_slice::<Value>(artifact) else {
            return false;
        };
        match &self.result {
            Some(expected) => json_equal::<T>(&actual, expected),
            None => false,
        }
    }
}

/// Compares two JSON values after decoding both into `T`
///
/// Fields `T` does not know are ignored, and equivalent encodings (`"0x0a"`
/// and `"0xa"`) compare equal.
pub fn json_equal<T>(x: &Value, y: &Value) -> bool
where
    T: DeserializeOwned + PartialEq,
{
    match (T::deserialize(x), T::deserialize(y)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}
