//! Transaction processing for TraceEvm
//!
//! Single traced or untraced transactions on the EVM's state, and
//! concurrent tracing of independent transactions on tokio's blocking pool.

use crate::{
    config::TraceOptions,
    dispatcher::Tracer,
    errors::{EvmError, RuntimeError, TracerError},
    evm::{builder::create_evm, TraceEvm},
    host::create_tracer_with_options,
    inspectors::HookInspector,
    types::{GenesisAlloc, SimulationTx, TraceContext, TraceOutcome, B256},
};
use alloy::primitives::Keccak256;
use revm::{
    context::{ContextTr, TxEnv},
    context_interface::result::ExecutionResult,
    database::{AccountState, CacheDB, Database, DatabaseRef},
    ExecuteCommitEvm, InspectCommitEvm,
};
use std::sync::Arc;
use tracing::{debug, warn};

impl<DB> TraceEvm<CacheDB<DB>, HookInspector<Tracer>>
where
    DB: DatabaseRef,
{
    /// Builds the interpreter transaction, reading the sender's nonce when unset
    fn tx_env(&mut self, input: SimulationTx) -> Result<TxEnv, RuntimeError> {
        let nonce = match input.nonce {
            Some(nonce) => nonce,
            None => self
                .ctx
                .db()
                .basic(input.caller)
                .map_err(|e| RuntimeError::AccountAccess(format!("{}: {e}", input.caller)))?
                .map(|account| account.nonce)
                .unwrap_or_default(),
        };
        let chain_id = self.ctx.cfg.chain_id;

        Ok(TxEnv::builder()
            .caller(input.caller)
            .value(input.value)
            .data(input.data)
            .kind(input.transact_to)
            .gas_limit(input.gas_limit)
            .gas_price(input.gas_price)
            .nonce(nonce)
            .chain_id(Some(chain_id))
            .build_fill())
    }

    /// Executes a transaction with `tracer` attached and commits its state
    ///
    /// Trace failures never fail the execution: they are returned in
    /// `TraceOutcome::trace`. An `Err` means the interpreter rejected the
    /// transaction itself.
    pub fn trace_transaction(
        &mut self,
        input: SimulationTx,
        tracer: Tracer,
    ) -> Result<TraceOutcome, EvmError> {
        let tx = self.tx_env(input)?;
        let name = tracer.name().to_string();

        let execution = self.inspect_commit(tx, HookInspector::new(tracer));
        let tracer = self.take_tracer();
        let execution = execution
            .map_err(|e| RuntimeError::ExecutionFailed(format!("Inspector execution failed: {e}")))?;

        let trace = match tracer {
            Some(mut tracer) => tracer.get_result(),
            None => Err(TracerError::Aborted("tracer was detached".to_string())),
        };
        if let Err(err) = &trace {
            warn!(target: "revm_tracers::evm", tracer = %name, error = %err, "trace failed");
        }
        debug!(
            target: "revm_tracers::evm",
            tracer = %name,
            success = execution.is_success(),
            gas_used = execution.gas_used(),
            "transaction traced"
        );
        Ok(TraceOutcome { execution, trace })
    }

    /// Executes a transaction without tracing and commits its state
    pub fn execute_transaction(&mut self, input: SimulationTx) -> Result<ExecutionResult, EvmError> {
        let tx = self.tx_env(input)?;
        let execution = self
            .transact_commit(tx)
            .map_err(|e| RuntimeError::ExecutionFailed(format!("Execution failed: {e}")))?;
        Ok(execution)
    }

    /// Keccak-256 digest of the committed state
    ///
    /// Covers every existing cached account (balance, nonce, code hash) and
    /// its non-zero slots, in address and slot order.
    pub fn state_digest(&mut self) -> B256 {
        let cache = &self.ctx.db().cache;
        let mut addresses: Vec<_> = cache.accounts.keys().copied().collect();
        addresses.sort();

        let mut hasher = Keccak256::new();
        for address in addresses {
            let Some(account) = cache.accounts.get(&address) else {
                continue;
            };
            // cached lookups of missing accounts are not state
            if account.account_state == AccountState::NotExisting {
                continue;
            }
            hasher.update(address);
            hasher.update(account.info.balance.to_be_bytes::<32>());
            hasher.update(account.info.nonce.to_be_bytes());
            hasher.update(account.info.code_hash);

            let mut slots: Vec<_> = account.storage.iter().filter(|(_, value)| !value.is_zero()).collect();
            slots.sort();
            for (slot, value) in slots {
                hasher.update(slot.to_be_bytes::<32>());
                hasher.update(value.to_be_bytes::<32>());
            }
        }
        hasher.finalize()
    }
}

/// One independent trace
#[derive(Debug, Clone)]
pub struct TraceJob {
    pub context: TraceContext,
    pub tx: SimulationTx,
    pub options: TraceOptions,
}

fn run_job(alloc: &GenesisAlloc, job: TraceJob) -> Result<TraceOutcome, EvmError> {
    let TraceJob { context, tx, options } = job;
    let mut evm = create_evm(alloc, &context)?;
    let tracer = create_tracer_with_options(&options, context)?;
    evm.trace_transaction(tx, tracer)
}

/// Traces independent transactions in parallel
///
/// Every job gets its own EVM over a copy of `alloc`, so jobs never observe
/// each other's writes. Results are returned in job order.
///
/// # Example
/// ```rust
/// use revm_tracers::{trace_transactions_concurrently, TraceJob, types::{GenesisAlloc, SimulationTx}};
/// use alloy::primitives::{address, Bytes};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let job = TraceJob {
///     context: Default::default(),
///     tx: SimulationTx::call(
///         address!("00000000000000000000000000000000000000e0"),
///         address!("00000000000000000000000000000000000000a1"),
///         Bytes::new(),
///     ),
///     options: Default::default(),
/// };
/// let results = trace_transactions_concurrently(Arc::new(GenesisAlloc::new()), vec![job]).await;
/// assert!(results[0].is_ok());
/// # }
/// ```
pub async fn trace_transactions_concurrently(
    alloc: Arc<GenesisAlloc>,
    jobs: Vec<TraceJob>,
) -> Vec<Result<TraceOutcome, EvmError>> {
    let handles: Vec<_> = jobs
        .into_iter()
        .map(|job| {
            let alloc = Arc::clone(&alloc);
            tokio::task::spawn_blocking(move || run_job(&alloc, job))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(RuntimeError::Task(e.to_string()).into()),
        };
        results.push(result);
    }
    results
}
