//! Sandboxed tracer program host
//!
//! Every tracer program runs behind `ProgramHost`, which:
//! - charges the per-trace `ExecutionBudget` before each hook
//! - catches panics and returned errors at the hook boundary
//! - drops the program after its first fault so later events are ignored
//!
//! Programs only see a `HostContext`: read-only state queries plus the trace
//! context. Nothing reachable from it can mutate chain state.

pub mod budget;
pub mod registry;
pub mod state;

pub use budget::{ExecutionBudget, DEFAULT_TIMEOUT};
pub use registry::{
    create_tracer, create_tracer_with_options, install_registry, parse_config, registry,
    ProgramFactory, RegistryBuilder, TracerRegistry,
};
pub use state::{DetachedState, StaticAccount, StaticState};

use crate::{
    errors::{HostFault, ProgramError, TracerError},
    traits::{StateView, TracerProgram},
    types::{AccountSnapshot, Address, Bytes, TraceContext, U256},
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Read-only capabilities handed to a program hook
pub struct HostContext<'a> {
    state: &'a mut dyn StateView,
    trace: &'a TraceContext,
}

impl<'a> HostContext<'a> {
    pub fn new(state: &'a mut dyn StateView, trace: &'a TraceContext) -> Self {
        Self { state, trace }
    }

    /// Block and transaction context of the trace
    pub fn trace_context(&self) -> &TraceContext {
        self.trace
    }

    /// Current account, `None` when it does not exist
    pub fn account(&mut self, address: Address) -> Result<Option<AccountSnapshot>, ProgramError> {
        Ok(self.state.account(address)?)
    }

    pub fn balance(&mut self, address: Address) -> Result<U256, ProgramError> {
        Ok(self.account(address)?.map(|a| a.balance).unwrap_or_default())
    }

    pub fn nonce(&mut self, address: Address) -> Result<u64, ProgramError> {
        Ok(self.account(address)?.map(|a| a.nonce).unwrap_or_default())
    }

    pub fn code(&mut self, address: Address) -> Result<Bytes, ProgramError> {
        Ok(self.account(address)?.map(|a| a.code).unwrap_or_default())
    }

    pub fn exists(&mut self, address: Address) -> Result<bool, ProgramError> {
        Ok(self.account(address)?.is_some())
    }

    pub fn storage(&mut self, address: Address, slot: U256) -> Result<U256, ProgramError> {
        Ok(self.state.storage(address, slot)?)
    }

    /// Account as it was before the transaction
    pub fn original_account(
        &mut self,
        address: Address,
    ) -> Result<Option<AccountSnapshot>, ProgramError> {
        Ok(self.state.original_account(address)?)
    }

    /// Storage slot as it was before the transaction
    pub fn original_storage(&mut self, address: Address, slot: U256) -> Result<U256, ProgramError> {
        Ok(self.state.original_storage(address, slot)?)
    }
}

/// Runs one tracer program inside the budget and panic boundary
pub struct ProgramHost {
    name: String,
    program: Option<Box<dyn TracerProgram>>,
    budget: ExecutionBudget,
}

impl std::fmt::Debug for ProgramHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramHost")
            .field("name", &self.name)
            .field("active", &self.program.is_some())
            .field("budget", &self.budget)
            .finish()
    }
}

impl ProgramHost {
    pub fn new(name: impl Into<String>, program: Box<dyn TracerProgram>, budget: ExecutionBudget) -> Self {
        Self { name: name.into(), program: Some(program), budget }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the program is still receiving events
    pub fn is_active(&self) -> bool {
        self.program.is_some()
    }

    pub fn budget(&self) -> &ExecutionBudget {
        &self.budget
    }

    /// Invokes one hook
    ///
    /// A fault drops the program; every later call is a no-op returning `Ok`.
    pub fn dispatch<F>(
        &mut self,
        hook: &'static str,
        state: &mut dyn StateView,
        trace: &TraceContext,
        f: F,
    ) -> Result<(), TracerError>
    where
        F: FnOnce(&mut dyn TracerProgram, &mut HostContext<'_>) -> Result<(), ProgramError>,
    {
        if self.program.is_none() {
            return Ok(());
        }
        if let Err(fault) = self.budget.charge() {
            warn!(target: "revm_tracers::host", tracer = %self.name, %fault, "budget exhausted");
            self.discard();
            return Err(fault.into());
        }
        let Some(program) = self.program.as_mut() else {
            return Ok(());
        };

        let mut ctx = HostContext::new(state, trace);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(program.as_mut(), &mut ctx)));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                let err = program_failure(hook, err);
                warn!(target: "revm_tracers::host", tracer = %self.name, hook, %err, "program failed");
                self.discard();
                Err(err)
            }
            Err(payload) => {
                let fault = HostFault::Panicked { hook, message: panic_message(payload.as_ref()) };
                warn!(target: "revm_tracers::host", tracer = %self.name, %fault, "program panicked");
                self.discard();
                Err(fault.into())
            }
        }
    }

    /// Asks the program for its artifact
    pub fn result(&mut self) -> Result<serde_json::Value, TracerError> {
        let Some(program) = self.program.as_mut() else {
            return Err(HostFault::Program {
                hook: "result",
                message: "program is no longer available".to_string(),
            }
            .into());
        };
        match panic::catch_unwind(AssertUnwindSafe(|| program.result())) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(program_failure("result", err)),
            Err(payload) => Err(HostFault::Panicked {
                hook: "result",
                message: panic_message(payload.as_ref()),
            }
            .into()),
        }
    }

    /// Drops the program
    pub fn discard(&mut self) {
        if self.program.take().is_some() {
            debug!(target: "revm_tracers::host", tracer = %self.name, "program discarded");
        }
    }
}

fn program_failure(hook: &'static str, err: ProgramError) -> TracerError {
    match err {
        ProgramError::Protocol(violation) => TracerError::Protocol(violation),
        ProgramError::Encoding(message) => TracerError::Serialization(message),
        other => HostFault::Program { hook, message: other.to_string() }.into(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::ProtocolViolation,
        types::{CallKind, FrameStart},
    };

    struct Flaky {
        calls: usize,
        fail_on: usize,
        panic: bool,
    }

    impl TracerProgram for Flaky {
        fn on_start(&mut self, _ctx: &mut HostContext<'_>, _frame: &FrameStart<'_>) -> Result<(), ProgramError> {
            self.calls += 1;
            if self.calls == self.fail_on {
                if self.panic {
                    panic!("boom");
                }
                return Err(ProgramError::Custom("bad frame".to_string()));
            }
            Ok(())
        }

        fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
            Ok(serde_json::json!(self.calls))
        }
    }

    fn start(host: &mut ProgramHost) -> Result<(), TracerError> {
        let frame = FrameStart {
            kind: CallKind::Call,
            from: Address::ZERO,
            to: Some(Address::ZERO),
            input: &[],
            gas: 0,
            value: U256::ZERO,
            salt: None,
        };
        host.dispatch("on_start", &mut StaticState::new(), &TraceContext::default(), |p, ctx| {
            p.on_start(ctx, &frame)
        })
    }

    #[test]
    fn test_program_error_becomes_fault() {
        let program = Flaky { calls: 0, fail_on: 2, panic: false };
        let mut host = ProgramHost::new("flaky", Box::new(program), ExecutionBudget::unlimited());
        assert!(start(&mut host).is_ok());
        assert_eq!(
            start(&mut host),
            Err(TracerError::HostFault(HostFault::Program {
                hook: "on_start",
                message: "bad frame".to_string()
            }))
        );
        assert!(!host.is_active());
        // later events are ignored
        assert!(start(&mut host).is_ok());
    }

    #[test]
    fn test_panic_is_caught() {
        let program = Flaky { calls: 0, fail_on: 1, panic: true };
        let mut host = ProgramHost::new("flaky", Box::new(program), ExecutionBudget::unlimited());
        assert_eq!(
            start(&mut host),
            Err(TracerError::HostFault(HostFault::Panicked {
                hook: "on_start",
                message: "boom".to_string()
            }))
        );
        assert!(host.result().is_err());
    }

    #[test]
    fn test_budget_exhaustion() {
        let program = Flaky { calls: 0, fail_on: usize::MAX, panic: false };
        let mut host =
            ProgramHost::new("flaky", Box::new(program), ExecutionBudget::new(Some(2), None));
        assert!(start(&mut host).is_ok());
        assert!(start(&mut host).is_ok());
        assert_eq!(
            start(&mut host),
            Err(TracerError::HostFault(HostFault::StepLimit { limit: 2 }))
        );
    }

    struct TxIndexReader(Option<usize>);

    impl TracerProgram for TxIndexReader {
        fn on_start(&mut self, ctx: &mut HostContext<'_>, _frame: &FrameStart<'_>) -> Result<(), ProgramError> {
            self.0 = Some(ctx.trace_context().tx_index);
            Ok(())
        }

        fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
            Ok(serde_json::json!(self.0))
        }
    }

    #[test]
    fn test_trace_context_is_visible_to_programs() {
        let mut host =
            ProgramHost::new("txIndex", Box::new(TxIndexReader(None)), ExecutionBudget::unlimited());
        let context = TraceContext { tx_index: 7, ..Default::default() };
        let frame = FrameStart {
            kind: CallKind::Call,
            from: Address::ZERO,
            to: Some(Address::ZERO),
            input: &[],
            gas: 0,
            value: U256::ZERO,
            salt: None,
        };
        host.dispatch("on_start", &mut StaticState::new(), &context, |p, ctx| p.on_start(ctx, &frame))
            .unwrap();
        assert_eq!(host.result(), Ok(serde_json::json!(7)));
    }

    #[test]
    fn test_protocol_errors_keep_their_kind() {
        assert_eq!(
            program_failure("on_end", ProgramError::Protocol(ProtocolViolation::UnbalancedEnd)),
            TracerError::Protocol(ProtocolViolation::UnbalancedEnd)
        );
        assert_eq!(
            program_failure("result", ProgramError::Encoding("nope".to_string())),
            TracerError::Serialization("nope".to_string())
        );
    }
}
