//! revm `Inspector` implementation of the bridge

use super::{BridgeFrame, HookInspector, RevmState, StepMark};
use crate::{
    host::DetachedState,
    traits::{Hooks, StateView},
    types::{
        Address, Bytes, CallKind, ExecutionStep, FrameEnd, FrameError, FrameStart, MemoryView,
        StackView, U256,
    },
    utils::{address_utils::{create2_address, word_to_b256}, error_utils::frame_error},
};
use revm::{
    context::ContextTr,
    context_interface::Transaction as TransactionTr,
    inspector::JournalExt,
    interpreter::{
        interpreter::EthInterpreter,
        interpreter_types::{Jumps, LoopControl, MemoryTr, ReturnData},
        CallInputs, CallOutcome, CallScheme, CreateInputs, CreateOutcome, CreateScheme,
        InstructionResult, Interpreter,
    },
    Inspector,
};
use tracing::trace;

/// Result of a finished frame, as reported by revm
struct FrameResult<'a> {
    result: InstructionResult,
    output: &'a [u8],
    spent: u64,
    remaining: u64,
    created: Option<Address>,
}

impl<H: Hooks> HookInspector<H> {
    /// Gas offered to a new frame and the intrinsic gas charged before it
    fn offered_gas<CTX: ContextTr>(&self, context: &CTX, gas_limit: u64) -> (u64, u64) {
        if self.frames.is_empty() {
            let tx_gas = context.tx().gas_limit();
            (tx_gas, tx_gas.saturating_sub(gas_limit))
        } else {
            (gas_limit, 0)
        }
    }

    /// Emits the end of the innermost frame
    ///
    /// revm runs `step` before an opcode executes, so the opcode that halts a
    /// frame has already been delivered as `on_step` when the halt becomes
    /// known. The fault is then reported for that same pc/op with remaining
    /// gas 0, right before `on_end`.
    fn finish_frame<CTX>(&mut self, context: &mut CTX, end: FrameResult<'_>)
    where
        CTX: ContextTr,
        CTX::Journal: JournalExt,
    {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let depth = self.frames.len();
        let Some(hooks) = self.hooks.as_mut() else {
            return;
        };

        let error = frame_error(end.result);
        // a frame that halted while executing loses all its gas
        let (spent, remaining) = match (&error, frame.last_step) {
            (Some(FrameError::Halted(_)), Some(_)) => (frame.gas_limit, 0),
            _ => (end.spent, end.remaining),
        };
        let mut state = RevmState::new(context);

        if let (Some(FrameError::Halted(reason)), Some(mark)) = (&error, frame.last_step) {
            let step = ExecutionStep {
                pc: mark.pc,
                op: mark.op,
                gas: remaining,
                cost: 0,
                depth,
                address: frame.address,
                stack: StackView::new(&[]),
                memory: MemoryView::new(&[]),
                return_data: &[],
                error: Some(reason.as_str()),
            };
            hooks.on_fault(&mut state, &step, reason);
        }

        let created = match frame.deploys {
            Some(derived) => end.created.or(Some(derived)),
            None => None,
        };
        hooks.on_end(
            &mut state,
            FrameEnd {
                output: end.output,
                gas_used: frame.intrinsic + spent,
                error: error.as_ref(),
                created,
            },
        );
    }
}

impl<CTX, H> Inspector<CTX, EthInterpreter> for HookInspector<H>
where
    CTX: ContextTr,
    CTX::Journal: JournalExt,
    H: Hooks,
{
    fn step(&mut self, interp: &mut Interpreter<EthInterpreter>, context: &mut CTX) {
        let Some(depth) = self.frames.len().checked_sub(1) else {
            return;
        };
        let Some(hooks) = self.hooks.as_mut() else {
            return;
        };
        let Some(frame) = self.frames.last_mut() else {
            return;
        };

        let pc = interp.bytecode.pc() as u64;
        let op = interp.bytecode.opcode();
        frame.last_step = Some(StepMark { pc, op });

        let memory = MemoryTr::slice(&interp.memory, 0..MemoryTr::size(&interp.memory));
        let return_data: &[u8] = ReturnData::buffer(&interp.return_data);
        let step = ExecutionStep {
            pc,
            op,
            gas: interp.control.gas().remaining(),
            cost: 0,
            depth,
            address: frame.address,
            stack: StackView::new(interp.stack.data()),
            memory: MemoryView::new(&memory),
            return_data,
            error: None,
        };
        hooks.on_step(&mut RevmState::new(context), &step);
    }

    fn call(&mut self, context: &mut CTX, inputs: &mut CallInputs) -> Option<CallOutcome> {
        self.hooks.as_ref()?;

        let (kind, from, to) = match inputs.scheme {
            CallScheme::StaticCall => (CallKind::StaticCall, inputs.caller, inputs.target_address),
            CallScheme::CallCode => (CallKind::CallCode, inputs.caller, inputs.bytecode_address),
            CallScheme::DelegateCall => {
                (CallKind::DelegateCall, inputs.target_address, inputs.bytecode_address)
            }
            _ => (CallKind::Call, inputs.caller, inputs.target_address),
        };
        let input: Bytes = inputs.input.bytes(context);
        let (gas, intrinsic) = self.offered_gas(context, inputs.gas_limit);
        trace!(target: "revm_tracers::inspector", %kind, %from, %to, gas, "call");

        self.frames.push(BridgeFrame {
            address: inputs.target_address,
            gas_limit: inputs.gas_limit,
            intrinsic,
            deploys: None,
            last_step: None,
        });
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_start(
                &mut RevmState::new(context),
                FrameStart {
                    kind,
                    from,
                    to: Some(to),
                    input: &input,
                    gas,
                    value: inputs.call_value(),
                    salt: None,
                },
            );
        }
        None
    }

    fn call_end(&mut self, context: &mut CTX, _inputs: &CallInputs, outcome: &mut CallOutcome) {
        let result = &outcome.result;
        self.finish_frame(
            context,
            FrameResult {
                result: result.result,
                output: &result.output,
                spent: result.gas.spent(),
                remaining: result.gas.remaining(),
                created: None,
            },
        );
    }

    fn create(&mut self, context: &mut CTX, inputs: &mut CreateInputs) -> Option<CreateOutcome> {
        self.hooks.as_ref()?;

        let (kind, salt, deploys) = match inputs.scheme {
            CreateScheme::Create2 { salt } => {
                let salt = word_to_b256(salt);
                (CallKind::Create2, Some(salt), create2_address(inputs.caller, salt, &inputs.init_code))
            }
            _ => {
                // the caller's nonce is bumped after this callback
                let nonce = RevmState::new(context)
                    .account(inputs.caller)
                    .ok()
                    .flatten()
                    .map(|account| account.nonce)
                    .unwrap_or_default();
                (CallKind::Create, None, inputs.caller.create(nonce))
            }
        };
        let (gas, intrinsic) = self.offered_gas(context, inputs.gas_limit);
        trace!(target: "revm_tracers::inspector", %kind, from = %inputs.caller, %deploys, gas, "create");

        self.frames.push(BridgeFrame {
            address: deploys,
            gas_limit: inputs.gas_limit,
            intrinsic,
            deploys: Some(deploys),
            last_step: None,
        });
        let init_code = inputs.init_code.clone();
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_start(
                &mut RevmState::new(context),
                FrameStart {
                    kind,
                    from: inputs.caller,
                    to: None,
                    input: &init_code,
                    gas,
                    value: inputs.value,
                    salt,
                },
            );
        }
        None
    }

    fn create_end(&mut self, context: &mut CTX, _inputs: &CreateInputs, outcome: &mut CreateOutcome) {
        let result = &outcome.result;
        self.finish_frame(
            context,
            FrameResult {
                result: result.result,
                output: &result.output,
                spent: result.gas.spent(),
                remaining: result.gas.remaining(),
                created: outcome.address,
            },
        );
    }

    fn selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_self_destruct(&mut DetachedState, contract, target, value);
        }
    }
}
