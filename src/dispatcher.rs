//! Hook dispatcher
//!
//! `Tracer` is the per-transaction receiver of the hook protocol. It checks
//! event ordering and depth, forwards every event in order to the sandboxed
//! program, and records the first failure so that `get_result()` can
//! surface it. Nothing it does can fail the transaction itself.

use crate::{
    errors::{ProtocolViolation, TracerError},
    finalizer::ResultFinalizer,
    host::{ExecutionBudget, ProgramHost},
    traits::{Hooks, StateView, TracerProgram},
    types::{Address, Bytes, ExecutionStep, FrameEnd, FrameStart, TraceContext, U256},
};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameMarker {
    Running,
    Faulted,
}

/// Tracer for one transaction
#[derive(Debug)]
pub struct Tracer {
    name: String,
    context: TraceContext,
    host: ProgramHost,
    frames: Vec<FrameMarker>,
    started: bool,
    finalizer: ResultFinalizer,
}

impl Tracer {
    pub fn new(
        name: impl Into<String>,
        context: TraceContext,
        program: Box<dyn TracerProgram>,
        budget: ExecutionBudget,
    ) -> Self {
        let name = name.into();
        Self {
            host: ProgramHost::new(name.clone(), program, budget),
            name,
            context,
            frames: Vec::new(),
            started: false,
            finalizer: ResultFinalizer::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// Number of frames currently open
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether the trace has a result (success or failure) ready or taken
    pub fn is_complete(&self) -> bool {
        self.finalizer.is_settled()
    }

    /// Cancels the trace
    ///
    /// Open frames are discarded and later events ignored; `get_result()`
    /// returns `TracerError::Aborted`. No effect once the trace completed.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.finalizer.is_pending() {
            self.fail(TracerError::Aborted(reason.into()));
        }
    }

    /// Returns the encoded artifact, once
    pub fn get_result(&mut self) -> Result<Bytes, TracerError> {
        self.finalizer.finalize(&mut self.host)
    }

    fn fail(&mut self, err: TracerError) {
        warn!(target: "revm_tracers::dispatcher", tracer = %self.name, %err, "trace failed");
        self.frames.clear();
        self.host.discard();
        self.finalizer.fail(err);
    }

    fn violate(&mut self, violation: ProtocolViolation) {
        self.fail(TracerError::Protocol(violation));
    }

    /// Checks that the trace still accepts events
    fn accepting(&mut self, event: &'static str) -> bool {
        if self.finalizer.is_failed() {
            return false;
        }
        if self.finalizer.is_settled() {
            self.violate(ProtocolViolation::EventAfterEnd { event });
            return false;
        }
        if event != "on_start" && self.frames.is_empty() {
            let violation = if self.started {
                ProtocolViolation::EventAfterEnd { event }
            } else {
                ProtocolViolation::EventBeforeStart { event }
            };
            self.violate(violation);
            return false;
        }
        true
    }

    /// Checks a step or fault against the open frame
    fn check_step(&mut self, step: &ExecutionStep<'_>) -> bool {
        let expected = self.frames.len() - 1;
        if step.depth != expected {
            self.violate(ProtocolViolation::DepthMismatch { expected, actual: step.depth });
            return false;
        }
        true
    }

    fn settle(&mut self, outcome: Result<(), TracerError>) {
        if let Err(err) = outcome {
            self.fail(err);
        }
    }
}

impl Hooks for Tracer {
    fn on_start(&mut self, state: &mut dyn StateView, frame: FrameStart<'_>) {
        if !self.accepting("on_start") {
            return;
        }
        if self.frames.last() == Some(&FrameMarker::Faulted) {
            let depth = self.frames.len() - 1;
            return self.violate(ProtocolViolation::StartAfterFault { depth });
        }
        if !frame.kind.is_create() && frame.to.is_none() {
            return self.violate(ProtocolViolation::MissingTarget { kind: frame.kind.as_str() });
        }

        if !self.started {
            debug!(
                target: "revm_tracers::dispatcher",
                tracer = %self.name,
                tx_index = self.context.tx_index,
                from = %frame.from,
                "trace started"
            );
        }
        self.started = true;
        self.frames.push(FrameMarker::Running);
        let outcome = self
            .host
            .dispatch("on_start", state, &self.context, |program, ctx| program.on_start(ctx, &frame));
        self.settle(outcome);
    }

    fn on_step(&mut self, state: &mut dyn StateView, step: &ExecutionStep<'_>) {
        if !self.accepting("on_step") || !self.check_step(step) {
            return;
        }
        if self.frames.last() == Some(&FrameMarker::Faulted) {
            return self.violate(ProtocolViolation::StepAfterFault { depth: step.depth });
        }
        trace!(target: "revm_tracers::dispatcher", pc = step.pc, op = step.op, depth = step.depth, "step");
        let outcome = self
            .host
            .dispatch("on_step", state, &self.context, |program, ctx| program.on_step(ctx, step));
        self.settle(outcome);
    }

    fn on_fault(&mut self, state: &mut dyn StateView, step: &ExecutionStep<'_>, reason: &str) {
        if !self.accepting("on_fault") || !self.check_step(step) {
            return;
        }
        match self.frames.last_mut() {
            Some(marker @ FrameMarker::Running) => *marker = FrameMarker::Faulted,
            _ => return self.violate(ProtocolViolation::DuplicateFault { depth: step.depth }),
        }
        debug!(target: "revm_tracers::dispatcher", depth = step.depth, reason, "frame faulted");
        let outcome = self.host.dispatch("on_fault", state, &self.context, |program, ctx| {
            program.on_fault(ctx, step, reason)
        });
        self.settle(outcome);
    }

    fn on_end(&mut self, state: &mut dyn StateView, frame: FrameEnd<'_>) {
        if !self.accepting("on_end") {
            return;
        }
        if self.frames.pop().is_none() {
            return self.violate(ProtocolViolation::UnbalancedEnd);
        }
        let outcome = self
            .host
            .dispatch("on_end", state, &self.context, |program, ctx| program.on_end(ctx, &frame));
        self.settle(outcome);

        if self.frames.is_empty() && self.finalizer.is_pending() {
            debug!(target: "revm_tracers::dispatcher", tracer = %self.name, gas_used = frame.gas_used, "trace complete");
            self.finalizer.complete();
        }
    }

    fn on_self_destruct(
        &mut self,
        state: &mut dyn StateView,
        address: Address,
        beneficiary: Address,
        value: U256,
    ) {
        if !self.accepting("on_self_destruct") {
            return;
        }
        let outcome = self.host.dispatch("on_self_destruct", state, &self.context, |program, ctx| {
            program.on_self_destruct(ctx, address, beneficiary, value)
        });
        self.settle(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::{HostFault, ProgramError},
        host::{HostContext, StaticState},
        types::{CallKind, MemoryView, StackView},
    };
    use std::sync::{Arc, Mutex};

    /// Records the hooks it receives
    #[derive(Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl TracerProgram for Recorder {
        fn on_start(&mut self, _ctx: &mut HostContext<'_>, frame: &FrameStart<'_>) -> Result<(), ProgramError> {
            self.events.lock().unwrap().push(format!("start:{}", frame.kind));
            Ok(())
        }

        fn on_step(&mut self, _ctx: &mut HostContext<'_>, step: &ExecutionStep<'_>) -> Result<(), ProgramError> {
            self.events.lock().unwrap().push(format!("step:{}", step.depth));
            Ok(())
        }

        fn on_fault(&mut self, _ctx: &mut HostContext<'_>, _step: &ExecutionStep<'_>, reason: &str) -> Result<(), ProgramError> {
            self.events.lock().unwrap().push(format!("fault:{reason}"));
            Ok(())
        }

        fn on_end(&mut self, _ctx: &mut HostContext<'_>, _frame: &FrameEnd<'_>) -> Result<(), ProgramError> {
            self.events.lock().unwrap().push("end".to_string());
            Ok(())
        }

        fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
            Ok(serde_json::json!(self.events.lock().unwrap().len()))
        }
    }

    fn recording_tracer() -> (Tracer, Arc<Mutex<Vec<String>>>) {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        let tracer = Tracer::new(
            "recorder",
            TraceContext::default(),
            Box::new(recorder),
            ExecutionBudget::unlimited(),
        );
        (tracer, events)
    }

    fn start(kind: CallKind) -> FrameStart<'static> {
        FrameStart {
            kind,
            from: Address::ZERO,
            to: Some(Address::with_last_byte(1)),
            input: &[],
            gas: 100,
            value: U256::ZERO,
            salt: None,
        }
    }

    fn end() -> FrameEnd<'static> {
        FrameEnd { output: &[], gas_used: 10, error: None, created: None }
    }

    fn step(depth: usize) -> ExecutionStep<'static> {
        ExecutionStep {
            pc: 0,
            op: 0x00,
            gas: 50,
            cost: 0,
            depth,
            address: Address::with_last_byte(1),
            stack: StackView::new(&[]),
            memory: MemoryView::new(&[]),
            return_data: &[],
            error: None,
        }
    }

    #[test]
    fn test_events_forwarded_in_order() {
        let (mut tracer, events) = recording_tracer();
        let mut state = StaticState::new();

        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.on_step(&mut state, &step(0));
        tracer.on_start(&mut state, start(CallKind::StaticCall));
        tracer.on_step(&mut state, &step(1));
        tracer.on_fault(&mut state, &step(1), "out of gas");
        tracer.on_end(&mut state, end());
        tracer.on_step(&mut state, &step(0));
        assert!(!tracer.is_complete());
        tracer.on_end(&mut state, end());

        assert!(tracer.is_complete());
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "start:CALL",
                "step:0",
                "start:STATICCALL",
                "step:1",
                "fault:out of gas",
                "end",
                "step:0",
                "end"
            ]
        );
        assert_eq!(tracer.get_result().unwrap(), Bytes::from(b"8".to_vec()));
        assert_eq!(tracer.get_result(), Err(TracerError::AlreadyFinalized));
    }

    #[test]
    fn test_result_before_end_is_not_ready() {
        let (mut tracer, _) = recording_tracer();
        let mut state = StaticState::new();
        assert_eq!(tracer.get_result(), Err(TracerError::NotReady));
        tracer.on_start(&mut state, start(CallKind::Call));
        assert_eq!(tracer.get_result(), Err(TracerError::NotReady));
        tracer.on_end(&mut state, end());
        assert!(tracer.get_result().is_ok());
    }

    #[test]
    fn test_depth_mismatch() {
        let (mut tracer, _) = recording_tracer();
        let mut state = StaticState::new();
        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.on_step(&mut state, &step(1));
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::Protocol(ProtocolViolation::DepthMismatch { expected: 0, actual: 1 }))
        );
    }

    #[test]
    fn test_event_before_start() {
        let (mut tracer, events) = recording_tracer();
        let mut state = StaticState::new();
        tracer.on_step(&mut state, &step(0));
        // the trace is settled on the violation; later events are ignored
        tracer.on_start(&mut state, start(CallKind::Call));
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::Protocol(ProtocolViolation::EventBeforeStart { event: "on_step" }))
        );
    }

    #[test]
    fn test_unbalanced_and_late_events() {
        let (mut tracer, _) = recording_tracer();
        let mut state = StaticState::new();
        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.on_end(&mut state, end());
        tracer.on_end(&mut state, end());
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::Protocol(ProtocolViolation::EventAfterEnd { event: "on_end" }))
        );
    }

    #[test]
    fn test_fault_rules() {
        let (mut tracer, _) = recording_tracer();
        let mut state = StaticState::new();
        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.on_fault(&mut state, &step(0), "invalid opcode");
        tracer.on_step(&mut state, &step(0));
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::Protocol(ProtocolViolation::StepAfterFault { depth: 0 }))
        );

        let (mut tracer, _) = recording_tracer();
        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.on_fault(&mut state, &step(0), "invalid opcode");
        tracer.on_fault(&mut state, &step(0), "invalid opcode");
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::Protocol(ProtocolViolation::DuplicateFault { depth: 0 }))
        );

        let (mut tracer, _) = recording_tracer();
        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.on_fault(&mut state, &step(0), "invalid opcode");
        tracer.on_start(&mut state, start(CallKind::Call));
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::Protocol(ProtocolViolation::StartAfterFault { depth: 0 }))
        );
    }

    #[test]
    fn test_missing_call_target() {
        let (mut tracer, _) = recording_tracer();
        let mut state = StaticState::new();
        tracer.on_start(&mut state, FrameStart { to: None, ..start(CallKind::DelegateCall) });
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::Protocol(ProtocolViolation::MissingTarget { kind: "DELEGATECALL" }))
        );
    }

    #[test]
    fn test_abort_settles_trace() {
        let (mut tracer, events) = recording_tracer();
        let mut state = StaticState::new();
        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.on_start(&mut state, start(CallKind::Call));
        tracer.abort("client went away");
        assert!(tracer.is_complete());
        assert_eq!(tracer.depth(), 0);

        // the source keeps executing; nothing more reaches the program
        tracer.on_end(&mut state, end());
        tracer.on_end(&mut state, end());
        assert_eq!(events.lock().unwrap().len(), 2);
        assert_eq!(tracer.get_result(), Err(TracerError::Aborted("client went away".to_string())));
    }

    #[test]
    fn test_budget_exhaustion_settles_trace() {
        let mut tracer = Tracer::new(
            "recorder",
            TraceContext::default(),
            Box::new(Recorder::default()),
            ExecutionBudget::new(Some(3), None),
        );
        let mut state = StaticState::new();
        tracer.on_start(&mut state, start(CallKind::Call));
        for _ in 0..10 {
            tracer.on_step(&mut state, &step(0));
        }
        tracer.on_end(&mut state, end());
        assert_eq!(
            tracer.get_result(),
            Err(TracerError::HostFault(HostFault::StepLimit { limit: 3 }))
        );
    }
}
