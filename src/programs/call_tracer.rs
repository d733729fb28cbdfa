//! Call tree builder
//!
//! Maintains an explicit stack of open frames: `on_start` pushes, `on_end`
//! pops and attaches the frame to its parent, the last pop becomes the root.
//! `on_fault` seals the faulting frame immediately; the echoed `on_end` of
//! that frame only fills in the created address and, for the root, its gas
//! figures.

use super::call_frame::{CallFrame, CallSchema, CallTraceArtifact};
use crate::{
    errors::{ProgramError, ProtocolViolation},
    host::HostContext,
    traits::TracerProgram,
    types::{Address, Bytes, ExecutionStep, FrameEnd, FrameError, FrameStart, U256},
    utils::{address_utils::create2_address, error_utils::parse_custom_error},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CallTracerConfig {
    /// Record only the root frame
    #[serde(default)]
    pub only_top_call: bool,
}

/// Open frames indexed by depth
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn top_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    /// Pops the top frame
    pub fn pop(&mut self) -> Result<CallFrame, ProtocolViolation> {
        self.frames.pop().ok_or(ProtocolViolation::UnbalancedEnd)
    }

    /// Attaches a sealed frame to the open parent; returns it back when it is the root
    pub fn attach(&mut self, frame: CallFrame) -> Option<CallFrame> {
        match self.frames.last_mut() {
            Some(parent) => {
                parent.calls.push(frame);
                None
            }
            None => Some(frame),
        }
    }
}

#[derive(Debug)]
pub struct CallTracer {
    schema: CallSchema,
    config: CallTracerConfig,
    stack: CallStack,
    root: Option<CallFrame>,
    /// Frame sealed by `on_fault` whose `on_end` is still due
    sealed_pending_end: bool,
    /// Nested frames ignored under `onlyTopCall`
    skipped: usize,
}

impl CallTracer {
    pub fn new(schema: CallSchema, config: CallTracerConfig) -> Self {
        Self {
            schema,
            config,
            stack: CallStack::default(),
            root: None,
            sealed_pending_end: false,
            skipped: 0,
        }
    }

    fn ignores_nested(&self) -> bool {
        self.config.only_top_call && !self.stack.is_empty()
    }

    fn seal(&mut self, frame: CallFrame) {
        if let Some(root) = self.stack.attach(frame) {
            self.root = Some(root);
        }
    }

    /// Most recently sealed frame: the last child of the open parent, or the root
    fn last_sealed_mut(&mut self) -> Option<&mut CallFrame> {
        if self.stack.is_empty() {
            self.root.as_mut()
        } else {
            self.stack.top_mut().and_then(|parent| parent.calls.last_mut())
        }
    }
}

/// Fills in the address reported for a creation frame
fn apply_created(frame: &mut CallFrame, created: Option<Address>) -> Result<(), ProtocolViolation> {
    if let Some(created) = created {
        match frame.to {
            Some(derived) if derived != created => {
                return Err(ProtocolViolation::CreatedAddressMismatch { derived, reported: created });
            }
            _ => frame.to = Some(created),
        }
    }
    Ok(())
}

impl TracerProgram for CallTracer {
    fn on_start(&mut self, _ctx: &mut HostContext<'_>, frame: &FrameStart<'_>) -> Result<(), ProgramError> {
        if self.ignores_nested() {
            self.skipped += 1;
            return Ok(());
        }
        let to = match (frame.to, frame.salt) {
            (Some(to), _) => Some(to),
            (None, Some(salt)) => Some(create2_address(frame.from, salt, frame.input)),
            (None, None) => None,
        };
        self.stack.push(CallFrame::new(
            frame.kind,
            frame.from,
            to,
            Bytes::copy_from_slice(frame.input),
            frame.gas,
            frame.value,
        ));
        Ok(())
    }

    fn on_fault(
        &mut self,
        _ctx: &mut HostContext<'_>,
        step: &ExecutionStep<'_>,
        reason: &str,
    ) -> Result<(), ProgramError> {
        if self.skipped > 0 {
            return Ok(());
        }
        let mut frame = self.stack.pop()?;
        frame.gas_used = frame.gas.saturating_sub(step.gas);
        frame.error = Some(reason.to_string());
        self.sealed_pending_end = true;
        self.seal(frame);
        Ok(())
    }

    fn on_end(&mut self, _ctx: &mut HostContext<'_>, end: &FrameEnd<'_>) -> Result<(), ProgramError> {
        if self.skipped > 0 {
            self.skipped -= 1;
            return Ok(());
        }
        if self.sealed_pending_end {
            self.sealed_pending_end = false;
            let is_root = self.stack.is_empty();
            let frame = self.last_sealed_mut().ok_or(ProtocolViolation::UnbalancedEnd)?;
            apply_created(frame, end.created)?;
            if is_root {
                frame.gas_used = end.gas_used;
            }
            return Ok(());
        }

        let mut frame = self.stack.pop()?;
        apply_created(&mut frame, end.created)?;
        frame.output = Bytes::copy_from_slice(end.output);
        frame.gas_used = end.gas_used;
        if let Some(error) = end.error {
            if matches!(error, FrameError::Reverted) {
                frame.revert_reason = parse_custom_error(end.output);
            }
            frame.error = Some(error.to_string());
        }
        self.seal(frame);
        Ok(())
    }

    fn on_self_destruct(
        &mut self,
        _ctx: &mut HostContext<'_>,
        address: Address,
        beneficiary: Address,
        value: U256,
    ) -> Result<(), ProgramError> {
        if self.config.only_top_call {
            return Ok(());
        }
        let parent = self
            .stack
            .top_mut()
            .ok_or(ProtocolViolation::EventBeforeStart { event: "on_self_destruct" })?;
        parent.calls.push(CallFrame::self_destruct(address, beneficiary, value));
        Ok(())
    }

    fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| ProgramError::Custom("call tree has no root frame".to_string()))?;
        serde_json::to_value(CallTraceArtifact::from_frame(root, self.schema))
            .map_err(|e| ProgramError::Encoding(e.to_string()))
    }
}
