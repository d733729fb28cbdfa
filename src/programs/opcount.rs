//! Executed opcode counter
//!
//! Counts `on_step` only; a fault reported in place of a step is not counted.

use crate::{
    errors::ProgramError, host::HostContext, traits::TracerProgram, types::ExecutionStep,
};

#[derive(Debug, Default)]
pub struct OpcountTracer {
    count: u64,
}

impl TracerProgram for OpcountTracer {
    fn on_step(&mut self, _ctx: &mut HostContext<'_>, _step: &ExecutionStep<'_>) -> Result<(), ProgramError> {
        self.count += 1;
        Ok(())
    }

    fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
        Ok(serde_json::json!(self.count))
    }
}
