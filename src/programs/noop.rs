use crate::{errors::ProgramError, traits::TracerProgram};

/// Observes nothing and returns `{}`
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl TracerProgram for NoopTracer {
    fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
        Ok(serde_json::json!({}))
    }
}
