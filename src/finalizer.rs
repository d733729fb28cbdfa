//! Result finalizer
//!
//! Three states: `Pending` until the root frame ends (or the trace fails),
//! `Ready` holding the outcome, `Taken` once `finalize` handed it out.

use crate::{errors::TracerError, host::ProgramHost, types::Bytes};
use serde_json::Value;

/// Largest integer a JSON consumer using IEEE doubles represents exactly
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FinalizerState {
    Pending,
    Ready(Result<(), TracerError>),
    Taken,
}

#[derive(Debug)]
pub struct ResultFinalizer {
    state: FinalizerState,
}

impl Default for ResultFinalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFinalizer {
    pub fn new() -> Self {
        Self { state: FinalizerState::Pending }
    }

    pub fn is_pending(&self) -> bool {
        self.state == FinalizerState::Pending
    }

    /// Whether an outcome has been recorded (taken or not)
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Whether the trace settled on an error
    pub fn is_failed(&self) -> bool {
        matches!(self.state, FinalizerState::Ready(Err(_)))
    }

    /// Records a successful completion; no-op unless pending
    pub fn complete(&mut self) {
        if self.is_pending() {
            self.state = FinalizerState::Ready(Ok(()));
        }
    }

    /// Records a failure; the first failure wins and a taken result is never replaced
    pub fn fail(&mut self, err: TracerError) {
        match self.state {
            FinalizerState::Pending | FinalizerState::Ready(Ok(())) => {
                self.state = FinalizerState::Ready(Err(err));
            }
            _ => {}
        }
    }

    /// Hands out the encoded artifact, once
    pub fn finalize(&mut self, host: &mut ProgramHost) -> Result<Bytes, TracerError> {
        match std::mem::replace(&mut self.state, FinalizerState::Taken) {
            FinalizerState::Pending => {
                self.state = FinalizerState::Pending;
                Err(TracerError::NotReady)
            }
            FinalizerState::Taken => Err(TracerError::AlreadyFinalized),
            FinalizerState::Ready(Err(err)) => Err(err),
            FinalizerState::Ready(Ok(())) => {
                let value = host.result()?;
                host.discard();
                encode(&value)
            }
        }
    }
}

/// Encodes an artifact, rejecting numbers JSON consumers cannot represent
pub fn encode(value: &Value) -> Result<Bytes, TracerError> {
    ensure_representable(value)?;
    serde_json::to_vec(value).map(Bytes::from).map_err(|e| TracerError::Serialization(e.to_string()))
}

fn ensure_representable(value: &Value) -> Result<(), TracerError> {
    match value {
        Value::Number(number) => {
            let magnitude = number
                .as_u64()
                .or_else(|| number.as_i64().map(|n| n.unsigned_abs()));
            match magnitude {
                Some(magnitude) if magnitude > MAX_SAFE_INTEGER => Err(TracerError::Serialization(
                    format!("integer {number} exceeds the exactly representable JSON range"),
                )),
                _ => Ok(()),
            }
        }
        Value::Array(items) => items.iter().try_for_each(ensure_representable),
        Value::Object(map) => map.values().try_for_each(ensure_representable),
        _ => Ok(()),
    }
}
