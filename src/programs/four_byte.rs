//! Function selector counter
//!
//! Counts `0x<selector>-<calldata size>` pairs for every call into a
//! contract, the root included. Creations and precompiles are skipped.

use crate::{
    errors::ProgramError,
    host::HostContext,
    traits::TracerProgram,
    types::FrameStart,
    utils::address_utils::is_precompile,
};
use alloy::hex;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct FourByteTracer {
    ids: BTreeMap<String, u64>,
}

impl TracerProgram for FourByteTracer {
    fn on_start(&mut self, _ctx: &mut HostContext<'_>, frame: &FrameStart<'_>) -> Result<(), ProgramError> {
        if frame.kind.is_create() || frame.input.len() < 4 {
            return Ok(());
        }
        if frame.to.is_some_and(is_precompile) {
            return Ok(());
        }
        let key = format!("{}-{}", hex::encode_prefixed(&frame.input[..4]), frame.input.len() - 4);
        *self.ids.entry(key).or_default() += 1;
        Ok(())
    }

    fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
        serde_json::to_value(&self.ids).map_err(|e| ProgramError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatcher::Tracer,
        host::{ExecutionBudget, StaticState},
        traits::Hooks,
        types::{Address, CallKind, FrameEnd, TraceContext, U256},
    };
    use serde_json::json;

    fn frame(kind: CallKind, to: Option<Address>, input: &[u8]) -> FrameStart<'_> {
        FrameStart { kind, from: Address::ZERO, to, input, gas: 1_000, value: U256::ZERO, salt: None }
    }

    #[test]
    fn test_counts_selectors() {
        let mut tracer = Tracer::new(
            "4byteTracer",
            TraceContext::default(),
            Box::<FourByteTracer>::default(),
            ExecutionBudget::unlimited(),
        );
        let mut state = StaticState::new();
        let contract = Some(Address::with_last_byte(0xaa));
        let transfer = [0xa9, 0x05, 0x9c, 0xbb, 0, 0];
        let end = FrameEnd { output: &[], gas_used: 0, error: None, created: None };

        tracer.on_start(&mut state, frame(CallKind::Call, contract, &transfer));
        tracer.on_start(&mut state, frame(CallKind::StaticCall, contract, &transfer));
        tracer.on_end(&mut state, end);
        // ecrecover precompile
        tracer.on_start(&mut state, frame(CallKind::StaticCall, Some(Address::with_last_byte(1)), &transfer));
        tracer.on_end(&mut state, end);
        tracer.on_start(&mut state, frame(CallKind::Call, contract, &[0x01, 0x02]));
        tracer.on_end(&mut state, end);
        tracer.on_start(&mut state, frame(CallKind::Create, None, &transfer));
        tracer.on_end(&mut state, end);
        tracer.on_end(&mut state, end);

        let result: serde_json::Value = serde_json::from_slice(&tracer.get_result().unwrap()).unwrap();
        assert_eq!(result, json!({"0xa9059cbb-2": 2}));
    }
}
