//! Call frames and their JSON schemas
//!
//! `CallFrame` is the builder's in-memory node. `CallTraceArtifact` is the
//! serialized shape shared by both call tracer schemas:
//!
//! | field | current | legacy |
//! |---|---|---|
//! | `value` | omitted for STATICCALL | omitted for STATICCALL and DELEGATECALL |
//! | `gas`, `gasUsed` | always | omitted for SELFDESTRUCT |
//! | `revertReason` | when decodable | never |
//!
//! Both omit `error` when unset and `calls` when empty.

use crate::{
    types::{Address, Bytes, CallKind, U256},
    utils::hex_utils,
};
use serde::{Deserialize, Serialize};

/// Output schema of the call tracer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSchema {
    Current,
    Legacy,
}

/// A frame of the call tree under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub kind: CallKind,
    pub from: Address,
    /// Unknown for CREATE until the frame ends
    pub to: Option<Address>,
    pub input: Bytes,
    pub output: Bytes,
    pub gas: u64,
    pub gas_used: u64,
    pub value: U256,
    pub error: Option<String>,
    pub revert_reason: Option<String>,
    pub calls: Vec<CallFrame>,
}

impl CallFrame {
    pub fn new(kind: CallKind, from: Address, to: Option<Address>, input: Bytes, gas: u64, value: U256) -> Self {
        Self {
            kind,
            from,
            to,
            input,
            output: Bytes::new(),
            gas,
            gas_used: 0,
            value,
            error: None,
            revert_reason: None,
            calls: Vec::new(),
        }
    }

    /// Sealed SELFDESTRUCT child
    pub fn self_destruct(contract: Address, beneficiary: Address, value: U256) -> Self {
        Self::new(CallKind::SelfDestruct, contract, Some(beneficiary), Bytes::new(), 0, value)
    }
}

/// Serialized call frame, valid for both schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTraceArtifact {
    #[serde(rename = "type")]
    pub kind: CallKind,
    #[serde(with = "hex_utils::address_hex")]
    pub from: Address,
    #[serde(with = "hex_utils::address_hex")]
    pub to: Address,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_utils::quantity_opt")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_utils::u64_hex_opt")]
    pub gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_utils::u64_hex_opt")]
    pub gas_used: Option<u64>,
    pub input: Bytes,
    #[serde(default)]
    pub output: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallTraceArtifact>,
}

impl CallTraceArtifact {
    /// Renders a finished frame in the given schema
    pub fn from_frame(frame: &CallFrame, schema: CallSchema) -> Self {
        let value = match (schema, frame.kind) {
            (_, CallKind::StaticCall) => None,
            (CallSchema::Legacy, CallKind::DelegateCall) => None,
            _ => Some(frame.value),
        };
        let (gas, gas_used) = match (schema, frame.kind) {
            (CallSchema::Legacy, CallKind::SelfDestruct) => (None, None),
            _ => (Some(frame.gas), Some(frame.gas_used)),
        };
        let revert_reason = match schema {
            CallSchema::Current => frame.revert_reason.clone(),
            CallSchema::Legacy => None,
        };

        Self {
            kind: frame.kind,
            from: frame.from,
            to: frame.to.unwrap_or_default(),
            value,
            gas,
            gas_used,
            input: frame.input.clone(),
            output: frame.output.clone(),
            error: frame.error.clone(),
            revert_reason,
            calls: frame.calls.iter().map(|call| Self::from_frame(call, schema)).collect(),
        }
    }

    /// Total number of frames in this subtree
    pub fn frame_count(&self) -> usize {
        1 + self.calls.iter().map(Self::frame_count).sum::<usize>()
    }

    /// Depth of the deepest frame, the root being 0
    pub fn max_depth(&self) -> usize {
        self.calls.iter().map(|call| call.max_depth() + 1).max().unwrap_or(0)
    }

    /// Pre-order `(depth, kind, from, to)` of every frame
    pub fn shape(&self) -> Vec<(usize, CallKind, Address, Address)> {
        let mut out = Vec::new();
        self.collect_shape(0, &mut out);
        out
    }

    fn collect_shape(&self, depth: usize, out: &mut Vec<(usize, CallKind, Address, Address)>) {
        out.push((depth, self.kind, self.from, self.to));
        for call in &self.calls {
            call.collect_shape(depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use serde_json::json;

    fn sample_tree() -> CallFrame {
        let root_addr = address!("00000000000000000000000000000000000000a1");
        let mut root = CallFrame::new(
            CallKind::Call,
            address!("00000000000000000000000000000000000000e0"),
            Some(root_addr),
            Bytes::from(vec![0x12, 0x34]),
            50_000,
            U256::from(1),
        );
        root.gas_used = 21_500;

        let mut delegate = CallFrame::new(
            CallKind::DelegateCall,
            root_addr,
            Some(address!("00000000000000000000000000000000000000b2")),
            Bytes::new(),
            1_000,
            U256::from(1),
        );
        delegate.error = Some("execution reverted".to_string());
        delegate.revert_reason = Some("nope".to_string());
        root.calls.push(delegate);
        root.calls.push(CallFrame::new(
            CallKind::StaticCall,
            root_addr,
            Some(address!("00000000000000000000000000000000000000c3")),
            Bytes::new(),
            500,
            U256::ZERO,
        ));
        root.calls.push(CallFrame::self_destruct(
            root_addr,
            address!("00000000000000000000000000000000000000e0"),
            U256::from(9),
        ));
        root
    }

    #[test]
    fn test_current_schema() {
        let artifact = CallTraceArtifact::from_frame(&sample_tree(), CallSchema::Current);
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "CALL",
                "from": "0x00000000000000000000000000000000000000e0",
                "to": "0x00000000000000000000000000000000000000a1",
                "value": "0x1",
                "gas": "0xc350",
                "gasUsed": "0x53fc",
                "input": "0x1234",
                "output": "0x",
                "calls": [
                    {
                        "type": "DELEGATECALL",
                        "from": "0x00000000000000000000000000000000000000a1",
                        "to": "0x00000000000000000000000000000000000000b2",
                        "value": "0x1",
                        "gas": "0x3e8",
                        "gasUsed": "0x0",
                        "input": "0x",
                        "output": "0x",
                        "error": "execution reverted",
                        "revertReason": "nope"
                    },
                    {
                        "type": "STATICCALL",
                        "from": "0x00000000000000000000000000000000000000a1",
                        "to": "0x00000000000000000000000000000000000000c3",
                        "gas": "0x1f4",
                        "gasUsed": "0x0",
                        "input": "0x",
                        "output": "0x"
                    },
                    {
                        "type": "SELFDESTRUCT",
                        "from": "0x00000000000000000000000000000000000000a1",
                        "to": "0x00000000000000000000000000000000000000e0",
                        "value": "0x9",
                        "gas": "0x0",
                        "gasUsed": "0x0",
                        "input": "0x",
                        "output": "0x"
                    }
                ]
            })
        );
    }

    #[test]
    fn test_legacy_schema() {
        let artifact = CallTraceArtifact::from_frame(&sample_tree(), CallSchema::Legacy);
        let delegate = &artifact.calls[0];
        assert_eq!(delegate.value, None);
        assert_eq!(delegate.revert_reason, None);
        assert_eq!(delegate.error.as_deref(), Some("execution reverted"));

        let destruct = serde_json::to_value(&artifact.calls[2]).unwrap();
        assert!(destruct.get("gas").is_none());
        assert!(destruct.get("gasUsed").is_none());
        assert_eq!(destruct["value"], "0x9");
    }

    #[test]
    fn test_schemas_agree_on_shape() {
        let tree = sample_tree();
        let current = CallTraceArtifact::from_frame(&tree, CallSchema::Current);
        let legacy = CallTraceArtifact::from_frame(&tree, CallSchema::Legacy);
        assert_eq!(current.frame_count(), 4);
        assert_eq!(current.max_depth(), 1);
        assert_eq!(current.shape(), legacy.shape());
    }

    #[test]
    fn test_json_round_trip_is_idempotent() {
        let artifact = CallTraceArtifact::from_frame(&sample_tree(), CallSchema::Current);
        let first = serde_json::to_string(&artifact).unwrap();
        let parsed: CallTraceArtifact = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed, artifact);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), first);
    }
}
