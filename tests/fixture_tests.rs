//! Fixture decoding and replay
//!
//! Fixtures carry a raw signed transaction; these tests sign one with a known
//! key, wrap it in a fixture and replay it through the call tracer. The
//! fixtures under `tests/testdata/<tracer>/` are replayed against the schema
//! of the tracer they are named after.

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    primitives::{address, hex, Address, Bytes, TxKind, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use revm_tracers::{
    errors::FixtureError,
    fixture::json_equal,
    programs::CallTraceArtifact,
    Fixture, TraceOptions,
};
use serde_json::json;
use std::path::{Path, PathBuf};

const KEY: &str = "b71c71a67e1177ad4e901695e1b4b9ee17ae16c6668d313eac2f96dbcda3f291";
const RECEIVER: Address = address!("00000000000000000000000000000000deadbeef");

fn signer() -> PrivateKeySigner {
    KEY.parse().unwrap()
}

fn raw_transfer(nonce: u64) -> Bytes {
    let tx = TxLegacy {
        chain_id: Some(1),
        nonce,
        gas_price: 1,
        gas_limit: 50_000,
        to: TxKind::Call(RECEIVER),
        value: U256::from(1),
        input: Bytes::new(),
    };
    let signature = signer().sign_hash_sync(&tx.signature_hash()).unwrap();
    TxEnvelope::Legacy(tx.into_signed(signature)).encoded_2718().into()
}

fn fixture() -> Fixture {
    let sender = signer().address();
    let raw = json!({
        "genesis": {
            "alloc": {
                sender.to_string(): { "balance": "0x56bc75e2d63100000", "nonce": "1" }
            },
            "config": { "chainId": 1 }
        },
        "context": {
            "number": "2",
            "difficulty": "0x1",
            "timestamp": "1479891545",
            "gasLimit": "4712388",
            "miner": "0x61c808d82a3ac53231750dadc13c777b59310bd9"
        },
        "input": hex::encode_prefixed(raw_transfer(1)),
        "result": {
            "type": "CALL",
            "from": sender.to_string().to_lowercase(),
            "to": "0x00000000000000000000000000000000deadbeef",
            "value": "0x1",
            "gas": "0xc350",
            "gasUsed": "0x5208",
            "input": "0x",
            "output": "0x"
        }
    });
    Fixture::from_json(&raw.to_string()).unwrap()
}

#[test]
fn test_decode_signed_transaction() {
    let tx = fixture().decode_transaction().unwrap();
    assert_eq!(tx.caller, signer().address());
    assert_eq!(tx.transact_to, TxKind::Call(RECEIVER));
    assert_eq!(tx.value, U256::from(1));
    assert_eq!(tx.gas_limit, 50_000);
    assert_eq!(tx.gas_price, 1);
    assert_eq!(tx.nonce, Some(1));
}

#[test]
fn test_fixture_replays_expected_trace() {
    let fixture = fixture();
    let outcome = fixture.run(&TraceOptions::default()).unwrap();
    assert!(outcome.execution.is_success());

    let artifact = outcome.trace.unwrap();
    assert!(fixture.matches::<CallTraceArtifact>(&artifact));
}

#[test]
fn test_fixture_mismatch_is_detected() {
    let mut fixture = fixture();
    if let Some(result) = fixture.result.as_mut() {
        result["gasUsed"] = json!("0x5209");
    }
    let artifact = fixture.run(&TraceOptions::default()).unwrap().trace.unwrap();
    assert!(!fixture.matches::<CallTraceArtifact>(&artifact));

    let actual: serde_json::Value = serde_json::from_slice(&artifact).unwrap();
    assert!(!json_equal::<CallTraceArtifact>(&actual, fixture.result.as_ref().unwrap()));
}

#[test]
fn test_fixture_file_round_trip() {
    let fixture = fixture();
    let path = std::env::temp_dir().join(format!("revm-tracers-fixture-{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_string_pretty(&fixture).unwrap()).unwrap();

    let loaded = Fixture::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.genesis, fixture.genesis);
    assert_eq!(loaded.input, fixture.input);
    assert_eq!(loaded.result, fixture.result);
}

#[test]
fn test_malformed_input() {
    let mut fixture = fixture();
    fixture.input = Bytes::from(vec![0xf8, 0x01]);
    assert!(matches!(fixture.decode_transaction(), Err(FixtureError::Transaction(_))));

    assert!(matches!(Fixture::from_json("{}"), Err(FixtureError::Json(_))));
}

fn fixture_files(dir: &str) -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/testdata").join(dir);
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    assert!(!files.is_empty(), "no fixtures in {}", dir.display());
    files
}

fn replay_dir(dir: &str, tracer: &str) {
    let options = TraceOptions { tracer: Some(tracer.to_string()), ..Default::default() };
    for path in fixture_files(dir) {
        let fixture = Fixture::from_file(&path).unwrap();
        let artifact = fixture
            .run(&options)
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()))
            .trace
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()));

        let actual: serde_json::Value = serde_json::from_slice(&artifact).unwrap();
        assert!(
            fixture.matches::<CallTraceArtifact>(&artifact),
            "{}: trace mismatch\nhave: {actual}\nwant: {}",
            path.display(),
            fixture.result.as_ref().unwrap()
        );
    }
}

#[test]
fn test_call_tracer_fixtures() {
    replay_dir("call_tracer", "callTracer");
}

#[test]
fn test_call_tracer_legacy_fixtures() {
    replay_dir("call_tracer_legacy", "callTracerLegacy");
}
