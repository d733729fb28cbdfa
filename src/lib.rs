//! # revm-tracers
//!
//! Sandboxed, deterministic EVM execution tracers driven by revm inspector hooks.
//!
//! ## Core Features
//!
//! - **Hook protocol**
//!   - Frame boundaries, per-opcode steps, faults and self-destructs
//!   - Ordering and depth checks with the first violation recorded
//!
//! - **Tracer programs**
//!   - `callTracer` / `callTracerLegacy`: nested call tree
//!   - `prestateTracer`: pre-transaction state of every touched account, or a pre/post diff
//!   - `4byteTracer`, `opcountTracer`, `noopTracer`
//!
//! - **Sandbox**
//!   - Programs run behind a panic boundary with a step and wall-clock budget
//!   - A failing program never affects the traced transaction
//!
//! - **Execution harness**
//!   - In-memory revm state seeded from a genesis allocation
//!   - Fixture loading with raw transaction decoding
//!   - Concurrent tracing of independent transactions
//!
//! ## Example Usage
//!
//! ```rust
//! use revm_tracers::{
//!     create_evm, create_tracer,
//!     programs::CallTraceArtifact,
//!     types::{GenesisAccount, GenesisAlloc, SimulationTx, TraceContext},
//! };
//! use alloy::primitives::{address, Bytes, U256};
//!
//! # fn main() -> anyhow::Result<()> {
//! let sender = address!("00000000000000000000000000000000000000e0");
//! let receiver = address!("00000000000000000000000000000000000000a1");
//! let mut alloc = GenesisAlloc::new();
//! alloc.insert(sender, GenesisAccount { balance: U256::from(1_000), ..Default::default() });
//!
//! let context = TraceContext::default();
//! let mut evm = create_evm(&alloc, &context)?;
//! let tracer = create_tracer("callTracer", context)?;
//! let tx = SimulationTx::call(sender, receiver, Bytes::new()).with_value(U256::from(10));
//!
//! let outcome = evm.trace_transaction(tx, tracer)?;
//! let trace: CallTraceArtifact = outcome.artifact()?;
//! assert_eq!(trace.to, receiver);
//! assert_eq!(trace.value, Some(U256::from(10)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `dispatcher`: per-transaction `Tracer`, the hook protocol receiver
//! - `host`: sandboxed program host, budget and tracer registry
//! - `programs`: built-in tracer programs
//! - `finalizer`: one-shot result hand-out and JSON encoding
//! - `evm`: revm execution harness
//! - `inspectors`: revm inspector bridging callbacks to hooks
//! - `fixture`: trace fixtures
//! - `types`, `traits`, `errors`, `config`, `utils`

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod evm;
pub mod finalizer;
pub mod fixture;
pub mod host;
pub mod inspectors;
pub mod programs;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::TraceOptions;
pub use dispatcher::Tracer;
pub use errors::{EvmError, TracerError};
pub use evm::{create_evm, trace_transactions_concurrently, TraceEvm, TraceJob, TracingEvm};
pub use fixture::Fixture;
pub use host::{create_tracer, create_tracer_with_options, install_registry, TracerRegistry};
pub use inspectors::HookInspector;
pub use traits::{Hooks, StateView, TracerProgram};
