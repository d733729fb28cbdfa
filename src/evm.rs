//! In-memory execution harness
//!
//! This module provides the `TraceEvm` wrapper around revm's `MainnetEvm`,
//! built over a `CacheDB` seeded from a genesis allocation, and runs
//! transactions with a `Tracer` attached through `HookInspector`.
//!
//! ## Usage
//!
//! ```rust
//! use revm_tracers::{create_evm, create_tracer, types::{GenesisAlloc, SimulationTx, TraceContext}};
//! use alloy::primitives::{address, Bytes};
//!
//! # fn main() -> anyhow::Result<()> {
//! let context = TraceContext::default();
//! let mut evm = create_evm(&GenesisAlloc::new(), &context)?;
//! let tracer = create_tracer("callTracer", context)?;
//! let tx = SimulationTx::call(
//!     address!("00000000000000000000000000000000000000e0"),
//!     address!("00000000000000000000000000000000000000a1"),
//!     Bytes::new(),
//! );
//! let outcome = evm.trace_transaction(tx, tracer)?;
//! assert!(outcome.execution.is_success());
//! # Ok(())
//! # }
//! ```

pub use revm::{
    database::Database,
    handler::MainnetContext,
    inspector::Inspector,
    MainnetEvm,
};
use std::ops::{Deref, DerefMut};

pub mod builder;
pub mod inspector;
pub mod processor;

pub use builder::{create_evm, TracingEvm};
pub use processor::{trace_transactions_concurrently, TraceJob};

/// Thin wrapper over revm's `MainnetEvm`
///
/// Derefs to the wrapped EVM, so the whole revm API stays available.
pub struct TraceEvm<DB: Database, INSP>(MainnetEvm<MainnetContext<DB>, INSP>);

impl<DB, INSP> TraceEvm<DB, INSP>
where
    DB: Database,
{
    /// Wraps an existing `MainnetEvm`
    pub fn new(evm: MainnetEvm<MainnetContext<DB>, INSP>) -> Self {
        Self(evm)
    }
}

impl<DB, INSP> Deref for TraceEvm<DB, INSP>
where
    DB: Database,
{
    type Target = MainnetEvm<MainnetContext<DB>, INSP>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<DB, INSP> DerefMut for TraceEvm<DB, INSP>
where
    DB: Database,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
