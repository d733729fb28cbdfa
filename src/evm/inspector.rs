//! Tracer management for TraceEvm

use crate::{dispatcher::Tracer, evm::TraceEvm, inspectors::HookInspector};
use revm::database::Database;

impl<DB> TraceEvm<DB, HookInspector<Tracer>>
where
    DB: Database,
{
    /// Attaches a tracer, returning the one it replaces
    pub fn install_tracer(&mut self, tracer: Tracer) -> Option<Tracer> {
        self.inspector.install(tracer)
    }

    /// Detaches the current tracer
    ///
    /// Called after each traced transaction; the EVM runs untraced until a
    /// new tracer is installed.
    pub fn take_tracer(&mut self) -> Option<Tracer> {
        self.inspector.take_hooks()
    }

    /// The attached tracer, if any
    pub fn tracer(&self) -> Option<&Tracer> {
        self.inspector.hooks()
    }
}
