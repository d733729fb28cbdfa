//! revm bridge for the hook protocol
//!
//! `HookInspector` implements revm's `Inspector` and replays the interpreter
//! callbacks into any `Hooks` receiver (normally a `Tracer`):
//!
//! | revm callback | hook |
//! |---|---|
//! | `call`, `create` | `on_start` |
//! | `step` | `on_step` |
//! | `call_end`, `create_end` | `on_fault` (halted frames), then `on_end` |
//! | `selfdestruct` | `on_self_destruct` |
//!
//! # Gas figures
//! The root frame is offered the transaction gas limit and its `gas_used`
//! includes intrinsic gas, before refunds. A halted frame consumes all gas it
//! was offered. `ExecutionStep::cost` is always 0 because revm charges dynamic
//! gas inside the instruction.
//!
//! # State
//! Hooks raised from `step`, `call*` and `create*` see the live journal
//! through `RevmState`. `selfdestruct` carries no context, so
//! `on_self_destruct` receives a `DetachedState`.

mod inspector;
mod state;

pub use state::RevmState;

use crate::{traits::Hooks, types::Address};

/// Opcode last executed in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepMark {
    pc: u64,
    op: u8,
}

/// Bridge-side record of an open frame
#[derive(Debug, Clone)]
struct BridgeFrame {
    /// Storage context of the frame
    address: Address,
    /// Gas the interpreter gave the frame
    gas_limit: u64,
    /// Intrinsic gas, non-zero for the root only
    intrinsic: u64,
    /// Address the frame deploys to, for CREATE and CREATE2
    deploys: Option<Address>,
    last_step: Option<StepMark>,
}

/// revm inspector driving a `Hooks` receiver
#[derive(Debug)]
pub struct HookInspector<H> {
    hooks: Option<H>,
    frames: Vec<BridgeFrame>,
}

impl<H> Default for HookInspector<H> {
    fn default() -> Self {
        Self { hooks: None, frames: Vec::new() }
    }
}

impl<H: Hooks> HookInspector<H> {
    pub fn new(hooks: H) -> Self {
        Self { hooks: Some(hooks), frames: Vec::new() }
    }

    /// Installs a receiver for the next transaction, returning the previous one
    pub fn install(&mut self, hooks: H) -> Option<H> {
        self.frames.clear();
        self.hooks.replace(hooks)
    }

    /// Removes the receiver; the inspector is inert afterwards
    pub fn take_hooks(&mut self) -> Option<H> {
        self.frames.clear();
        self.hooks.take()
    }

    pub fn hooks(&self) -> Option<&H> {
        self.hooks.as_ref()
    }

    pub fn hooks_mut(&mut self) -> Option<&mut H> {
        self.hooks.as_mut()
    }

    /// Frames currently open in the interpreter
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
