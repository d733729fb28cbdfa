//! Built-in tracer programs
//!
//! - [`call_tracer`]: nested call tree, current and legacy schema
//! - [`prestate`]: pre-transaction state of every touched account
//! - [`four_byte`]: function selector counts
//! - [`opcount`]: number of executed opcodes
//! - [`noop`]: empty result

pub mod call_frame;
pub mod call_tracer;
pub mod four_byte;
pub mod noop;
pub mod opcount;
pub mod prestate;

pub use call_frame::{CallFrame, CallSchema, CallTraceArtifact};
pub use call_tracer::{CallStack, CallTracer, CallTracerConfig};
pub use four_byte::FourByteTracer;
pub use noop::NoopTracer;
pub use opcount::OpcountTracer;
pub use prestate::{
    AccountState, PrestateAccount, PrestateArtifact, PrestateConfig, PrestateDiffArtifact,
    PrestateTracer,
};

/// Call tree in the current schema
pub const CALL_TRACER: &str = "callTracer";
/// Call tree in the legacy schema
pub const CALL_TRACER_LEGACY: &str = "callTracerLegacy";
pub const PRESTATE_TRACER: &str = "prestateTracer";
pub const FOUR_BYTE_TRACER: &str = "4byteTracer";
pub const OPCOUNT_TRACER: &str = "opcountTracer";
pub const NOOP_TRACER: &str = "noopTracer";
