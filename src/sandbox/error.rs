use thiserror::Error;

/// Failures at the level of one run attempt.
///
/// Everything here short-circuits only the current attempt; whatever output
/// and event log were captured before the failure are still delivered
/// (compile failure precedes any execution, so it delivers nothing).
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("compilation failed: {diagnostics}")]
    CompileFailed { diagnostics: String },

    #[error("run event channel closed")]
    ChannelClosed,

    #[error("module execution task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Why a sandboxed module stopped before returning normally.
///
/// Modules propagate these with `?` out of their `run` body; the host maps
/// them onto the run state machine. `InputExhausted` and `Exit` are control
/// flow, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Trap {
    /// A read was requested past the end of the accumulated input buffer.
    /// Triggers the resume protocol instead of blocking or returning EOF.
    #[error("input exhausted")]
    InputExhausted,

    /// The module called `exit(code)`; normal termination for any code.
    #[error("exit({0})")]
    Exit(i32),

    /// The module touched part of the system surface the sandbox stubs out.
    #[error("{0} is not supported in the sandbox")]
    NotSupported(&'static str),

    /// Any other abnormal termination.
    #[error("module fault: {0}")]
    Fault(String),
}
