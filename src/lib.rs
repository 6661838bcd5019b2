pub mod instrument;
pub mod replay;
pub mod sandbox;
pub mod trace;

pub use instrument::Instrumenter;
pub use replay::{replay, Frame, HeapBlock, PointerClass, ReplayView, Variable, VariableKind};
pub use sandbox::{
    CompileRequest, CompilerService, RunEvent, RunHandle, RunReport, RunSession, RunStatus,
    SandboxError, SandboxHost, SandboxModule, SyscallHost, Trap,
};
pub use trace::{DemuxedOutput, OutputDemuxer, TraceAction, TraceEvent, SENTINEL};
