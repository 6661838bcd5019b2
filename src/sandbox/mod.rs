pub mod compiler;
pub mod error;
pub mod mock;
pub mod runner;
pub mod syscalls;

pub use compiler::{CompileRequest, CompilerService, SandboxModule};
pub use error::{SandboxError, Trap};
pub use mock::{MockCompiler, ScriptedModule};
pub use runner::{RunEvent, RunHandle, RunReport, RunSession, RunStatus, SandboxHost};
pub use syscalls::{StreamId, SyscallHost};
