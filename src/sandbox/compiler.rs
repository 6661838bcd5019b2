use std::sync::Arc;

use async_trait::async_trait;

use crate::sandbox::error::{SandboxError, Trap};
use crate::sandbox::syscalls::SyscallHost;

/// What the external compiler service receives: the instrumented source and
/// any toolchain flags the caller wants forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub instrumented_source: String,
    pub flags: Vec<String>,
}

impl CompileRequest {
    pub fn new(instrumented_source: impl Into<String>) -> Self {
        Self {
            instrumented_source: instrumented_source.into(),
            flags: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }
}

/// A compiled, runnable program. The module is a pure function of the host
/// it is given; the host carries all run state, so one module value can back
/// any number of (sequential) runs with fresh hosts.
pub trait SandboxModule: Send + Sync {
    fn run(&self, host: &mut SyscallHost) -> Result<(), Trap>;
}

/// The external compiler/toolchain, specified only through this seam.
///
/// Success yields an executable module; failure yields
/// `SandboxError::CompileFailed` whose diagnostics are surfaced verbatim to
/// the caller, with no run attempted.
#[async_trait]
pub trait CompilerService: Send + Sync {
    async fn compile(&self, request: CompileRequest)
        -> Result<Arc<dyn SandboxModule>, SandboxError>;
}
