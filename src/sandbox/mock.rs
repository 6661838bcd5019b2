//! Deterministic stand-ins for the external compiler and its modules.
//!
//! `ScriptedModule` wraps a closure over the syscall host so tests (and the
//! examples in `tests/pipeline.rs`) can express a target program directly in
//! Rust without any real toolchain. `MockCompiler` records every compile
//! request for later assertions.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::sandbox::compiler::{CompileRequest, CompilerService, SandboxModule};
use crate::sandbox::error::{SandboxError, Trap};
use crate::sandbox::syscalls::SyscallHost;
use crate::trace::SENTINEL;

type Script = dyn Fn(&mut SyscallHost) -> Result<(), Trap> + Send + Sync;

/// A sandbox module whose behavior is a Rust closure.
pub struct ScriptedModule {
    script: Box<Script>,
    runs: Mutex<usize>,
}

impl ScriptedModule {
    pub fn new(
        script: impl Fn(&mut SyscallHost) -> Result<(), Trap> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            runs: Mutex::new(0),
        })
    }

    /// How many times this module has been run (restarts included).
    pub fn run_count(&self) -> usize {
        *self.runs.lock()
    }
}

impl SandboxModule for ScriptedModule {
    fn run(&self, host: &mut SyscallHost) -> Result<(), Trap> {
        *self.runs.lock() += 1;
        (self.script)(host)
    }
}

/// Compiler service double: returns a fixed module or fixed diagnostics.
pub struct MockCompiler {
    module: Option<Arc<dyn SandboxModule>>,
    diagnostics: Option<String>,
    requests: Mutex<Vec<CompileRequest>>,
}

impl MockCompiler {
    /// Every compile succeeds with this module.
    pub fn returning(module: Arc<dyn SandboxModule>) -> Self {
        Self {
            module: Some(module),
            diagnostics: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every compile fails with these diagnostics.
    pub fn failing(diagnostics: impl Into<String>) -> Self {
        Self {
            module: None,
            diagnostics: Some(diagnostics.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Captured compile requests, for assertions.
    pub fn requests(&self) -> Vec<CompileRequest> {
        self.requests.lock().clone()
    }

    pub fn compile_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl CompilerService for MockCompiler {
    async fn compile(
        &self,
        request: CompileRequest,
    ) -> Result<Arc<dyn SandboxModule>, SandboxError> {
        self.requests.lock().push(request);
        match (&self.module, &self.diagnostics) {
            (Some(module), _) => Ok(Arc::clone(module)),
            (None, Some(diagnostics)) => Err(SandboxError::CompileFailed {
                diagnostics: diagnostics.clone(),
            }),
            (None, None) => Err(SandboxError::CompileFailed {
                diagnostics: "mock compiler has no module".into(),
            }),
        }
    }
}

/// Script helper: print one sentinel-prefixed trace line.
pub fn emit_trace(host: &mut SyscallHost, json: &str) -> Result<(), Trap> {
    host.print(&format!("{SENTINEL}{json}\n"))?;
    Ok(())
}

/// Script helper: read a line from stdin and parse it as an integer,
/// trapping on garbage the way a target program would.
pub fn read_int(host: &mut SyscallHost) -> Result<i64, Trap> {
    let line = host.read_line()?;
    line.trim()
        .parse()
        .map_err(|_| Trap::Fault(format!("not a number: {line:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_module_counts_runs() {
        let module = ScriptedModule::new(|_| Ok(()));
        let mut host = SyscallHost::new("");
        module.run(&mut host).unwrap();
        module.run(&mut host).unwrap();
        assert_eq!(module.run_count(), 2);
    }

    #[tokio::test]
    async fn mock_compiler_captures_requests() {
        let compiler = MockCompiler::failing("nope");
        let result = compiler
            .compile(CompileRequest::new("int main(void) {}"))
            .await;
        assert!(matches!(
            result,
            Err(SandboxError::CompileFailed { diagnostics }) if diagnostics == "nope"
        ));
        assert_eq!(compiler.compile_count(), 1);
        assert_eq!(compiler.requests()[0].instrumented_source, "int main(void) {}");
    }

    #[test]
    fn read_int_parses_and_traps() {
        let mut host = SyscallHost::new("42\nabc\n");
        assert_eq!(read_int(&mut host).unwrap(), 42);
        assert!(matches!(read_int(&mut host), Err(Trap::Fault(_))));
    }
}
