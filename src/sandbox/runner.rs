use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::sandbox::compiler::{CompileRequest, CompilerService, SandboxModule};
use crate::sandbox::error::{SandboxError, Trap};
use crate::sandbox::syscalls::SyscallHost;
use crate::trace::TraceEvent;

/// Run state machine: IDLE → COMPILING → RUNNING → terminal/paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Compiling,
    Running,
    Finished,
    NeedInput,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Compiling => "compiling",
            RunStatus::Running => "running",
            RunStatus::Finished => "finished",
            RunStatus::NeedInput => "need_input",
            RunStatus::Error => "error",
        }
    }

    /// Terminal states freeze the event log; `NeedInput` pauses it.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            RunStatus::Finished | RunStatus::NeedInput | RunStatus::Error
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything one run attempt produced. On a resumed run this supersedes,
/// rather than appends to, the previous attempt's report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub output: String,
    pub stderr: String,
    pub events: Vec<TraceEvent>,
    pub warnings: Vec<String>,
    /// Compiler diagnostics, verbatim; set only on compile failure.
    pub diagnostics: Option<String>,
    /// Trap description; set only on abnormal termination.
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub input_consumed: usize,
    pub started_at: DateTime<Utc>,
}

impl RunReport {
    fn empty(run_id: Uuid, status: RunStatus) -> Self {
        Self {
            run_id,
            status,
            output: String::new(),
            stderr: String::new(),
            events: Vec::new(),
            warnings: Vec::new(),
            diagnostics: None,
            error: None,
            exit_code: None,
            input_consumed: 0,
            started_at: Utc::now(),
        }
    }
}

/// Events streamed to the caller while a run progresses.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Status(RunStatus),
    Output(String),
    Report(RunReport),
}

/// Handle to an in-flight run.
pub struct RunHandle {
    pub events: mpsc::Receiver<RunEvent>,
    pub run_id: Uuid,
}

async fn send(tx: Option<&mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = tx {
        // Receiver dropped means nobody is watching; the run still finishes.
        let _ = tx.send(event).await;
    }
}

/// One full pipeline attempt: compile (unless cached), run on a fresh host,
/// demultiplex, map the outcome onto the state machine.
async fn run_once(
    run_id: Uuid,
    compiler: &Arc<dyn CompilerService>,
    request: &CompileRequest,
    accumulated_input: &str,
    cached: Option<Arc<dyn SandboxModule>>,
    tx: Option<&mpsc::Sender<RunEvent>>,
) -> Result<(RunReport, Option<Arc<dyn SandboxModule>>), SandboxError> {
    let started_at = Utc::now();

    send(tx, RunEvent::Status(RunStatus::Compiling)).await;
    let module = match cached {
        Some(module) => module,
        None => match compiler.compile(request.clone()).await {
            Ok(module) => module,
            Err(SandboxError::CompileFailed { diagnostics }) => {
                tracing::warn!("compile failed for run {run_id}");
                let mut report = RunReport::empty(run_id, RunStatus::Error);
                report.diagnostics = Some(diagnostics);
                report.started_at = started_at;
                send(tx, RunEvent::Report(report.clone())).await;
                return Ok((report, None));
            }
            Err(other) => return Err(other),
        },
    };

    send(tx, RunEvent::Status(RunStatus::Running)).await;
    let input = accumulated_input.to_string();
    let worker = Arc::clone(&module);
    let (host, outcome) = tokio::task::spawn_blocking(move || {
        let mut host = SyscallHost::new(&input);
        let outcome = worker.run(&mut host);
        (host, outcome)
    })
    .await?;

    let input_consumed = host.input_consumed();
    let (demuxed, stderr, exit_code) = host.finish();
    let (status, error) = match outcome {
        Ok(()) | Err(Trap::Exit(_)) => (RunStatus::Finished, None),
        Err(Trap::InputExhausted) => (RunStatus::NeedInput, None),
        Err(trap) => (RunStatus::Error, Some(trap.to_string())),
    };
    tracing::debug!(
        "run {run_id} settled: {status}, {} events, {} warnings",
        demuxed.events.len(),
        demuxed.warnings.len()
    );

    let report = RunReport {
        run_id,
        status,
        output: demuxed.output,
        stderr,
        events: demuxed.events,
        warnings: demuxed.warnings,
        diagnostics: None,
        error,
        exit_code,
        input_consumed,
        started_at,
    };
    if !report.output.is_empty() {
        send(tx, RunEvent::Output(report.output.clone())).await;
    }
    send(tx, RunEvent::Report(report.clone())).await;
    Ok((report, Some(module)))
}

/// Stateful wrapper implementing the restart-based input protocol.
///
/// There is no suspend/resume of a paused module: on `NEED_INPUT` the caller
/// supplies more text, the old instance is discarded, and the whole pipeline
/// reruns with the cumulative input buffer. This requires the target program
/// to be a deterministic function of its input prefix; wall-clock or random
/// reads can shift pre-pause states after a resume, an accepted limitation.
pub struct RunSession {
    compiler: Arc<dyn CompilerService>,
    request: CompileRequest,
    accumulated_input: String,
    cached_module: Option<Arc<dyn SandboxModule>>,
    last: Option<RunReport>,
}

impl RunSession {
    pub fn new(compiler: Arc<dyn CompilerService>, instrumented_source: impl Into<String>) -> Self {
        Self {
            compiler,
            request: CompileRequest::new(instrumented_source),
            accumulated_input: String::new(),
            cached_module: None,
            last: None,
        }
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.request.flags = flags;
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.accumulated_input = input.into();
        self
    }

    /// Run the full pipeline with the current cumulative input.
    pub async fn run(&mut self) -> Result<RunReport, SandboxError> {
        let run_id = Uuid::new_v4();
        let (report, module) = run_once(
            run_id,
            &self.compiler,
            &self.request,
            &self.accumulated_input,
            self.cached_module.clone(),
            None,
        )
        .await?;
        self.cached_module = module;
        self.last = Some(report.clone());
        Ok(report)
    }

    /// Append newly supplied input (plus a line terminator) and rerun.
    pub async fn resume(&mut self, input: &str) -> Result<RunReport, SandboxError> {
        self.accumulated_input.push_str(input);
        self.accumulated_input.push('\n');
        self.run().await
    }

    pub fn status(&self) -> RunStatus {
        self.last
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(RunStatus::Idle)
    }

    pub fn accumulated_input(&self) -> &str {
        &self.accumulated_input
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last.as_ref()
    }
}

/// Stateless entry point streaming run progress to the caller, for
/// presentation layers that want status/output/report events as they
/// happen. Resumption is a fresh `start` with the extended input.
pub struct SandboxHost {
    compiler: Arc<dyn CompilerService>,
}

impl SandboxHost {
    pub fn new(compiler: Arc<dyn CompilerService>) -> Self {
        Self { compiler }
    }

    pub fn start(&self, request: CompileRequest, accumulated_input: String) -> RunHandle {
        let (tx, rx) = mpsc::channel(256);
        let run_id = Uuid::new_v4();
        let compiler = Arc::clone(&self.compiler);
        tokio::spawn(async move {
            if let Err(e) = run_once(run_id, &compiler, &request, &accumulated_input, None, Some(&tx)).await
            {
                tracing::error!("run {run_id} failed: {e}");
            }
        });
        RunHandle { events: rx, run_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::{emit_trace, MockCompiler, ScriptedModule};
    use crate::trace::TraceEvent;

    #[tokio::test]
    async fn compile_failure_surfaces_diagnostics_verbatim() {
        let compiler = Arc::new(MockCompiler::failing("line 3: expected ';'"));
        let mut session = RunSession::new(compiler, "int main( {}");
        let report = session.run().await.unwrap();
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.diagnostics.as_deref(), Some("line 3: expected ';'"));
        assert!(report.output.is_empty());
        assert!(report.events.is_empty());
    }

    #[tokio::test]
    async fn finished_run_delivers_output_and_events() {
        let module = ScriptedModule::new(|host| {
            host.print("hello\n")?;
            emit_trace(
                host,
                r#"{"kind":"var","line":1,"name":"a","value":"1","addr":"0x10"}"#,
            )?;
            Ok(())
        });
        let compiler = Arc::new(MockCompiler::returning(module));
        let mut session = RunSession::new(compiler, "src");
        let report = session.run().await.unwrap();
        assert_eq!(report.status, RunStatus::Finished);
        assert_eq!(report.output, "hello\n");
        assert_eq!(report.events.len(), 1);
        assert!(matches!(report.events[0], TraceEvent::Var { .. }));
    }

    #[tokio::test]
    async fn explicit_exit_is_normal_termination() {
        let module = ScriptedModule::new(|host| {
            host.print("bye\n")?;
            Err(host.exit(2))
        });
        let compiler = Arc::new(MockCompiler::returning(module));
        let mut session = RunSession::new(compiler, "src");
        let report = session.run().await.unwrap();
        assert_eq!(report.status, RunStatus::Finished);
        assert_eq!(report.exit_code, Some(2));
        assert_eq!(report.output, "bye\n");
    }

    #[tokio::test]
    async fn trap_delivers_partial_output() {
        let module = ScriptedModule::new(|host| {
            host.print("before the fault\n")?;
            emit_trace(
                host,
                r#"{"kind":"func","line":1,"name":"main","action":"enter"}"#,
            )?;
            Err(Trap::Fault("division by zero".into()))
        });
        let compiler = Arc::new(MockCompiler::returning(module));
        let mut session = RunSession::new(compiler, "src");
        let report = session.run().await.unwrap();
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.error.as_deref(), Some("module fault: division by zero"));
        assert_eq!(report.output, "before the fault\n");
        assert_eq!(report.events.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_input_pauses_with_partial_state() {
        let module = ScriptedModule::new(|host| {
            host.print("enter a number: ")?;
            let line = host.read_line()?;
            host.print(&format!("got {line}\n"))?;
            Ok(())
        });
        let compiler = Arc::new(MockCompiler::returning(module));
        let mut session = RunSession::new(compiler, "src");
        let report = session.run().await.unwrap();
        assert_eq!(report.status, RunStatus::NeedInput);
        // The unterminated prompt is still delivered.
        assert_eq!(report.output, "enter a number: ");
        assert_eq!(report.input_consumed, 0);
    }

    #[tokio::test]
    async fn resume_reruns_with_cumulative_input() {
        let module = ScriptedModule::new(|host| {
            let line = host.read_line()?;
            host.print(&format!("got {line}\n"))?;
            Ok(())
        });
        let compiler = Arc::new(MockCompiler::returning(module.clone()));
        let mut session = RunSession::new(compiler.clone(), "src");

        assert_eq!(session.run().await.unwrap().status, RunStatus::NeedInput);
        let report = session.resume("5").await.unwrap();
        assert_eq!(report.status, RunStatus::Finished);
        assert_eq!(report.output, "got 5\n");
        assert_eq!(session.accumulated_input(), "5\n");
        // The old instance was discarded and the module rerun from scratch,
        // but the compiled module was reused from the cache.
        assert_eq!(module.run_count(), 2);
        assert_eq!(compiler.compile_count(), 1);
    }

    #[tokio::test]
    async fn streaming_host_reports_status_transitions() {
        let module = ScriptedModule::new(|host| {
            host.print("out\n")?;
            Ok(())
        });
        let compiler = Arc::new(MockCompiler::returning(module));
        let host = SandboxHost::new(compiler);
        let mut handle = host.start(CompileRequest::new("src"), String::new());

        let mut statuses = Vec::new();
        let mut report = None;
        while let Some(event) = handle.events.recv().await {
            match event {
                RunEvent::Status(s) => statuses.push(s),
                RunEvent::Report(r) => report = Some(r),
                RunEvent::Output(_) => {}
            }
        }
        assert_eq!(statuses, vec![RunStatus::Compiling, RunStatus::Running]);
        assert_eq!(report.unwrap().status, RunStatus::Finished);
    }
}
