//! End-to-end pipeline coverage: scripted programs running on the syscall
//! host, the restart-based input protocol, and replay over real demuxed logs.

use std::sync::Arc;

use memlens::sandbox::mock::{emit_trace, MockCompiler, ScriptedModule};
use memlens::{replay, Instrumenter, PointerClass, RunSession, RunStatus, VariableKind};

/// A program that reads two numbers and echoes each; the shape of the
/// canonical interactive-input walkthrough.
fn two_reads() -> Arc<ScriptedModule> {
    ScriptedModule::new(|host| {
        host.print("first: ")?;
        let a = host.read_line()?;
        host.print(&format!("{a}\n"))?;
        emit_trace(
            host,
            &format!(r#"{{"kind":"var","line":2,"name":"a","value":"{a}","addr":"0x10"}}"#),
        )?;
        host.print("second: ")?;
        let b = host.read_line()?;
        host.print(&format!("{b}\n"))?;
        emit_trace(
            host,
            &format!(r#"{{"kind":"var","line":4,"name":"b","value":"{b}","addr":"0x14"}}"#),
        )?;
        Ok(())
    })
}

#[tokio::test]
async fn interactive_program_resumes_through_both_reads() {
    let module = two_reads();
    let compiler = Arc::new(MockCompiler::returning(module.clone()));
    let mut session = RunSession::new(compiler.clone(), "src");

    // No input yet: the program stops at the first read.
    let report = session.run().await.unwrap();
    assert_eq!(report.status, RunStatus::NeedInput);
    assert_eq!(report.output, "first: ");
    assert_eq!(report.input_consumed, 0);
    assert!(report.events.is_empty());

    // First number: the rerun consumes it and stops at the second read.
    let report = session.resume("5").await.unwrap();
    assert_eq!(report.status, RunStatus::NeedInput);
    assert_eq!(report.output, "first: 5\nsecond: ");
    assert_eq!(report.events.len(), 1);

    // Second number: the rerun replays the first read identically and
    // finishes. The report supersedes the earlier partial ones.
    let report = session.resume("7").await.unwrap();
    assert_eq!(report.status, RunStatus::Finished);
    assert_eq!(report.output, "first: 5\nsecond: 7\n");
    assert_eq!(report.events.len(), 2);
    assert_eq!(session.accumulated_input(), "5\n7\n");
    assert_eq!(report.input_consumed, 4);

    // Three executions, one compile: instances are discarded, modules cached.
    assert_eq!(module.run_count(), 3);
    assert_eq!(compiler.compile_count(), 1);

    // The final log replays into both bindings in the root frame.
    let view = replay(&report.events, report.events.len() - 1, true);
    let values: Vec<_> = view.frames[0]
        .variables
        .iter()
        .map(|v| match &v.kind {
            VariableKind::Scalar { value, .. } => (v.name.as_str(), value.as_str()),
            other => panic!("expected scalar, got {other:?}"),
        })
        .collect();
    assert_eq!(values, [("a", "5"), ("b", "7")]);
    assert_eq!(view.description, "declared b = 7");
}

#[tokio::test]
async fn heap_lifecycle_replays_with_leak_and_dangling() {
    let module = ScriptedModule::new(|host| {
        for json in [
            r#"{"kind":"func","line":1,"name":"main","action":"enter"}"#,
            r#"{"kind":"heap_array","line":2,"name":"p","value":"?","size":3,"addr":"0x5000"}"#,
            r#"{"kind":"pointer","line":2,"name":"p","addr":"0x20","value":"0x5000"}"#,
            r#"{"kind":"assign","line":3,"name":"p[0]","value":"42"}"#,
            r#"{"kind":"heap_alloc","line":4,"name":"q","value":"?","size":1,"addr":"0x6000"}"#,
            r#"{"kind":"pointer","line":4,"name":"q","addr":"0x28","value":"0x6000"}"#,
            r#"{"kind":"heap_free","line":5,"name":"p","addr":"0x5000"}"#,
        ] {
            emit_trace(host, json)?;
        }
        Ok(())
    });
    let compiler = Arc::new(MockCompiler::returning(module));
    let mut session = RunSession::new(compiler, "src");
    let report = session.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Finished);
    assert_eq!(report.events.len(), 7);

    let view = replay(&report.events, report.events.len() - 1, true);
    // q never freed; p freed but retained and its pointer dangles.
    assert_eq!(view.leaks, ["q"]);
    let p_block = view.heap.iter().find(|b| b.name == "p").unwrap();
    assert!(p_block.freed);
    assert_eq!(p_block.values[0], "42");
    match &view.frames[0].variable("p").unwrap().kind {
        VariableKind::Pointer { class, .. } => assert_eq!(*class, PointerClass::Dangling),
        other => panic!("expected pointer, got {other:?}"),
    }
}

#[tokio::test]
async fn stray_output_between_trace_lines_is_preserved_in_order() {
    let module = ScriptedModule::new(|host| {
        host.print("progress 1\n")?;
        emit_trace(
            host,
            r#"{"kind":"var","line":1,"name":"a","value":"1","addr":"0x10"}"#,
        )?;
        host.print("progress 2\n")?;
        // Malformed payload: dropped with a warning, run unaffected.
        host.print(&format!("{}{{broken\n", memlens::SENTINEL))?;
        Ok(())
    });
    let compiler = Arc::new(MockCompiler::returning(module));
    let mut session = RunSession::new(compiler, "src");
    let report = session.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Finished);
    assert_eq!(report.output, "progress 1\nprogress 2\n");
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn instrumented_source_keeps_line_numbers_for_every_construct() {
    let src = r#"int add(int x, int y) {
    int sum = x + y;
    return sum;
}
int main(void) {
    int nums[3] = {1, 2, 3};
    int *p = malloc(2 * sizeof(int));
    nums[0] = add(4, 5);
    free(p);
    return 0;
}
"#;
    let out = Instrumenter::new().instrument(src);
    assert_eq!(src.lines().count(), out.lines().count());
    // Each original statement still starts its own line.
    for (original, rewritten) in src.lines().zip(out.lines()) {
        assert!(
            rewritten.starts_with(original.trim_end())
                || rewritten.trim_start().ends_with(original.trim()),
            "line lost its statement: {original:?} -> {rewritten:?}"
        );
    }
    assert!(out.contains("heap_array"));
    assert!(out.contains("heap_free"));
}

mod properties {
    use memlens::{replay, TraceAction, TraceEvent};
    use proptest::prelude::*;

    fn arb_event() -> impl Strategy<Value = TraceEvent> {
        let name = prop::sample::select(vec!["a", "b", "p", "main", "helper"]);
        prop_oneof![
            (1u32..50, name.clone(), 0i64..100).prop_map(|(line, name, v)| TraceEvent::Var {
                line,
                name: name.into(),
                value: v.to_string(),
                addr: format!("0x{:x}", 0x100 + v * 4),
            }),
            (1u32..50, name.clone(), 0i64..100).prop_map(|(line, name, v)| {
                TraceEvent::Assign {
                    line,
                    name: name.into(),
                    value: v.to_string(),
                }
            }),
            (1u32..50, name.clone(), any::<bool>()).prop_map(|(line, name, enter)| {
                TraceEvent::Func {
                    line,
                    name: name.into(),
                    action: if enter {
                        TraceAction::Enter
                    } else {
                        TraceAction::Exit
                    },
                }
            }),
            (1u32..50, name, 0u64..0x40).prop_map(|(line, name, t)| TraceEvent::Pointer {
                line,
                name: name.into(),
                addr: format!("0x{:x}", 0x200 + t),
                value: format!("0x{:x}", 0x100 + t * 4),
                deref: false,
            }),
        ]
    }

    proptest! {
        // Folding the same prefix twice is bit-identical, any step is safe,
        // and a frame always exists.
        #[test]
        fn replay_is_pure_and_total(
            events in prop::collection::vec(arb_event(), 0..40),
            step in 0usize..60,
            complete in any::<bool>(),
        ) {
            let first = replay(&events, step, complete);
            let second = replay(&events, step, complete);
            prop_assert_eq!(&first, &second);
            prop_assert!(!first.frames.is_empty());
            prop_assert_eq!(first.frames.last().unwrap().name.as_str(), "program");
            if !events.is_empty() {
                prop_assert!(first.step < events.len());
            }
        }
    }
}
