use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use pipe_core::{ExecutionFault, HandlerError, Invocation, MemorySink, PendingOp, PipelineBuilder, PipelineDefinition, Resolver, ResumableUnit, RunStatus,
                SynthesisSettings, SynthesizedUnit, Synthesizer, UnitEventKind, ValueSource, ValueType, Verb};
use serde_json::json;

fn resumable(synth: &Synthesizer, pipeline: &PipelineDefinition) -> ResumableUnit {
    match synth.synthesize(pipeline).expect("synthesis") {
        SynthesizedUnit::Resumable(unit) => unit,
        other => panic!("expected resumable unit, got {other:?}"),
    }
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// inc (sync) -> fetch (async, resuelto desde afuera) -> double (sync).
struct Harness {
    pipeline: PipelineDefinition,
    resolver: Arc<Mutex<Option<Resolver>>>,
    calls: [Arc<AtomicUsize>; 3],
}

fn harness() -> Harness {
    let resolver: Arc<Mutex<Option<Resolver>>> = Arc::new(Mutex::new(None));
    let calls = [counter(), counter(), counter()];
    let (c0, c1, c2) = (calls[0].clone(), calls[1].clone(), calls[2].clone());
    let slot = resolver.clone();
    let pipeline = PipelineBuilder::new(Verb::Get, "/calc/{x:int}").pure("inc", [ValueSource::route("x", ValueType::Int)], ValueType::Int, move |a| {
                                                                        c0.fetch_add(1, Ordering::SeqCst);
                                                                        Ok(json!(a.i64(0)? + 1))
                                                                    })
                                                                    .pure_async("fetch", [ValueSource::predecessor()], ValueType::Int, move |_| {
                                                                        c1.fetch_add(1, Ordering::SeqCst);
                                                                        let (op, r) = PendingOp::channel();
                                                                        *slot.lock().unwrap() = Some(r);
                                                                        op
                                                                    })
                                                                    .pure("double", [ValueSource::predecessor()], ValueType::Int, move |a| {
                                                                        c2.fetch_add(1, Ordering::SeqCst);
                                                                        Ok(json!(a.i64(0)? * 2))
                                                                    })
                                                                    .build()
                                                                    .unwrap();
    Harness { pipeline,
              resolver,
              calls }
}

fn counts(calls: &[Arc<AtomicUsize>; 3]) -> [usize; 3] {
    [calls[0].load(Ordering::SeqCst), calls[1].load(Ordering::SeqCst), calls[2].load(Ordering::SeqCst)]
}

#[test]
fn suspends_at_the_async_handler_and_resumes_without_rerunning() {
    let h = harness();
    let unit = resumable(&Synthesizer::default(), &h.pipeline);
    assert_eq!(unit.states().len(), 2);

    let run = unit.start(Invocation::new().with_input("x", json!(3)));
    assert_eq!(run.cursor(), 0);
    assert!(run.is_waiting(0));
    assert_eq!(run.status(), RunStatus::Suspended { state: 0 });
    assert!(!run.completion().is_resolved());
    assert_eq!(counts(&h.calls), [1, 1, 0]);

    // Reentrada antes de completar: nada cambia, nada se re-ejecuta.
    run.advance();
    run.advance();
    assert_eq!(run.cursor(), 0);
    assert_eq!(counts(&h.calls), [1, 1, 0]);

    let resolver = h.resolver.lock().unwrap().take().expect("resolver stored");
    resolver.complete(json!(10));

    assert_eq!(run.cursor(), 2);
    assert_eq!(run.status(), RunStatus::Completed);
    assert!(!run.is_waiting(0));
    assert_eq!(run.state_result(0), Some(json!(10)));
    assert_eq!(run.state_result(1), Some(json!(20)));
    assert_eq!(run.completion().try_result(), Some(Ok(json!(20))));
    assert_eq!(counts(&h.calls), [1, 1, 1]);
}

#[test]
fn advance_after_completion_is_a_noop() {
    let h = harness();
    let unit = resumable(&Synthesizer::default(), &h.pipeline);
    let run = unit.start(Invocation::new().with_input("x", json!(1)));
    let notified = counter();
    let n = notified.clone();
    run.completion().on_resolved(move |_| {
                        n.fetch_add(1, Ordering::SeqCst);
                    });
    h.resolver.lock().unwrap().take().unwrap().complete(json!(5));
    for _ in 0..3 {
        run.advance();
    }
    assert_eq!(run.cursor(), 2);
    assert_eq!(counts(&h.calls), [1, 1, 1]);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[test]
fn already_complete_operation_does_not_suspend() {
    let sink = Arc::new(MemorySink::new());
    let pipeline = PipelineBuilder::new(Verb::Get, "/").pure_async("ready", [], ValueType::Str, |_| PendingOp::ready(json!("now")))
                                                        .view("show", "t")
                                                        .build()
                                                        .unwrap();
    let unit = resumable(&Synthesizer::default().with_sink_instance(sink.clone()), &pipeline);
    let run = unit.start(Invocation::new());
    assert_eq!(run.status(), RunStatus::Completed);
    let value = run.completion().try_result().unwrap().unwrap();
    assert_eq!(value["model"], json!("now"));
    let kinds = sink.for_run(run.run_id()).into_iter().map(|e| e.kind).collect::<Vec<_>>();
    assert!(!kinds.contains(&UnitEventKind::Suspended));
    assert_eq!(kinds.first(), Some(&UnitEventKind::InvocationStarted));
    assert_eq!(kinds.last(), Some(&UnitEventKind::Completed));
}

#[test]
fn failed_operation_faults_the_run_and_stops_later_handlers() {
    let h = harness();
    let unit = resumable(&Synthesizer::default(), &h.pipeline);
    let run = unit.start(Invocation::new().with_input("x", json!(3)));
    h.resolver.lock().unwrap().take().unwrap().fail(HandlerError::new("upstream down"));

    assert_eq!(run.cursor(), -1);
    assert_eq!(run.status(), RunStatus::Faulted);
    match run.completion().try_result() {
        Some(Err(ExecutionFault::Handler { handler, error })) => {
            assert_eq!(handler.index, 1);
            assert_eq!(error.message(), "upstream down");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(counts(&h.calls), [1, 1, 0]);

    run.advance();
    assert_eq!(run.cursor(), -1);
    assert_eq!(counts(&h.calls), [1, 1, 0]);
}

#[test]
fn dropped_resolver_faults_as_abandoned() {
    let h = harness();
    let unit = resumable(&Synthesizer::default(), &h.pipeline);
    let run = unit.start(Invocation::new().with_input("x", json!(3)));
    drop(h.resolver.lock().unwrap().take());
    assert!(matches!(run.completion().try_result(),
                     Some(Err(ExecutionFault::Handler { error, .. })) if error == HandlerError::abandoned()));
}

#[test]
fn panic_after_resumption_is_caught_once() {
    let pipeline = PipelineBuilder::new(Verb::Get, "/").pure_async("wait", [], ValueType::Int, |_| PendingOp::ready(json!(1)))
                                                        .pure("explode", [ValueSource::predecessor()], ValueType::Int, |_| panic!("late"))
                                                        .build()
                                                        .unwrap();
    let run = resumable(&Synthesizer::default(), &pipeline).start(Invocation::new());
    assert_eq!(run.status(), RunStatus::Faulted);
    assert!(matches!(run.completion().try_result(),
                     Some(Err(ExecutionFault::Panicked { location, message })) if location.contains("explode") && message == "late"));
}

#[test]
fn uncaught_panic_still_settles_the_run() {
    let slot: Arc<Mutex<Option<Resolver>>> = Arc::new(Mutex::new(None));
    let keep = slot.clone();
    let pipeline = PipelineBuilder::new(Verb::Get, "/").pure_async("wait", [], ValueType::Int, move |_| {
                                                            let (op, r) = PendingOp::channel();
                                                            *keep.lock().unwrap() = Some(r);
                                                            op
                                                        })
                                                        .pure("explode", [ValueSource::predecessor()], ValueType::Int, |_| panic!("late"))
                                                        .build()
                                                        .unwrap();
    let settings = SynthesisSettings { catch_panics: false,
                                       ..SynthesisSettings::default() };
    let run = resumable(&Synthesizer::new(settings), &pipeline).start(Invocation::new());
    assert_eq!(run.status(), RunStatus::Suspended { state: 0 });

    let resolver = slot.lock().unwrap().take().unwrap();
    let unwound = panic::catch_unwind(AssertUnwindSafe(|| resolver.complete(json!(1))));
    assert!(unwound.is_err());
    assert_eq!(run.status(), RunStatus::Faulted);
    assert!(matches!(run.completion().try_result(),
                     Some(Err(ExecutionFault::Panicked { location, message })) if location.contains("explode") && message == "late"));

    // la corrida no quedó marcada como activa
    run.advance();
    assert_eq!(run.cursor(), -1);
}

#[test]
fn panicking_completion_listener_does_not_fault_a_completed_run() {
    let h = harness();
    let sink = Arc::new(MemorySink::new());
    let unit = resumable(&Synthesizer::default().with_sink_instance(sink.clone()), &h.pipeline);
    let run = unit.start(Invocation::new().with_input("x", json!(3)));
    run.completion().on_resolved(|_| panic!("listener"));

    let resolver = h.resolver.lock().unwrap().take().unwrap();
    let unwound = panic::catch_unwind(AssertUnwindSafe(|| resolver.complete(json!(4))));
    assert!(unwound.is_err());
    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(run.cursor(), 2);
    assert_eq!(run.completion().try_result(), Some(Ok(json!(8))));
    let kinds = sink.for_run(run.run_id()).into_iter().map(|e| e.kind).collect::<Vec<_>>();
    assert!(!kinds.iter().any(|k| matches!(k, UnitEventKind::Faulted { .. })));

    run.advance();
    assert_eq!(run.status(), RunStatus::Completed);
}

#[test]
fn missing_input_faults_before_any_handler_runs() {
    let h = harness();
    let run = resumable(&Synthesizer::default(), &h.pipeline).start(Invocation::new());
    assert_eq!(run.completion().try_result(), Some(Err(ExecutionFault::MissingInput { name: "x".into() })));
    assert_eq!(counts(&h.calls), [0, 0, 0]);
}

#[test]
fn prepare_does_not_execute_until_advanced() {
    let h = harness();
    let run = resumable(&Synthesizer::default(), &h.pipeline).prepare(Invocation::new().with_input("x", json!(0)));
    assert_eq!(run.status(), RunStatus::Running);
    assert_eq!(counts(&h.calls), [0, 0, 0]);
    run.advance();
    assert_eq!(run.status(), RunStatus::Suspended { state: 0 });
}

#[test]
fn continuation_can_run_on_another_thread() {
    let h = harness();
    let unit = resumable(&Synthesizer::default(), &h.pipeline);
    let run = unit.start(Invocation::new().with_input("x", json!(3)));
    let resolver = h.resolver.lock().unwrap().take().unwrap();
    thread::spawn(move || resolver.complete(json!(4))).join().unwrap();
    assert_eq!(run.completion().try_result(), Some(Ok(json!(8))));
}

#[test]
fn runs_of_the_same_unit_are_independent() {
    let resolvers: Arc<Mutex<Vec<Resolver>>> = Arc::new(Mutex::new(Vec::new()));
    let slot = resolvers.clone();
    let pipeline = PipelineBuilder::new(Verb::Get, "/n/{n:int}").pure_async("echo", [ValueSource::route("n", ValueType::Int)], ValueType::Int, move |_| {
                                                                     let (op, r) = PendingOp::channel();
                                                                     slot.lock().unwrap().push(r);
                                                                     op
                                                                 })
                                                                 .pure("plus", [ValueSource::predecessor(), ValueSource::route("n", ValueType::Int)], ValueType::Int, |a| {
                                                                     Ok(json!(a.i64(0)? + a.i64(1)?))
                                                                 })
                                                                 .build()
                                                                 .unwrap();
    let unit = resumable(&Synthesizer::default(), &pipeline);
    let first = unit.start(Invocation::new().with_input("n", json!(1)));
    let second = unit.start(Invocation::new().with_input("n", json!(2)));
    let mut pending = std::mem::take(&mut *resolvers.lock().unwrap());
    // Se resuelven en orden inverso.
    pending.pop().unwrap().complete(json!(200));
    assert_eq!(second.completion().try_result(), Some(Ok(json!(202))));
    assert!(!first.completion().is_resolved());
    pending.pop().unwrap().complete(json!(100));
    assert_eq!(first.completion().try_result(), Some(Ok(json!(101))));
}

#[tokio::test]
async fn completion_can_be_awaited() {
    let pipeline = PipelineBuilder::new(Verb::Get, "/").pure_async("later", [], ValueType::Int, |_| {
                                                            let (op, r) = PendingOp::channel();
                                                            tokio::spawn(async move {
                                                                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                                                                r.complete(json!(42));
                                                            });
                                                            op
                                                        })
                                                        .build()
                                                        .unwrap();
    let run = resumable(&Synthesizer::default(), &pipeline).start(Invocation::new());
    assert_eq!(run.completion().await, Ok(json!(42)));
    assert_eq!(run.status(), RunStatus::Completed);
}
