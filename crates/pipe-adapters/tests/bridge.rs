use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pipe_adapters::{AsyncHandler, TokioBridge};
use pipe_core::{Behavior, HandlerArgs, HandlerDefinition, HandlerError, Invocation, PendingOp, PipelineBuilder, Synthesizer, ValueSource, ValueType, Verb};
use serde_json::{json, Value};
use tokio_test::{assert_pending, assert_ready_eq, task};

struct Sleepy {
    millis: u64,
}

#[async_trait]
impl AsyncHandler for Sleepy {
    fn name(&self) -> &str {
        "sleepy"
    }

    async fn call(&self, args: HandlerArgs) -> Result<Value, HandlerError> {
        tokio::time::sleep(Duration::from_millis(self.millis)).await;
        Ok(json!(args.i64(0)? * 3))
    }
}

fn start(behavior: &Behavior, args: HandlerArgs) -> PendingOp {
    match behavior {
        Behavior::Async(f) => f(args),
        Behavior::Sync(_) => panic!("bridge behaviors are asynchronous"),
    }
}

async fn settle(op: &PendingOp) -> Option<Result<Value, HandlerError>> {
    for _ in 0..200 {
        if op.is_complete() {
            return op.take_result();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    None
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_handler_resolves_the_operation() {
    let bridge = TokioBridge::current().expect("inside tokio");
    let behavior = bridge.behavior(Arc::new(Sleepy { millis: 5 }));
    assert!(behavior.is_async());
    let op = start(&behavior, HandlerArgs::new(vec![pipe_core::Arg::Value(json!(4))]));
    assert_eq!(settle(&op).await, Some(Ok(json!(12))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_fails_the_operation() {
    let bridge = TokioBridge::current().unwrap().with_timeout(Duration::from_millis(10));
    let op = start(&bridge.behavior(Arc::new(Sleepy { millis: 1_000 })), HandlerArgs::new(vec![pipe_core::Arg::Value(json!(1))]));
    let result = settle(&op).await.expect("settled");
    assert!(matches!(result, Err(e) if e.message().contains("timed out")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_task_is_reported_as_abandoned() {
    let bridge = TokioBridge::current().unwrap();
    let behavior = bridge.from_fn("boom", |_args| async move {
                             if true {
                                 panic!("task died");
                             }
                             Ok::<_, HandlerError>(Value::Null)
                         });
    let op = start(&behavior, HandlerArgs::default());
    assert_eq!(settle(&op).await, Some(Err(HandlerError::abandoned())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_work_runs_off_the_caller() {
    let bridge = TokioBridge::current().unwrap();
    let behavior = bridge.blocking(|args| Ok(json!(args.str(0)?.len())));
    let op = start(&behavior, HandlerArgs::new(vec![pipe_core::Arg::Value(json!("abcd"))]));
    assert_eq!(settle(&op).await, Some(Ok(json!(4))));
}

#[test]
fn no_bridge_outside_a_runtime() {
    assert!(TokioBridge::current().is_none());
}

#[test]
fn bridged_unit_wakes_the_task_awaiting_it() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let bridge = TokioBridge::new(runtime.handle().clone());
    let (release, gate) = tokio::sync::oneshot::channel::<i64>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    let gated = bridge.from_fn("gated", move |_args| {
                          let gate = gate.lock().unwrap().take();
                          async move {
                              let gate = gate.ok_or_else(|| HandlerError::new("gate already used"))?;
                              gate.await.map(|n| json!(n)).map_err(|_| HandlerError::new("gate dropped"))
                          }
                      });
    let pipeline = PipelineBuilder::new(Verb::Get, "/gated").then(HandlerDefinition::pure("gated", ValueType::Int).body(gated))
                                                             .pure("plus", [ValueSource::predecessor()], ValueType::Int, |a| Ok(json!(a.i64(0)? + 1)))
                                                             .build()
                                                             .unwrap();
    let completion = Synthesizer::default().synthesize(&pipeline).unwrap().call(Invocation::new());
    let mut fut = task::spawn(completion);
    assert_pending!(fut.poll());

    release.send(41).unwrap();
    for _ in 0..400 {
        if fut.is_woken() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(fut.is_woken());
    assert_ready_eq!(fut.poll(), Ok(json!(42)));
}
