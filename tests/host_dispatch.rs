use std::sync::Arc;
use std::time::Duration;

use pipe_adapters::TokioBridge;
use pipe_core::{ExecutionFault, HandlerDefinition, HandlerError, Invocation, PipelineBuilder, PipelineDefinition, Synthesizer, ValueSource, ValueType,
                Verb};
use pipeflow_rust::{AppConfig, AppError, RouteTable};
use serde_json::json;

fn show_item() -> PipelineDefinition {
    PipelineBuilder::new(Verb::Get, "/items/{id:int}").pure("load",
                                                            [ValueSource::route("id", ValueType::Int),
                                                             ValueSource::optional(pipe_core::InputOrigin::Query, "page", ValueType::Int, json!(1))],
                                                            ValueType::Int,
                                                            |args| Ok(json!(args.i64(0)? * 100 + args.i64(1)?)))
                                                      .build()
                                                      .unwrap()
}

#[test]
fn dispatch_coerces_route_and_query_values() {
    let table = RouteTable::new(Synthesizer::default());
    table.register(&show_item()).unwrap();
    let value = tokio_test::block_on(table.dispatch(Verb::Get, "/items/4?page=3", Invocation::new())).unwrap();
    assert_eq!(value, json!(403));
    let value = tokio_test::block_on(table.dispatch(Verb::Get, "/ITEMS/4", Invocation::new())).unwrap();
    assert_eq!(value, json!(401));
}

#[test]
fn explicit_inputs_take_precedence() {
    let table = RouteTable::new(Synthesizer::default());
    table.register(&show_item()).unwrap();
    let invocation = Invocation::new().with_input("page", json!(9));
    let value = tokio_test::block_on(table.dispatch(Verb::Get, "/items/1?page=2", invocation)).unwrap();
    assert_eq!(value, json!(109));
}

#[test]
fn unknown_routes_and_bad_values_are_reported() {
    let table = RouteTable::new(Synthesizer::default());
    table.register(&show_item()).unwrap();

    let err = tokio_test::block_on(table.dispatch(Verb::Post, "/items/4", Invocation::new())).unwrap_err();
    assert!(matches!(err, AppError::RouteNotFound { verb: Verb::Post, .. }));
    // la restricción {id:int} no coincide
    let err = tokio_test::block_on(table.dispatch(Verb::Get, "/items/abc", Invocation::new())).unwrap_err();
    assert!(matches!(err, AppError::RouteNotFound { .. }));
    let err = tokio_test::block_on(table.dispatch(Verb::Get, "/items/4?page=x", Invocation::new())).unwrap_err();
    assert!(matches!(err, AppError::InvalidValue { ref name, expected: ValueType::Int, .. } if name == "page"));
}

#[test]
fn duplicate_routes_are_rejected() {
    let table = RouteTable::new(Synthesizer::default());
    table.register(&show_item()).unwrap();
    let err = table.register(&show_item()).unwrap_err();
    assert!(matches!(err, AppError::DuplicateRoute { verb: Verb::Get, ref route } if route == "/items/{id:int}"));
    assert_eq!(table.len(), 1);
}

#[test]
fn first_registered_route_wins() {
    let table = RouteTable::new(Synthesizer::default());
    let literal = PipelineBuilder::new(Verb::Get, "/items/latest").pure("latest", [], ValueType::Str, |_| Ok(json!("literal")))
                                                                  .build()
                                                                  .unwrap();
    let param = PipelineBuilder::new(Verb::Get, "/items/{slug}").pure("slug", [ValueSource::route("slug", ValueType::Str)], ValueType::Str, |a| {
                                                                    Ok(json!(a.str(0)?))
                                                                })
                                                                .build()
                                                                .unwrap();
    table.register(&literal).unwrap();
    table.register(&param).unwrap();
    assert_eq!(tokio_test::block_on(table.dispatch(Verb::Get, "/items/latest", Invocation::new())).unwrap(), json!("literal"));
    assert_eq!(tokio_test::block_on(table.dispatch(Verb::Get, "/items/other", Invocation::new())).unwrap(), json!("other"));

    let routes = table.routes();
    assert_eq!(routes.iter().map(|r| r.route.as_str()).collect::<Vec<_>>(), vec!["/items/latest", "/items/{slug}"]);
    assert_eq!(routes[1].inputs, vec!["slug".to_string()]);
}

#[test]
fn invalid_pipelines_surface_as_synthesis_errors() {
    let table = RouteTable::new(Synthesizer::default());
    let pipeline = PipelineBuilder::new(Verb::Get, "/cfg").pure("cfg", [ValueSource::bound("missing")], ValueType::Any, |a| Ok(a.value(0)?.clone()))
                                                          .build()
                                                          .unwrap();
    let err = table.register(&pipeline).unwrap_err();
    assert!(matches!(err, AppError::Synthesis(_)));
    assert!(table.is_empty());
}

#[test]
fn bound_values_come_from_configuration() {
    let config = AppConfig::from_vars([("PIPEFLOW_BIND_GREETING", "hola")]).unwrap();
    let table = RouteTable::from_config(&config);
    let pipeline = PipelineBuilder::new(Verb::Get, "/greet").pure("greet", [ValueSource::bound("greeting")], ValueType::Str, |a| Ok(a.value(0)?.clone()))
                                                            .build()
                                                            .unwrap();
    table.register(&pipeline).unwrap();
    assert_eq!(tokio_test::block_on(table.dispatch(Verb::Get, "/greet", Invocation::new())).unwrap(), json!("hola"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resumable_route_dispatches_through_the_bridge() {
    let bridge = TokioBridge::current().unwrap().with_timeout(Duration::from_secs(2));
    let fetch = HandlerDefinition::pure("fetch", ValueType::Int).with_input(ValueSource::route("id", ValueType::Int))
                                                               .body(bridge.from_fn("fetch", |args| async move {
                                                                               tokio::time::sleep(Duration::from_millis(2)).await;
                                                                               Ok::<_, HandlerError>(json!(args.i64(0)? + 1))
                                                                           }));
    let pipeline = PipelineBuilder::new(Verb::Put, "/counters/{id:int}").then(fetch)
                                                                         .pure("double", [ValueSource::predecessor()], ValueType::Int, |a| Ok(json!(a.i64(0)? * 2)))
                                                                         .build()
                                                                         .unwrap();
    let table = RouteTable::new(Synthesizer::default());
    table.register(&pipeline).unwrap();
    assert!(table.routes()[0].is_async);

    let value = table.dispatch(Verb::Put, "/counters/20", Invocation::new()).await.unwrap();
    assert_eq!(value, json!(42));
}

#[tokio::test]
async fn execution_faults_are_wrapped() {
    let pipeline = PipelineBuilder::new(Verb::Delete, "/boom").pure("boom", [], ValueType::Int, |_| Err(HandlerError::new("sin stock")))
                                                              .build()
                                                              .unwrap();
    let table = Arc::new(RouteTable::new(Synthesizer::default()));
    table.register(&pipeline).unwrap();
    let err = table.dispatch(Verb::Delete, "/boom", Invocation::new()).await.unwrap_err();
    assert!(matches!(err, AppError::Execution(ExecutionFault::Handler { ref error, .. }) if error.message() == "sin stock"));
}
