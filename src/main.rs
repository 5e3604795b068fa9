use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pipe_adapters::{AsyncHandler, TokioBridge};
use pipe_core::{HandlerArgs, HandlerDefinition, HandlerError, Invocation, PipelineBuilder, PipelineDefinition, ValueSource, ValueType, Verb};
use pipeflow_rust::{AppError, RouteTable, CONFIG};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Inventario simulado: responde tras una pequeña espera.
struct StockLookup;

#[async_trait]
impl AsyncHandler for StockLookup {
    fn name(&self) -> &str {
        "stock_lookup"
    }

    async fn call(&self, args: HandlerArgs) -> Result<Value, HandlerError> {
        let id = args.i64(0)?;
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(json!({ "id": id, "stock": id * 3 }))
    }
}

fn catalog_pipeline() -> Result<PipelineDefinition, AppError> {
    Ok(PipelineBuilder::new(Verb::Get, "/items/{id:int}")
        .pure("load",
              [ValueSource::route("id", ValueType::Int),
               ValueSource::bound("site")],
              ValueType::Object,
              |args| Ok(json!({ "id": args.i64(0)?, "site": args.value(1)?.clone() })))
        .view("show", "items/show")
        .tag("catalog")
        .build()?)
}

fn reserve_pipeline(bridge: &TokioBridge) -> Result<PipelineDefinition, AppError> {
    let lookup = HandlerDefinition::pure("lookup", ValueType::Object).with_input(ValueSource::route("id", ValueType::Int))
                                                                     .body(bridge.behavior(Arc::new(StockLookup)));
    Ok(PipelineBuilder::new(Verb::Post, "/items/{id:int}/reserve")
        .then(lookup)
        .action("audit", [ValueSource::predecessor()], |args| {
            log::info!("reserva solicitada: {}", args.value(0)?);
            Ok(Value::Null)
        })
        .pure("quantity",
              [ValueSource::predecessor(),
               ValueSource::optional(pipe_core::InputOrigin::Query, "qty", ValueType::Int, json!(1))],
              ValueType::Object,
              |args| {
                  let item = args.value(0)?;
                  let qty = args.i64(1)?;
                  Ok(json!({ "item": item.clone(), "reserved": qty.min(item["stock"].as_i64().unwrap_or(0)) }))
              })
        .partial("reserved", "items/_reserved")
        .require_anti_forgery()
        .build()?)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let bridge = TokioBridge::current().ok_or_else(|| AppError::Config("sin runtime tokio".into()))?
                                       .with_timeout(Duration::from_secs(2));
    let mut config = CONFIG.clone();
    config.bound.entry("site".to_string()).or_insert_with(|| json!("demo"));
    let table = RouteTable::from_config(&config);
    table.register(&catalog_pipeline()?)?;
    table.register(&reserve_pipeline(&bridge)?)?;

    let routes = serde_json::to_string_pretty(&table.routes()).map_err(|e| AppError::Config(e.to_string()))?;
    println!("Rutas registradas:\n{routes}");

    for (verb, path) in [(Verb::Get, "/items/7"), (Verb::Post, "/items/7/reserve?qty=5"), (Verb::Get, "/items/abc"), (Verb::Post, "/items/2/reserve?qty=x")] {
        match table.dispatch(verb, path, Invocation::new()).await {
            Ok(value) => println!("{verb} {path} -> {value}"),
            Err(err) => println!("{verb} {path} -> error: {err}"),
        }
    }
    Ok(())
}
