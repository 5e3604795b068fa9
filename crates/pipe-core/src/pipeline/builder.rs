//! Builder fluido para `PipelineDefinition`.
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new(Verb::Get, "/items/{id:int}")
//!     .pure("load", [ValueSource::route("id", ValueType::Int)], ValueType::Object, load)
//!     .view("show", "items/show")
//!     .build()?;
//! ```

use serde_json::Value;

use super::{PipelineDefinition, PipelineMetadata, Verb};
use crate::errors::{ConfigurationError, HandlerError};
use crate::future::PendingOp;
use crate::handler::{HandlerDefinition, RenderTarget};
use crate::model::{HandlerArgs, ValueType};
use crate::source::ValueSource;

#[derive(Debug)]
pub struct PipelineBuilder {
    verb: Verb,
    route: String,
    handlers: Vec<HandlerDefinition>,
    metadata: PipelineMetadata,
}

impl PipelineBuilder {
    pub fn new(verb: Verb, route: impl Into<String>) -> Self {
        Self { verb,
               route: route.into(),
               handlers: Vec::new(),
               metadata: PipelineMetadata::default() }
    }

    /// Agrega un handler ya construido.
    pub fn then(mut self, handler: HandlerDefinition) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn pure<I, F>(self, label: &str, inputs: I, output: ValueType, f: F) -> Self
        where I: IntoIterator<Item = ValueSource>,
              F: Fn(HandlerArgs) -> Result<Value, HandlerError> + Send + Sync + 'static
    {
        self.then(HandlerDefinition::pure(label, output).with_inputs(inputs).sync_body(f))
    }

    pub fn pure_async<I, F>(self, label: &str, inputs: I, output: ValueType, f: F) -> Self
        where I: IntoIterator<Item = ValueSource>,
              F: Fn(HandlerArgs) -> PendingOp + Send + Sync + 'static
    {
        self.then(HandlerDefinition::pure(label, output).with_inputs(inputs).async_body(f))
    }

    pub fn action<I, F>(self, label: &str, inputs: I, f: F) -> Self
        where I: IntoIterator<Item = ValueSource>,
              F: Fn(HandlerArgs) -> Result<Value, HandlerError> + Send + Sync + 'static
    {
        self.then(HandlerDefinition::action(label).with_inputs(inputs).sync_body(f))
    }

    pub fn action_async<I, F>(self, label: &str, inputs: I, f: F) -> Self
        where I: IntoIterator<Item = ValueSource>,
              F: Fn(HandlerArgs) -> PendingOp + Send + Sync + 'static
    {
        self.then(HandlerDefinition::action(label).with_inputs(inputs).async_body(f))
    }

    /// Vista cuyo modelo es el resultado previo.
    pub fn view(self, label: &str, template: &str) -> Self {
        self.then(HandlerDefinition::view(label, template))
    }

    pub fn partial(self, label: &str, template: &str) -> Self {
        self.then(HandlerDefinition::partial(label, template))
    }

    pub fn component(self, label: &str, target: RenderTarget) -> Self {
        self.then(HandlerDefinition::component(label, target))
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    pub fn require_anti_forgery(mut self) -> Self {
        self.metadata.require_anti_forgery = true;
        self
    }

    pub fn require_authorization(mut self) -> Self {
        self.metadata.require_authorization = true;
        self
    }

    pub fn build(self) -> Result<PipelineDefinition, ConfigurationError> {
        PipelineDefinition::new(self.verb, &self.route, self.handlers, self.metadata)
    }
}
