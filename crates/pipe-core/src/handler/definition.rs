use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Behavior, HandlerBody, HandlerKind};
use crate::errors::{ConfigurationError, HandlerError, HandlerRef};
use crate::future::PendingOp;
use crate::model::{HandlerArgs, ValueType};
use crate::registry::BehaviorKey;
use crate::source::ValueSource;

/// Destino de un paso de render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderTarget {
    /// Template por nombre (vista, parcial o componente nombrado).
    Template(String),
    /// Componente identificado por tipo.
    Component(String),
}

impl RenderTarget {
    pub fn template(name: impl Into<String>) -> Self {
        RenderTarget::Template(name.into())
    }

    pub fn component<T: ?Sized>() -> Self {
        RenderTarget::Component(std::any::type_name::<T>().to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            RenderTarget::Template(name) | RenderTarget::Component(name) => name,
        }
    }
}

/// Un paso de la pipeline.
///
/// Para los pasos de render, `output` es el tipo del modelo (opcional); el
/// valor que sigue por la pipeline es siempre el descriptor (`Object`).
#[derive(Debug, Clone)]
pub struct HandlerDefinition {
    pub label: String,
    pub kind: HandlerKind,
    pub is_async: bool,
    pub inputs: Vec<ValueSource>,
    pub output: Option<ValueType>,
    pub render_target: Option<RenderTarget>,
    pub body: HandlerBody,
}

impl HandlerDefinition {
    pub fn new(kind: HandlerKind, label: impl Into<String>) -> Self {
        Self { label: label.into(),
               kind,
               is_async: false,
               inputs: Vec::new(),
               output: None,
               render_target: None,
               body: HandlerBody::Passthrough }
    }

    pub fn pure(label: impl Into<String>, output: ValueType) -> Self {
        Self::new(HandlerKind::PureFunction, label).returning(output)
    }

    pub fn action(label: impl Into<String>) -> Self {
        Self::new(HandlerKind::SideEffectingAction, label)
    }

    pub fn view(label: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(HandlerKind::RenderView, label).render_to(RenderTarget::template(template))
    }

    pub fn partial(label: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(HandlerKind::RenderPartialView, label).render_to(RenderTarget::template(template))
    }

    pub fn component(label: impl Into<String>, target: RenderTarget) -> Self {
        Self::new(HandlerKind::RenderComponent, label).render_to(target)
    }

    pub fn with_input(mut self, source: ValueSource) -> Self {
        self.inputs.push(source);
        self
    }

    pub fn with_inputs<I: IntoIterator<Item = ValueSource>>(mut self, sources: I) -> Self {
        self.inputs.extend(sources);
        self
    }

    pub fn returning(mut self, output: ValueType) -> Self {
        self.output = Some(output);
        self
    }

    pub fn render_to(mut self, target: RenderTarget) -> Self {
        self.render_target = Some(target);
        self
    }

    pub fn sync_body<F>(mut self, f: F) -> Self
        where F: Fn(HandlerArgs) -> Result<Value, HandlerError> + Send + Sync + 'static
    {
        self.is_async = false;
        self.body = HandlerBody::Inline(Behavior::sync(f));
        self
    }

    pub fn async_body<F>(mut self, f: F) -> Self
        where F: Fn(HandlerArgs) -> PendingOp + Send + Sync + 'static
    {
        self.is_async = true;
        self.body = HandlerBody::Inline(Behavior::asynchronous(f));
        self
    }

    pub fn body(mut self, behavior: Behavior) -> Self {
        self.is_async = behavior.is_async();
        self.body = HandlerBody::Inline(behavior);
        self
    }

    /// Cuerpo tomado del registro de comportamientos. La asincronía se
    /// declara aquí y se contrasta con el valor registrado al sintetizar.
    pub fn registered(mut self, key: BehaviorKey, is_async: bool) -> Self {
        self.is_async = is_async;
        self.body = HandlerBody::Registered(key);
        self
    }

    /// Tipo del valor que este handler deja como resultado previo.
    pub fn result_type(&self) -> Option<ValueType> {
        match self.kind {
            HandlerKind::PureFunction => self.output,
            HandlerKind::SideEffectingAction => None,
            HandlerKind::RenderView | HandlerKind::RenderPartialView | HandlerKind::RenderComponent => Some(ValueType::Object),
        }
    }

    pub fn handler_ref(&self, index: usize) -> HandlerRef {
        HandlerRef::new(index, &self.label)
    }

    /// Reglas locales al handler; las que dependen de la pipeline completa
    /// viven en `PipelineDefinition::new`.
    pub fn validate(&self, index: usize) -> Result<(), ConfigurationError> {
        let handler = self.handler_ref(index);
        match (self.kind, &self.render_target) {
            (kind, None) if kind.is_render() => return Err(ConfigurationError::MissingRenderTarget { handler }),
            (kind, Some(RenderTarget::Template(name))) if kind.is_render() && name.trim().is_empty() => {
                return Err(ConfigurationError::MissingRenderTarget { handler })
            }
            (HandlerKind::RenderView | HandlerKind::RenderPartialView, Some(RenderTarget::Component(_))) => {
                return Err(ConfigurationError::ComponentTargetMisplaced { handler })
            }
            (HandlerKind::PureFunction | HandlerKind::SideEffectingAction, Some(_)) => {
                return Err(ConfigurationError::UnexpectedRenderTarget { handler })
            }
            _ => {}
        }
        match self.kind {
            HandlerKind::SideEffectingAction if self.output.is_some() => return Err(ConfigurationError::ActionWithOutput { handler }),
            HandlerKind::PureFunction if self.output.is_none() => return Err(ConfigurationError::MissingOutputType { handler }),
            _ => {}
        }
        match &self.body {
            HandlerBody::Passthrough if !self.kind.is_render() || self.is_async => Err(ConfigurationError::InvalidPassthrough { handler }),
            HandlerBody::Inline(behavior) if behavior.is_async() != self.is_async => {
                Err(ConfigurationError::AsyncMismatch { handler,
                                                        declared: self.is_async,
                                                        actual: behavior.is_async() })
            }
            _ => Ok(()),
        }
    }
}
