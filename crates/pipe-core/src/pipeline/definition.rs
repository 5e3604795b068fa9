use serde_json::{json, Value};

use super::{PipelineMetadata, RouteTemplate, Verb};
use crate::constants::SYNTHESIZER_VERSION;
use crate::errors::ConfigurationError;
use crate::handler::{HandlerDefinition, HandlerKind};
use crate::hashing::hash_value;
use crate::model::ValueType;
use crate::source::{unify_inputs, InputOrigin, InputSlots};

/// Pipeline validada. Inmutable después de construida.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    verb: Verb,
    route: RouteTemplate,
    handlers: Vec<HandlerDefinition>,
    metadata: PipelineMetadata,
    inputs: InputSlots,
    definition_hash: String,
}

impl PipelineDefinition {
    /// Valida y construye la pipeline.
    ///
    /// Orden de validación: no vacía, ruta, reglas locales de cada handler,
    /// último handler productor de valor, unificación de inputs externos y
    /// placeholders de ruta.
    pub fn new(verb: Verb,
               route: &str,
               handlers: Vec<HandlerDefinition>,
               metadata: PipelineMetadata)
               -> Result<Self, ConfigurationError> {
        let last = handlers.last().ok_or(ConfigurationError::EmptyPipeline)?;
        let route = RouteTemplate::parse(route)?;
        for (index, handler) in handlers.iter().enumerate() {
            handler.validate(index)?;
        }
        if last.kind == HandlerKind::SideEffectingAction {
            return Err(ConfigurationError::EndsWithAction { handler: last.handler_ref(handlers.len() - 1) });
        }
        let inputs = unify_inputs(handlers.iter().flat_map(|h| h.inputs.iter()))?;
        for slot in inputs.iter().filter(|s| s.origin == InputOrigin::Route) {
            let param = route.param(&slot.name)
                             .ok_or_else(|| ConfigurationError::UnknownRouteParameter { name: slot.name.clone(),
                                                                                        route: route.as_str().to_string() })?;
            if let Some(constraint) = param.constraint {
                if slot.value_type != constraint && slot.value_type != ValueType::Any {
                    return Err(ConfigurationError::RouteConstraintMismatch { name: slot.name.clone(),
                                                                             constraint,
                                                                             declared: slot.value_type });
                }
            }
        }
        let definition_hash = hash_value(&shape(verb, &route, &handlers, &metadata));
        Ok(Self { verb,
                  route,
                  handlers,
                  metadata,
                  inputs,
                  definition_hash })
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn route(&self) -> &RouteTemplate {
        &self.route
    }

    pub fn handlers(&self) -> &[HandlerDefinition] {
        &self.handlers
    }

    pub fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }

    /// Inputs externos unificados, en orden de primera aparición.
    pub fn inputs(&self) -> &InputSlots {
        &self.inputs
    }

    /// true si algún handler es asíncrono.
    pub fn is_async(&self) -> bool {
        self.handlers.iter().any(|h| h.is_async)
    }

    /// Tipo de salida de la pipeline: el del último handler.
    pub fn output_type(&self) -> Option<ValueType> {
        self.handlers.last().and_then(HandlerDefinition::result_type)
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// Forma observable de la pipeline; los cuerpos no entran en el hash.
fn shape(verb: Verb, route: &RouteTemplate, handlers: &[HandlerDefinition], metadata: &PipelineMetadata) -> Value {
    let handlers: Vec<Value> = handlers.iter()
                                       .map(|h| {
                                           json!({
                                               "label": h.label,
                                               "kind": h.kind,
                                               "async": h.is_async,
                                               "inputs": h.inputs,
                                               "output": h.output,
                                               "target": h.render_target,
                                           })
                                       })
                                       .collect();
    json!({
        "version": SYNTHESIZER_VERSION,
        "verb": verb,
        "route": route.as_str(),
        "handlers": handlers,
        "metadata": metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ValueSource;
    use serde_json::json;

    fn double() -> HandlerDefinition {
        HandlerDefinition::pure("double", ValueType::Int).with_input(ValueSource::route("id", ValueType::Int))
                                                         .sync_body(|args| Ok(json!(args.i64(0)? * 2)))
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        let err = PipelineDefinition::new(Verb::Get, "/", vec![], PipelineMetadata::default()).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyPipeline);
    }

    #[test]
    fn trailing_action_is_rejected() {
        let handlers = vec![double(), HandlerDefinition::action("log").sync_body(|_| Ok(Value::Null))];
        let err = PipelineDefinition::new(Verb::Post, "/items/{id}", handlers, PipelineMetadata::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::EndsWithAction { handler } if handler.index == 1));
    }

    #[test]
    fn route_inputs_must_exist_and_respect_constraints() {
        let err = PipelineDefinition::new(Verb::Get, "/items", vec![double()], PipelineMetadata::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownRouteParameter { .. }));

        let err = PipelineDefinition::new(Verb::Get, "/items/{id:bool}", vec![double()], PipelineMetadata::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::RouteConstraintMismatch { .. }));
    }

    #[test]
    fn derived_properties() {
        let p = PipelineDefinition::new(Verb::Get,
                                        "/items/{id:int}",
                                        vec![double(), HandlerDefinition::view("show", "items/show")],
                                        PipelineMetadata::default()).unwrap();
        assert!(!p.is_async());
        assert_eq!(p.output_type(), Some(ValueType::Object));
        assert_eq!(p.inputs().len(), 1);
        assert_eq!(p.definition_hash().len(), 64);
    }

    #[test]
    fn hash_tracks_shape_not_bodies() {
        let make = |verb| PipelineDefinition::new(verb, "/items/{id}", vec![double()], PipelineMetadata::default()).unwrap();
        let other_body = PipelineDefinition::new(Verb::Get,
                                                 "/items/{id}",
                                                 vec![double().sync_body(|_| Ok(json!(0)))],
                                                 PipelineMetadata::default()).unwrap();
        assert_eq!(make(Verb::Get).definition_hash(), other_body.definition_hash());
        assert_ne!(make(Verb::Get).definition_hash(), make(Verb::Put).definition_hash());
    }
}
