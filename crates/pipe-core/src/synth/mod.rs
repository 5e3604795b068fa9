//! Sintetizadores: de `PipelineDefinition` a unidad invocable.
//!
//! - Sin handlers asíncronos: `SyncUnit`, ejecución lineal.
//! - Con alguno: `partition` + `ResumableUnit`.
//!
//! En ambos casos los cuerpos se copian a la `CaptureTable` de la unidad y las
//! fuentes se compilan a `ArgPlan` antes de devolverla; todo error detectable
//! sin request sale aquí como `ConfigurationError`.

mod partition;
mod plan;
mod resumable;
mod settings;
mod sync_unit;

use std::sync::Arc;

use indexmap::IndexSet;

use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::errors::ConfigurationError;
use crate::future::UnitCompletion;
use crate::model::Invocation;
use crate::pipeline::PipelineDefinition;
use crate::registry::{self, SinkKey};
use crate::source::{BoundValues, InputSlots};

pub use partition::{partition, State};
pub use resumable::{ResumableRun, ResumableUnit, RunStatus};
pub use settings::SynthesisSettings;
pub use sync_unit::SyncUnit;

use plan::UnitPlan;

/// Unidad producida por la síntesis. La posee quien la registra (el host).
/// Resultado de sintetizar una pipeline: síncrona si ningún handler es
/// asíncrono, reanudable en otro caso.
#[derive(Debug, Clone)]
pub enum SynthesizedUnit {
    Sync(SyncUnit),
    Resumable(ResumableUnit),
}

impl SynthesizedUnit {
    /// `true` para la variante reanudable.
    pub fn is_async(&self) -> bool {
        matches!(self, SynthesizedUnit::Resumable(_))
    }

    pub fn inputs(&self) -> &InputSlots {
        match self {
            SynthesizedUnit::Sync(unit) => unit.inputs(),
            SynthesizedUnit::Resumable(unit) => unit.inputs(),
        }
    }

    pub fn definition_hash(&self) -> &str {
        match self {
            SynthesizedUnit::Sync(unit) => unit.definition_hash(),
            SynthesizedUnit::Resumable(unit) => unit.definition_hash(),
        }
    }

    /// Forma uniforme de invocar: la unidad síncrona corre en el acto y
    /// devuelve un handle ya resuelto.
    pub fn call(&self, invocation: Invocation) -> UnitCompletion {
        match self {
            SynthesizedUnit::Sync(unit) => {
                let completion = UnitCompletion::new();
                completion.resolve(unit.invoke(&invocation));
                completion
            }
            SynthesizedUnit::Resumable(unit) => unit.start(invocation).completion(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    settings: SynthesisSettings,
    bound: BoundValues,
    ambient: Option<IndexSet<String>>,
    sink: Option<SinkKey>,
}

impl Synthesizer {
    pub fn new(settings: SynthesisSettings) -> Self {
        Self { settings,
               ..Self::default() }
    }

    /// Valores para las fuentes `Bound`.
    pub fn with_bound_values(mut self, bound: BoundValues) -> Self {
        self.bound = bound;
        self
    }

    /// Declara las propiedades ambiente que el host provee; a partir de aquí
    /// una fuente `Ambient` desconocida es error de configuración.
    pub fn with_ambient_properties<I, S>(mut self, names: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.ambient = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Sink ya registrado en `registry::diagnostics()`.
    pub fn with_sink(mut self, key: SinkKey) -> Self {
        self.sink = Some(key);
        self
    }

    /// Registra `sink` y lo usa para las unidades siguientes.
    pub fn with_sink_instance(self, sink: Arc<dyn DiagnosticSink>) -> Self {
        let key = registry::diagnostics().add(sink);
        self.with_sink(key)
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    /// Valida contra el entorno (registros, valores ligados, ambiente),
    /// particiona y compila la unidad. Falla antes de ejecutar nada.
    pub fn synthesize(&self, pipeline: &PipelineDefinition) -> Result<SynthesizedUnit, ConfigurationError> {
        let sink = match self.sink {
            Some(key) => key,
            None => registry::diagnostics().add(Arc::new(LogSink::new(self.settings.event_level))),
        };
        let plan = Arc::new(UnitPlan::compile(pipeline, &self.settings, &self.bound, self.ambient.as_ref(), sink)?);
        if !pipeline.is_async() {
            log::debug!("[synth] {} {}: synchronous unit, {} handlers",
                        pipeline.verb(),
                        pipeline.route().as_str(),
                        pipeline.len());
            return Ok(SynthesizedUnit::Sync(SyncUnit::new(plan)));
        }
        let states = partition(pipeline.handlers());
        if states.len() > self.settings.max_states {
            return Err(ConfigurationError::TooManyStates { states: states.len(),
                                                           max: self.settings.max_states });
        }
        log::debug!("[synth] {} {}: resumable unit, {} handlers in {} states",
                    pipeline.verb(),
                    pipeline.route().as_str(),
                    pipeline.len(),
                    states.len());
        Ok(SynthesizedUnit::Resumable(ResumableUnit::new(plan, states)))
    }
}
