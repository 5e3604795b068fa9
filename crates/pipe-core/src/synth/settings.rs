use crate::constants::DEFAULT_MAX_STATES;

/// Opciones de síntesis. Se pasan explícitamente al `Synthesizer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisSettings {
    /// Verifica el valor de cada handler contra su tipo declarado.
    pub strict_output_types: bool,
    /// Convierte pánicos de los cuerpos en `ExecutionFault::Panicked`.
    pub catch_panics: bool,
    /// Nivel del `LogSink` por defecto.
    pub event_level: log::Level,
    pub max_states: usize,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self { strict_output_types: true,
               catch_panics: true,
               event_level: log::Level::Debug,
               max_states: DEFAULT_MAX_STATES }
    }
}
