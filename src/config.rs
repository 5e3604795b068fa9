//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone una estructura
//! inmutable (`CONFIG`) con los ajustes de síntesis y los valores ligados.
use std::str::FromStr;

use once_cell::sync::Lazy;
use pipe_core::{BoundValues, SynthesisSettings, Synthesizer};
use serde_json::Value;

use crate::errors::AppError;

const STRICT_TYPES: &str = "PIPEFLOW_STRICT_TYPES";
const CATCH_PANICS: &str = "PIPEFLOW_CATCH_PANICS";
const EVENT_LEVEL: &str = "PIPEFLOW_EVENT_LEVEL";
const MAX_STATES: &str = "PIPEFLOW_MAX_STATES";
/// Prefijo de los valores para fuentes `Bound` (`PIPEFLOW_BIND_PAGE_SIZE=25`
/// → clave `page_size`).
const BIND_PREFIX: &str = "PIPEFLOW_BIND_";

/// Configuración global de la aplicación.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Ajustes que se pasan al sintetizador.
    pub synthesis: SynthesisSettings,
    /// Valores de configuración disponibles para las pipelines.
    pub bound: BoundValues,
}

impl AppConfig {
    /// Construye la configuración a partir de pares (nombre, valor). Las
    /// variables ajenas al prefijo `PIPEFLOW_` se ignoran.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, AppError>
        where I: IntoIterator<Item = (K, V)>,
              K: AsRef<str>,
              V: AsRef<str>
    {
        let mut config = AppConfig::default();
        for (name, raw) in vars {
            let (name, raw) = (name.as_ref(), raw.as_ref().trim());
            match name {
                STRICT_TYPES => config.synthesis.strict_output_types = parse_flag(name, raw)?,
                CATCH_PANICS => config.synthesis.catch_panics = parse_flag(name, raw)?,
                EVENT_LEVEL => {
                    config.synthesis.event_level =
                        log::Level::from_str(raw).map_err(|_| AppError::Config(format!("{name}: nivel de log desconocido '{raw}'")))?
                }
                MAX_STATES => {
                    config.synthesis.max_states = raw.parse::<usize>()
                                                     .ok()
                                                     .filter(|n| *n > 0)
                                                     .ok_or_else(|| AppError::Config(format!("{name}: se espera un entero positivo, no '{raw}'")))?
                }
                _ => {
                    if let Some(key) = name.strip_prefix(BIND_PREFIX).filter(|k| !k.is_empty()) {
                        config.bound.insert(key.to_ascii_lowercase(), parse_bound(raw));
                    }
                }
            }
        }
        config.bound.sort_keys();
        Ok(config)
    }

    /// Lee `.env` (si existe) y las variables del proceso.
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Sintetizador con estos ajustes y valores ligados.
    pub fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(self.synthesis.clone()).with_bound_values(self.bound.clone())
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{name}: se espera un booleano, no '{raw}'"))),
    }
}

// JSON si se puede; si no, el texto tal cual.
fn parse_bound(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Instancia global perezosa de configuración, evaluada una sola vez. Una
/// configuración inválida se reporta y se reemplaza por los valores por
/// defecto.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    AppConfig::from_env().unwrap_or_else(|err| {
                             log::warn!("{err}; usando configuración por defecto");
                             AppConfig::default()
                         })
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_without_variables() {
        let config = AppConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.synthesis, SynthesisSettings::default());
        assert!(config.bound.is_empty());
    }

    #[test]
    fn reads_settings_and_bound_values() {
        let config = AppConfig::from_vars([("PIPEFLOW_STRICT_TYPES", "false"),
                                           ("PIPEFLOW_CATCH_PANICS", "0"),
                                           ("PIPEFLOW_EVENT_LEVEL", "info"),
                                           ("PIPEFLOW_MAX_STATES", "8"),
                                           ("PIPEFLOW_BIND_SITE", "main"),
                                           ("PIPEFLOW_BIND_PAGE_SIZE", "25"),
                                           ("PATH", "/usr/bin")]).unwrap();
        assert!(!config.synthesis.strict_output_types);
        assert!(!config.synthesis.catch_panics);
        assert_eq!(config.synthesis.event_level, log::Level::Info);
        assert_eq!(config.synthesis.max_states, 8);
        assert_eq!(config.bound.keys().collect::<Vec<_>>(), vec!["page_size", "site"]);
        assert_eq!(config.bound["page_size"], json!(25));
        assert_eq!(config.bound["site"], json!("main"));
    }

    #[test]
    fn rejects_malformed_values() {
        for (name, raw) in [("PIPEFLOW_STRICT_TYPES", "maybe"), ("PIPEFLOW_MAX_STATES", "0"), ("PIPEFLOW_EVENT_LEVEL", "loud")] {
            let err = AppConfig::from_vars([(name, raw)]).unwrap_err();
            assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with(name)), "{err}");
        }
    }
}
