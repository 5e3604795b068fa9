//! Tabla de rutas: registra pipelines sintetizadas y despacha invocaciones
//! por verbo + path.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use pipe_core::{InputOrigin, InputSlots, Invocation, PipelineDefinition, RouteTemplate, SynthesizedUnit, Synthesizer, Verb};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;

struct RouteEntry {
    seq: u64,
    route: RouteTemplate,
    unit: Arc<SynthesizedUnit>,
    registered_at: DateTime<Utc>,
}

/// Resumen serializable de una ruta registrada.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub verb: Verb,
    pub route: String,
    pub definition_hash: String,
    pub is_async: bool,
    pub inputs: Vec<String>,
    pub registered_at: DateTime<Utc>,
}

pub struct RouteTable {
    synthesizer: Synthesizer,
    routes: DashMap<(Verb, String), RouteEntry>,
    next_seq: AtomicU64,
}

impl RouteTable {
    pub fn new(synthesizer: Synthesizer) -> Self {
        Self { synthesizer,
               routes: DashMap::new(),
               next_seq: AtomicU64::new(0) }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.synthesizer())
    }

    /// Sintetiza `pipeline` y la registra bajo su verbo y ruta. Devuelve el
    /// hash de la definición.
    pub fn register(&self, pipeline: &PipelineDefinition) -> Result<String, AppError> {
        let key = (pipeline.verb(), pipeline.route().as_str().to_string());
        if self.routes.contains_key(&key) {
            return Err(AppError::DuplicateRoute { verb: key.0, route: key.1 });
        }
        let unit = self.synthesizer.synthesize(pipeline)?;
        let hash = unit.definition_hash().to_string();
        match self.routes.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(e) => {
                let (verb, route) = e.key().clone();
                Err(AppError::DuplicateRoute { verb, route })
            }
            dashmap::mapref::entry::Entry::Vacant(e) => {
                log::info!("ruta registrada: {} {} ({})", pipeline.verb(), pipeline.route().as_str(), if unit.is_async() { "reanudable" } else { "síncrona" });
                e.insert(RouteEntry { seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                                      route: pipeline.route().clone(),
                                      unit: Arc::new(unit),
                                      registered_at: Utc::now() });
                Ok(hash)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Unidad y parámetros crudos de la ruta que atiende `verb path`. Si
    /// varias coinciden gana la registrada primero.
    pub fn resolve(&self, verb: Verb, path: &str) -> Option<(Arc<SynthesizedUnit>, IndexMap<String, String>)> {
        self.routes
            .iter()
            .filter(|entry| entry.key().0 == verb)
            .filter_map(|entry| entry.route.match_path(path).map(|params| (entry.seq, entry.unit.clone(), params)))
            .min_by_key(|(seq, _, _)| *seq)
            .map(|(_, unit, params)| (unit, params))
    }

    /// Rutas registradas en orden de registro.
    pub fn routes(&self) -> Vec<RouteSummary> {
        let mut entries: Vec<(u64, RouteSummary)> =
            self.routes
                .iter()
                .map(|entry| {
                    let (verb, route) = entry.key().clone();
                    (entry.seq,
                     RouteSummary { verb,
                                    route,
                                    definition_hash: entry.unit.definition_hash().to_string(),
                                    is_async: entry.unit.is_async(),
                                    inputs: entry.unit.inputs().iter().map(|s| s.name.clone()).collect(),
                                    registered_at: entry.registered_at })
                })
                .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, summary)| summary).collect()
    }

    /// Despacha una request: completa los inputs de ruta y query a partir de
    /// `path` y espera el resultado de la unidad. Los valores ya presentes en
    /// `invocation` tienen prioridad.
    pub async fn dispatch(&self, verb: Verb, path: &str, mut invocation: Invocation) -> Result<Value, AppError> {
        let (unit, route_params) = self.resolve(verb, path)
                                       .ok_or_else(|| AppError::RouteNotFound { verb,
                                                                                path: path.to_string() })?;
        bind_raw(unit.inputs(), InputOrigin::Route, route_params, &mut invocation)?;
        bind_raw(unit.inputs(), InputOrigin::Query, query_params(path), &mut invocation)?;

        let request_id = Uuid::new_v4();
        log::debug!("[{request_id}] {verb} {path}");
        let outcome = unit.call(invocation).await;
        if let Err(fault) = &outcome {
            log::warn!("[{request_id}] {verb} {path} falló: {fault}");
        }
        Ok(outcome?)
    }
}

// Convierte cada valor crudo al tipo del slot que lo declara.
fn bind_raw(slots: &InputSlots, origin: InputOrigin, raw: IndexMap<String, String>, invocation: &mut Invocation) -> Result<(), AppError> {
    for slot in slots.iter().filter(|s| s.origin == origin) {
        let Some(text) = raw.get(&slot.name) else {
            continue;
        };
        if invocation.input(&slot.name).is_some() {
            continue;
        }
        let value = slot.value_type
                        .coerce_str(text)
                        .ok_or_else(|| AppError::InvalidValue { name: slot.name.clone(),
                                                                raw: text.clone(),
                                                                expected: slot.value_type })?;
        invocation.set_input(slot.name.clone(), value);
    }
    Ok(())
}

/// Pares `clave=valor` del query string. Sin decodificación de porcentajes;
/// si una clave se repite gana la primera.
fn query_params(path: &str) -> IndexMap<String, String> {
    let mut params = IndexMap::new();
    if let Some((_, query)) = path.split_once('?') {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.entry(key.to_string()).or_insert_with(|| value.to_string());
        }
    }
    params
}
