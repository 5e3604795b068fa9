//! Constantes del sintetizador.
//!
//! `SYNTHESIZER_VERSION` forma parte del input del `definition_hash`: subirla
//! invalida los fingerprints de todas las pipelines aunque su forma no cambie.

/// Versión lógica del sintetizador. Mantener estable mientras la semántica de
/// ejecución (orden, particionado, wrapping de render) no cambie.
pub const SYNTHESIZER_VERSION: &str = "P1.0";

/// Valor del cursor de una unidad reanudable que falló.
pub const FAULTED_CURSOR: isize = -1;

/// Límite por defecto de estados por pipeline (ver `SynthesisSettings`).
pub const DEFAULT_MAX_STATES: usize = 64;
