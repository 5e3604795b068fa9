//! pipe-core: síntesis de pipelines declarativas a unidades invocables
//! (síncronas o reanudables).
pub mod constants;
pub mod diagnostics;
pub mod errors;
pub mod future;
pub mod handler;
pub mod hashing;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod source;
pub mod synth;

pub use diagnostics::{DiagnosticSink, LogSink, MemorySink, UnitEvent, UnitEventKind};
pub use errors::{ConfigurationError, ExecutionFault, HandlerError, HandlerRef, RegistryError};
pub use future::{PendingOp, Registration, Resolver, UnitCompletion, UnitOutcome};
pub use handler::{Behavior, HandlerBody, HandlerDefinition, HandlerKind, RenderTarget};
pub use model::{Arg, HandlerArgs, Invocation, RenderMode, RenderOutput, UploadedArtifact, ValueType};
pub use pipeline::{PipelineBuilder, PipelineDefinition, PipelineMetadata, RouteTemplate, Verb};
pub use registry::{BehaviorKey, CaptureTable, Registry, RegistryKey, SinkKey};
pub use source::{BoundValues, ExternalInput, InputOrigin, InputSlot, InputSlots, ValueSource};
pub use synth::{partition, ResumableRun, ResumableUnit, RunStatus, State, SynthesisSettings, SynthesizedUnit, Synthesizer, SyncUnit};
