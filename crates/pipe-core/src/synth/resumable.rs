//! Unidad reanudable: máquina de estados explícita con un único `advance`
//! reentrante.
//!
//! Cursor: `0..N` = estado actual, `N` = completada, `FAULTED_CURSOR` = falló.
//! Cada estado guarda su resultado parcial, la operación pendiente y el flag
//! `waiting`. Suspender = registrar `advance` como continuación y volver;
//! reanudar = volver a llamar `advance`, que salta el trabajo ya hecho.
//!
//! Solo un `advance` ejecuta a la vez por corrida: una llamada concurrente (o
//! reentrante desde una continuación) deja pedido otro paso al que está
//! activo y retorna.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use super::plan::{Invoked, UnitPlan};
use super::State;
use crate::constants::FAULTED_CURSOR;
use crate::diagnostics::UnitEventKind;
use crate::errors::ExecutionFault;
use crate::future::{lock, PendingOp, Registration, UnitCompletion};
use crate::model::Invocation;
use crate::source::{InputSlots, Scope};

/// Unidad sintetizada para pipelines con al menos un handler asíncrono.
/// Cada `start`/`prepare` crea una corrida independiente.
#[derive(Debug, Clone)]
pub struct ResumableUnit {
    plan: Arc<UnitPlan>,
    states: Arc<Vec<State>>,
}

impl ResumableUnit {
    pub(crate) fn new(plan: Arc<UnitPlan>, states: Vec<State>) -> Self {
        Self { plan,
               states: Arc::new(states) }
    }

    /// Crea una corrida sin ejecutar nada (cursor en 0).
    pub fn prepare(&self, invocation: Invocation) -> ResumableRun {
        let frames = self.states.iter().map(|_| Frame::default()).collect();
        let machine = Machine { invocation: Arc::new(invocation),
                                inputs: None,
                                last: None,
                                frames };
        ResumableRun { shared: Arc::new(RunShared { plan: self.plan.clone(),
                                                    states: self.states.clone(),
                                                    run_id: Uuid::new_v4(),
                                                    cursor: AtomicIsize::new(0),
                                                    machine: Mutex::new(machine),
                                                    active: AtomicBool::new(false),
                                                    requested: AtomicBool::new(false),
                                                    completion: UnitCompletion::new() }) }
    }

    /// Crea una corrida y la avanza hasta la primera suspensión real.
    pub fn start(&self, invocation: Invocation) -> ResumableRun {
        let run = self.prepare(invocation);
        run.advance();
        run
    }

    /// Estados en que se particionó la pipeline.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Inputs externos unificados que espera cada invocación.
    pub fn inputs(&self) -> &InputSlots {
        &self.plan.inputs
    }

    /// Hash de la definición de la pipeline de origen.
    pub fn definition_hash(&self) -> &str {
        &self.plan.definition_hash
    }
}

#[derive(Debug, Default)]
struct Frame {
    result: Option<Value>,
    pending: Option<PendingOp>,
    waiting: bool,
}

#[derive(Debug)]
struct Machine {
    invocation: Arc<Invocation>,
    /// Inputs externos capturados en la primera entrada.
    inputs: Option<Arc<Vec<Value>>>,
    /// Resultado previo vigente.
    last: Option<Value>,
    frames: Vec<Frame>,
}

struct RunShared {
    plan: Arc<UnitPlan>,
    states: Arc<Vec<State>>,
    run_id: Uuid,
    cursor: AtomicIsize,
    machine: Mutex<Machine>,
    active: AtomicBool,
    requested: AtomicBool,
    completion: UnitCompletion,
}

/// Estado observable de una corrida, derivado del cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Aún no suspendida (incluye no iniciada).
    Running,
    Suspended { state: usize },
    Completed,
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    /// El estado terminó y el cursor avanzó.
    Advanced,
    /// Continuación registrada; hay que volver.
    Suspended,
    /// La operación pendiente ya está completa.
    Ready,
}

/// Una invocación en curso de una `ResumableUnit`. Los clones comparten la
/// misma corrida.
#[derive(Clone)]
pub struct ResumableRun {
    shared: Arc<RunShared>,
}

impl ResumableRun {
    /// Avanza la máquina todo lo posible. No-op si ya completó o falló.
    ///
    /// Con `catch_panics` desactivado, un pánico de handler marca la corrida
    /// como fallida, resuelve la completitud y se vuelve a lanzar.
    pub fn advance(&self) {
        let shared = &*self.shared;
        shared.requested.store(true, Ordering::SeqCst);
        loop {
            if shared.active.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
                return;
            }
            {
                let _active = ActiveGuard(&shared.active);
                while shared.requested.swap(false, Ordering::SeqCst) {
                    self.step();
                }
            }
            if !shared.requested.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    fn step(&self) {
        let current = Cell::new(None);
        let plan = &self.shared.plan;
        let outcome = if plan.settings.catch_panics {
            plan.guard(&current, || self.drive(&current))
        } else {
            match panic::catch_unwind(AssertUnwindSafe(|| self.drive(&current))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    self.fault(plan.panic_fault(&current, payload.as_ref()));
                    panic::resume_unwind(payload);
                }
            }
        };
        if let Err(fault) = outcome {
            self.fault(fault);
        }
        self.publish();
    }

    // Fuera de la frontera de pánicos: un listener que falla no mueve el
    // cursor de una corrida completada.
    fn publish(&self) {
        let shared = &*self.shared;
        let n = shared.states.len();
        if self.cursor() != n as isize || shared.completion.is_resolved() {
            return;
        }
        let value = lock(&shared.machine).frames.get(n - 1).and_then(|f| f.result.clone());
        if let Some(value) = value {
            shared.completion.resolve(Ok(value));
        }
    }

    fn drive(&self, current: &Cell<Option<usize>>) -> Result<(), ExecutionFault> {
        while let Some(k) = self.live_state() {
            let waiting = lock(&self.shared.machine).frames[k].waiting;
            let progress = if waiting {
                Progress::Ready
            } else {
                self.run_handlers(k, current)?
            };
            match progress {
                Progress::Advanced => {}
                Progress::Suspended => return Ok(()),
                Progress::Ready => {
                    if !self.collect(k, current, waiting)? {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    fn live_state(&self) -> Option<usize> {
        let cursor = self.shared.cursor.load(Ordering::SeqCst);
        if cursor < 0 || cursor as usize >= self.shared.states.len() {
            None
        } else {
            Some(cursor as usize)
        }
    }

    fn run_handlers(&self, k: usize, current: &Cell<Option<usize>>) -> Result<Progress, ExecutionFault> {
        let shared = &*self.shared;
        let plan = &shared.plan;
        let (invocation, captured, mut last) = {
            let m = lock(&shared.machine);
            (m.invocation.clone(), m.inputs.clone(), m.last.clone())
        };
        let inputs = match captured {
            Some(inputs) => inputs,
            None => {
                plan.emit(shared.run_id, k, UnitEventKind::InvocationStarted);
                let bound = Arc::new(plan.inputs.bind_all(&invocation)?);
                lock(&shared.machine).inputs = Some(bound.clone());
                bound
            }
        };

        for index in shared.states[k].handlers.clone() {
            current.set(Some(index));
            plan.handler_started(shared.run_id, k, index);
            let scope = Scope { invocation: &invocation,
                                inputs: &inputs,
                                predecessor: last.as_ref() };
            match plan.invoke(index, &scope)? {
                Invoked::Value(raw) => {
                    if let Some(value) = plan.complete(index, raw)? {
                        last = Some(value);
                    }
                    plan.handler_finished(shared.run_id, k, index);
                }
                Invoked::Pending(op) => {
                    current.set(None);
                    return Ok(self.await_op(k, op, last));
                }
            }
        }
        current.set(None);
        self.finish_state(k, last)?;
        Ok(Progress::Advanced)
    }

    fn await_op(&self, k: usize, op: PendingOp, last: Option<Value>) -> Progress {
        {
            let mut m = lock(&self.shared.machine);
            m.last = last;
            let frame = &mut m.frames[k];
            frame.pending = Some(op.clone());
            frame.waiting = true;
        }
        let run = self.clone();
        match op.on_complete(move || run.advance()) {
            Registration::Registered => {
                self.shared.plan.emit(self.shared.run_id, k, UnitEventKind::Suspended);
                Progress::Suspended
            }
            Registration::AlreadyComplete => Progress::Ready,
        }
    }

    /// Recoge el resultado de la operación pendiente del estado `k`. `false`
    /// si todavía no completó (se sigue esperando, sin re-registrar).
    fn collect(&self, k: usize, current: &Cell<Option<usize>>, resumed: bool) -> Result<bool, ExecutionFault> {
        let shared = &*self.shared;
        let plan = &shared.plan;
        let (pending, mut last) = {
            let m = lock(&shared.machine);
            (m.frames[k].pending.clone(), m.last.clone())
        };
        let op = pending.ok_or_else(|| ExecutionFault::Internal(format!("state {k} waiting without a pending operation")))?;
        if !op.is_complete() {
            return Ok(false);
        }
        let index = shared.states[k].last_handler();
        let handler = &plan.handlers[index].handler;
        current.set(Some(index));
        if resumed {
            plan.emit(shared.run_id, k, UnitEventKind::Resumed);
        }
        let raw = match op.take_result() {
            Some(Ok(value)) => value,
            Some(Err(error)) => {
                return Err(ExecutionFault::Handler { handler: handler.clone(),
                                                     error })
            }
            None => return Err(ExecutionFault::Internal(format!("result of handler {handler} already consumed"))),
        };
        if let Some(value) = plan.complete(index, raw)? {
            last = Some(value);
        }
        plan.handler_finished(shared.run_id, k, index);
        current.set(None);
        {
            let mut m = lock(&shared.machine);
            let frame = &mut m.frames[k];
            frame.pending = None;
            frame.waiting = false;
        }
        self.finish_state(k, last)?;
        Ok(true)
    }

    fn finish_state(&self, k: usize, last: Option<Value>) -> Result<(), ExecutionFault> {
        let shared = &*self.shared;
        {
            let mut m = lock(&shared.machine);
            m.frames[k].result = last.clone();
            m.last = last.clone();
        }
        let next = k + 1;
        if next < shared.states.len() {
            shared.cursor.store(next as isize, Ordering::SeqCst);
            return Ok(());
        }
        if last.is_none() {
            return Err(ExecutionFault::Internal("pipeline produced no value".to_string()));
        }
        shared.cursor.store(next as isize, Ordering::SeqCst);
        shared.plan.emit(shared.run_id, k, UnitEventKind::Completed);
        Ok(())
    }

    fn fault(&self, fault: ExecutionFault) {
        let shared = &*self.shared;
        let n = shared.states.len() as isize;
        // Solo un estado vivo puede fallar; completada o fallida es final.
        let Ok(previous) = shared.cursor
                                 .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| (0..n).contains(&c).then_some(FAULTED_CURSOR))
        else {
            return;
        };
        shared.plan.emit(shared.run_id,
                         previous as usize,
                         UnitEventKind::Faulted { message: fault.to_string() });
        shared.completion.resolve(Err(fault));
    }

    /// Valor crudo del cursor.
    pub fn cursor(&self) -> isize {
        self.shared.cursor.load(Ordering::SeqCst)
    }

    /// Estado actual; `Suspended` solo si el estado vivo espera una operación.
    pub fn status(&self) -> RunStatus {
        let cursor = self.cursor();
        if cursor < 0 {
            return RunStatus::Faulted;
        }
        let state = cursor as usize;
        if state >= self.shared.states.len() {
            RunStatus::Completed
        } else if self.is_waiting(state) {
            RunStatus::Suspended { state }
        } else {
            RunStatus::Running
        }
    }

    /// `true` si el estado `state` tiene una operación pendiente sin recoger.
    pub fn is_waiting(&self, state: usize) -> bool {
        lock(&self.shared.machine).frames.get(state).is_some_and(|f| f.waiting)
    }

    /// Resultado vigente al cerrar el estado `state`, si ya cerró.
    pub fn state_result(&self, state: usize) -> Option<Value> {
        lock(&self.shared.machine).frames.get(state).and_then(|f| f.result.clone())
    }

    /// Número de estados (N); el cursor vale N al completar.
    pub fn state_count(&self) -> usize {
        self.shared.states.len()
    }

    /// Handle compartido con el resultado final de la corrida.
    pub fn completion(&self) -> UnitCompletion {
        self.shared.completion.clone()
    }

    /// Identificador de la corrida, presente en sus eventos.
    pub fn run_id(&self) -> Uuid {
        self.shared.run_id
    }
}

struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for ResumableRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumableRun")
         .field("run_id", &self.shared.run_id)
         .field("cursor", &self.cursor())
         .field("states", &self.shared.states.len())
         .finish()
    }
}
