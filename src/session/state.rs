//! Session state machine: a tagged union plus a pure reducer.
//!
//! [`Session::reduce`] never performs I/O. It updates the session and returns
//! the [`SessionEffect`]s the controller must carry out (remote calls, tracker
//! commands, timers). Every response event carries the cycle token it was
//! issued under; events for any other cycle are dropped.

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{Persona, RefinementResult, normalize_question};

/// Monotonic token identifying one submit→personas→improvement round.
pub type CycleId = u64;

/// Which of the two remote calls an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteCall {
    SelectPersonas,
    ImproveQuestion,
}

impl std::fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteCall::SelectPersonas => write!(f, "select-personas"),
            RemoteCall::ImproveQuestion => write!(f, "improve-question"),
        }
    }
}

/// Lifecycle phase, carrying only the data valid in that phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    SelectingPersonas {
        cycle: CycleId,
    },
    Processing {
        cycle: CycleId,
        personas: Vec<Persona>,
    },
    Complete {
        cycle: CycleId,
        personas: Vec<Persona>,
        result: RefinementResult,
        /// Transient celebration after a success
        celebrating: bool,
    },
    Errored {
        cycle: CycleId,
        message: String,
        /// Personas fetched before the failure; kept but not shown as active
        retained_personas: Vec<Persona>,
    },
}

impl SessionPhase {
    pub fn cycle(&self) -> Option<CycleId> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::SelectingPersonas { cycle }
            | SessionPhase::Processing { cycle, .. }
            | SessionPhase::Complete { cycle, .. }
            | SessionPhase::Errored { cycle, .. } => Some(*cycle),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::SelectingPersonas { .. } => "selecting_personas",
            SessionPhase::Processing { .. } => "processing",
            SessionPhase::Complete { .. } => "complete",
            SessionPhase::Errored { .. } => "errored",
        }
    }
}

/// Inputs to the reducer: user actions, remote responses and timer expiries.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Submit {
        question: String,
    },
    Iterate,
    PersonasSelected {
        cycle: CycleId,
        personas: Vec<Persona>,
    },
    ImprovementReady {
        cycle: CycleId,
        result: Box<RefinementResult>,
    },
    RequestFailed {
        cycle: CycleId,
        call: RemoteCall,
        message: String,
    },
    CelebrationElapsed {
        cycle: CycleId,
    },
}

/// Work the controller must perform after a reduction, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Abort requests and timers belonging to a superseded cycle
    CancelInFlight,
    ResetTracker,
    StartTracker,
    FinishTracker,
    StopTracker,
    SelectPersonas {
        cycle: CycleId,
        question: String,
    },
    ImproveQuestion {
        cycle: CycleId,
        question: String,
        personas: Vec<Persona>,
    },
    Celebrate {
        cycle: CycleId,
    },
}

/// Mutable state of one refinement session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: Uuid,
    question: String,
    phase: SessionPhase,
    iteration: u32,
    last_cycle: CycleId,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            question: String::new(),
            phase: SessionPhase::Idle,
            iteration: 0,
            last_cycle: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Question of the current (or last) cycle, as sent to the backend.
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Number of successful completions so far.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn cycle(&self) -> Option<CycleId> {
        self.phase.cycle()
    }

    /// Persona set active in this cycle (empty unless processing or complete).
    pub fn personas(&self) -> &[Persona] {
        match &self.phase {
            SessionPhase::Processing { personas, .. } | SessionPhase::Complete { personas, .. } => {
                personas
            }
            _ => &[],
        }
    }

    pub fn result(&self) -> Option<&RefinementResult> {
        match &self.phase {
            SessionPhase::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Errored { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Personas kept from a cycle that failed during improvement.
    pub fn retained_personas(&self) -> &[Persona] {
        match &self.phase {
            SessionPhase::Errored {
                retained_personas, ..
            } => retained_personas,
            _ => &[],
        }
    }

    pub fn is_celebrating(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Complete {
                celebrating: true,
                ..
            }
        )
    }

    /// A request is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::SelectingPersonas { .. } | SessionPhase::Processing { .. }
        )
    }

    /// The current cycle reached `Complete` or `Errored`.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Complete { .. } | SessionPhase::Errored { .. }
        )
    }

    /// Apply one event and return the effects to execute.
    pub fn reduce(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match event {
            SessionEvent::Submit { question } => self.begin_cycle(&question),
            SessionEvent::Iterate => match &self.phase {
                SessionPhase::Complete { result, .. } => {
                    let next = result.improved_question.clone();
                    self.begin_cycle(&next)
                }
                other => {
                    debug!(phase = other.name(), "iterate ignored outside complete state");
                    Vec::new()
                }
            },
            SessionEvent::PersonasSelected { cycle, personas } => {
                if self.phase != (SessionPhase::SelectingPersonas { cycle }) {
                    return self.stale("personas", cycle);
                }
                info!(session = %self.id, cycle, count = personas.len(), "personas ready");
                self.phase = SessionPhase::Processing {
                    cycle,
                    personas: personas.clone(),
                };
                vec![
                    SessionEffect::StartTracker,
                    SessionEffect::ImproveQuestion {
                        cycle,
                        question: self.question.clone(),
                        personas,
                    },
                ]
            }
            SessionEvent::ImprovementReady { cycle, result } => {
                if !matches!(&self.phase, SessionPhase::Processing { cycle: c, .. } if *c == cycle)
                {
                    return self.stale("improvement", cycle);
                }
                let personas = match std::mem::replace(&mut self.phase, SessionPhase::Idle) {
                    SessionPhase::Processing { personas, .. } => personas,
                    _ => Vec::new(),
                };
                self.iteration += 1;
                info!(session = %self.id, cycle, iteration = self.iteration, "cycle complete");
                self.phase = SessionPhase::Complete {
                    cycle,
                    personas,
                    result: *result,
                    celebrating: true,
                };
                vec![
                    SessionEffect::FinishTracker,
                    SessionEffect::Celebrate { cycle },
                ]
            }
            SessionEvent::RequestFailed {
                cycle,
                call,
                message,
            } => {
                let pending = match &self.phase {
                    SessionPhase::SelectingPersonas { cycle: c } if *c == cycle => {
                        RemoteCall::SelectPersonas
                    }
                    SessionPhase::Processing { cycle: c, .. } if *c == cycle => {
                        RemoteCall::ImproveQuestion
                    }
                    _ => return self.stale("failure", cycle),
                };
                if pending != call {
                    return self.stale("failure", cycle);
                }

                warn!(session = %self.id, cycle, %call, %message, "cycle failed");
                let retained_personas = match std::mem::replace(&mut self.phase, SessionPhase::Idle)
                {
                    SessionPhase::Processing { personas, .. } => personas,
                    _ => Vec::new(),
                };
                self.phase = SessionPhase::Errored {
                    cycle,
                    message,
                    retained_personas,
                };
                match call {
                    RemoteCall::SelectPersonas => Vec::new(),
                    RemoteCall::ImproveQuestion => vec![SessionEffect::StopTracker],
                }
            }
            SessionEvent::CelebrationElapsed { cycle } => {
                if let SessionPhase::Complete {
                    cycle: c,
                    celebrating,
                    ..
                } = &mut self.phase
                    && *c == cycle
                {
                    *celebrating = false;
                }
                Vec::new()
            }
        }
    }

    /// Start a fresh cycle for `raw`, superseding whatever is in flight.
    fn begin_cycle(&mut self, raw: &str) -> Vec<SessionEffect> {
        let Some(question) = normalize_question(raw) else {
            debug!("blank question ignored");
            return Vec::new();
        };

        self.last_cycle += 1;
        let cycle = self.last_cycle;
        self.question = question.clone();
        self.phase = SessionPhase::SelectingPersonas { cycle };
        info!(session = %self.id, cycle, chars = question.chars().count(), "cycle submitted");

        vec![
            SessionEffect::CancelInFlight,
            SessionEffect::ResetTracker,
            SessionEffect::SelectPersonas { cycle, question },
        ]
    }

    fn stale(&self, what: &str, cycle: CycleId) -> Vec<SessionEffect> {
        debug!(
            session = %self.id,
            cycle,
            current = ?self.cycle(),
            what,
            "ignoring event from superseded cycle"
        );
        Vec::new()
    }
}
