//! Exclusive-owner actor around [`Session`].
//!
//! The controller task owns the session, the stage tracker and any in-flight
//! backend request. User commands (from [`SessionHandle`]) and backend
//! responses arrive on channels and are reduced strictly one at a time, so no
//! lock guards the session and no partial update is ever observable. Each
//! reduction ends by publishing a snapshot on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

use super::state::{CycleId, RemoteCall, Session, SessionEffect, SessionEvent};
use crate::backend::ReasoningBackend;
use crate::errors::SessionError;
use crate::tasks::ScopedTasks;
use crate::tracker::{StageProgress, StageTracker, TrackerTiming};

/// Tunables for one controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub tracker: TrackerTiming,
    /// How long a completed cycle stays in its celebratory state
    pub celebration: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tracker: TrackerTiming::default(),
            celebration: Duration::from_secs(3),
        }
    }
}

/// Outcome of a `submit`/`iterate` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A new cycle started
    Accepted { cycle: CycleId },
    /// Nothing happened (blank question, or nothing to iterate on)
    Ignored,
}

enum Command {
    Submit {
        question: String,
        reply: oneshot::Sender<Submission>,
    },
    Iterate {
        reply: oneshot::Sender<Submission>,
    },
}

/// Client side of a running session controller.
///
/// Dropping the handle (or calling [`SessionHandle::shutdown`]) stops the
/// controller, which aborts its timers and any outstanding request.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    session: watch::Receiver<Session>,
    progress: watch::Receiver<StageProgress>,
    worker: JoinHandle<()>,
}

impl SessionHandle {
    /// Start a controller on the current Tokio runtime.
    pub fn spawn(backend: Arc<dyn ReasoningBackend>, settings: ControllerSettings) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();

        let session = Session::new();
        let (published, session_rx) = watch::channel(session.clone());
        let tracker = StageTracker::new(settings.tracker);
        let progress = tracker.subscribe();

        let span = info_span!("session", id = %session.id());
        let controller = SessionController {
            session,
            backend,
            tracker,
            celebration: settings.celebration,
            in_flight: ScopedTasks::new(),
            responses_tx,
            published,
        };
        let worker = tokio::spawn(controller.run(commands_rx, responses_rx).instrument(span));

        Self {
            commands: commands_tx,
            session: session_rx,
            progress,
            worker,
        }
    }

    /// Submit a new question, superseding any cycle in flight.
    pub async fn submit(&self, question: impl Into<String>) -> Result<Submission, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                question: question.into(),
                reply,
            })
            .map_err(|_| SessionError::ControllerClosed)?;
        rx.await.map_err(|_| SessionError::ControllerClosed)
    }

    /// Feed the last improved question back in as a new cycle.
    pub async fn iterate(&self) -> Result<Submission, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Iterate { reply })
            .map_err(|_| SessionError::ControllerClosed)?;
        rx.await.map_err(|_| SessionError::ControllerClosed)
    }

    /// Wait until `cycle` completes, fails, or is superseded by a newer cycle.
    pub async fn wait_settled(&self, cycle: CycleId) -> Result<Session, SessionError> {
        let mut rx = self.session.clone();
        let session = rx
            .wait_for(|s| match s.cycle() {
                Some(current) if current == cycle => s.is_settled(),
                Some(current) => current > cycle,
                None => false,
            })
            .await
            .map_err(|_| SessionError::ControllerClosed)?;
        Ok(session.clone())
    }

    /// Submit `question` and wait for its cycle to settle.
    ///
    /// Returns `None` when the question was blank.
    pub async fn refine(&self, question: impl Into<String>) -> Result<Option<Session>, SessionError> {
        match self.submit(question).await? {
            Submission::Accepted { cycle } => Ok(Some(self.wait_settled(cycle).await?)),
            Submission::Ignored => Ok(None),
        }
    }

    /// Iterate and wait for the new cycle to settle.
    ///
    /// Returns `None` when there was no completed result to iterate on.
    pub async fn refine_again(&self) -> Result<Option<Session>, SessionError> {
        match self.iterate().await? {
            Submission::Accepted { cycle } => Ok(Some(self.wait_settled(cycle).await?)),
            Submission::Ignored => Ok(None),
        }
    }

    /// Latest published session state.
    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.clone()
    }

    pub fn progress(&self) -> watch::Receiver<StageProgress> {
        self.progress.clone()
    }

    /// Stop the controller and wait for it to exit.
    pub async fn shutdown(self) {
        let Self {
            commands, worker, ..
        } = self;
        drop(commands);
        let _ = worker.await;
    }
}

struct SessionController {
    session: Session,
    backend: Arc<dyn ReasoningBackend>,
    tracker: StageTracker,
    celebration: Duration,
    in_flight: ScopedTasks,
    responses_tx: mpsc::UnboundedSender<SessionEvent>,
    published: watch::Sender<Session>,
}

impl SessionController {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut responses: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Submit { question, reply }) => {
                        let outcome = self.dispatch_user(SessionEvent::Submit { question });
                        let _ = reply.send(outcome);
                    }
                    Some(Command::Iterate { reply }) => {
                        let outcome = self.dispatch_user(SessionEvent::Iterate);
                        let _ = reply.send(outcome);
                    }
                    None => break,
                },
                Some(event) = responses.recv() => self.dispatch(event),
            }
        }

        self.in_flight.cancel_all();
        self.tracker.stop();
        debug!("session controller stopped");
    }

    fn dispatch_user(&mut self, event: SessionEvent) -> Submission {
        let before = self.session.cycle();
        self.dispatch(event);
        match self.session.cycle() {
            Some(cycle) if Some(cycle) != before => Submission::Accepted { cycle },
            _ => Submission::Ignored,
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let effects = self.session.reduce(event);
        for effect in effects {
            self.execute(effect);
        }
        self.published.send_replace(self.session.clone());
    }

    fn execute(&mut self, effect: SessionEffect) {
        match effect {
            SessionEffect::CancelInFlight => self.in_flight.cancel_all(),
            SessionEffect::ResetTracker => self.tracker.reset(),
            SessionEffect::StartTracker => self.tracker.start(),
            SessionEffect::FinishTracker => self.tracker.finish(),
            SessionEffect::StopTracker => self.tracker.stop(),
            SessionEffect::SelectPersonas { cycle, question } => {
                let backend = self.backend.clone();
                let tx = self.responses_tx.clone();
                let span = info_span!("remote", call = %RemoteCall::SelectPersonas, cycle);
                self.in_flight.spawn(
                    async move {
                        let event = match backend.select_personas(&question).await {
                            Ok(personas) => SessionEvent::PersonasSelected { cycle, personas },
                            Err(e) => SessionEvent::RequestFailed {
                                cycle,
                                call: RemoteCall::SelectPersonas,
                                message: e.user_message(),
                            },
                        };
                        let _ = tx.send(event);
                    }
                    .instrument(span),
                );
            }
            SessionEffect::ImproveQuestion {
                cycle,
                question,
                personas,
            } => {
                let backend = self.backend.clone();
                let tx = self.responses_tx.clone();
                let span = info_span!("remote", call = %RemoteCall::ImproveQuestion, cycle);
                self.in_flight.spawn(
                    async move {
                        let event = match backend.improve_question(&question, &personas).await {
                            Ok(result) => SessionEvent::ImprovementReady {
                                cycle,
                                result: Box::new(result),
                            },
                            Err(e) => SessionEvent::RequestFailed {
                                cycle,
                                call: RemoteCall::ImproveQuestion,
                                message: e.user_message(),
                            },
                        };
                        let _ = tx.send(event);
                    }
                    .instrument(span),
                );
            }
            SessionEffect::Celebrate { cycle } => {
                let tx = self.responses_tx.clone();
                let duration = self.celebration;
                self.in_flight.spawn(async move {
                    tokio::time::sleep(duration).await;
                    let _ = tx.send(SessionEvent::CelebrationElapsed { cycle });
                });
            }
        }
    }
}
