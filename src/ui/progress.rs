//! Live terminal view of a refinement cycle.
//!
//! Supports three output modes:
//! - `full`: spinner while personas are chosen, then a stage progress bar
//! - `minimal`: one line per stage change
//! - `json`: JSON-formatted events for machine consumption

use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::errors::SessionError;
use crate::model::Persona;
use crate::presenter::markup::Span;
use crate::presenter::{ResultReport, ResultView};
use crate::session::{CycleId, Session, SessionHandle, SessionPhase};
use crate::stage::{self, STAGE_COUNT};
use crate::tracker::StageProgress;
use crate::ui::icons::{CHECK, THINKING};
use crate::ui::panels;

/// Output mode for the refiner UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Rich terminal UI with progress bars
    #[default]
    Full,
    /// Single-line status updates
    Minimal,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "minimal" => Self::Minimal,
            _ => Self::Full,
        })
    }
}

impl UiMode {
    /// Parse UI mode from string (convenience method).
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Machine-readable events emitted in JSON mode.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent<'a> {
    Submitted { cycle: CycleId, question: &'a str },
    Personas { cycle: CycleId, personas: &'a [Persona] },
    Stage { cycle: CycleId, index: usize, key: &'a str, label: &'a str },
    Complete { cycle: CycleId, result: ResultReport },
    Errored { cycle: CycleId, message: &'a str },
}

/// Per-cycle widgets and what has already been printed for the cycle.
#[derive(Default)]
struct LiveCycle {
    cycle: CycleId,
    spinner: Option<ProgressBar>,
    bar: Option<ProgressBar>,
    announced: bool,
    personas_shown: bool,
    last_stage: Option<usize>,
}

/// Terminal UI for refinement sessions.
pub struct RefinerUI {
    mode: UiMode,
    multi: MultiProgress,
    term: Term,
    width: usize,
    verbose: bool,
}

impl RefinerUI {
    /// `wrap_width` of 0 means "use the terminal width".
    pub fn new(mode: UiMode, wrap_width: usize, verbose: bool) -> Self {
        Self {
            mode,
            multi: MultiProgress::new(),
            term: Term::stdout(),
            width: panels::wrap_width(wrap_width),
            verbose,
        }
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    /// Print a line via `MultiProgress`, falling back to stdout when the bars are
    /// hidden (not a terminal) or the rich UI fails.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() || self.multi.println(msg.as_ref()).is_err() {
            let _ = writeln!(&self.term, "{}", msg.as_ref());
        }
    }

    fn emit(&self, event: &UiEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(&self.term, "{}", json);
        }
    }

    /// Render `cycle` live until it completes, fails or is superseded.
    pub async fn follow(
        &self,
        handle: &SessionHandle,
        cycle: CycleId,
    ) -> Result<Session, SessionError> {
        let mut sessions = handle.subscribe();
        let mut progress = handle.progress();
        let mut live = LiveCycle {
            cycle,
            ..Default::default()
        };

        let settled = handle.wait_settled(cycle);
        tokio::pin!(settled);

        let current = sessions.borrow_and_update().clone();
        self.on_session(&mut live, &current);

        loop {
            tokio::select! {
                outcome = &mut settled => {
                    let session = outcome?;
                    self.on_session(&mut live, &session);
                    let last = *progress.borrow();
                    self.on_progress(&mut live, last);
                    self.close(&mut live, &session);
                    return Ok(session);
                }
                Ok(()) = sessions.changed() => {
                    let session = sessions.borrow_and_update().clone();
                    self.on_session(&mut live, &session);
                }
                Ok(()) = progress.changed() => {
                    let snapshot = *progress.borrow_and_update();
                    self.on_progress(&mut live, snapshot);
                }
            }
        }
    }

    /// Catch the widgets up with `session`.
    ///
    /// Snapshots arrive latest-only, so a fast cycle may skip straight from
    /// selecting to settled; every step that was missed is replayed here.
    fn on_session(&self, live: &mut LiveCycle, session: &Session) {
        if session.cycle() != Some(live.cycle) {
            return;
        }
        let selecting = matches!(session.phase(), SessionPhase::SelectingPersonas { .. });
        if !live.announced {
            live.announced = true;
            self.announce(live, session, selecting);
        }
        if selecting {
            return;
        }

        if let Some(spinner) = live.spinner.take() {
            spinner.finish_and_clear();
        }
        let personas = session.personas();
        if live.personas_shown || personas.is_empty() {
            return;
        }
        live.personas_shown = true;
        self.show_personas(live.cycle, personas);
        if self.mode == UiMode::Full {
            live.bar = Some(self.stage_bar());
        }
    }

    fn announce(&self, live: &mut LiveCycle, session: &Session, selecting: bool) {
        match self.mode {
            UiMode::Json => self.emit(&UiEvent::Submitted {
                cycle: live.cycle,
                question: session.question(),
            }),
            UiMode::Minimal => self.print_line("Selecting personas..."),
            UiMode::Full if selecting => {
                let spinner = self.multi.add(ProgressBar::new_spinner());
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner} {msg}")
                        .expect("progress bar template is a valid static string"),
                );
                spinner.set_message(format!("{}Selecting personas...", THINKING));
                spinner.enable_steady_tick(Duration::from_millis(100));
                live.spinner = Some(spinner);
            }
            UiMode::Full => {}
        }
    }

    fn show_personas(&self, cycle: CycleId, personas: &[Persona]) {
        match self.mode {
            UiMode::Json => self.emit(&UiEvent::Personas { cycle, personas }),
            UiMode::Minimal => {
                let names: Vec<&str> = personas.iter().map(|p| p.name.as_str()).collect();
                self.print_line(format!("Personas: {}", names.join(", ")));
            }
            UiMode::Full => {
                self.print_line(style("Selected personas").cyan().bold().to_string());
                for persona in personas {
                    self.print_line(panels::persona_card(persona, self.width));
                }
            }
        }
    }

    fn stage_bar(&self) -> ProgressBar {
        let bar_style = ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan/blue}] {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");
        let bar = self.multi.add(ProgressBar::new(1000));
        bar.set_style(bar_style);
        bar.set_prefix(format!("1/{}", STAGE_COUNT));
        bar
    }

    fn on_progress(&self, live: &mut LiveCycle, progress: StageProgress) {
        if !live.personas_shown || progress.run == 0 {
            return;
        }
        let Some(stage) = progress.stage() else {
            return;
        };

        if let Some(bar) = &live.bar {
            bar.set_position((progress.overall(STAGE_COUNT) * 1000.0).round() as u64);
            bar.set_prefix(format!("{}/{}", progress.index + 1, STAGE_COUNT));
            bar.set_message(format!(
                "{} {}",
                style(stage.label).yellow(),
                style(stage.description).dim()
            ));
        }

        if live.last_stage == Some(progress.index) {
            return;
        }
        live.last_stage = Some(progress.index);
        match self.mode {
            UiMode::Json => self.emit(&UiEvent::Stage {
                cycle: live.cycle,
                index: progress.index,
                key: stage.key,
                label: stage.label,
            }),
            UiMode::Minimal => self.print_line(format!(
                "[{}/{}] {}",
                progress.index + 1,
                STAGE_COUNT,
                stage.label
            )),
            UiMode::Full => {
                if self.verbose {
                    self.print_line(format!(
                        "  {} {}",
                        style("→").dim(),
                        style(stage.description).dim()
                    ));
                }
            }
        }
    }

    fn close(&self, live: &mut LiveCycle, session: &Session) {
        if let Some(spinner) = live.spinner.take() {
            spinner.finish_and_clear();
        }
        if let Some(bar) = live.bar.take() {
            match session.phase() {
                SessionPhase::Complete { .. } => bar.finish_with_message(format!(
                    "{}{}",
                    CHECK,
                    stage::get_stage(stage::last_stage_index())
                        .map(|s| s.label)
                        .unwrap_or("Done")
                )),
                _ => bar.abandon(),
            }
        }
    }

    /// Print the outcome of a settled cycle.
    ///
    /// `details` reveals every collapsed section before rendering.
    pub fn show_outcome(&self, session: &Session, details: bool) {
        let Some(cycle) = session.cycle() else {
            return;
        };
        if let Some(message) = session.error() {
            match self.mode {
                UiMode::Json => self.emit(&UiEvent::Errored { cycle, message }),
                _ => self.print_line(panels::error_alert(message, self.width)),
            }
            return;
        }
        let Some(view) = ResultView::from_session(session) else {
            return;
        };
        if details {
            view.rationale.reveal();
            view.individual_answers.reveal();
            view.new_dimensions.reveal();
        }
        self.show_result(cycle, &view);
    }

    /// Print a result view as it currently stands (revealed sections included).
    pub fn show_result(&self, cycle: CycleId, view: &ResultView) {
        match self.mode {
            UiMode::Json => self.emit(&UiEvent::Complete {
                cycle,
                result: view.report(),
            }),
            UiMode::Minimal => {
                self.print_line(format!("Refined: {}", view.improved_question));
            }
            UiMode::Full => {
                if view.celebrating {
                    self.print_line(panels::celebration(view.iteration));
                }
                self.print_line("");
                self.print_line(panels::result_panels(view, self.width));
                self.print_line("");
            }
        }
    }

    /// Print one revealed section (interactive mode).
    pub fn show_section(&self, title: &str, spans: &[Span]) {
        if spans.is_empty() {
            self.print_line(
                style(format!("No {} available.", title.to_lowercase()))
                    .dim()
                    .to_string(),
            );
            return;
        }
        self.print_line(panels::section(title, spans, self.width));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RefinementResult;
    use crate::session::SessionEvent;
    use indicatif::ProgressDrawTarget;

    fn hidden_ui(mode: UiMode) -> RefinerUI {
        RefinerUI {
            mode,
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            term: Term::stdout(),
            width: 80,
            verbose: false,
        }
    }

    fn submitted() -> Session {
        let mut session = Session::new();
        session.reduce(SessionEvent::Submit {
            question: "What is happiness?".into(),
        });
        session
    }

    fn completed() -> Session {
        let mut session = submitted();
        let cycle = session.cycle().unwrap();
        session.reduce(SessionEvent::PersonasSelected {
            cycle,
            personas: vec![Persona::new("Aristotle", "Philosopher")],
        });
        session.reduce(SessionEvent::ImprovementReady {
            cycle,
            result: Box::new(RefinementResult::new("What makes a life good?")),
        });
        session
    }

    fn finished_progress() -> StageProgress {
        StageProgress {
            run: 1,
            index: stage::last_stage_index(),
            fraction: 1.0,
            running: false,
        }
    }

    #[test]
    fn test_skipped_processing_snapshot_is_replayed() {
        let ui = hidden_ui(UiMode::Full);
        let session = completed();
        let mut live = LiveCycle {
            cycle: session.cycle().unwrap(),
            ..Default::default()
        };

        ui.on_session(&mut live, &session);
        assert!(live.announced);
        assert!(live.personas_shown);
        assert!(live.spinner.is_none());
        let bar = live.bar.clone().unwrap();

        ui.on_progress(&mut live, finished_progress());
        assert_eq!(bar.position(), 1000);
        assert_eq!(live.last_stage, Some(stage::last_stage_index()));

        ui.close(&mut live, &session);
        assert!(live.bar.is_none());
        assert!(bar.is_finished());
    }

    #[test]
    fn test_selecting_then_complete_clears_spinner() {
        let ui = hidden_ui(UiMode::Full);
        let mut live = LiveCycle {
            cycle: submitted().cycle().unwrap(),
            ..Default::default()
        };

        ui.on_session(&mut live, &submitted());
        assert!(live.spinner.is_some());
        assert!(!live.personas_shown);

        ui.on_session(&mut live, &completed());
        assert!(live.spinner.is_none());
        assert!(live.personas_shown);
        assert!(live.bar.is_some());
    }

    #[test]
    fn test_other_cycles_are_ignored() {
        let ui = hidden_ui(UiMode::Minimal);
        let session = completed();
        let mut live = LiveCycle {
            cycle: session.cycle().unwrap() + 1,
            ..Default::default()
        };
        ui.on_session(&mut live, &session);
        assert!(!live.announced);
        assert!(!live.personas_shown);
    }

    #[test]
    fn test_ui_mode_parse() {
        assert_eq!(UiMode::parse("json"), UiMode::Json);
        assert_eq!(UiMode::parse("MINIMAL"), UiMode::Minimal);
        assert_eq!(UiMode::parse("full"), UiMode::Full);
        assert_eq!(UiMode::parse("anything"), UiMode::Full);
    }

    #[test]
    fn test_stage_event_serializes_with_tag() {
        let event = UiEvent::Stage {
            cycle: 3,
            index: 1,
            key: "critique",
            label: "Critiquing",
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stage");
        assert_eq!(json["cycle"], 3);
        assert_eq!(json["key"], "critique");
    }

    #[test]
    fn test_errored_event_serializes_message() {
        let event = UiEvent::Errored {
            cycle: 1,
            message: "An error occurred: HTTP error! status: 500",
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"errored\""));
        assert!(json.contains("status: 500"));
    }
}
