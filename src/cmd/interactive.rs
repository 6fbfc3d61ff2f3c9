//! Interactive refinement loop: `refiner interactive`.

use anyhow::Result;
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};

use refiner::config::Config;
use refiner::presenter::ResultView;
use refiner::session::{CycleId, SessionHandle, Submission};
use refiner::ui::RefinerUI;

/// What the user can do once a cycle has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Iterate,
    ShowRationale,
    ShowIndividualAnswers,
    ShowNewDimensions,
    NewQuestion,
    Quit,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Iterate => "Refine further (iterate on the new question)",
            Action::ShowRationale => "Show why this question is better",
            Action::ShowIndividualAnswers => "Show individual persona answers",
            Action::ShowNewDimensions => "Show new dimensions",
            Action::NewQuestion => "Ask a new question",
            Action::Quit => "Quit",
        }
    }
}

/// Menu entries for the current result. Reveal actions are offered only for
/// sections that exist and are not shown yet.
pub fn actions_for(view: Option<&ResultView>) -> Vec<Action> {
    let mut actions = Vec::new();
    if let Some(view) = view {
        actions.push(Action::Iterate);
        if view.rationale.is_available() && !view.rationale.is_revealed() {
            actions.push(Action::ShowRationale);
        }
        if view.individual_answers.is_available() && !view.individual_answers.is_revealed() {
            actions.push(Action::ShowIndividualAnswers);
        }
        if view.new_dimensions.is_available() && !view.new_dimensions.is_revealed() {
            actions.push(Action::ShowNewDimensions);
        }
    }
    actions.push(Action::NewQuestion);
    actions.push(Action::Quit);
    actions
}

fn choose(actions: &[Action]) -> Result<Action> {
    let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What next?")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(actions[selection])
}

enum Next {
    Iterate,
    NewQuestion,
    Quit,
}

/// Show the settled cycle and loop on the action menu until the user moves on.
fn settle(ui: &RefinerUI, view: Option<&ResultView>) -> Result<Next> {
    loop {
        match choose(&actions_for(view))? {
            Action::Iterate => return Ok(Next::Iterate),
            Action::NewQuestion => return Ok(Next::NewQuestion),
            Action::Quit => return Ok(Next::Quit),
            Action::ShowRationale => {
                if let Some(view) = view {
                    ui.show_section("Why this question", view.rationale.reveal());
                }
            }
            Action::ShowIndividualAnswers => {
                if let Some(view) = view {
                    ui.show_section("Individual answers", view.individual_answers.reveal());
                }
            }
            Action::ShowNewDimensions => {
                if let Some(view) = view {
                    ui.show_section("New dimensions", view.new_dimensions.reveal());
                }
            }
        }
    }
}

async fn run_cycles(ui: &RefinerUI, handle: &SessionHandle, first: CycleId) -> Result<Next> {
    let mut cycle = first;
    loop {
        let session = ui.follow(handle, cycle).await?;
        ui.show_outcome(&session, false);

        let view = ResultView::from_session(&session);
        match settle(ui, view.as_ref())? {
            Next::Iterate => match handle.iterate().await? {
                Submission::Accepted { cycle: next } => cycle = next,
                Submission::Ignored => return Ok(Next::NewQuestion),
            },
            other => return Ok(other),
        }
    }
}

pub async fn cmd_interactive(config: &Config) -> Result<()> {
    let ui = RefinerUI::new(config.ui_mode, config.wrap_width, config.verbose);
    let handle = SessionHandle::spawn(config.backend()?, config.controller);

    ui.print_line("");
    ui.print_line(style("Question Refiner").bold().to_string());
    ui.print_line(
        style(format!("Backend: {}  (leave the question empty to quit)", config.base_url))
            .dim()
            .to_string(),
    );
    ui.print_line("");

    loop {
        let question: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Your question")
            .allow_empty(true)
            .interact_text()?;

        let Submission::Accepted { cycle } = handle.submit(question).await? else {
            break;
        };
        match run_cycles(&ui, &handle, cycle).await? {
            Next::Quit => break,
            Next::NewQuestion | Next::Iterate => continue,
        }
    }

    handle.shutdown().await;
    Ok(())
}
