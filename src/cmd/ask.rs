//! One-shot refinement: `refiner ask`.

use anyhow::Result;
use console::style;
use tracing::info;

use refiner::config::Config;
use refiner::session::{SessionHandle, Submission};
use refiner::ui::RefinerUI;

/// Run `iterations` chained cycles for `question`.
///
/// Returns `false` when a cycle ended in an error.
pub async fn cmd_ask(config: &Config, question: &str, iterations: u32, details: bool) -> Result<bool> {
    let ui = RefinerUI::new(config.ui_mode, config.wrap_width, config.verbose);
    let handle = SessionHandle::spawn(config.backend()?, config.controller);
    info!(backend = %config.base_url, iterations, "starting refinement");

    let mut submission = handle.submit(question).await?;
    let mut remaining = iterations.max(1);

    let succeeded = loop {
        let Submission::Accepted { cycle } = submission else {
            ui.print_line(style("Nothing to refine: the question is empty.").dim().to_string());
            break true;
        };

        let session = ui.follow(&handle, cycle).await?;
        ui.show_outcome(&session, details);

        if session.error().is_some() {
            break false;
        }
        remaining -= 1;
        if remaining == 0 {
            break true;
        }
        submission = handle.iterate().await?;
    };

    handle.shutdown().await;
    Ok(succeeded)
}
