//! Informational commands: `refiner stages` and `refiner ping`.

use anyhow::Result;
use console::style;

use refiner::config::Config;
use refiner::stage::get_all_stages;
use refiner::ui::UiMode;
use refiner::ui::icons::{CHECK, CROSS};

pub fn cmd_stages(mode: UiMode) -> Result<()> {
    let stages = get_all_stages();
    if mode == UiMode::Json {
        println!("{}", serde_json::to_string_pretty(stages)?);
        return Ok(());
    }

    println!();
    println!("Progress stages");
    println!("===============");
    println!();
    for (i, stage) in stages.iter().enumerate() {
        println!(
            "  {}. {:<13} {}",
            i + 1,
            style(stage.label).yellow(),
            style(stage.description).dim()
        );
    }
    println!();
    Ok(())
}

/// Probe the backend. Returns `false` when it is unreachable.
pub async fn cmd_ping(config: &Config) -> Result<bool> {
    let backend = config.http_backend()?;
    match backend.ping().await {
        Ok(message) => {
            println!(
                "{}{} responded: {}",
                CHECK,
                style(backend.base_url()).cyan(),
                message
            );
            Ok(true)
        }
        Err(e) => {
            println!(
                "{}{} is not reachable: {}",
                CROSS,
                style(backend.base_url()).cyan(),
                e
            );
            Ok(false)
        }
    }
}
