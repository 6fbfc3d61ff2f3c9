//! Configuration view and validation commands: `refiner config`.

use anyhow::Result;
use std::path::Path;

use super::super::ConfigCommands;

pub fn cmd_config(
    project_dir: &Path,
    backend_url: Option<String>,
    timeout_secs: Option<u64>,
    command: Option<ConfigCommands>,
) -> Result<()> {
    use refiner::refiner_config::{RefinerConfig, RefinerToml};

    let config = RefinerConfig::with_cli_args(project_dir.to_path_buf(), backend_url, timeout_secs)?;
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Refiner Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No refiner.toml found at {}", config_path.display());
                println!("Using defaults. Run 'refiner config init' to create one.");
            }
            println!();

            println!("Effective values (with env/CLI overrides):");
            let toml = &config.toml;
            println!("[backend]");
            println!("  base_url = \"{}\"", toml.backend.base_url);
            println!(
                "  selection_timeout_secs = {}",
                toml.backend.selection_timeout_secs
            );
            println!(
                "  improvement_timeout_secs = {}",
                toml.backend.improvement_timeout_secs
            );
            println!();
            println!("[stages]");
            println!("  tick_ms = {}", toml.stages.tick_ms);
            println!("  fraction_step = {}", toml.stages.fraction_step);
            println!("  advance_secs = {}", toml.stages.advance_secs);
            println!();
            println!("[display]");
            println!("  celebration_ms = {}", toml.display.celebration_ms);
            println!("  wrap_width = {}", toml.display.wrap_width);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                if config_path.exists() {
                    println!("Configuration is valid.");
                } else {
                    println!("No refiner.toml found. Using defaults (valid).");
                }
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let target = config.project_config_file();
            if target.exists() {
                println!("refiner.toml already exists at {}", target.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(dir) = target.parent()
                && !dir.exists()
            {
                std::fs::create_dir_all(dir)?;
            }

            RefinerToml::default().save(&target)?;

            println!("Created refiner.toml at {}", target.display());
            println!();
            println!("You can now customize:");
            println!("  - [backend] base_url, selection_timeout_secs, improvement_timeout_secs");
            println!("  - [stages] tick_ms, fraction_step, advance_secs");
            println!("  - [display] celebration_ms, wrap_width");
            println!();
        }
    }

    Ok(())
}
