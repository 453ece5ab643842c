use anyhow::{bail, Context};
use clap::Parser;
use hulc_eval::checkpoints::CheckpointResolver;
use hulc_eval::cli::Cli;
use hulc_eval::config::AppConfig;
use hulc_eval::credentials::load_credential;
use hulc_eval::environment::TabletopLoader;
use hulc_eval::planner::{build_planner, PlannerGateway};
use hulc_eval::rollout::{
    AutoConfirm, ConsoleConfirmation, ConsoleReporter, JsonlReporter, RolloutOrchestrator,
    RolloutSettings,
};
use std::path::Path;
use tracing::{error, info, warn};

mod main_runtime;

use main_runtime::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("\x1b[31m✗ {:#}\x1b[0m", e);
        std::process::exit(1);
    }
}

/// Load and validate the configuration in `dir`
fn load_config(dir: &Path) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load_from(dir)
        .with_context(|| format!("failed to load configuration from {}", dir.display()))?;
    if let Err(errors) = config.validate() {
        bail!("invalid configuration in {}: {}", dir.display(), errors.join("; "));
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.config)?;
    init_logging(cli.debug, cli.eval_log_dir.as_deref(), &config.logging);

    let resolver =
        CheckpointResolver::with_layout(&cli.train_folder, config.evaluation.checkpoint_layout());
    let checkpoints = resolver
        .resolve(&cli.selection()?)
        .with_context(|| format!("no checkpoints to evaluate in {}", cli.train_folder.display()))?;

    let credential = load_credential(cli.cohere_path.as_deref()).context("failed to read API key")?;
    if credential.is_some() && !cli.planner.requires_credential() {
        warn!("Planner '{}' does not use the API key from --cohere-path", cli.planner);
    }
    let planner = build_planner(cli.planner, &config.planner, credential)
        .with_context(|| format!("failed to set up planner '{}'", cli.planner))?;
    let gateway = PlannerGateway::new(planner);

    let settings = RolloutSettings {
        train_folder: cli.train_folder.clone(),
        dataset_path: cli.dataset_path.clone(),
        device: cli.device,
        instruction: cli.instruction(&config),
        session_reuse: cli.session_reuse(&config),
    };
    info!(
        planner = %cli.planner,
        session = %settings.session_reuse,
        "Evaluating {} checkpoint(s) on: {}",
        checkpoints.len(),
        settings.instruction
    );

    let mut orchestrator =
        RolloutOrchestrator::new(settings, Box::new(TabletopLoader::new()), gateway)
            .with_sink(Box::new(ConsoleReporter));
    if let Some(dir) = cli.eval_log_dir.as_deref() {
        let jsonl = JsonlReporter::create(dir)
            .with_context(|| format!("failed to open rollout log in {}", dir.display()))?;
        orchestrator = orchestrator.with_sink(Box::new(jsonl));
    }
    orchestrator = if cli.confirm_plans(&config) {
        orchestrator.with_confirmation(Box::new(ConsoleConfirmation::new()?))
    } else {
        orchestrator.with_confirmation(Box::new(AutoConfirm))
    };

    let summary = orchestrator.run(&checkpoints).await?;

    println!();
    print!("{}", summary.render_table());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_config_uses_defaults_without_files() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert!(config.evaluation.confirm_plan);
    }

    #[test]
    fn test_unreadable_config_names_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("default.toml"), "[evaluation\nconfirm_plan = ").unwrap();

        let err = load_config(tmp.path()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("failed to load configuration from"));
        assert!(message.contains(&tmp.path().display().to_string()));
    }

    #[test]
    fn test_invalid_config_lists_every_problem() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("default.toml"),
            "[evaluation]\ninstruction = \" \"\ncheckpoint_extension = \"\"\n",
        )
        .unwrap();

        let message = load_config(tmp.path()).unwrap_err().to_string();
        assert!(message.contains("evaluation.instruction must not be empty"));
        assert!(message.contains("evaluation.checkpoint_extension must not be empty"));
    }
}
