mod bootstrap;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use warden_config::{
    AllowlistConfig, WardenConfig, apply_all_defaults, config_dir, config_file_path, write_config,
};
use warden_core::Command;
use warden_policy::{classify, classify_target_type, recommend_profile, suggestions_for};

use bootstrap::load_runtime;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden: authorization gate and audit chain for security commands")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $WARDEN_CONFIG_DIR/config.yaml or ~/.warden/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Identity recorded with each decision
    #[arg(long, global = true, env = "USER", default_value = "unknown")]
    actor: String,

    /// Fall back to a localhost-only allowlist when none is configured
    #[arg(long, global = true)]
    safe_default: bool,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a command without authorizing it
    Analyze {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Authorize a command and record the decision
    Authorize {
        /// Also print the dry-run plan for an allowed command
        #[arg(long)]
        plan: bool,
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Check whether a single target is allowlisted
    Check { target: String },
    /// Verify the audit chain
    Verify {
        /// Also re-derive log-digest entries from the decision log
        #[arg(long)]
        against_log: bool,
    },
    /// Show engine status
    Status,
    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Analyze { text } => {
            let text = text.join(" ");
            let analysis = classify(&text);
            let target_type = analysis.target_type;
            let profile = recommend_profile(&analysis);
            let suggestions = suggestions_for(analysis.action_type);
            if cli.json {
                output::print_json(&serde_json::json!({
                    "analysis": analysis,
                    "targetType": target_type,
                    "profile": profile,
                    "suggestions": suggestions,
                }))?;
            } else {
                print!("{}", output::render_analysis(&analysis, target_type, profile, suggestions));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Authorize { plan, text } => {
            let runtime = load_runtime(&config_path).await?;
            let engine = runtime.engine(cli.safe_default).await?;
            let command = Command::new(text.join(" ")).with_context("source", "cli");
            let verdict = engine.evaluate_with_timeout(command, cli.actor.clone()).await;
            let dry_run = plan.then(|| verdict.plan());

            if cli.json {
                output::print_json(&serde_json::json!({ "verdict": verdict, "plan": dry_run }))?;
            } else {
                print!("{}", output::render_verdict(&verdict));
                if let Some(dry_run) = &dry_run {
                    print!("{}", output::render_plan(dry_run));
                }
            }
            Ok(if verdict.context.is_allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Check { target } => {
            let runtime = load_runtime(&config_path).await?;
            let allowlist = runtime.allowlist(cli.safe_default).await?;
            let allowed = allowlist.try_is_allowed(&target)?;
            let target_type = classify_target_type(&target);
            if cli.json {
                output::print_json(&serde_json::json!({
                    "target": target,
                    "allowed": allowed,
                    "targetType": target_type,
                }))?;
            } else {
                let verdict = if allowed { "allowed" } else { "not allowed" };
                println!("{target} ({target_type}) is {verdict}");
            }
            Ok(if allowed { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Commands::Verify { against_log } => {
            let runtime = load_runtime(&config_path).await?;
            let engine = runtime.engine(cli.safe_default).await?;
            let report = if against_log {
                engine.verify_against_log()?
            } else {
                engine.verify_chain()
            };
            if cli.json {
                output::print_json(&report)?;
            } else {
                print!("{}", output::render_verification(&report));
            }
            Ok(if report.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Status => {
            let runtime = load_runtime(&config_path).await?;
            let engine = runtime.engine(cli.safe_default).await?;
            let status = engine.status();
            if cli.json {
                output::print_json(&status)?;
            } else {
                print!("{}", output::render_status(&status));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => {
            if config_path.exists() && !force {
                output::note_warn(&format!(
                    "{} already exists; pass --force to overwrite",
                    config_path.display()
                ));
                return Ok(ExitCode::FAILURE);
            }
            let config = apply_all_defaults(WardenConfig {
                allowlist: Some(AllowlistConfig {
                    path: None,
                    targets: Some(
                        warden_config::defaults::SAFE_DEFAULT_TARGETS
                            .iter()
                            .map(|t| t.to_string())
                            .collect(),
                    ),
                }),
                ..Default::default()
            });
            write_config(&config, &config_path).await?;
            info!(path = %config_path.display(), "Wrote starter config");
            println!("Wrote {}", config_path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
