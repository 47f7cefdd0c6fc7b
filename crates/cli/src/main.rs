//! relsync command-line tool.
//!
//! Publishes local build artifacts to a single GitHub release from a CI job,
//! and generates / validates the configuration file it reads.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use relsync_core::artifacts;
use relsync_core::ci::{self, GateDecision};
use relsync_core::config::Config;
use relsync_core::github::GitHubClient;
use relsync_core::models::ReleaseAction;
use relsync_core::reconcile::{Reconciler, ReleaseTarget};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// relsync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "relsync",
    version,
    about = "Keep one GitHub release in sync with local build artifacts"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "relsync.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or replace the release and upload the artifacts.
    Publish {
        /// Override `release.tag`.
        #[arg(long)]
        tag: Option<String>,

        /// Override `release.branch` (branch name or commit SHA).
        #[arg(long)]
        target: Option<String>,

        /// Override `assets.base_dir`.
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Publish even when the CI gate would skip this build.
        #[arg(long)]
        force: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./relsync.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

/// CLI values that take precedence over the config file.
#[derive(Debug, Default)]
struct Overrides {
    tag: Option<String>,
    target: Option<String>,
    base_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(tag) = self.tag {
            config.release.tag = tag;
        }
        if let Some(target) = self.target {
            config.release.branch = target;
        }
        if let Some(base_dir) = self.base_dir {
            config.assets.base_dir = base_dir;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::fail(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = expand_tilde(&cli.config);
    match cli.command {
        Commands::Publish {
            tag,
            target,
            base_dir,
            force,
        } => {
            let overrides = Overrides {
                tag,
                target,
                base_dir,
            };
            cmd_publish(&config_path, overrides, force).await
        }
        Commands::Init { output } => {
            init_tracing("warn");
            cmd_init(&output)
        }
        Commands::Validate => {
            init_tracing("warn");
            cmd_validate(&config_path)
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path, overrides: Overrides) -> Result<Config> {
    let mut config = Config::load_from_file(path).context("failed to load configuration file")?;
    overrides.apply(&mut config);
    config.resolve_env_vars();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_publish(config_path: &Path, overrides: Overrides, force: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    init_tracing(&config.logging.level);

    match ci::gate(&config) {
        GateDecision::Publish => {}
        GateDecision::Skip(reason) if force => {
            info!(%reason, "CI gate overridden with --force");
        }
        GateDecision::Skip(reason) => {
            println!("{}", style::warn(&format!("Skipping publish: {}", reason)));
            return Ok(());
        }
    }

    let artifacts = artifacts::resolve(&config.assets.base_dir, &config.assets.patterns)
        .context("failed to resolve artifacts")?;

    // The token is checked before any network I/O.
    let client = GitHubClient::from_config(&config).context("failed to build GitHub client")?;
    let reconciler = Reconciler::new(client, ReleaseTarget::from(&config));

    let stats = reconciler
        .run(&artifacts)
        .await
        .with_context(|| format!("failed to publish release '{}'", config.release.tag))?;

    match stats.release_action {
        ReleaseAction::Skipped => {
            println!(
                "{}",
                style::warn(&format!(
                    "No artifacts matched in {}; release '{}' left untouched",
                    config.assets.base_dir.display(),
                    config.release.tag
                ))
            );
        }
        action => {
            println!(
                "{}",
                style::success(&format!(
                    "Release '{}' {} on {}: {} asset(s) uploaded",
                    config.release.tag, action, config.github.repo, stats.uploaded
                ))
            );
            if stats.replaced_assets > 0 || stats.pruned_assets > 0 {
                println!(
                    "  {}",
                    style::dim(&format!(
                        "{} replaced, {} stale removed",
                        stats.replaced_assets, stats.pruned_assets
                    ))
                );
            }
        }
    }
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, Config::default_template()).context("failed to write config file")?;

    println!("{}", style::success(&format!("Default configuration written to {}", output.display())));
    println!();
    println!("{}", style::header("Next steps:"));
    println!("  1. Set github.repo, release.tag and assets.patterns");
    println!("  2. Export the token variable named by github.token_env (GH_TOKEN)");
    println!(
        "  3. Validate with: relsync validate --config {}",
        output.display()
    );
    println!(
        "  4. Publish from CI: relsync publish --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config = Config::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config.resolve_env_vars();
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  {}", style::fail(&format!("Validation error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    }

    let artifacts = artifacts::resolve(&config.assets.base_dir, &config.assets.patterns)
        .context("failed to resolve artifacts")?;

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  GitHub repo   : {}", config.github.repo);
    println!(
        "  GitHub token  : {} ({})",
        style::presence(config.github.token.as_deref()),
        config.github.token_env
    );
    println!("  Release tag   : {}", config.release.tag);
    println!("  Target        : {}", config.release.branch);
    println!("  On existing   : {}", config.release.on_existing);
    println!("  CI gate       : {}", if config.ci.enabled { "enabled" } else { "disabled" });
    println!("  Artifacts     : {} matched", artifacts.len());
    for artifact in &artifacts {
        println!(
            "    {}",
            style::dim(&format!(
                "{} ({} bytes, {})",
                artifact.name, artifact.size, artifact.content_type
            ))
        );
    }

    if config.github.token.is_none() {
        println!();
        println!(
            "{}",
            style::warn(&format!("{} is not set; publish will fail", config.github.token_env))
        );
    }
    Ok(())
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_publish_overrides() {
        let cli = Cli::try_parse_from([
            "relsync", "--config", "ci/relsync.toml", "publish", "--tag", "v1-nightly", "--force",
        ])
        .unwrap();
        assert_eq!(cli.config, "ci/relsync.toml");
        match cli.command {
            Commands::Publish { tag, force, base_dir, .. } => {
                assert_eq!(tag.as_deref(), Some("v1-nightly"));
                assert!(force);
                assert!(base_dir.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_overrides_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relsync.toml");
        std::fs::write(&path, Config::default_template()).unwrap();

        let config = load_config(
            &path,
            Overrides {
                tag: Some("edge".into()),
                target: Some("deadbeef".into()),
                base_dir: Some(PathBuf::from("out")),
            },
        )
        .unwrap();
        assert_eq!(config.release.tag, "edge");
        assert_eq!(config.release.branch, "deadbeef");
        assert_eq!(config.assets.base_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_empty_tag_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relsync.toml");
        std::fs::write(&path, Config::default_template()).unwrap();

        let overrides = Overrides {
            tag: Some(String::new()),
            ..Default::default()
        };
        assert!(load_config(&path, overrides).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relsync.toml");
        cmd_init(&path).unwrap();
        assert!(cmd_init(&path).is_err());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, Config::default_template());
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("relsync.toml"), PathBuf::from("relsync.toml"));
    }
}
