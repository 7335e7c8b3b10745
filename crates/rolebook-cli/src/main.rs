#![deny(unsafe_code)]

//! Rolebook CLI: browse and inspect agent and tool definitions.

mod report;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rolebook_config::AppConfig;
use rolebook_core::{ConfigResolver, DefinitionKind, TraceCollector, TraceReader, build_info};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::report::Reporter;

/// Agents and tools shown as examples by `rolebook overview`.
const SAMPLE_AGENT: &str = "coder-agent";
const SAMPLE_TOOL: &str = "write_python";

/// Rolebook: resolve agent and tool definitions from a catalog tree.
#[derive(Parser)]
#[command(name = "rolebook", version = build_info::VERSION_LINE, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "rolebook.toml")]
    config: PathBuf,

    /// Catalog root directory (overrides `catalog.root`).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Print the resolver's decisions to stderr after the command.
    #[arg(long, global = true)]
    explain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List agents and tools and load the sample definitions.
    Overview,

    /// List available agents.
    Agents,

    /// List available tools.
    Tools,

    /// Show the definition of an agent.
    Agent {
        /// Agent name (directory under `role/`).
        name: String,
    },

    /// Show the definition of a tool.
    Tool {
        /// Tool name (file stem anywhere under `tool/`).
        name: String,
    },

    /// Print the file a name resolves to.
    Which {
        #[command(subcommand)]
        target: WhichTarget,
    },

    /// Load every definition and report files that cannot be read.
    Check,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Show version, commit and build profile.
    Version,
}

#[derive(Subcommand)]
enum WhichTarget {
    /// Resolve an agent name.
    Agent { name: String },
    /// Resolve a tool name.
    Tool { name: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (mut config, config_found) = load_config(&cli.config).await?;
    if let Some(root) = &cli.root {
        config.catalog.root = root.clone();
    }

    let trace = init_tracing(&cli, &config);
    if !config_found {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let code = run(&cli, &config)?;

    if let Some(reader) = trace {
        let mut stderr = Reporter::new(io::stderr().lock(), false);
        stderr.explain(&reader.entries(), reader.dropped())?;
    }

    Ok(code)
}

/// Install the fmt subscriber, plus the trace collector when `--explain`
/// is set. `RUST_LOG` wins over `-v`, which wins over `logging.level`.
fn init_tracing(cli: &Cli, config: &AppConfig) -> Option<TraceReader> {
    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter);

    let collector = cli.explain.then(|| TraceCollector::for_resolver(256));
    let reader = collector.as_ref().map(TraceCollector::reader);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(collector)
        .init();

    reader
}

fn run(cli: &Cli, config: &AppConfig) -> Result<ExitCode> {
    let resolver = ConfigResolver::from_config(&config.catalog);
    let mut out = Reporter::new(io::stdout().lock(), cli.json);

    match &cli.command {
        Commands::Overview => {
            let agents = resolver.list_agents()?;
            let tools = resolver.list_tools()?;
            let samples = [
                (
                    DefinitionKind::Agent,
                    SAMPLE_AGENT,
                    resolver.resolve_agent(SAMPLE_AGENT)?,
                ),
                (
                    DefinitionKind::Tool,
                    SAMPLE_TOOL,
                    resolver.resolve_tool(SAMPLE_TOOL)?,
                ),
            ];
            out.overview(&agents, &tools, config.report.preview_limit, &samples)?;
        }
        Commands::Agents => out.agents(&resolver.list_agents()?)?,
        Commands::Tools => out.tools(&resolver.list_tools()?)?,
        Commands::Agent { name } => {
            let record = resolver
                .resolve_agent(name)
                .with_context(|| format!("failed to resolve agent '{name}'"))?;
            out.record(DefinitionKind::Agent, name, record.as_ref())?;
            return Ok(found_code(record.is_some()));
        }
        Commands::Tool { name } => {
            let record = resolver
                .resolve_tool(name)
                .with_context(|| format!("failed to resolve tool '{name}'"))?;
            out.record(DefinitionKind::Tool, name, record.as_ref())?;
            return Ok(found_code(record.is_some()));
        }
        Commands::Which { target } => {
            let (kind, name, path) = match target {
                WhichTarget::Agent { name } => {
                    (DefinitionKind::Agent, name, resolver.agent_path(name)?)
                }
                WhichTarget::Tool { name } => {
                    (DefinitionKind::Tool, name, resolver.tool_path(name)?)
                }
            };
            out.path(kind, name, path.as_deref())?;
            return Ok(found_code(path.is_some()));
        }
        Commands::Check => {
            let report = resolver.check_tree()?;
            out.check(&report)?;
            return Ok(found_code(report.is_clean()));
        }
        Commands::Config { show } => cmd_config(&cli.config, config, *show)?,
        Commands::Version => println!("rolebook {}", build_info::version_string()),
    }

    Ok(ExitCode::SUCCESS)
}

fn found_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render config as TOML")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Load the config file, or defaults rooted at the working directory when
/// the file does not exist. The flag reports whether a file was found.
async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load config '{}'", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use rolebook_test_utils::TestConfigBuilder;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag_carries_build_info() {
        let command = Cli::command();
        assert_eq!(command.get_version(), Some(build_info::VERSION_LINE));
    }

    #[test]
    fn test_parse_which_tool() {
        let cli = Cli::parse_from(["rolebook", "--root", "/srv", "which", "tool", "lint"]);
        assert_eq!(cli.root, Some(PathBuf::from("/srv")));
        assert!(matches!(
            cli.command,
            Commands::Which {
                target: WhichTarget::Tool { ref name }
            } if name == "lint"
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["rolebook", "tools", "--json", "--explain"]);
        assert!(cli.json);
        assert!(cli.explain);
    }

    #[tokio::test]
    async fn test_load_config_missing_file_uses_defaults() {
        let (config, found) = load_config(Path::new("/nonexistent/rolebook.toml"))
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(config.catalog.root, PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rolebook.toml");
        tokio::fs::write(&path, "[catalog]\nroot = \"catalog\"\n")
            .await
            .unwrap();

        let (config, found) = load_config(&path).await.unwrap();
        assert!(found);
        assert_eq!(config.catalog.root, tmp.path().join("catalog"));
    }

    #[tokio::test]
    async fn test_load_config_invalid_file_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rolebook.toml");
        tokio::fs::write(&path, "[catalog]\nmax_depth = 0\n")
            .await
            .unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("failed to load config"));
    }

    #[test]
    fn test_config_renders_as_toml() {
        let config = TestConfigBuilder::new()
            .preview_limit(5)
            .log_level("debug")
            .build();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("preview_limit = 5"));
        assert!(rendered.contains("level = \"debug\""));
    }
}
