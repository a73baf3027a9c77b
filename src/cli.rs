use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::{OutputFormat, WorkshopConfig};
use crate::performance::{
    HostSnapshot, MemoryLimit, PerformanceReport, PerformanceSystem, ProcessProvider, Scenario,
};

/// Workshop performance diagnostics
#[derive(Parser)]
#[command(name = "workshop-perf")]
#[command(about = "Aggregate host performance counters and explain what they mean")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration directory path
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a recorded host snapshot (JSON)
    Analyze {
        /// Path to the snapshot file
        snapshot: PathBuf,
    },

    /// Sample this process's memory and timing
    Live(LiveArgs),

    /// Run a workshop anti-pattern scenario against a simulated host
    Demo(DemoArgs),

    /// Show the active thresholds
    Thresholds,

    /// Show or create the configuration file
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LiveArgs {
    /// Seconds between samples
    #[arg(long)]
    pub interval: Option<u64>,

    /// Number of samples to take
    #[arg(long)]
    pub samples: Option<u32>,

    /// Memory ceiling in host shorthand (e.g. 512M, -1 for unlimited)
    #[arg(long)]
    pub memory_limit: Option<String>,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Scenario name (n-plus-one, memory-retention, hook-overload, slow-request, baseline)
    pub scenario: Option<String>,

    /// List available scenarios
    #[arg(long)]
    pub list: bool,

    /// Items processed by the N+1 loop and the hook overload render
    #[arg(long)]
    pub posts: Option<u32>,

    /// Megabytes retained by the memory scenario
    #[arg(long)]
    pub retain_mb: Option<u64>,

    /// Delay added by the slow request scenario
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Simulate a host with verbose query logging turned off
    #[arg(long)]
    pub no_query_log: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Command-line interface handler
pub struct CliHandler {
    config: WorkshopConfig,
    config_dir: Option<PathBuf>,
    system: PerformanceSystem,
    format: OutputFormat,
}

impl CliHandler {
    /// Create a new CLI handler
    pub fn new(config_dir: Option<PathBuf>, format: Option<OutputFormat>) -> Result<Self> {
        let config = WorkshopConfig::load_or_default(config_dir.as_deref())
            .context("Failed to load configuration")?;
        let system = PerformanceSystem::new(config.thresholds.clone());
        let format = format.unwrap_or(config.output.format);

        Ok(Self {
            config,
            config_dir,
            system,
            format,
        })
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Analyze { snapshot } => self.handle_analyze(snapshot),
            Commands::Live(args) => self.handle_live(args).await,
            Commands::Demo(args) => self.handle_demo(args),
            Commands::Thresholds => self.handle_thresholds(),
            Commands::Config(args) => self.handle_config(args),
        }
    }

    fn handle_analyze(&self, path: PathBuf) -> Result<()> {
        let snapshot = HostSnapshot::load(&path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;

        let report = self.system.report(&snapshot);
        self.print_report(&report)
    }

    async fn handle_live(&self, args: LiveArgs) -> Result<()> {
        let interval = args.interval.unwrap_or(self.config.live.interval_secs).max(1);
        let samples = args.samples.unwrap_or(self.config.live.samples).max(1);
        let limit = args
            .memory_limit
            .as_deref()
            .map(MemoryLimit::parse)
            .or_else(|| self.config.live.memory_limit());

        let mut provider = ProcessProvider::new(limit);
        let mut ticker = tokio::time::interval(Duration::from_secs(interval));

        info!("Sampling {} times every {}s", samples, interval);
        for sample in 1..=samples {
            ticker.tick().await;
            provider.refresh();

            let report = self.system.report(&provider);
            if self.format == OutputFormat::Table {
                println!("Sample {}/{}", sample, samples);
            }
            self.print_report(&report)?;
        }

        Ok(())
    }

    fn handle_demo(&self, args: DemoArgs) -> Result<()> {
        if args.list {
            for scenario in Scenario::all() {
                println!("  {:<18} {}", scenario.name(), scenario.description());
            }
            return Ok(());
        }

        let name = args
            .scenario
            .context("Scenario name required (use --list to see available scenarios)")?;
        let scenario: Scenario = name.parse()?;

        let mut demo = self.config.demo.clone();
        if let Some(posts) = args.posts {
            demo.posts = posts;
        }
        if let Some(retain_mb) = args.retain_mb {
            demo.retain_mb = retain_mb;
        }
        if let Some(delay_ms) = args.delay_ms {
            demo.delay_ms = delay_ms;
        }
        if args.no_query_log {
            demo.save_queries = false;
        }
        demo.validate()?;

        info!("Running scenario {}: {}", scenario, scenario.description());
        let host = scenario.run(&demo);
        let report = self.system.report(&host);
        self.print_report(&report)
    }

    fn handle_thresholds(&self) -> Result<()> {
        let t = self.system.thresholds();
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(t)?),
            OutputFormat::Table => {
                println!("Advisor Thresholds");
                println!("==================");
                println!("  {:<24} > {}", "Query count", t.high_query_count);
                println!("  {:<24} > {}s", "Slow query", t.slow_query_seconds);
                println!("  {:<24} > {}%", "Memory usage", t.high_memory_percent);
                println!(
                    "  {:<24} < {}% (over {} samples)",
                    "Cache hit ratio", t.low_cache_ratio_percent, t.min_cache_samples
                );
                println!("  {:<24} > {}s", "Execution time", t.slow_request_seconds);
            }
        }
        Ok(())
    }

    fn handle_config(&self, args: ConfigArgs) -> Result<()> {
        let path = WorkshopConfig::default_path(self.config_dir.as_deref())?;

        match args.action {
            ConfigAction::Show => {
                println!("# {}", path.display());
                print!("{}", toml::to_string_pretty(&self.config)?);
            }
            ConfigAction::Init { force } => {
                if path.exists() && !force {
                    anyhow::bail!(
                        "Configuration already exists at {} (use --force to overwrite)",
                        path.display()
                    );
                }
                WorkshopConfig::default().save_to_file(&path)?;
                println!("Wrote default configuration to {}", path.display());
            }
        }

        Ok(())
    }

    fn print_report(&self, report: &PerformanceReport) -> Result<()> {
        for advisory in report.problems() {
            warn!("[{}] {}", advisory.priority, advisory.message);
        }

        match self.format {
            OutputFormat::Table => println!("{}", report.render_table()),
            OutputFormat::Json => println!("{}", report.to_json()?),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_demo_command() {
        let cli = Cli::try_parse_from([
            "workshop-perf",
            "--format",
            "json",
            "demo",
            "n-plus-one",
            "--posts",
            "5",
            "--no-query-log",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Demo(args) => {
                assert_eq!(args.scenario.as_deref(), Some("n-plus-one"));
                assert_eq!(args.posts, Some(5));
                assert!(args.no_query_log);
            }
            _ => panic!("expected demo command"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["workshop-perf", "thresholds", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Thresholds));
    }

    #[tokio::test]
    async fn test_handler_runs_demo_and_config_init() {
        let dir = TempDir::new().unwrap();
        let handler = CliHandler::new(Some(dir.path().to_path_buf()), Some(OutputFormat::Json)).unwrap();

        let demo = DemoArgs {
            scenario: Some("baseline".to_string()),
            list: false,
            posts: None,
            retain_mb: None,
            delay_ms: None,
            no_query_log: false,
        };
        handler.handle_command(Commands::Demo(demo)).await.unwrap();

        let init = ConfigArgs {
            action: ConfigAction::Init { force: false },
        };
        handler.handle_command(Commands::Config(init)).await.unwrap();
        assert!(dir.path().join("config.toml").exists());

        // A second init without --force refuses to overwrite
        let init = ConfigArgs {
            action: ConfigAction::Init { force: false },
        };
        assert!(handler.handle_command(Commands::Config(init)).await.is_err());
    }

    #[tokio::test]
    async fn test_handler_rejects_unknown_scenario() {
        let dir = TempDir::new().unwrap();
        let handler = CliHandler::new(Some(dir.path().to_path_buf()), None).unwrap();

        let demo = DemoArgs {
            scenario: Some("cache-stampede".to_string()),
            list: false,
            posts: None,
            retain_mb: None,
            delay_ms: None,
            no_query_log: false,
        };
        let err = handler.handle_command(Commands::Demo(demo)).await.unwrap_err();
        assert!(err.to_string().contains("Unknown scenario"));
    }
}
