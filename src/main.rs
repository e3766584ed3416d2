use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lumi_keyword::{report, runner, utils::config::Config};

#[derive(Parser)]
#[command(name = "lumi-keyword")]
#[command(version = "0.1.0")]
#[command(about = "Keyword-driven test table runner", long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test table(s) from a file or directory
    Run {
        /// Path to a .cdd/.sdd/.std table or a directory of tables
        path: PathBuf,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Field separator (overrides config)
        #[arg(long)]
        separator: Option<String>,

        /// App map name (overrides config)
        #[arg(long)]
        app_map: Option<String>,

        /// Directory searched for scripts (overrides config)
        #[arg(long)]
        scripts_dir: Option<PathBuf>,

        /// Program used to check window/component existence (overrides config)
        #[arg(long)]
        probe: Option<PathBuf>,

        /// Default timeout for branch commands in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Stop a table at its first failure
        #[arg(long, default_value = "false")]
        stop_on_failure: bool,

        /// Generate reports (JSON, JUnit)
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// Check test table(s) for malformed records without running them
    Check {
        /// Path to a table or a directory of tables
        path: PathBuf,

        /// Field separator (overrides config)
        #[arg(long)]
        separator: Option<String>,
    },

    /// Generate report from saved run results
    Report {
        /// Path to results JSON
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Run {
            path,
            output,
            separator,
            app_map,
            scripts_dir,
            probe,
            timeout,
            stop_on_failure,
            report,
        } => {
            if let Some(separator) = separator {
                config.separator = separator;
            }
            if let Some(app_map) = app_map {
                config.app_map_name = app_map;
            }
            if let Some(dir) = scripts_dir {
                config.scripts_dir = dir;
            }
            if probe.is_some() {
                config.probe_command = probe;
            }
            if let Some(secs) = timeout {
                config.default_timeout_secs = secs;
            }
            if stop_on_failure {
                config.continue_on_failure = false;
            }

            println!(
                "{} Running tables from: {}",
                "▶".green().bold(),
                path.display()
            );
            println!("  Scripts: {}", config.scripts_dir.display().to_string().cyan());
            match &config.probe_command {
                Some(probe) => println!("  Probe: {}", probe.display().to_string().cyan()),
                None => println!("  Probe: {}", "not configured".yellow()),
            }
            if report {
                println!("  Output: {}", output.display().to_string().cyan());
            }

            let shutdown = Arc::new(AtomicBool::new(false));
            let shutdown_handler = shutdown.clone();
            ctrlc::set_handler(move || {
                println!("\n{} Stopping run...", "⏹".yellow());
                shutdown_handler.store(true, Ordering::SeqCst);
            })?;

            let summary = runner::run_tables(&path, &config, &output, report, shutdown).await?;
            if summary.has_failures() {
                std::process::exit(1);
            }
        }

        Commands::Check { path, separator } => {
            if let Some(separator) = separator {
                config.separator = separator;
            }
            println!("{} Checking tables in: {}", "🔍".to_string().blue(), path.display());
            let issues = runner::check_tables(&path, &config)?;
            if issues > 0 {
                println!("\n{} {} issue(s) found", "✗".red(), issues);
                std::process::exit(1);
            }
            println!("\n{} No issues found", "✓".green());
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref()).await?;
        }
    }

    Ok(())
}
