pub mod branch;
pub mod context;
pub mod events;
pub mod pipeline;
pub mod script;
pub mod state;
pub mod table;

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::driver::log_sink::EventLogSink;
use crate::driver::process::{ProcessProbe, ProcessScriptHost, UnavailableProbe};
use crate::driver::traits::GuiProbe;
use crate::parser::table::{is_table_file, parse_table_file};
use crate::report::{self, RunResults};
use crate::utils::config::Config;

pub use events::*;
pub use pipeline::CommandPipeline;
pub use state::*;
pub use table::{TableOptions, TableRunner};

/// Collect table files from a file or directory, sorted by path
pub fn collect_tables(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_table_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run test tables from a file or directory
///
/// Returns the run summary; a shutdown request aborts the run with an error
/// after the reports for the tables processed so far are written.
pub async fn run_tables(
    path: &Path,
    config: &Config,
    output: &Path,
    write_reports: bool,
    shutdown: Arc<AtomicBool>,
) -> Result<RunSummary> {
    let files = collect_tables(path)?;
    let base_dir = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(Path::new("."))
    };
    let context = context::RunContext::new(
        base_dir,
        Some(output),
        &config.facility_id,
        &config.app_map_name,
    );

    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    let probe: Arc<dyn GuiProbe> = match &config.probe_command {
        Some(program) => Arc::new(ProcessProbe::new(
            &context.resolve_path(program),
            config.probe_interval_ms,
            shutdown.clone(),
        )),
        None => Arc::new(UnavailableProbe),
    };
    let scripts = Arc::new(ProcessScriptHost::new(
        &context.resolve_path(&config.scripts_dir),
    ));
    let log = Arc::new(EventLogSink::new(emitter.clone()));
    let pipeline = CommandPipeline::new(probe, scripts, log)
        .with_default_timeout(config.default_timeout_secs);
    let runner = TableRunner::new(pipeline, emitter.clone(), TableOptions::from(config));

    let mut session = RunSessionState::new(&uuid::Uuid::new_v4().to_string());
    session.start();
    emitter.emit(RunEvent::SessionStarted {
        session_id: session.session_id.clone(),
    });

    if files.is_empty() {
        println!("{} No test tables found.", "ℹ".blue());
    }

    let mut aborted = None;
    for file in &files {
        let lines = parse_table_file(file)?;
        let mut table = TableState::new(&table_name(file), &file.display().to_string());
        let result = runner.run_table(&mut table, &lines).await;
        session.add_table(table);
        if let Err(e) = result {
            aborted = Some(e);
            break;
        }
    }

    session.finish();
    let summary = session.summary();
    emitter.emit(RunEvent::SessionFinished {
        summary: summary.clone(),
    });
    drop(runner);
    drop(emitter);
    // The listener ends once every sender is gone
    let _ = listener.await;

    if write_reports {
        context.ensure_output_dir()?;
        let results = RunResults::from_session(session.to_report());
        let json_path = report::json::write_report(&results, &context.output_dir)?;
        println!(
            "\n{} JSON report saved to: {}",
            "📄".to_string().blue(),
            json_path.display().to_string().cyan()
        );
        let junit_path = report::junit::write_report(&results, &context.output_dir)?;
        println!(
            "{} JUnit report saved to: {}",
            "📊".to_string().blue(),
            junit_path.display().to_string().cyan()
        );
    }

    if let Some(e) = aborted {
        return Err(anyhow::Error::new(e).context("Run aborted"));
    }
    Ok(summary)
}

/// Check test tables without running them; returns the number of issues
pub fn check_tables(path: &Path, config: &Config) -> Result<usize> {
    let mut total = 0;
    for file in collect_tables(path)? {
        let lines = parse_table_file(&file)?;
        let issues = table::check_lines(&lines, &config.separator);
        if issues.is_empty() {
            println!("  {} {} ({} records)", "✓".green(), file.display(), lines.len());
            continue;
        }
        println!("  {} {}", "✗".red(), file.display());
        for issue in &issues {
            println!("    line {}: {}", issue.line_number, issue.message.yellow());
        }
        total += issues.len();
    }
    Ok(total)
}
