use super::state::{RunSummary, TableCounters};
use crate::driver::traits::Severity;
use crate::parser::types::StatusCode;
use tokio::sync::broadcast;

/// Table execution events for real-time updates
#[derive(Debug, Clone)]
pub enum RunEvent {
    // Session events
    SessionStarted {
        session_id: String,
    },
    SessionFinished {
        summary: RunSummary,
    },

    // Table events
    TableStarted {
        table: String,
        record_count: usize,
    },
    TableFinished {
        table: String,
        counters: TableCounters,
        duration_ms: Option<u64>,
    },

    // Record events
    RecordStarted {
        line_number: usize,
        record: String,
    },
    RecordFinished {
        line_number: usize,
        status: StatusCode,
        status_info: String,
        duration_ms: u64,
    },
    Branch {
        from_line: usize,
        block_id: String,
        to_line: Option<usize>,
    },

    // Test-log message
    Message {
        facility: String,
        message: String,
        severity: Severity,
        detail: Option<String>,
    },
}

/// Event emitter for broadcasting run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<RunEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::print(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("console listener skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn print(event: &RunEvent) {
        use colored::Colorize;

        match event {
            RunEvent::SessionStarted { session_id } => {
                println!(
                    "\n{} Run started: {}",
                    "▶".green().bold(),
                    session_id.cyan()
                );
            }

            RunEvent::SessionFinished { summary } => {
                println!("\n{} Run finished", "■".blue().bold());
                println!("  Tables: {}", summary.total_tables);
                println!("  Records: {}", summary.counters.total_records);
                println!(
                    "  {} passed, {} warnings, {} failed, {} skipped, {} branches",
                    summary.counters.general_passes.to_string().green(),
                    summary.counters.general_warnings.to_string().yellow(),
                    summary.counters.general_failures.to_string().red(),
                    summary.counters.skipped.to_string().yellow(),
                    summary.counters.branches.to_string().cyan()
                );
                if let Some(duration) = summary.total_duration_ms {
                    println!("  Duration: {}ms", duration);
                }
            }

            RunEvent::TableStarted {
                table,
                record_count,
            } => {
                println!(
                    "\n  {} Table: {} ({} records)",
                    "→".blue(),
                    table.white().bold(),
                    record_count
                );
            }

            RunEvent::TableFinished {
                table,
                counters,
                duration_ms,
            } => {
                let mark = if counters.general_failures == 0 {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!(
                    "  {} {} ({} failed, {}ms)",
                    mark,
                    table,
                    counters.general_failures,
                    duration_ms.unwrap_or(0)
                );
            }

            RunEvent::RecordStarted { .. } => {}

            RunEvent::RecordFinished {
                line_number,
                status,
                status_info,
                duration_ms,
            } => {
                let label = match status {
                    StatusCode::Ok | StatusCode::NoScriptFailure => status.as_str().green(),
                    StatusCode::BranchToBlockId => status.as_str().cyan(),
                    StatusCode::ScriptWarning => status.as_str().yellow(),
                    StatusCode::GeneralScriptFailure | StatusCode::NotExecuted => {
                        status.as_str().red()
                    }
                };
                if status.is_failure() && !status_info.is_empty() {
                    println!(
                        "    {:>4} {} {} ({}ms)",
                        line_number,
                        label,
                        status_info.dimmed(),
                        duration_ms
                    );
                } else {
                    println!("    {:>4} {} ({}ms)", line_number, label, duration_ms);
                }
            }

            RunEvent::Branch {
                from_line,
                block_id,
                to_line,
            } => match to_line {
                Some(to) => println!(
                    "    {} line {} → BlockID '{}' at line {}",
                    "↪".cyan(),
                    from_line,
                    block_id,
                    to
                ),
                None => println!(
                    "    {} line {} → BlockID '{}' not found",
                    "↪".red(),
                    from_line,
                    block_id
                ),
            },

            RunEvent::Message {
                message,
                severity,
                detail,
                ..
            } => {
                let text = match severity {
                    Severity::Failed => format!("{} {}", "❌".red(), message.red()),
                    Severity::Warning => format!("{} {}", "⚠".yellow(), message.yellow()),
                    Severity::Passed => format!("{} {}", "✅".green(), message),
                    Severity::Generic => format!("{} {}", "ℹ".blue(), message),
                };
                println!("      {}", text);
                if let Some(detail) = detail {
                    for line in detail.lines().filter(|l| !l.trim().is_empty()) {
                        println!("        {}", line.dimmed());
                    }
                }
            }
        }
    }
}
