use std::time::Instant;

use crate::driver::traits::{LogSink, Severity};
use crate::error::{escalate_shutdown, RecordError};
use crate::parser::fields::trimmed_unquoted;
use crate::parser::table::{tokenize, TableLine};
use crate::parser::types::{RecordKind, StatusCode, TestRecord};
use crate::utils::config::Config;

use super::events::{EventEmitter, RunEvent};
use super::pipeline::{is_branch_command, CommandPipeline};
use super::state::{RecordState, TableState};

/// Settings the driver loop needs from the run configuration
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub separator: String,
    pub facility_id: String,
    pub app_map_name: String,
    pub continue_on_failure: bool,
    pub script_not_executed_block: Option<String>,
    pub max_branches: u32,
}

impl From<&Config> for TableOptions {
    fn from(config: &Config) -> Self {
        Self {
            separator: config.separator.clone(),
            facility_id: config.facility_id.clone(),
            app_map_name: config.app_map_name.clone(),
            continue_on_failure: config.continue_on_failure,
            script_not_executed_block: config.script_not_executed_block.clone(),
            max_branches: config.max_branches,
        }
    }
}

impl Default for TableOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Find the line index of the `B` record labelled `block_id` (case-insensitive)
pub fn locate_block(lines: &[TableLine], block_id: &str, separator: &str) -> Option<usize> {
    lines.iter().position(|line| {
        let tokens = tokenize(&line.text, separator);
        let is_block = tokens
            .first()
            .map(|t| RecordKind::from_record_type(&trimmed_unquoted(t)) == RecordKind::BlockId)
            .unwrap_or(false);
        is_block
            && tokens
                .get(1)
                .map(|t| trimmed_unquoted(t).eq_ignore_ascii_case(block_id))
                .unwrap_or(false)
    })
}

/// Problem found while checking a table without running it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIssue {
    pub line_number: usize,
    pub message: String,
}

/// Tokenize every line and report records the driver loop would reject
pub fn check_lines(lines: &[TableLine], separator: &str) -> Vec<TableIssue> {
    let mut issues = Vec::new();
    for line in lines {
        let record = TestRecord::from_line(&line.text, separator);
        let mut issue = |message: String| {
            issues.push(TableIssue {
                line_number: line.line_number,
                message,
            })
        };
        let command = record.token(1).map(trimmed_unquoted).unwrap_or_default();
        match record.kind() {
            RecordKind::Unknown => {
                issue(format!("Unknown RECORD TYPE '{}'", record.record_type()))
            }
            RecordKind::BlockId if command.is_empty() => {
                issue("Block record without a BlockID".to_string())
            }
            RecordKind::DriverCommand | RecordKind::TestStep if command.is_empty() => {
                issue("Record has no command".to_string())
            }
            RecordKind::DriverCommand if is_branch_command(&command) => {
                let params = record.raw_tokens.len().saturating_sub(2);
                if params < 3 {
                    issue(format!("{} needs BlockID, window and component", command));
                } else if let Some(block) = record.token(2).map(trimmed_unquoted) {
                    if locate_block(lines, &block, separator).is_none() {
                        issue(format!("{} targets missing BlockID '{}'", command, block));
                    }
                }
            }
            _ => {}
        }
    }
    issues
}

/// Drives the records of one table through the command pipeline,
/// following BlockID branches.
pub struct TableRunner {
    pipeline: CommandPipeline,
    emitter: EventEmitter,
    options: TableOptions,
}

impl TableRunner {
    pub fn new(pipeline: CommandPipeline, emitter: EventEmitter, options: TableOptions) -> Self {
        Self {
            pipeline,
            emitter,
            options,
        }
    }

    pub fn pipeline(&self) -> &CommandPipeline {
        &self.pipeline
    }

    /// Run every line of a table, recording results into `table`.
    ///
    /// Only the shutdown signal is returned as an error; the records
    /// processed so far stay in `table`.
    pub async fn run_table(
        &self,
        table: &mut TableState,
        lines: &[TableLine],
    ) -> Result<(), RecordError> {
        let log = self.pipeline.log();
        let facility = self.options.facility_id.as_str();
        let mut jumps: u32 = 0;
        let mut index = 0;

        table.start();
        self.emitter.emit(RunEvent::TableStarted {
            table: table.table_name.clone(),
            record_count: lines.len(),
        });

        while index < lines.len() {
            let line = &lines[index];
            let started = Instant::now();
            let mut record = TestRecord::from_line(&line.text, &self.options.separator)
                .with_location(&table.table_path, line.line_number)
                .with_facility(facility)
                .with_app_map(&self.options.app_map_name);
            let kind = record.kind();

            self.emitter.emit(RunEvent::RecordStarted {
                line_number: line.line_number,
                record: line.text.clone(),
            });

            let mut jump: Option<String> = None;
            let mut shutdown: Option<RecordError> = None;

            match kind {
                RecordKind::BlockId => {
                    let block = record.token(1).map(trimmed_unquoted).unwrap_or_default();
                    log.log_message(
                        facility,
                        &format!("Begin Block '{}'", block),
                        Severity::Generic,
                        None,
                    );
                    record.set_status(StatusCode::NoScriptFailure);
                }
                RecordKind::Skipped => {}
                RecordKind::Breakpoint => {
                    log.log_message(
                        facility,
                        &format!(
                            "Breakpoint at line {} in {}",
                            line.line_number, table.table_path
                        ),
                        Severity::Generic,
                        None,
                    );
                    record.set_status(StatusCode::Ok);
                }
                RecordKind::DriverCommand => match self.pipeline.process(&mut record).await {
                    Ok(outcome) => match outcome.status {
                        StatusCode::BranchToBlockId => match outcome.branch_target() {
                            Some(target) => jump = Some(target.to_string()),
                            None => {
                                log::error!("Error retrieving blockid from statusInfo field.");
                                record.set_status(StatusCode::GeneralScriptFailure);
                                record.set_status_info("missing BlockID for branch");
                            }
                        },
                        StatusCode::NotExecuted => {
                            jump = self.options.script_not_executed_block.clone();
                        }
                        _ => {}
                    },
                    Err(e) if e.is_shutdown() => shutdown = Some(e),
                    Err(e) => log::debug!("record at line {} rejected: {}", line.line_number, e),
                },
                RecordKind::TestStep | RecordKind::Unknown => {
                    if let Err(e) = self.dispatch_fallback(&mut record, log.as_ref()).await {
                        shutdown = Some(e);
                    }
                }
            }

            if let Some(target) = jump.clone() {
                // Branches and not-executed jumps share the same limit
                jumps += 1;
                if jumps > self.options.max_branches {
                    let message = format!(
                        "Exceeded {} BlockID branches in table {}",
                        self.options.max_branches, table.table_path
                    );
                    log.log_message(facility, &message, Severity::Failed, None);
                    record.set_status(StatusCode::GeneralScriptFailure);
                    record.set_status_info(message);
                    jump = None;
                }
                if jump.is_some() && locate_block(lines, &target, &self.options.separator).is_none() {
                    log.log_message(
                        facility,
                        &format!(
                            "UNABLE TO TRANSFER EXECUTION TO BLOCKID '{}' in table {} at line {}.",
                            target, table.table_path, line.line_number
                        ),
                        Severity::Failed,
                        Some(&format!("BlockId '{}' not found.", target)),
                    );
                    self.emitter.emit(RunEvent::Branch {
                        from_line: line.line_number,
                        block_id: target,
                        to_line: None,
                    });
                    record.set_status(StatusCode::GeneralScriptFailure);
                    jump = None;
                }
            }

            let status = record.status;
            let duration_ms = started.elapsed().as_millis() as u64;
            let command = if record.command.is_empty() {
                record.token(1).map(trimmed_unquoted).unwrap_or_default()
            } else {
                record.command.clone()
            };
            self.emitter.emit(RunEvent::RecordFinished {
                line_number: line.line_number,
                status,
                status_info: record.status_info.clone(),
                duration_ms,
            });
            table.push(RecordState {
                line_number: line.line_number,
                input_record: line.text.clone(),
                kind,
                command,
                status,
                status_info: record.status_info,
                duration_ms,
            });

            if let Some(e) = shutdown {
                table.abort(&e.to_string());
                return Err(e);
            }

            if let Some(target) = jump {
                if let Some(position) = locate_block(lines, &target, &self.options.separator) {
                    log.log_message(
                        facility,
                        &format!(
                            "TRANSFERRING EXECUTION TO BLOCKID '{}' in table {} at line {}.",
                            target, table.table_path, lines[position].line_number
                        ),
                        Severity::Generic,
                        None,
                    );
                    self.emitter.emit(RunEvent::Branch {
                        from_line: line.line_number,
                        block_id: target,
                        to_line: Some(lines[position].line_number),
                    });
                    index = position;
                    continue;
                }
            }

            let failed = matches!(
                status,
                StatusCode::GeneralScriptFailure | StatusCode::NotExecuted
            ) && kind != RecordKind::Skipped;
            if failed && !self.options.continue_on_failure {
                log.log_message(
                    facility,
                    &format!(
                        "Table {} stopped after failure at line {}",
                        table.table_path, line.line_number
                    ),
                    Severity::Warning,
                    None,
                );
                break;
            }

            index += 1;
        }

        table.finish();
        self.emitter.emit(RunEvent::TableFinished {
            table: table.table_name.clone(),
            counters: table.counters.clone(),
            duration_ms: table.total_duration_ms,
        });
        Ok(())
    }

    /// Hand a non driver-command record to the fallback dispatcher
    async fn dispatch_fallback(
        &self,
        record: &mut TestRecord,
        log: &dyn LogSink,
    ) -> Result<(), RecordError> {
        if let Err(e) = self.pipeline.fallback().dispatch(record).await {
            let e = escalate_shutdown(e)?;
            record.set_status(StatusCode::GeneralScriptFailure);
            record.set_status_info(format!("{:#}", e));
            log.log_message(
                &record.facility_id,
                &format!("*** Error *** {:#}", e),
                Severity::Failed,
                Some(&record.input_record),
            );
        }
        if !record.is_executed() {
            log.log_message(
                &record.facility_id,
                &format!(
                    "Unknown RECORD TYPE, SCRIPT NAME, or COMMAND in table {} at line {}",
                    record.filename, record.line_number
                ),
                Severity::Warning,
                Some(&record.input_record),
            );
            record.set_status(StatusCode::ScriptWarning);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::table::parse_table_content;

    #[test]
    fn test_locate_block_ignores_case_and_quotes() {
        let lines = parse_table_content(
            "C, CallScript, A\nB, \"Block1\"\nC, CallScript, B\nb, second\n",
        );
        assert_eq!(locate_block(&lines, "block1", ","), Some(1));
        assert_eq!(locate_block(&lines, "Second", ","), Some(3));
        assert_eq!(locate_block(&lines, "Missing", ","), None);
    }

    #[test]
    fn test_check_lines_reports_bad_records() {
        let lines = parse_table_content(
            "C, OnGUIExistsGotoBlockID, Done, LoginWnd, OK\n\
             C, OnGUINotExistGotoBlockID, Nowhere, LoginWnd, OK\n\
             C, OnGUIExistsGotoBlockID, Done\n\
             X, CallScript, A\n\
             C\n\
             B, Done\n",
        );
        let issues = check_lines(&lines, ",");
        let flagged: Vec<usize> = issues.iter().map(|i| i.line_number).collect();
        assert_eq!(flagged, vec![2, 3, 4, 5]);
        assert!(issues[0].message.contains("missing BlockID 'Nowhere'"));
    }

    #[test]
    fn test_locate_block_only_matches_block_records() {
        let lines = parse_table_content("C, Block1\nS, Block1\n");
        assert_eq!(locate_block(&lines, "Block1", ","), None);
    }
}
