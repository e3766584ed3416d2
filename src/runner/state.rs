use crate::parser::types::{RecordKind, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Result of one processed table line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordState {
    pub line_number: usize,
    pub input_record: String,
    pub kind: RecordKind,
    pub command: String,
    pub status: StatusCode,
    pub status_info: String,
    pub duration_ms: u64,
}

/// Counters kept by the driver loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounters {
    pub total_records: u32,
    pub general_passes: u32,
    pub general_warnings: u32,
    pub general_failures: u32,
    pub skipped: u32,
    pub branches: u32,
}

impl TableCounters {
    /// Count a final status
    pub fn record(&mut self, status: StatusCode) {
        match status {
            StatusCode::Ok | StatusCode::NoScriptFailure => self.general_passes += 1,
            StatusCode::ScriptWarning => self.general_warnings += 1,
            StatusCode::GeneralScriptFailure | StatusCode::NotExecuted => {
                self.general_failures += 1
            }
            StatusCode::BranchToBlockId => {
                self.general_passes += 1;
                self.branches += 1;
            }
        }
    }

    pub fn merge(&mut self, other: &TableCounters) {
        self.total_records += other.total_records;
        self.general_passes += other.general_passes;
        self.general_warnings += other.general_warnings;
        self.general_failures += other.general_failures;
        self.skipped += other.skipped;
        self.branches += other.branches;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TableStatus {
    Pending,
    Running,
    Passed,
    Warning,
    Failed,
    Aborted { reason: String },
}

/// State for one table run
#[derive(Debug, Clone)]
pub struct TableState {
    pub table_name: String,
    pub table_path: String,
    pub status: TableStatus,
    pub records: Vec<RecordState>,
    pub counters: TableCounters,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration_ms: Option<u64>,
}

impl TableState {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            table_name: name.to_string(),
            table_path: path.to_string(),
            status: TableStatus::Pending,
            records: Vec::new(),
            counters: TableCounters::default(),
            started_at: None,
            finished_at: None,
            total_duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = TableStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn push(&mut self, record: RecordState) {
        self.counters.total_records += 1;
        match record.kind {
            RecordKind::Skipped => self.counters.skipped += 1,
            RecordKind::Breakpoint => {}
            _ => self.counters.record(record.status),
        }
        self.records.push(record);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.total_duration_ms = Some(start.elapsed().as_millis() as u64);
        }
        if matches!(self.status, TableStatus::Aborted { .. }) {
            return;
        }
        self.status = if self.counters.general_failures > 0 {
            TableStatus::Failed
        } else if self.counters.general_warnings > 0 {
            TableStatus::Warning
        } else {
            TableStatus::Passed
        };
    }

    pub fn abort(&mut self, reason: &str) {
        self.status = TableStatus::Aborted {
            reason: reason.to_string(),
        };
        self.finish();
    }

    /// Serialize state for reporting
    pub fn to_report(&self) -> TableStateReport {
        TableStateReport {
            table_name: self.table_name.clone(),
            table_path: self.table_path.clone(),
            status: self.status.clone(),
            records: self.records.clone(),
            counters: self.counters.clone(),
            total_duration_ms: self.total_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStateReport {
    pub table_name: String,
    pub table_path: String,
    pub status: TableStatus,
    pub records: Vec<RecordState>,
    pub counters: TableCounters,
    pub total_duration_ms: Option<u64>,
}

/// Global run session state
#[derive(Debug, Clone)]
pub struct RunSessionState {
    pub session_id: String,
    pub tables: Vec<TableState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl RunSessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            tables: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_table(&mut self, table: TableState) {
        self.tables.push(table);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> RunSummary {
        let mut counters = TableCounters::default();
        for table in &self.tables {
            counters.merge(&table.counters);
        }

        let total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });

        RunSummary {
            session_id: self.session_id.clone(),
            total_tables: self.tables.len() as u32,
            counters,
            total_duration_ms,
        }
    }

    /// Serialize state for reporting
    pub fn to_report(&self) -> RunSessionReport {
        RunSessionReport {
            session_id: self.session_id.clone(),
            tables: self.tables.iter().map(|t| t.to_report()).collect(),
            summary: self.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub session_id: String,
    pub total_tables: u32,
    pub counters: TableCounters,
    pub total_duration_ms: Option<u64>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.counters.general_failures > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSessionReport {
    pub session_id: String,
    pub tables: Vec<TableStateReport>,
    pub summary: RunSummary,
}
