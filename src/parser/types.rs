use serde::{Deserialize, Serialize};
use std::fmt;

use super::fields::trimmed_unquoted;
use super::table::tokenize;

/// Outcome of processing a single test record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// No stage has accepted responsibility for the record yet
    #[default]
    NotExecuted,
    Ok,
    NoScriptFailure,
    GeneralScriptFailure,
    ScriptWarning,
    /// The driver loop should jump to the block named in the status info
    BranchToBlockId,
}

impl StatusCode {
    pub fn is_executed(&self) -> bool {
        !matches!(self, StatusCode::NotExecuted)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StatusCode::GeneralScriptFailure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::NotExecuted => "SCRIPT_NOT_EXECUTED",
            StatusCode::Ok => "OK",
            StatusCode::NoScriptFailure => "NO_SCRIPT_FAILURE",
            StatusCode::GeneralScriptFailure => "GENERAL_SCRIPT_FAILURE",
            StatusCode::ScriptWarning => "SCRIPT_WARNING",
            StatusCode::BranchToBlockId => "BRANCH_TO_BLOCKID",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of test-table line, derived from the record type token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    /// C, CW, CF
    DriverCommand,
    /// T, TW, TF
    TestStep,
    /// S
    Skipped,
    /// B
    BlockId,
    /// BP
    Breakpoint,
    Unknown,
}

impl RecordKind {
    pub fn from_record_type(record_type: &str) -> Self {
        match record_type.trim().to_uppercase().as_str() {
            "C" | "CW" | "CF" => RecordKind::DriverCommand,
            "T" | "TW" | "TF" => RecordKind::TestStep,
            "S" => RecordKind::Skipped,
            "B" => RecordKind::BlockId,
            "BP" => RecordKind::Breakpoint,
            _ => RecordKind::Unknown,
        }
    }
}

/// Final status handed back to the driver loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub status: StatusCode,
    pub status_info: String,
}

impl RecordOutcome {
    /// Block to jump to, if this outcome requests a branch
    pub fn branch_target(&self) -> Option<&str> {
        let target = self.status_info.trim();
        if self.status == StatusCode::BranchToBlockId && !target.is_empty() {
            Some(target)
        } else {
            None
        }
    }
}

/// One line of a test table and everything the interpreter learns about it
#[derive(Debug, Clone, Default)]
pub struct TestRecord {
    /// Unprocessed fields; token 0 is the record type
    pub raw_tokens: Vec<String>,
    /// Original line text, used for diagnostics
    pub input_record: String,
    pub command: String,
    pub params: Vec<String>,
    pub status: StatusCode,
    pub status_info: String,
    pub window_name: Option<String>,
    pub component_name: Option<String>,
    pub filename: String,
    pub line_number: usize,
    pub facility_id: String,
    pub app_map_name: String,
}

impl TestRecord {
    pub fn new(raw_tokens: Vec<String>, separator: &str) -> Self {
        let input_record = raw_tokens.join(separator);
        Self {
            raw_tokens,
            input_record,
            ..Default::default()
        }
    }

    /// Build a record from a raw table line
    pub fn from_line(line: &str, separator: &str) -> Self {
        Self {
            raw_tokens: tokenize(line, separator),
            input_record: line.to_string(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, filename: &str, line_number: usize) -> Self {
        self.filename = filename.to_string();
        self.line_number = line_number;
        self
    }

    pub fn with_facility(mut self, facility_id: &str) -> Self {
        self.facility_id = facility_id.to_string();
        self
    }

    pub fn with_app_map(mut self, app_map_name: &str) -> Self {
        self.app_map_name = app_map_name.to_string();
        self
    }

    /// Record type (token 0), trimmed and unquoted
    pub fn record_type(&self) -> String {
        self.raw_tokens
            .first()
            .map(|t| trimmed_unquoted(t))
            .unwrap_or_default()
    }

    pub fn kind(&self) -> RecordKind {
        RecordKind::from_record_type(&self.record_type())
    }

    /// Raw token at `index`, if present
    pub fn token(&self, index: usize) -> Option<&str> {
        self.raw_tokens.get(index).map(String::as_str)
    }

    pub fn is_executed(&self) -> bool {
        self.status.is_executed()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn set_status_info(&mut self, info: impl Into<String>) {
        self.status_info = info.into();
    }

    pub fn outcome(&self) -> RecordOutcome {
        RecordOutcome {
            status: self.status,
            status_info: self.status_info.clone(),
        }
    }

    /// "[command] failure in table [filename] at line [n]."
    pub fn standard_failure_detail(&self) -> String {
        format!(
            "{} failure in table {} at line {}.",
            self.command, self.filename, self.line_number
        )
    }

    /// "[command] warning in table [filename] at line [n]."
    pub fn standard_warning_detail(&self) -> String {
        format!(
            "{} warning in table {} at line {}.",
            self.command, self.filename, self.line_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_ignores_case() {
        assert_eq!(RecordKind::from_record_type("c"), RecordKind::DriverCommand);
        assert_eq!(RecordKind::from_record_type("CF"), RecordKind::DriverCommand);
        assert_eq!(RecordKind::from_record_type("tw"), RecordKind::TestStep);
        assert_eq!(RecordKind::from_record_type("B"), RecordKind::BlockId);
        assert_eq!(RecordKind::from_record_type("BP"), RecordKind::Breakpoint);
        assert_eq!(RecordKind::from_record_type("MyScript"), RecordKind::Unknown);
    }

    #[test]
    fn test_branch_target_requires_status_and_info() {
        let outcome = RecordOutcome {
            status: StatusCode::BranchToBlockId,
            status_info: " Block1 ".to_string(),
        };
        assert_eq!(outcome.branch_target(), Some("Block1"));

        let empty = RecordOutcome {
            status: StatusCode::BranchToBlockId,
            status_info: String::new(),
        };
        assert_eq!(empty.branch_target(), None);

        let passed = RecordOutcome {
            status: StatusCode::NoScriptFailure,
            status_info: "Block1".to_string(),
        };
        assert_eq!(passed.branch_target(), None);
    }

    #[test]
    fn test_standard_details() {
        let record = TestRecord::from_line("C, WaitForGUI, Win, Comp", ",")
            .with_location("Login.cdd", 12);
        let mut record = record;
        record.command = "WaitForGUI".to_string();
        assert_eq!(
            record.standard_failure_detail(),
            "WaitForGUI failure in table Login.cdd at line 12."
        );
        assert_eq!(
            record.standard_warning_detail(),
            "WaitForGUI warning in table Login.cdd at line 12."
        );
    }
}
