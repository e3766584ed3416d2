use crate::parser::types::TestRecord;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Severity attached to a test-log message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Generic,
    Warning,
    Failed,
    Passed,
}

/// Destination for test-log messages
pub trait LogSink: Send + Sync {
    /// Log a message on the given facility
    ///
    /// # Arguments
    /// * `facility` - Logging channel identifier, passed through opaquely
    /// * `message` - Primary message text
    /// * `severity` - How the message should be counted and rendered
    /// * `detail` - Optional second line with extra context
    fn log_message(&self, facility: &str, message: &str, severity: Severity, detail: Option<&str>);
}

/// Window/component existence check
///
/// Concrete automation engines implement this by polling for presence or
/// absence of the target until the timeout elapses.
#[async_trait]
pub trait GuiProbe: Send + Sync {
    /// Wait for a window/component to exist (or to be gone)
    ///
    /// # Arguments
    /// * `expect_exist` - true to wait for presence, false to wait for absence
    /// * `app_map` - App map used to resolve the names
    /// * `window` - Window name
    /// * `component` - Component name
    /// * `timeout_secs` - Upper bound on how long to wait
    ///
    /// # Returns
    /// True if the expectation was met within the timeout
    async fn check_existence(
        &self,
        expect_exist: bool,
        app_map: &str,
        window: &str,
        component: &str,
        timeout_secs: u64,
    ) -> Result<bool>;
}

/// Summary of one executed script or test class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRunReport {
    pub ran_count: u32,
    pub ignored_count: u32,
    pub failed_count: u32,
    pub elapsed_ms: u64,
    pub failure_details: Vec<String>,
}

impl ScriptRunReport {
    pub fn passed_count(&self) -> u32 {
        self.ran_count
            .saturating_sub(self.ignored_count)
            .saturating_sub(self.failed_count)
    }

    /// Human readable run summary
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} tests run.\n{} tests ignored.\n{} tests failed.\nRuntime: {} milliseconds.\n",
            self.ran_count, self.ignored_count, self.failed_count, self.elapsed_ms
        );
        for failure in &self.failure_details {
            text.push_str(&format!("\n   {}\n", failure));
        }
        text
    }
}

/// Result of asking a script host to run a script by name
#[derive(Debug)]
pub enum ScriptOutcome {
    /// The host does not know the script; another engine may
    NotFound,
    /// The script ran to completion
    Ran(ScriptRunReport),
    /// The script was found and started but produced no result at all
    NoResult,
    /// Running the script failed
    Error(anyhow::Error),
}

/// Loads and runs external scripts or test classes by name
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Run `name`, passing `args` through in order
    async fn run_script(&self, name: &str, args: &[String]) -> ScriptOutcome;
}

/// Engine-specific stages of the command pipeline
///
/// Both hooks default to no-ops. A hook that handles a record sets its
/// status away from `NotExecuted`; returning an error marks the record as
/// failed unless the error is the shutdown signal.
#[async_trait]
pub trait CommandEngine: Send + Sync {
    /// Get the engine name (e.g., "selenium", "process")
    fn engine_name(&self) -> &str;

    /// Runs on every record after initialisation
    async fn local_process(&self, _record: &mut TestRecord) -> Result<()> {
        Ok(())
    }

    /// Handle the keywords specific to this engine
    async fn command_process(&self, _record: &mut TestRecord) -> Result<()> {
        Ok(())
    }
}

/// Generic record-type dispatcher used when no pipeline stage handled a record
#[async_trait]
pub trait RecordDispatcher: Send + Sync {
    async fn dispatch(&self, record: &mut TestRecord) -> Result<()>;
}

/// Engine with no keywords of its own
pub struct BaseEngine;

#[async_trait]
impl CommandEngine for BaseEngine {
    fn engine_name(&self) -> &str {
        "base"
    }
}

/// Dispatcher that leaves every record untouched
pub struct NoFallback;

#[async_trait]
impl RecordDispatcher for NoFallback {
    async fn dispatch(&self, _record: &mut TestRecord) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_report_summary() {
        let report = ScriptRunReport {
            ran_count: 5,
            ignored_count: 1,
            failed_count: 1,
            elapsed_ms: 42,
            failure_details: vec!["testLogin(LoginTest): expected true".to_string()],
        };
        assert_eq!(report.passed_count(), 3);
        let summary = report.summary();
        assert!(summary.starts_with("5 tests run.\n1 tests ignored.\n1 tests failed."));
        assert!(summary.contains("Runtime: 42 milliseconds."));
        assert!(summary.contains("   testLogin(LoginTest): expected true"));
    }

    #[test]
    fn test_passed_count_saturates() {
        let report = ScriptRunReport {
            ran_count: 1,
            ignored_count: 2,
            failed_count: 3,
            ..Default::default()
        };
        assert_eq!(report.passed_count(), 0);
    }
}
