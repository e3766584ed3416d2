use super::traits::{GuiProbe, ScriptHost, ScriptOutcome, ScriptRunReport};
use crate::error::SHUTDOWN_MARKER;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs executables from a scripts directory for CallScript/CallJUnit
pub struct ProcessScriptHost {
    scripts_dir: PathBuf,
}

impl ProcessScriptHost {
    pub fn new(scripts_dir: &Path) -> Self {
        Self {
            scripts_dir: scripts_dir.to_path_buf(),
        }
    }

    /// Find an executable named `name` in the scripts directory
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        which::which_in(name, Some(&self.scripts_dir), cwd).ok()
    }
}

/// Read `N tests run.` style counters out of script output
///
/// Without counters a clean exit counts as one passing test and a
/// non-zero exit as one failing test.
pub fn parse_run_report(stdout: &str, stderr: &str, success: bool, elapsed_ms: u64) -> ScriptRunReport {
    let mut report = ScriptRunReport {
        ran_count: 1,
        ignored_count: 0,
        failed_count: if success { 0 } else { 1 },
        elapsed_ms,
        failure_details: Vec::new(),
    };

    if let Ok(counter) = Regex::new(r"(?m)^\s*(\d+)\s+tests?\s+(run|ignored|failed)\.") {
        for caps in counter.captures_iter(stdout) {
            let value: u32 = caps[1].parse().unwrap_or(0);
            match &caps[2] {
                "run" => report.ran_count = value,
                "ignored" => report.ignored_count = value,
                _ => report.failed_count = value,
            }
        }
    }

    if !success || report.failed_count > 0 {
        report.failure_details.extend(
            stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        );
    }
    report
}

#[async_trait]
impl ScriptHost for ProcessScriptHost {
    async fn run_script(&self, name: &str, args: &[String]) -> ScriptOutcome {
        let Some(path) = self.resolve(name) else {
            log::debug!("script '{}' not found in {}", name, self.scripts_dir.display());
            return ScriptOutcome::NotFound;
        };

        let start = Instant::now();
        let output = match tokio::process::Command::new(&path)
            .args(args)
            .current_dir(&self.scripts_dir)
            .output()
            .await
            .with_context(|| format!("Failed to start {}", path.display()))
        {
            Ok(output) => output,
            Err(e) => return ScriptOutcome::Error(e),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        // Killed by a signal: the script never reported anything
        if output.status.code().is_none() {
            return ScriptOutcome::NoResult;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        ScriptOutcome::Ran(parse_run_report(
            &stdout,
            &stderr,
            output.status.success(),
            elapsed_ms,
        ))
    }
}

/// Existence probe backed by an external program
///
/// The program is invoked as `<program> exists|gone <window> <component> [app_map]`
/// and exits 0 when the condition currently holds. It is polled until the
/// condition holds or the timeout elapses.
pub struct ProcessProbe {
    program: PathBuf,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl ProcessProbe {
    pub fn new(program: &Path, interval_ms: u64, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            program: program.to_path_buf(),
            interval: Duration::from_millis(interval_ms.max(1)),
            shutdown,
        }
    }

    async fn probe_once(
        &self,
        expect_exist: bool,
        app_map: &str,
        window: &str,
        component: &str,
    ) -> Result<bool> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .arg(if expect_exist { "exists" } else { "gone" })
            .arg(window)
            .arg(component);
        if !app_map.is_empty() {
            command.arg(app_map);
        }
        let status = command
            .status()
            .await
            .with_context(|| format!("Failed to run probe {}", self.program.display()))?;
        Ok(status.success())
    }
}

#[async_trait]
impl GuiProbe for ProcessProbe {
    async fn check_existence(
        &self,
        expect_exist: bool,
        app_map: &str,
        window: &str,
        component: &str,
        timeout_secs: u64,
    ) -> Result<bool> {
        // A timeout past the clock's range never expires
        let deadline = Instant::now().checked_add(Duration::from_secs(timeout_secs));
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                anyhow::bail!("{}: run interrupted", SHUTDOWN_MARKER);
            }
            if self.probe_once(expect_exist, app_map, window, component).await? {
                return Ok(true);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(false);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Probe used when no probe program is configured
pub struct UnavailableProbe;

#[async_trait]
impl GuiProbe for UnavailableProbe {
    async fn check_existence(
        &self,
        _expect_exist: bool,
        _app_map: &str,
        window: &str,
        component: &str,
        _timeout_secs: u64,
    ) -> Result<bool> {
        anyhow::bail!(
            "No probe command configured to check {}:{}",
            window,
            component
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_shutdown_signal;
    use crate::runner::branch::parse_timeout;

    #[test]
    fn test_parse_run_report_reads_counters() {
        let stdout = "starting\n4 tests run.\n1 tests ignored.\n2 tests failed.\n";
        let report = parse_run_report(stdout, "boom\n\nbang", true, 42);
        assert_eq!(report.ran_count, 4);
        assert_eq!(report.ignored_count, 1);
        assert_eq!(report.failed_count, 2);
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failure_details, vec!["boom", "bang"]);
    }

    #[test]
    fn test_parse_run_report_uses_exit_status() {
        let ok = parse_run_report("hello", "", true, 1);
        assert_eq!((ok.ran_count, ok.failed_count), (1, 0));
        assert!(ok.failure_details.is_empty());

        let failed = parse_run_report("", "bad input", false, 1);
        assert_eq!((failed.ran_count, failed.failed_count), (1, 1));
        assert_eq!(failed.failure_details, vec!["bad input"]);
    }

    #[test]
    fn test_missing_script_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let host = ProcessScriptHost::new(dir.path());
        assert!(host.resolve("does-not-exist").is_none());
    }

    #[tokio::test]
    async fn test_missing_script_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let host = ProcessScriptHost::new(dir.path());
        assert!(matches!(
            host.run_script("does-not-exist", &[]).await,
            ScriptOutcome::NotFound
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_receives_arguments() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("count-args");
        std::fs::write(&script, "#!/bin/sh\necho \"$# tests run.\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let host = ProcessScriptHost::new(dir.path());
        let args = vec!["alice".to_string(), "42".to_string()];
        match host.run_script("count-args", &args).await {
            ScriptOutcome::Ran(report) => assert_eq!(report.ran_count, 2),
            _ => panic!("script did not run"),
        }
    }

    #[tokio::test]
    async fn test_probe_reports_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(true));
        let probe = ProcessProbe::new(Path::new("probe"), 10, shutdown);
        let err = probe
            .check_existence(true, "", "LoginWnd", "OK", 1)
            .await
            .unwrap_err();
        assert!(is_shutdown_signal(&err));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let probe = ProcessProbe::new(
            Path::new("/bin/true"),
            10,
            Arc::new(AtomicBool::new(false)),
        );
        let (timeout, _) = parse_timeout(Some("9223372036854775807"), 15);
        let found = probe
            .check_existence(true, "", "Win1", "Comp1", timeout)
            .await
            .unwrap();
        assert!(found);
    }

    #[tokio::test]
    async fn test_unavailable_probe_errors() {
        let err = UnavailableProbe
            .check_existence(true, "", "LoginWnd", "OK", 1)
            .await
            .unwrap_err();
        assert!(!is_shutdown_signal(&err));
    }
}
