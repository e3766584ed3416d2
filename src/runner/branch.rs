use crate::driver::traits::{GuiProbe, LogSink, Severity};
use crate::error::{escalate_shutdown, RecordError};
use crate::parser::types::{StatusCode, TestRecord};

/// Timeout used when a branch command gives none (or an invalid one)
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How the timeout parameter was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutSource {
    Given,
    Missing,
    Invalid,
}

/// Resolve the optional timeout parameter.
///
/// Missing, empty or non-integer values fall back to `default`; negative values clamp to 0.
pub fn parse_timeout(raw: Option<&str>, default: u64) -> (u64, TimeoutSource) {
    match raw.map(str::trim) {
        None | Some("") => (default, TimeoutSource::Missing),
        Some(text) => match text.parse::<i64>() {
            Ok(secs) => (secs.max(0) as u64, TimeoutSource::Given),
            Err(_) => (default, TimeoutSource::Invalid),
        },
    }
}

/// Implements `OnGUIExistsGotoBlockID` and `OnGUINotExistGotoBlockID`.
///
/// Params: BlockID, Window, Component[, TimeoutSeconds]. "Not found" and
/// "still there" are ordinary outcomes reported through the record status.
pub struct GuiExistenceBranchEvaluator<'a> {
    probe: &'a dyn GuiProbe,
    log: &'a dyn LogSink,
    default_timeout_secs: u64,
}

impl<'a> GuiExistenceBranchEvaluator<'a> {
    pub fn new(probe: &'a dyn GuiProbe, log: &'a dyn LogSink) -> Self {
        Self {
            probe,
            log,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    pub async fn evaluate(
        &self,
        record: &mut TestRecord,
        expect_exist: bool,
    ) -> Result<(), RecordError> {
        if record.params.len() < 3 {
            issue_parameter_count_failure(self.log, record, "Insufficient Parameters.");
            return Ok(());
        }

        let command = record.command.clone();
        let block_name = record.params[0].clone();
        let window = record.params[1].clone();
        let component = record.params[2].clone();

        let (timeout, source) = parse_timeout(
            record.params.get(3).map(String::as_str),
            self.default_timeout_secs,
        );
        match source {
            TimeoutSource::Given => {}
            TimeoutSource::Missing => self.log.log_message(
                &record.facility_id,
                &format!(
                    "{} optional parameter 'TIMEOUT' set to '{}'.",
                    command, timeout
                ),
                Severity::Generic,
                None,
            ),
            TimeoutSource::Invalid => self.log.log_message(
                &record.facility_id,
                &format!(
                    "{} invalid optional parameter 'TIMEOUT' set to '{}'.",
                    command, timeout
                ),
                Severity::Warning,
                None,
            ),
        }

        log::info!(
            "{}: window:{}, component:{}, seconds:{}",
            command,
            window,
            component,
            timeout
        );

        let satisfied = match self
            .probe
            .check_existence(
                expect_exist,
                &record.app_map_name,
                &window,
                &component,
                timeout,
            )
            .await
        {
            Ok(satisfied) => satisfied,
            Err(e) => {
                let e = escalate_shutdown(e)?;
                record.set_status(StatusCode::GeneralScriptFailure);
                let detail = format!("{}: {:#}", record.standard_failure_detail(), e);
                record.set_status_info(detail.clone());
                self.log.log_message(
                    &record.facility_id,
                    &format!("Unable to perform {}", command),
                    Severity::Failed,
                    Some(&detail),
                );
                return Ok(());
            }
        };

        let found = match (expect_exist, satisfied) {
            (true, true) => format!("{} was found within timeout {}", component, timeout),
            (true, false) => format!("{} was not found within timeout {}", component, timeout),
            (false, true) => format!("{} does not exist within timeout {}", component, timeout),
            (false, false) => format!("{} exists after timeout {}", component, timeout),
        };

        let message = if satisfied {
            record.set_status(StatusCode::BranchToBlockId);
            record.set_status_info(block_name.clone());
            format!(
                "{}. {} attempting branch to {}.",
                found, command, block_name
            )
        } else {
            record.set_status(StatusCode::NoScriptFailure);
            format!("{}. {} did not branch to {}.", found, command, block_name)
        };

        self.log
            .log_message(&record.facility_id, &message, Severity::Generic, None);
        Ok(())
    }
}

/// Set a failure status for a record with too few parameters
pub(crate) fn issue_parameter_count_failure(log: &dyn LogSink, record: &mut TestRecord, detail: &str) {
    record.set_status(StatusCode::GeneralScriptFailure);
    let standard = record.standard_failure_detail();
    record.set_status_info(format!("{} {}", standard, detail));
    log.log_message(
        &record.facility_id,
        &standard,
        Severity::Failed,
        Some(detail),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(None, 15), (15, TimeoutSource::Missing));
        assert_eq!(parse_timeout(Some("2"), 15), (2, TimeoutSource::Given));
        assert_eq!(parse_timeout(Some(" 30 "), 15), (30, TimeoutSource::Given));
        assert_eq!(parse_timeout(Some("abc"), 15), (15, TimeoutSource::Invalid));
        assert_eq!(parse_timeout(Some(""), 15), (15, TimeoutSource::Missing));
        assert_eq!(parse_timeout(Some("  "), 15), (15, TimeoutSource::Missing));
        assert_eq!(parse_timeout(Some("2.5"), 15), (15, TimeoutSource::Invalid));
    }

    #[test]
    fn test_negative_timeout_clamps_to_zero() {
        assert_eq!(parse_timeout(Some("-5"), 15), (0, TimeoutSource::Given));
    }
}
