use crate::driver::traits::{LogSink, ScriptHost, ScriptOutcome, Severity};
use crate::error::{escalate_shutdown, RecordError};
use crate::parser::types::{StatusCode, TestRecord};

use super::branch::issue_parameter_count_failure;

/// Runs external scripts for `CallScript` and `CallJUnit`
pub struct ScriptInvoker<'a> {
    host: &'a dyn ScriptHost,
    log: &'a dyn LogSink,
}

impl<'a> ScriptInvoker<'a> {
    pub fn new(host: &'a dyn ScriptHost, log: &'a dyn LogSink) -> Self {
        Self { host, log }
    }

    /// `C, CallScript, ScriptName[, Arg...]`
    ///
    /// Parameters after the script name are passed to the script in order.
    /// A script the host does not know leaves the record `NotExecuted` so a
    /// later engine can still pick it up.
    pub async fn call_script(&self, record: &mut TestRecord) -> Result<(), RecordError> {
        let Some(script_name) = record.params.first().cloned() else {
            issue_parameter_count_failure(self.log, record, "ScriptName");
            return Ok(());
        };
        let command = record.command.clone();
        let args = record.params[1..].to_vec();
        log::info!("{}: scriptName: {}, args: {:?}", command, script_name, args);

        match self.host.run_script(&script_name, &args).await {
            ScriptOutcome::NotFound => {
                record.set_status(StatusCode::NotExecuted);
                self.log.log_message(
                    &record.facility_id,
                    &format!("Script '{}' not found.", script_name),
                    Severity::Warning,
                    Some(&record.standard_warning_detail()),
                );
            }
            ScriptOutcome::Ran(report) => {
                let summary = report.summary();
                record.set_status(StatusCode::NoScriptFailure);
                record.set_status_info(summary.clone());
                self.log.log_message(
                    &record.facility_id,
                    &format!("{} {} successful.", command, script_name),
                    Severity::Generic,
                    Some(&summary),
                );
            }
            ScriptOutcome::NoResult => {
                let detail = format!(
                    "{} executed '{}', and returned a null Result!",
                    command, script_name
                );
                self.fail(record, &format!("Script '{}' error: {}", script_name, detail));
            }
            ScriptOutcome::Error(e) => {
                let e = escalate_shutdown(e)?;
                self.fail(record, &format!("Script '{}' error: {:#}", script_name, e));
            }
        }
        Ok(())
    }

    /// `C, CallJUnit, package.p1.Class;package.p2.Class`
    ///
    /// Every named class is run; any class that could not be run turns the
    /// whole command into a warning. The combined results go to the status info.
    pub async fn call_junit(&self, record: &mut TestRecord) -> Result<(), RecordError> {
        let class_names = record.params.first().cloned().unwrap_or_default();
        let classes = split_class_names(&class_names);
        if classes.is_empty() {
            issue_parameter_count_failure(
                self.log,
                record,
                "Invalid parameter value for ClassNames",
            );
            return Ok(());
        }

        let command = record.command.clone();
        record.set_status(StatusCode::NotExecuted);
        log::info!("handling {}: {}", command, class_names);

        let mut with_warning = false;
        let mut result = String::new();
        for class in classes {
            self.log.log_message(
                &record.facility_id,
                &format!("'{}' set to '{}'", command, class),
                Severity::Generic,
                None,
            );
            result.push_str(&format!(
                "\n---------------------------{} '{}' Begin Results -----------------------------------\n",
                command, class
            ));
            match self.host.run_script(class, &[]).await {
                ScriptOutcome::Ran(report) => result.push_str(&report.summary()),
                ScriptOutcome::NotFound => {
                    with_warning = true;
                    result.push_str(&format!("'{}' was not executed! Class not found.\n", class));
                }
                ScriptOutcome::NoResult => {
                    with_warning = true;
                    result.push_str(&format!(
                        "'{}' was not executed! {} returned a null Result.\n",
                        class, command
                    ));
                }
                ScriptOutcome::Error(e) => {
                    let e = escalate_shutdown(e)?;
                    with_warning = true;
                    result.push_str(&format!("'{}' was not executed! Due to {:#}\n", class, e));
                }
            }
            result.push_str(&format!(
                "---------------------------{} '{}' End Results -----------------------------------\n",
                command, class
            ));
        }

        record.set_status_info(result.clone());
        if with_warning {
            record.set_status(StatusCode::ScriptWarning);
            self.log.log_message(
                &record.facility_id,
                &record.standard_warning_detail(),
                Severity::Warning,
                Some(&result),
            );
        } else {
            record.set_status(StatusCode::NoScriptFailure);
            self.log.log_message(
                &record.facility_id,
                &format!("{} '{}' successful.", command, class_names),
                Severity::Generic,
                Some(&result),
            );
        }
        Ok(())
    }

    fn fail(&self, record: &mut TestRecord, message: &str) {
        record.set_status(StatusCode::GeneralScriptFailure);
        record.set_status_info(message.to_string());
        self.log.log_message(
            &record.facility_id,
            message,
            Severity::Failed,
            Some(&record.standard_failure_detail()),
        );
    }
}

/// Split a class-name list on the first separator present among `;`, `:`, `,`, else space
pub fn split_class_names(names: &str) -> Vec<&str> {
    let separator = [';', ':', ',']
        .into_iter()
        .find(|c| names.contains(*c))
        .unwrap_or(' ');
    names
        .split(separator)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}
