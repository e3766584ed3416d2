use std::sync::Arc;

use crate::driver::traits::{
    BaseEngine, CommandEngine, GuiProbe, LogSink, NoFallback, RecordDispatcher, ScriptHost,
    Severity,
};
use crate::error::{escalate_shutdown, RecordError};
use crate::parser::fields::interpret_fields;
use crate::parser::types::{RecordKind, RecordOutcome, StatusCode, TestRecord};

use super::branch::{GuiExistenceBranchEvaluator, DEFAULT_TIMEOUT_SECS};
use super::script::ScriptInvoker;

pub const ON_GUI_EXISTS_GOTO_BLOCK_ID: &str = "OnGUIExistsGotoBlockID";
pub const ON_GUI_NOT_EXIST_GOTO_BLOCK_ID: &str = "OnGUINotExistGotoBlockID";
pub const CALL_SCRIPT: &str = "CallScript";
pub const CALL_JUNIT: &str = "CallJUnit";

/// Whether `command` is one of the two GUI branch keywords
pub fn is_branch_command(command: &str) -> bool {
    command.eq_ignore_ascii_case(ON_GUI_EXISTS_GOTO_BLOCK_ID)
        || command.eq_ignore_ascii_case(ON_GUI_NOT_EXIST_GOTO_BLOCK_ID)
}

/// Interprets driver-command records.
///
/// Stages run in a fixed order: init, local process, general commands,
/// engine commands, fallback. Once a stage moves the status away from
/// `NotExecuted` no later stage runs (the local hook always runs).
pub struct CommandPipeline {
    engine: Arc<dyn CommandEngine>,
    probe: Arc<dyn GuiProbe>,
    scripts: Arc<dyn ScriptHost>,
    fallback: Arc<dyn RecordDispatcher>,
    log: Arc<dyn LogSink>,
    default_timeout_secs: u64,
}

impl CommandPipeline {
    pub fn new(
        probe: Arc<dyn GuiProbe>,
        scripts: Arc<dyn ScriptHost>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            engine: Arc::new(BaseEngine),
            probe,
            scripts,
            fallback: Arc::new(NoFallback),
            log,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn CommandEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn RecordDispatcher>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.engine_name()
    }

    /// Dispatcher used for records no stage handled
    pub fn fallback(&self) -> Arc<dyn RecordDispatcher> {
        self.fallback.clone()
    }

    pub fn log(&self) -> Arc<dyn LogSink> {
        self.log.clone()
    }

    /// Supports standard driver-command record types (C, CW, CF)
    pub fn is_supported_record_type(record_type: &str) -> bool {
        RecordKind::from_record_type(record_type) == RecordKind::DriverCommand
    }

    /// Process one record and return its final status
    pub async fn process(&self, record: &mut TestRecord) -> Result<RecordOutcome, RecordError> {
        if let Err(e) = self.init(record) {
            if !e.is_shutdown() {
                let message = format!(
                    "{} unable to process record: {}",
                    self.engine.engine_name(),
                    e
                );
                record.set_status(StatusCode::GeneralScriptFailure);
                record.set_status_info(message.clone());
                self.log.log_message(
                    &record.facility_id,
                    &message,
                    Severity::Failed,
                    Some(&record.input_record),
                );
            }
            return Err(e);
        }

        let local = self.engine.local_process(record).await;
        self.absorb(record, local, "localProcess")?;

        if !record.is_executed() {
            self.general_command_process(record).await?;
        }

        if !record.is_executed() {
            log::debug!(
                "{}.commandProcess processing: '{}' with parameters: {:?}",
                self.engine.engine_name(),
                record.command,
                record.params
            );
            let result = self.engine.command_process(record).await;
            self.absorb(record, result, "commandProcess")?;
        }

        if !record.is_executed() {
            let result = self.fallback.dispatch(record).await;
            self.absorb(record, result, "fallback")?;
        }

        Ok(record.outcome())
    }

    /// Interpret fields, reset the status and derive window/component names
    fn init(&self, record: &mut TestRecord) -> Result<(), RecordError> {
        let record_type = record.record_type();
        if !Self::is_supported_record_type(&record_type) {
            return Err(RecordError::FieldAccess {
                record: record.input_record.clone(),
                message: format!("unsupported record type '{}'", record_type),
            });
        }
        interpret_fields(record, self.log.as_ref())?;
        record.set_status(StatusCode::NotExecuted);
        record.set_status_info(String::new());

        let skip = if is_branch_command(&record.command) { 1 } else { 0 };
        let mut names = record.params.iter().skip(skip);
        record.window_name = names.next().cloned();
        record.component_name = names.next().cloned();
        Ok(())
    }

    /// Keywords every engine handles the same way
    async fn general_command_process(&self, record: &mut TestRecord) -> Result<(), RecordError> {
        let command = record.command.clone();
        if command.eq_ignore_ascii_case(ON_GUI_EXISTS_GOTO_BLOCK_ID) {
            self.branch_evaluator().evaluate(record, true).await
        } else if command.eq_ignore_ascii_case(ON_GUI_NOT_EXIST_GOTO_BLOCK_ID) {
            self.branch_evaluator().evaluate(record, false).await
        } else if command.eq_ignore_ascii_case(CALL_SCRIPT) {
            self.script_invoker().call_script(record).await
        } else if command.eq_ignore_ascii_case(CALL_JUNIT) {
            self.script_invoker().call_junit(record).await
        } else {
            Ok(())
        }
    }

    fn branch_evaluator(&self) -> GuiExistenceBranchEvaluator<'_> {
        GuiExistenceBranchEvaluator::new(self.probe.as_ref(), self.log.as_ref())
            .with_default_timeout(self.default_timeout_secs)
    }

    fn script_invoker(&self) -> ScriptInvoker<'_> {
        ScriptInvoker::new(self.scripts.as_ref(), self.log.as_ref())
    }

    /// Turn a stage error into a failure status, re-raising shutdown
    fn absorb(
        &self,
        record: &mut TestRecord,
        result: anyhow::Result<()>,
        stage: &str,
    ) -> Result<(), RecordError> {
        let Err(e) = result else {
            return Ok(());
        };
        let e = escalate_shutdown(e)?;
        log::warn!("{} failed for '{}': {:#}", stage, record.input_record, e);
        record.set_status(StatusCode::GeneralScriptFailure);
        let message = format!("*** Error *** {:#}", e);
        record.set_status_info(message.clone());
        self.log.log_message(
            &record.facility_id,
            &message,
            Severity::Failed,
            Some(&record.standard_failure_detail()),
        );
        Ok(())
    }
}
