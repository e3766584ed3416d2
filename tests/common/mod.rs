//! Test doubles shared by the integration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use lumi_keyword::driver::log_sink::MemoryLogSink;
use lumi_keyword::driver::traits::{
    CommandEngine, GuiProbe, ScriptHost, ScriptOutcome, ScriptRunReport,
};
use lumi_keyword::parser::types::{StatusCode, TestRecord};
use lumi_keyword::runner::CommandPipeline;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a [`FakeProbe`] answers
#[derive(Debug, Clone)]
pub enum ProbeAnswer {
    Satisfied(bool),
    Fails(String),
}

/// Existence probe with a fixed answer that records every call
pub struct FakeProbe {
    answer: ProbeAnswer,
    calls: AtomicUsize,
    timeouts: Mutex<Vec<u64>>,
}

impl FakeProbe {
    pub fn answering(satisfied: bool) -> Arc<Self> {
        Self::with(ProbeAnswer::Satisfied(satisfied))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with(ProbeAnswer::Fails(message.to_string()))
    }

    fn with(answer: ProbeAnswer) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
            timeouts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> Vec<u64> {
        self.timeouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GuiProbe for FakeProbe {
    async fn check_existence(
        &self,
        _expect_exist: bool,
        _app_map: &str,
        _window: &str,
        _component: &str,
        timeout_secs: u64,
    ) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeouts.lock().unwrap().push(timeout_secs);
        match &self.answer {
            ProbeAnswer::Satisfied(value) => Ok(*value),
            ProbeAnswer::Fails(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

/// How a scripted name behaves in [`FakeScriptHost`]
#[derive(Debug, Clone)]
pub enum FakeScript {
    Passes,
    FailsTests(u32),
    NoResult,
    Errors(String),
}

/// Script host backed by a name table; unknown names are not found
#[derive(Default)]
pub struct FakeScriptHost {
    scripts: HashMap<String, FakeScript>,
    calls: Mutex<Vec<String>>,
    arguments: Mutex<Vec<Vec<String>>>,
}

impl FakeScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, script: FakeScript) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Arguments of every call, in call order
    pub fn arguments(&self) -> Vec<Vec<String>> {
        self.arguments.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptHost for FakeScriptHost {
    async fn run_script(&self, name: &str, args: &[String]) -> ScriptOutcome {
        self.calls.lock().unwrap().push(name.to_string());
        self.arguments.lock().unwrap().push(args.to_vec());
        match self.scripts.get(name) {
            None => ScriptOutcome::NotFound,
            Some(FakeScript::Passes) => ScriptOutcome::Ran(ScriptRunReport {
                ran_count: 3,
                elapsed_ms: 12,
                ..Default::default()
            }),
            Some(FakeScript::FailsTests(failed)) => ScriptOutcome::Ran(ScriptRunReport {
                ran_count: 3,
                failed_count: *failed,
                elapsed_ms: 12,
                failure_details: vec!["assertion failed".to_string()],
                ..Default::default()
            }),
            Some(FakeScript::NoResult) => ScriptOutcome::NoResult,
            Some(FakeScript::Errors(message)) => {
                ScriptOutcome::Error(anyhow::anyhow!("{}", message))
            }
        }
    }
}

/// Engine that counts its hooks and can claim or reject records
#[derive(Default)]
pub struct RecordingEngine {
    pub local_calls: AtomicUsize,
    pub command_calls: AtomicUsize,
    /// Status set by `local_process`, if any
    pub local_status: Option<StatusCode>,
    /// Commands `command_process` handles with `NoScriptFailure`
    pub handles: Vec<String>,
    /// Error message `command_process` returns
    pub command_error: Option<String>,
}

impl RecordingEngine {
    pub fn local_calls(&self) -> usize {
        self.local_calls.load(Ordering::SeqCst)
    }

    pub fn command_calls(&self) -> usize {
        self.command_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandEngine for RecordingEngine {
    fn engine_name(&self) -> &str {
        "recording"
    }

    async fn local_process(&self, record: &mut TestRecord) -> Result<()> {
        self.local_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.local_status {
            record.set_status(status);
        }
        Ok(())
    }

    async fn command_process(&self, record: &mut TestRecord) -> Result<()> {
        self.command_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.command_error {
            anyhow::bail!("{}", message);
        }
        if self
            .handles
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&record.command))
        {
            record.set_status(StatusCode::NoScriptFailure);
        }
        Ok(())
    }
}

/// Pipeline wired to the given doubles, logging into the returned sink
pub fn pipeline(
    probe: Arc<FakeProbe>,
    scripts: Arc<FakeScriptHost>,
) -> (CommandPipeline, MemoryLogSink) {
    let log = MemoryLogSink::new();
    let pipeline = CommandPipeline::new(probe, scripts, Arc::new(log.clone()));
    (pipeline, log)
}

/// Record as the driver loop builds it
pub fn record(line: &str) -> TestRecord {
    TestRecord::from_line(line, ",")
        .with_location("Login.cdd", 7)
        .with_facility("lumi")
}
