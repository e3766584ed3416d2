use super::types::RunResults;
use crate::parser::types::{RecordKind, StatusCode};
use crate::runner::state::{RecordState, TableStateReport};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

fn is_failed(record: &RecordState) -> bool {
    record.kind != RecordKind::Skipped
        && matches!(
            record.status,
            StatusCode::GeneralScriptFailure | StatusCode::NotExecuted
        )
}

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate JUnit XML: one testsuite per table, one testcase per record
pub fn generate_junit_xml(results: &RunResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let counters = &results.summary.counters;
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-keyword-run"));
    suites_start.push_attribute(("tests", counters.total_records.to_string().as_str()));
    suites_start.push_attribute(("failures", counters.general_failures.to_string().as_str()));
    suites_start.push_attribute(("skipped", counters.skipped.to_string().as_str()));
    suites_start.push_attribute((
        "time",
        seconds(results.summary.total_duration_ms.unwrap_or(0)).as_str(),
    ));
    writer.write_event(Event::Start(suites_start))?;

    for table in &results.tables {
        write_test_suite(&mut writer, table, results)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    Ok(String::from_utf8(result)?)
}

fn write_test_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    table: &TableStateReport,
    results: &RunResults,
) -> Result<()> {
    let failures = table.records.iter().filter(|r| is_failed(r)).count();

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", table.table_name.as_str()));
    suite_start.push_attribute(("tests", table.records.len().to_string().as_str()));
    suite_start.push_attribute(("failures", failures.to_string().as_str()));
    suite_start.push_attribute(("skipped", table.counters.skipped.to_string().as_str()));
    suite_start.push_attribute(("id", results.session_id.as_str()));
    suite_start.push_attribute((
        "time",
        seconds(table.total_duration_ms.unwrap_or(0)).as_str(),
    ));
    suite_start.push_attribute(("timestamp", results.generated_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    let classname = table.table_path.replace(['/', '\\'], ".");
    for record in &table.records {
        write_test_case(writer, record, &classname)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    record: &RecordState,
    classname: &str,
) -> Result<()> {
    let name = if record.command.is_empty() {
        format!("line {}", record.line_number)
    } else {
        format!("line {}: {}", record.line_number, record.command)
    };

    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", name.as_str()));
    case_start.push_attribute(("classname", classname));
    case_start.push_attribute(("time", seconds(record.duration_ms).as_str()));
    writer.write_event(Event::Start(case_start))?;

    if record.kind == RecordKind::Skipped {
        writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
    } else if is_failed(record) {
        let message = if record.status_info.is_empty() {
            record.status.as_str()
        } else {
            record.status_info.as_str()
        };
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", message));
        fail_start.push_attribute(("type", record.status.as_str()));
        writer.write_event(Event::Start(fail_start))?;
        writer.write_event(Event::Text(BytesText::new(&record.input_record)))?;
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    } else if record.status == StatusCode::ScriptWarning && !record.status_info.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(&record.status_info)))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into the output directory
pub fn write_report(results: &RunResults, output_dir: &Path) -> Result<std::path::PathBuf> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    Ok(path)
}
