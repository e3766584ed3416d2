use crate::driver::traits::{LogSink, Severity};
use crate::error::{RecordError, TokenOutOfRange};

use super::types::TestRecord;

const COMMAND_FIELD: &str = "command";
const PARAM_FIELD: &str = "param";

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{a0}')
}

/// Trim spaces, tabs and no-break spaces, then drop at most one leading
/// and at most one trailing double quote.
pub fn trimmed_unquoted(token: &str) -> String {
    let trimmed = token.trim_matches(is_blank);
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.to_string()
}

/// Split a driver-command record into its command keyword and parameters.
///
/// Token 0 is the record type, token 1 the command, tokens 2..N the
/// positional parameters. The record is only modified when the command
/// token is present; a record without one is reported through `log` as a
/// FAILED message and rejected with [`RecordError::MalformedRecord`].
pub fn interpret_fields(record: &mut TestRecord, log: &dyn LogSink) -> Result<(), RecordError> {
    let index = 1;
    let command = match record.token(index) {
        Some(token) => trimmed_unquoted(token),
        None => {
            log.log_message(
                &record.facility_id,
                &format!(
                    "interpretFields: tokenIndex:{}, getting {},\n   this is the inputRecord: {}",
                    index, COMMAND_FIELD, record.input_record
                ),
                Severity::Failed,
                None,
            );
            return Err(RecordError::MalformedRecord {
                index,
                field: COMMAND_FIELD,
                record: record.input_record.clone(),
                source: TokenOutOfRange {
                    index,
                    len: record.raw_tokens.len(),
                },
            });
        }
    };

    let params: Vec<String> = record.raw_tokens[2..]
        .iter()
        .map(|t| trimmed_unquoted(t))
        .collect();

    log::debug!(
        "interpreted {} with {} {}(s) from '{}'",
        command,
        params.len(),
        PARAM_FIELD,
        record.input_record
    );

    record.command = command;
    record.params = params;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::log_sink::MemoryLogSink;

    #[test]
    fn test_trimmed_unquoted() {
        assert_eq!(trimmed_unquoted("  CallScript "), "CallScript");
        assert_eq!(trimmed_unquoted("\t\"Block1\"\u{a0}"), "Block1");
        assert_eq!(trimmed_unquoted("\"half"), "half");
        assert_eq!(trimmed_unquoted("half\""), "half");
        assert_eq!(trimmed_unquoted("\"\"x\"\""), "\"x\"");
        assert_eq!(trimmed_unquoted("   "), "");
        assert_eq!(trimmed_unquoted("\""), "");
    }

    #[test]
    fn test_interpret_command_and_params() {
        let log = MemoryLogSink::new();
        let mut record = TestRecord::from_line("C, \"CallScript\" , TestScript2", ",");
        interpret_fields(&mut record, &log).unwrap();
        assert_eq!(record.command, "CallScript");
        assert_eq!(record.params, vec!["TestScript2".to_string()]);
        assert!(log.messages().is_empty());
    }

    #[test]
    fn test_interpret_without_params() {
        let log = MemoryLogSink::new();
        let mut record = TestRecord::from_line("C,ClearAppMapCache", ",");
        interpret_fields(&mut record, &log).unwrap();
        assert_eq!(record.command, "ClearAppMapCache");
        assert!(record.params.is_empty());
    }

    #[test]
    fn test_interpret_is_deterministic() {
        let log = MemoryLogSink::new();
        let tokens = vec![
            "C".to_string(),
            " OnGUIExistsGotoBlockID".to_string(),
            "\"Block1\"".to_string(),
            "Win1 ".to_string(),
        ];
        let mut first = TestRecord::new(tokens.clone(), ",");
        let mut second = TestRecord::new(tokens, ",");
        interpret_fields(&mut first, &log).unwrap();
        interpret_fields(&mut second, &log).unwrap();
        assert_eq!(first.command, second.command);
        assert_eq!(first.params, second.params);
    }

    #[test]
    fn test_missing_command_is_malformed() {
        let log = MemoryLogSink::new();
        let mut record = TestRecord::new(vec!["C".to_string()], ",");
        let err = interpret_fields(&mut record, &log).unwrap_err();
        match err {
            RecordError::MalformedRecord {
                index,
                field,
                record: text,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(field, "command");
                assert_eq!(text, "C");
                assert_eq!(source.len, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(record.command.is_empty());
        assert!(record.params.is_empty());

        let messages = log.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, Severity::Failed);
        assert!(messages[0].message.contains("tokenIndex:1"));
    }
}
