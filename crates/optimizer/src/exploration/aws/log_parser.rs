#![forbid(unsafe_code)]

use crate::error::Error;
use crate::exploration::LogParser;
use tracing::debug;

/// Parses the `REPORT` tail of an AWS Lambda invocation log.
///
/// The billed duration is required; the cold-start `Init Duration` is
/// subtracted (rounded up) so cold starts do not skew samples.
#[derive(Debug, Default)]
pub struct AwsLogParser;

const BILLED_DURATION: &str = "Billed Duration";
const MEMORY_SIZE: &str = "Memory Size";
const MAX_MEMORY_USED: &str = "Max Memory Used";
const INIT_DURATION: &str = "Init Duration";
const TIMEOUT_MARKER: &str = "Task timed out after";
const ERROR_MARKER: &str = "[ERROR]";
const ERROR_END_MARKER: &str = "END RequestId";

impl LogParser for AwsLogParser {
    fn parse(&self, log: &[u8]) -> Result<u64, Error> {
        let log = String::from_utf8_lossy(log);

        let billed = field(&log, BILLED_DURATION)
            .ok_or_else(|| Error::LogUnparseable(format!("missing `{BILLED_DURATION}`")))?;
        let init = field(&log, INIT_DURATION).unwrap_or(0.0);
        let duration_ms = ((billed as i64) - (init.ceil() as i64)).max(0) as u64;

        debug!(billed, init, duration_ms, "parsed invocation log");

        if log.contains(TIMEOUT_MARKER) {
            return Err(Error::FunctionTimeout {
                duration_ms: Some(duration_ms),
            });
        }

        let out_of_memory = match (field(&log, MAX_MEMORY_USED), field(&log, MEMORY_SIZE)) {
            (Some(used), Some(size)) => used >= size,
            _ => false,
        };
        if out_of_memory || (log.contains("ENOMEM") && log.contains("errorType")) {
            return Err(Error::FunctionOutOfMemory {
                duration_ms: Some(duration_ms),
            });
        }

        if let Some(message) = error_message(&log) {
            return Err(Error::Invocation {
                message,
                duration_ms: Some(duration_ms),
            });
        }

        Ok(duration_ms)
    }
}

/// Extract the numeric value of `<key>: <float> <unit>`, tolerating any
/// whitespace around the marker.
fn field(log: &str, key: &str) -> Option<f64> {
    let marker = format!("{key}:");
    let start = log.find(&marker)? + marker.len();
    let rest = log[start..].trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// The application error payload between `[ERROR]` and `END RequestId`.
fn error_message(log: &str) -> Option<String> {
    let start = log.find(ERROR_MARKER)? + ERROR_MARKER.len();
    let rest = &log[start..];
    let end = rest.find(ERROR_END_MARKER)?;
    Some(rest[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(duration: f64, billed: u64, size: u32, used: u32) -> String {
        format!(
            "START RequestId: 8f507cf6 Version: $LATEST\n\
             END RequestId: 8f507cf6\n\
             REPORT RequestId: 8f507cf6\tDuration: {duration} ms\t\
             Billed Duration: {billed} ms\tMemory Size: {size} MB\t\
             Max Memory Used: {used} MB\t\n"
        )
    }

    #[test]
    fn parses_billed_duration() {
        let parser = AwsLogParser;
        let log = report(102.25, 103, 512, 80);
        assert_eq!(parser.parse(log.as_bytes()).unwrap(), 103);
    }

    #[test]
    fn subtracts_init_duration() {
        let parser = AwsLogParser;
        let mut log = report(102.25, 103, 512, 80);
        log.push_str("\tInit Duration: 20.4 ms\n");
        assert_eq!(parser.parse(log.as_bytes()).unwrap(), 82);
    }

    #[test]
    fn missing_billed_duration_is_unparseable() {
        let parser = AwsLogParser;
        let err = parser.parse(b"REPORT RequestId: x Duration: 10 ms").unwrap_err();
        assert!(matches!(err, Error::LogUnparseable(_)));
    }

    #[test]
    fn timeout_marker_wins_and_carries_duration() {
        let parser = AwsLogParser;
        let mut log = report(3000.0, 3000, 512, 80);
        log.push_str("2015-09-22 Task timed out after 3.00 seconds\n");
        let err = parser.parse(log.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::FunctionTimeout {
                duration_ms: Some(3000)
            }
        ));
    }

    #[test]
    fn max_memory_at_capacity_is_out_of_memory() {
        let parser = AwsLogParser;
        let log = report(500.0, 500, 128, 128);
        let err = parser.parse(log.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::FunctionOutOfMemory {
                duration_ms: Some(500)
            }
        ));
    }

    #[test]
    fn enomem_marker_is_out_of_memory() {
        let parser = AwsLogParser;
        let mut log = report(500.0, 500, 128, 64);
        log.push_str(r#"{"errorType":"Runtime.OutOfMemory","errorMessage":"ENOMEM"}"#);
        assert!(matches!(
            parser.parse(log.as_bytes()).unwrap_err(),
            Error::FunctionOutOfMemory { .. }
        ));
    }

    #[test]
    fn runtime_error_payload_is_extracted() {
        let parser = AwsLogParser;
        let log = format!(
            "START RequestId: 8f507cf6\n\
             [ERROR] KeyError: 'width'\n\
             END RequestId: 8f507cf6\n\
             REPORT RequestId: 8f507cf6\tBilled Duration: 45 ms\t\
             Memory Size: 512 MB\tMax Memory Used: 60 MB\n"
        );
        let err = parser.parse(log.as_bytes()).unwrap_err();
        match err {
            Error::Invocation {
                message,
                duration_ms,
            } => {
                assert_eq!(message, "KeyError: 'width'");
                assert_eq!(duration_ms, Some(45));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
