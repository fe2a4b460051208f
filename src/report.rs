use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// User-facing diagnostics for a pipeline component. Diagnostic lines go to
/// stderr with a timestamp and the component tag; echo lines go to stdout
/// verbatim. Both are gated by flags fixed at startup.
///
/// This is separate from the `tracing` log stream: the reporter carries the
/// narrative the utilities promise on `-v` / `-e`.
#[derive(Debug, Clone)]
pub struct Reporter {
    tag: &'static str,
    verbose: bool,
    echo: bool,
}

impl Reporter {
    pub fn new(tag: &'static str, verbose: bool, echo: bool) -> Self {
        Self { tag, verbose, echo }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Timestamped diagnostic on stderr, verbose mode only.
    pub fn diag(&self, message: &str) {
        if self.verbose {
            eprintln!("{}: {}: {}", now_iso8601(), self.tag, message);
        }
    }

    /// Repeat a line on stdout, echo mode only.
    pub fn echo(&self, line: &str) {
        if self.echo {
            println!("{line}");
        }
    }
}

pub fn now_iso8601() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Structured report for an unclassified fault, printed to stderr before the
/// guaranteed-cleanup shutdown.
pub fn fault_report(kind: &str, message: &str) -> String {
    json!({"kind": kind, "message": message}).to_string()
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn fault_report_is_a_json_document() {
        let report = fault_report("connect", "broker unreachable");
        let doc: Value = serde_json::from_str(&report).unwrap();

        assert_eq!(doc["kind"], "connect");
        assert_eq!(doc["message"], "broker unreachable");
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let now = now_iso8601();
        assert!(OffsetDateTime::parse(&now, &Rfc3339).is_ok());
    }

    #[test]
    fn silent_reporter_emits_nothing() {
        // No observable assertion without capturing the streams; this pins the
        // flag plumbing down and must not panic.
        let reporter = Reporter::new("test", false, false);
        reporter.diag("dropped");
        reporter.echo("dropped");
        assert!(!reporter.verbose());
    }
}
