//! Structured JSON logger
//!
//! Each event becomes one line on stderr: `event` and `severity` first, then
//! the caller's fields sorted by key. stdout stays reserved for CLI responses.
//! The threshold comes from `RESOLVEPLAN_LOG` (defaults to WARN) and is read
//! once per process.

use std::fmt;
use std::io::{self, Write};
use std::sync::OnceLock;

static THRESHOLD: OnceLock<Severity> = OnceLock::new();

const THRESHOLD_ENV: &str = "RESOLVEPLAN_LOG";

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Plan construction detail
    Trace = 0,
    /// Registrations, cache invalidations
    Info = 1,
    /// Skipped or degraded fragments
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Parses a level name, ignoring case and surrounding whitespace
    pub fn parse(name: &str) -> Option<Self> {
        [Severity::Trace, Severity::Info, Severity::Warn, Severity::Error]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event with its fields, ready to be rendered as a JSON line
#[derive(Debug)]
pub struct LogRecord<'a> {
    severity: Severity,
    event: &'a str,
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> LogRecord<'a> {
    pub fn new(severity: Severity, event: &'a str, fields: &[(&'a str, &'a str)]) -> Self {
        let mut fields = fields.to_vec();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        Self {
            severity,
            event,
            fields,
        }
    }

    /// Renders the record as a single newline-terminated JSON object
    pub fn render(&self) -> String {
        let mut line = String::with_capacity(64 + self.fields.len() * 32);
        line.push('{');
        push_pair(&mut line, "event", self.event);
        line.push(',');
        push_pair(&mut line, "severity", self.severity.as_str());
        for (key, value) in &self.fields {
            line.push(',');
            push_pair(&mut line, key, value);
        }
        line.push_str("}\n");
        line
    }
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    push_quoted(line, key);
    line.push(':');
    push_quoted(line, value);
}

fn push_quoted(line: &mut String, raw: &str) {
    line.push('"');
    for c in raw.chars() {
        match c {
            '"' => line.push_str("\\\""),
            '\\' => line.push_str("\\\\"),
            '\n' => line.push_str("\\n"),
            '\r' => line.push_str("\\r"),
            '\t' => line.push_str("\\t"),
            c if c.is_control() => line.push_str(&format!("\\u{:04x}", c as u32)),
            c => line.push(c),
        }
    }
    line.push('"');
}

/// Process-wide JSON-line logger
pub struct Logger;

impl Logger {
    /// Lowest severity that is written
    pub fn threshold() -> Severity {
        *THRESHOLD.get_or_init(|| {
            std::env::var(THRESHOLD_ENV)
                .ok()
                .and_then(|v| Severity::parse(&v))
                .unwrap_or(Severity::Warn)
        })
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::threshold()
    }

    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        Self::write_record(&LogRecord::new(severity, event, fields), &mut io::stderr());
    }

    /// Writes one record with a single `write_all`; sink errors are dropped
    pub fn write_record<W: Write>(record: &LogRecord<'_>, sink: &mut W) {
        let _ = sink.write_all(record.render().as_bytes());
        let _ = sink.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sink = Vec::new();
        Logger::write_record(&LogRecord::new(severity, event, fields), &mut sink);
        String::from_utf8(sink).unwrap()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("trace"), Some(Severity::Trace));
        assert_eq!(Severity::parse(" Warn "), Some(Severity::Warn));
        assert_eq!(Severity::parse("loud"), None);
    }

    #[test]
    fn test_record_is_one_json_line() {
        let line = capture(Severity::Warn, "PARSE_FRAGMENT_SKIPPED", &[("key", "x-limit")]);
        assert!(line.ends_with('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "PARSE_FRAGMENT_SKIPPED");
        assert_eq!(parsed["severity"], "WARN");
        assert_eq!(parsed["key"], "x-limit");
    }

    #[test]
    fn test_fields_sorted_regardless_of_input_order() {
        let a = capture(Severity::Info, "E", &[("table", "posts"), ("depth", "3")]);
        let b = capture(Severity::Info, "E", &[("depth", "3"), ("table", "posts")]);
        assert_eq!(a, b);
        assert!(a.find("depth").unwrap() < a.find("table").unwrap());
    }

    #[test]
    fn test_values_with_quotes_and_newlines_stay_on_one_line() {
        let line = capture(Severity::Warn, "E", &[("value", "{\"broken\": \ntrue\u{1}")]);

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["value"], "{\"broken\": \ntrue\u{1}");
        assert_eq!(line.matches('\n').count(), 1);
    }
}
