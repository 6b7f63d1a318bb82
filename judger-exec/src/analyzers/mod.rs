//! The built-in analyzers, one for each kind of problem.

use std::sync::Arc;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex as BytesRegex;
use regex::Regex;

use judger_dag::ProcessorResult;

use crate::{Analyzer, RuntimeNode};

mod default;
mod hack;
mod traditional;

pub use custom_test::CustomTest;
pub use default::DefaultAnalyzer;
pub use hack::Hack;
pub use traditional::Traditional;

/// The analyzer with that name, among `traditional`, `customtest` and `default`.
pub fn by_name(name: &str) -> Option<Arc<dyn Analyzer>> {
    match name {
        "traditional" => Some(Arc::new(Traditional)),
        "customtest" => Some(Arc::new(CustomTest)),
        "default" => Some(Arc::new(DefaultAnalyzer)),
        _ => None,
    }
}

/// The report written by a testlib checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckerReport {
    /// The outcome, like `accepted` or `wrong-answer`.
    pub outcome: String,
    /// The message of the checker.
    pub message: String,
}

/// Parse the XML report of a testlib checker, which looks like
/// `<result outcome="accepted">ok 1 number(s)</result>`.
///
/// The report is decoded with the encoding of its XML declaration (testlib declares
/// `windows-1251`), or as UTF-8 without one.
pub(crate) fn checker_report(report: &[u8]) -> Option<CheckerReport> {
    lazy_static! {
        static ref RESULT: Regex =
            Regex::new(r#"(?s)<result\s+outcome\s*=\s*"([^"]*)"[^>]*>(.*?)</result>"#)
                .expect("Invalid regex");
        static ref DECLARATION: BytesRegex =
            BytesRegex::new(r#"^\s*<\?xml[^>]*\bencoding\s*=\s*["']([^"']+)["']"#)
                .expect("Invalid regex");
    }
    let encoding = DECLARATION
        .captures(report)
        .and_then(|captures| Encoding::for_label(&captures[1]))
        .unwrap_or(UTF_8);
    let (report, _, malformed) = encoding.decode(report);
    if malformed {
        debug!("Checker report is not valid {}", encoding.name());
    }
    let captures = RESULT.captures(&report)?;
    Some(CheckerReport {
        outcome: unescape(&captures[1]),
        message: unescape(&captures[2]),
    })
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// The time and memory used by the program run by a node.
pub(crate) fn usage(result: Option<&ProcessorResult>) -> (Duration, u64) {
    match result {
        Some(result) => (
            result.cpu_time.or(result.real_time).unwrap_or_default(),
            result.memory.unwrap_or(0),
        ),
        None => (Duration::ZERO, 0),
    }
}

/// The content of an input of a node, empty if not bound.
pub(crate) fn input_of<'a>(node: &'a RuntimeNode, label: &str) -> &'a [u8] {
    node.input(label).map(|b| b.as_ref()).unwrap_or_default()
}

/// The content of an output of a node, empty if not produced.
pub(crate) fn output_of<'a>(node: &'a RuntimeNode, label: &str) -> &'a [u8] {
    node.output(label).map(|b| b.as_ref()).unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_checker_report() {
        let report = checker_report(
            br#"<?xml version="1.0" encoding="windows-1251"?>
<result outcome="wrong-answer">1st numbers differ - expected: &apos;3&apos;, found: &apos;4&apos;</result>"#,
        )
        .unwrap();
        assert_eq!(report.outcome, "wrong-answer");
        assert_eq!(
            report.message,
            "1st numbers differ - expected: '3', found: '4'"
        );
        assert_eq!(checker_report(b"garbage"), None);
    }

    #[test]
    fn test_checker_report_windows_1251() {
        let mut report = br#"<?xml version="1.0" encoding="windows-1251"?>
<result outcome="wrong-answer">"#
            .to_vec();
        // "Неверно" in windows-1251
        report.extend_from_slice(&[0xcd, 0xe5, 0xe2, 0xe5, 0xf0, 0xed, 0xee]);
        report.extend_from_slice(b"</result>");
        let report = checker_report(&report).unwrap();
        assert_eq!(report.outcome, "wrong-answer");
        assert_eq!(report.message, "Неверно");
    }

    #[test]
    fn test_checker_report_utf8() {
        let report =
            checker_report("<result outcome=\"accepted\">ответ верный</result>".as_bytes())
                .unwrap();
        assert_eq!(report.message, "ответ верный");
    }

    #[test]
    fn test_by_name() {
        assert!(by_name("traditional").is_some());
        assert!(by_name("customtest").is_some());
        assert!(by_name("default").is_some());
        assert!(by_name("interactive").is_none());
    }
}
