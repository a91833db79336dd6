//! Helpers for cop tests.
//!
//! Fixtures are Ruby source with annotation lines under the offending line:
//!
//! ```text
//! x = /a[b]/
//!       ^^^ Style/RedundantRegexpCharacterClass: Redundant single-element ...
//! ```
//!
//! The first `^` marks the expected column. Annotation lines are removed
//! before the cop sees the source.

use ruby_prism::Visit;

use crate::cop::walker::{ActiveCop, BatchedCopWalker};
use crate::cop::{Cop, CopConfig};
use crate::correction::{Correction, CorrectionSet};
use crate::diagnostic::Diagnostic;
use crate::parse::parse_source;
use crate::parse::source::SourceFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOffense {
    pub line: usize,
    pub column: usize,
    pub cop_name: String,
    pub message: String,
}

/// Parse `   ^^^ Dept/Name: message`. The carets must be the first
/// non-blank characters and the cop name must contain a `/`, so Ruby code
/// such as `a ^ b` or `/^foo/` is never mistaken for an annotation.
fn parse_annotation(line: &str) -> Option<(usize, &str, &str)> {
    let trimmed = line.trim_start();
    let column = line.len() - trimmed.len();
    let rest = trimmed.trim_start_matches('^');
    if rest.len() == trimmed.len() {
        return None;
    }
    let (cop_name, message) = rest.strip_prefix(' ')?.trim_end().split_once(": ")?;
    if !cop_name.contains('/') {
        return None;
    }
    Some((column, cop_name, message))
}

/// Split a fixture into clean source and the offenses it expects. Each
/// annotation refers to the closest source line above it.
///
/// # Panics
///
/// If the fixture is not UTF-8 or starts with an annotation.
pub fn parse_fixture(raw: &[u8]) -> (Vec<u8>, Vec<ExpectedOffense>) {
    let text = std::str::from_utf8(raw).expect("fixture must be valid UTF-8");
    let mut source_lines: Vec<&str> = Vec::new();
    let mut expected = Vec::new();

    for (idx, line) in text.split('\n').enumerate() {
        match parse_annotation(line) {
            Some((column, cop_name, message)) => {
                assert!(
                    !source_lines.is_empty(),
                    "annotation on fixture line {} has no source line above it: {line:?}",
                    idx + 1,
                );
                expected.push(ExpectedOffense {
                    line: source_lines.len(),
                    column,
                    cop_name: cop_name.to_string(),
                    message: message.to_string(),
                });
            }
            None => source_lines.push(line),
        }
    }
    (source_lines.join("\n").into_bytes(), expected)
}

/// Run one cop over `source_bytes`. Corrections are collected only when
/// `autocorrect` is set.
pub fn run_cop_full(
    cop: &dyn Cop,
    source_bytes: &[u8],
    config: CopConfig,
    autocorrect: bool,
) -> (Vec<Diagnostic>, Vec<Correction>) {
    let source = SourceFile::from_bytes("test.rb", source_bytes.to_vec());
    let parse_result = parse_source(source.as_bytes());
    let active = vec![ActiveCop {
        cop,
        config: &config,
        index: 0,
        autocorrect,
    }];
    let mut walker = BatchedCopWalker::new(active, &source, &parse_result);
    walker.visit(&parse_result.node());
    (walker.diagnostics, walker.corrections)
}

pub fn run_cop(cop: &dyn Cop, source_bytes: &[u8]) -> Vec<Diagnostic> {
    run_cop_with_config(cop, source_bytes, CopConfig::default())
}

pub fn run_cop_with_config(cop: &dyn Cop, source_bytes: &[u8], config: CopConfig) -> Vec<Diagnostic> {
    run_cop_full(cop, source_bytes, config, false).0
}

pub fn assert_cop_offenses(cop: &dyn Cop, fixture_bytes: &[u8]) {
    assert_cop_offenses_with_config(cop, fixture_bytes, CopConfig::default());
}

/// Order-independent: both sides are sorted by (line, column).
pub fn assert_cop_offenses_with_config(cop: &dyn Cop, fixture_bytes: &[u8], config: CopConfig) {
    let (clean_source, mut expected) = parse_fixture(fixture_bytes);
    let mut diagnostics = run_cop_with_config(cop, &clean_source, config);
    expected.sort_by_key(|e| (e.line, e.column));
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let actual: Vec<ExpectedOffense> = diagnostics
        .iter()
        .map(|d| ExpectedOffense {
            line: d.location.line,
            column: d.location.column,
            cop_name: d.cop_name.clone(),
            message: d.message.clone(),
        })
        .collect();
    assert_eq!(
        actual,
        expected,
        "offense mismatch\nexpected:\n{}\nactual:\n{}",
        format_offenses(&expected),
        format_offenses(&actual),
    );
}

pub fn assert_cop_no_offenses(cop: &dyn Cop, source_bytes: &[u8]) {
    assert_cop_no_offenses_with_config(cop, source_bytes, CopConfig::default());
}

pub fn assert_cop_no_offenses_with_config(cop: &dyn Cop, source_bytes: &[u8], config: CopConfig) {
    let diagnostics = run_cop_with_config(cop, source_bytes, config);
    assert!(
        diagnostics.is_empty(),
        "expected no offenses but got {}:\n{}",
        diagnostics.len(),
        diagnostics
            .iter()
            .map(|d| format!("  {d}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );
}

/// Apply one round of the cop's corrections and compare with `expected`.
pub fn assert_cop_correction(cop: &dyn Cop, source_bytes: &[u8], expected: &[u8]) {
    let (diagnostics, corrections) = run_cop_full(cop, source_bytes, CopConfig::default(), true);
    assert!(
        diagnostics.iter().all(|d| d.corrected),
        "every offense should be marked corrected"
    );
    let corrected = CorrectionSet::from_vec(corrections).apply(source_bytes);
    assert_eq!(
        String::from_utf8_lossy(&corrected),
        String::from_utf8_lossy(expected),
    );
}

fn format_offenses(offenses: &[ExpectedOffense]) -> String {
    offenses
        .iter()
        .map(|e| format!("  {}:{} {}: {}", e.line, e.column, e.cop_name, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fixture tests for a cop, reading `tests/fixtures/<dir>/offense.rb` and
/// `no_offense.rb`. With `autocorrect`, `offense.rb` (annotations stripped)
/// must also correct to `corrected.rb`.
#[macro_export]
macro_rules! cop_fixture_tests {
    ($cop:expr, $dir:literal) => {
        #[test]
        fn offense_fixture() {
            $crate::testutil::assert_cop_offenses(
                &$cop,
                include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $dir, "/offense.rb")),
            );
        }

        #[test]
        fn no_offense_fixture() {
            $crate::testutil::assert_cop_no_offenses(
                &$cop,
                include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $dir, "/no_offense.rb")),
            );
        }
    };
    ($cop:expr, $dir:literal, autocorrect) => {
        $crate::cop_fixture_tests!($cop, $dir);

        #[test]
        fn corrected_fixture() {
            let (source, _) = $crate::testutil::parse_fixture(include_bytes!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/tests/fixtures/",
                $dir,
                "/offense.rb"
            )));
            $crate::testutil::assert_cop_correction(
                &$cop,
                &source,
                include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $dir, "/corrected.rb")),
            );
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_with_indent() {
        assert_eq!(
            parse_annotation("      ^^^ Style/Foo: some message"),
            Some((6, "Style/Foo", "some message"))
        );
        assert_eq!(parse_annotation("^ Lint/X: m"), Some((0, "Lint/X", "m")));
    }

    #[test]
    fn annotation_message_keeps_backticks() {
        let (_, _, message) =
            parse_annotation("^^^ Style/Foo: `[a]` can be replaced with `a`.").unwrap();
        assert_eq!(message, "`[a]` can be replaced with `a`.");
    }

    #[test]
    fn ruby_code_is_not_an_annotation() {
        for line in ["x = 1", "/^foo/", "a ^ b", "", "  puts \"^hi\""] {
            assert_eq!(parse_annotation(line), None, "{line:?}");
        }
    }

    #[test]
    fn malformed_annotations_rejected() {
        assert_eq!(parse_annotation("^^^ no slash here"), None);
        assert_eq!(parse_annotation("^^^Style/Foo: msg"), None);
        assert_eq!(parse_annotation("^^^ Style/Foo msg"), None);
        assert_eq!(parse_annotation("^^^ Style/Foo:msg"), None);
    }

    #[test]
    fn parse_fixture_strips_annotations() {
        let raw = b"x = /[a]/\n     ^^^ Style/Foo: msg\ny = 2\n";
        let (clean, expected) = parse_fixture(raw);
        assert_eq!(clean, b"x = /[a]/\ny = 2\n");
        assert_eq!(
            expected,
            vec![ExpectedOffense {
                line: 1,
                column: 5,
                cop_name: "Style/Foo".to_string(),
                message: "msg".to_string(),
            }]
        );
    }

    #[test]
    fn parse_fixture_several_annotations_per_line() {
        let raw = b"/[a][b]/\n ^^^ A/B: m1\n    ^^^ A/B: m2\nz\n";
        let (clean, expected) = parse_fixture(raw);
        assert_eq!(clean, b"/[a][b]/\nz\n");
        assert_eq!(expected.len(), 2);
        assert!(expected.iter().all(|e| e.line == 1));
        assert_eq!(expected[1].column, 4);
    }

    #[test]
    fn parse_fixture_without_trailing_newline() {
        let (clean, expected) = parse_fixture(b"x\n^ A/B: m");
        assert_eq!(clean, b"x");
        assert_eq!(expected[0].line, 1);
    }

    #[test]
    #[should_panic(expected = "has no source line above it")]
    fn annotation_before_source_panics() {
        parse_fixture(b"^^^ A/B: m\nx = 1\n");
    }
}
