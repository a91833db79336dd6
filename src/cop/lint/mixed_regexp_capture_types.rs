use crate::cop::{Cop, CopConfig};
use crate::correction::Correction;
use crate::diagnostic::{Diagnostic, Severity};
use crate::parse::source::SourceFile;
use crate::regexp::{CaptureFilter, InterpolationHandling, RegexpLiteral};

/// Named and numbered captures in the same regexp: once a named group is
/// present Ruby stops numbering the plain `( )` groups.
///
/// The `Interpolation` option (`ignore`, the default, or `blank`) decides
/// whether literals with interpolation are checked.
pub struct MixedRegexpCaptureTypes;

const MSG: &str = "Do not mix named captures and numbered captures in a Regexp literal.";

impl Cop for MixedRegexpCaptureTypes {
    fn name(&self) -> &'static str {
        "Lint/MixedRegexpCaptureTypes"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_node(
        &self,
        source: &SourceFile,
        node: &ruby_prism::Node<'_>,
        _parse_result: &ruby_prism::ParseResult<'_>,
        config: &CopConfig,
        diagnostics: &mut Vec<Diagnostic>,
        _corrections: Option<&mut Vec<Correction>>,
    ) {
        let Some(literal) = RegexpLiteral::from_node(node, source.as_bytes()) else {
            return;
        };
        // Invalid values are rejected when the config is loaded.
        let interpolation: InterpolationHandling = config
            .option_str("Interpolation")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let captures = literal.captures_with(interpolation, CaptureFilter::Any);
        let (named, numbered): (Vec<_>, Vec<_>) =
            captures.iter().partition(|capture| capture.name.is_some());
        if named.is_empty() || numbered.is_empty() {
            return;
        }

        let (line, column) = source.offset_to_line_col(literal.opening_start);
        diagnostics.push(self.diagnostic(source, line, column, MSG.to_string()));
    }
}
