use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::cop::{Cop, CopConfig};
use crate::correction::Correction;
use crate::diagnostic::Diagnostic;
use crate::parse::source::SourceFile;
use crate::regexp::{Event, ExprKind, Expression, InterpolationHandling, RegexpLiteral, traverse};

/// Flags character classes holding exactly one element, e.g. `/[x]/` or
/// `/[\s]/`, which can be written without the brackets.
///
/// A class is kept when unwrapping would change the meaning: negated
/// classes, `[\b]` (backspace inside a class, word boundary outside),
/// metacharacters that would need escaping once outside the class, and
/// whitespace in free-spacing mode, where bare whitespace is ignored.
pub struct RedundantRegexpCharacterClass;

/// Characters that are literal inside `[...]` but special outside it.
const REQUIRES_ESCAPE_OUTSIDE_CHAR_CLASS: &[&str] =
    &[".", "*", "+", "?", "{", "}", "(", ")", "|", "$"];

/// ASCII whitespace, as Ruby's `\s`.
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?-u:\s)").unwrap());

/// A single-element class whose brackets can be dropped.
#[derive(Debug, Clone, Copy)]
pub struct RedundantClass<'t> {
    pub set: &'t Expression,
    pub element: &'t Expression,
}

impl Cop for RedundantRegexpCharacterClass {
    fn name(&self) -> &'static str {
        "Style/RedundantRegexpCharacterClass"
    }

    fn supports_autocorrect(&self) -> bool {
        true
    }

    fn check_node(
        &self,
        source: &SourceFile,
        node: &ruby_prism::Node<'_>,
        _parse_result: &ruby_prism::ParseResult<'_>,
        _config: &CopConfig,
        diagnostics: &mut Vec<Diagnostic>,
        mut corrections: Option<&mut Vec<Correction>>,
    ) {
        let Some(literal) = RegexpLiteral::from_node(node, source.as_bytes()) else {
            return;
        };
        let tree = match literal.parsed_tree(InterpolationHandling::Blank) {
            Some(Ok(tree)) => tree,
            Some(Err(malformed)) => {
                debug!(
                    path = %source.path.display(),
                    offset = literal.opening_start,
                    reason = %malformed.reason,
                    "skipping unparsable regexp"
                );
                return;
            }
            None => return,
        };

        for found in find_redundant_classes(&tree, literal.is_extended()) {
            let range = to_source_range(&literal, found.set);
            let Some(class_source) = source
                .as_bytes()
                .get(range.clone())
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
            else {
                continue;
            };
            let element = without_character_class(class_source);

            let (line, column) = source.offset_to_line_col(range.start);
            let mut diag = self.diagnostic(
                source,
                line,
                column,
                format!(
                    "Redundant single-element character class, `{class_source}` can be replaced with `{element}`."
                ),
            );
            if let Some(ref mut corr) = corrections {
                corr.push(Correction {
                    start: range.start,
                    end: range.end,
                    replacement: element.to_string(),
                    cop_name: self.name(),
                    cop_index: 0,
                });
                diag.corrected = true;
            }
            diagnostics.push(diag);
        }
    }
}

/// Single-element classes in `tree` that are safe to unwrap, outermost first.
pub fn find_redundant_classes(tree: &Expression, free_spacing: bool) -> Vec<RedundantClass<'_>> {
    traverse(tree)
        .filter(|(event, _, _)| *event == Event::Enter)
        .filter_map(|(_, expr, _)| single_element(expr))
        .filter(|found| is_redundant(&found.element.text, free_spacing))
        .collect()
}

fn single_element(expr: &Expression) -> Option<RedundantClass<'_>> {
    if expr.kind != ExprKind::Set || expr.negated {
        return None;
    }
    let [element] = expr.children.as_slice() else {
        return None;
    };
    // Ranges and intersections stand for more than one character.
    match element.kind {
        ExprKind::PosixClass | ExprKind::Set | ExprKind::Range | ExprKind::Intersection => None,
        _ => Some(RedundantClass { set: expr, element }),
    }
}

fn is_redundant(element: &str, free_spacing: bool) -> bool {
    let whitespace_in_free_spacing = free_spacing && WHITESPACE.is_match(element);
    let backspace = element == r"\b";
    let needs_escape = REQUIRES_ESCAPE_OUTSIDE_CHAR_CLASS.contains(&element);
    !(whitespace_in_free_spacing || backspace || needs_escape)
}

/// Absolute source bytes of `set`, brackets included. Pattern offset 0 is
/// the first byte after the opening delimiter.
pub fn to_source_range(literal: &RegexpLiteral<'_>, set: &Expression) -> Range<usize> {
    literal.opening_end + set.ts..literal.opening_end + set.te
}

fn without_character_class(class_source: &str) -> &str {
    &class_source[1..class_source.len() - 1]
}
