use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use super::cache::{self, ParseCache, ParseResult};
use super::expression::Expression;
use super::normalize::{Segment, SegmentKind, normalize};
use super::traverse::{CaptureFilter, captures};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexpError {
    #[error("interpolation must be one of `ignore` or `blank`, got `{0}`")]
    InvalidInterpolation(String),
}

/// What to do with a literal that contains interpolation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpolationHandling {
    /// Skip the literal entirely.
    #[default]
    Ignore,
    /// Analyze it with the interpolated regions blanked out.
    Blank,
}

impl FromStr for InterpolationHandling {
    type Err = RegexpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "blank" => Ok(Self::Blank),
            other => Err(RegexpError::InvalidInterpolation(other.to_string())),
        }
    }
}

/// A regexp literal (`/.../` or `%r{...}`) as seen by the regexp cops.
///
/// Built from a prism `RegularExpressionNode` or
/// `InterpolatedRegularExpressionNode`. The segments cover exactly the
/// bytes between the opening and closing delimiters, so offset `i` in the
/// normalized pattern is source byte `opening_end + i`.
#[derive(Debug, Clone)]
pub struct RegexpLiteral<'a> {
    pub opening_start: usize,
    pub opening_end: usize,
    segments: Vec<Segment<'a>>,
    extended: bool,
}

impl<'a> RegexpLiteral<'a> {
    /// Returns `None` for any other node, or when the literal body is not
    /// valid UTF-8. Bare regexps in conditions (`if /re/`) count as literals.
    pub fn from_node(node: &ruby_prism::Node<'_>, source: &'a [u8]) -> Option<Self> {
        if let Some(re) = node.as_regular_expression_node() {
            return Self::plain(source, re.opening_loc(), re.content_loc(), re.is_extended());
        }
        if let Some(re) = node.as_match_last_line_node() {
            return Self::plain(source, re.opening_loc(), re.content_loc(), re.is_extended());
        }
        if let Some(re) = node.as_interpolated_regular_expression_node() {
            return Self::interpolated(
                source,
                re.opening_loc(),
                re.closing_loc(),
                re.parts().iter(),
                re.is_extended(),
            );
        }
        if let Some(re) = node.as_interpolated_match_last_line_node() {
            return Self::interpolated(
                source,
                re.opening_loc(),
                re.closing_loc(),
                re.parts().iter(),
                re.is_extended(),
            );
        }
        None
    }

    fn plain(
        source: &'a [u8],
        opening: ruby_prism::Location<'_>,
        content: ruby_prism::Location<'_>,
        extended: bool,
    ) -> Option<Self> {
        let start = content.start_offset();
        let text = utf8_slice(source, start, content.end_offset())?;
        Some(Self {
            opening_start: opening.start_offset(),
            opening_end: opening.end_offset(),
            segments: vec![Segment::literal(text, start)],
            extended,
        })
    }

    /// String parts are pattern text; everything else (`#{}`, `#@ivar`,
    /// `#$gvar`) is interpolation.
    fn interpolated<'pr>(
        source: &'a [u8],
        opening: ruby_prism::Location<'pr>,
        closing: ruby_prism::Location<'pr>,
        parts: impl Iterator<Item = ruby_prism::Node<'pr>>,
        extended: bool,
    ) -> Option<Self> {
        let body_end = closing.start_offset();
        let mut cursor = opening.end_offset();
        let mut segments = Vec::new();
        for part in parts {
            let loc = part.location();
            if loc.start_offset() > cursor {
                segments.push(Segment::literal(
                    utf8_slice(source, cursor, loc.start_offset())?,
                    cursor,
                ));
            }
            let text = utf8_slice(source, loc.start_offset(), loc.end_offset())?;
            segments.push(if part.as_string_node().is_some() {
                Segment::literal(text, loc.start_offset())
            } else {
                Segment::interpolation(text, loc.start_offset())
            });
            cursor = loc.end_offset();
        }
        if cursor < body_end {
            segments.push(Segment::literal(utf8_slice(source, cursor, body_end)?, cursor));
        }

        Some(Self {
            opening_start: opening.start_offset(),
            opening_end: opening.end_offset(),
            segments,
            extended,
        })
    }

    /// Free-spacing (`x` flag) mode.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn has_interpolation(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.kind == SegmentKind::Interpolation)
    }

    pub fn normalized_pattern(&self) -> String {
        normalize(&self.segments, self.extended)
    }

    /// The parsed tree of the normalized pattern, from the process-wide cache.
    ///
    /// `None` means the literal was skipped under `Ignore`; `Some(Err(_))`
    /// means the pattern could not be parsed.
    pub fn parsed_tree(&self, interpolation: InterpolationHandling) -> Option<ParseResult> {
        self.parsed_tree_in(cache::global(), interpolation)
    }

    pub fn parsed_tree_in(
        &self,
        cache: &ParseCache,
        interpolation: InterpolationHandling,
    ) -> Option<ParseResult> {
        if interpolation == InterpolationHandling::Ignore && self.has_interpolation() {
            return None;
        }
        Some(cache.get_or_parse(&self.normalized_pattern()))
    }

    /// Capturing groups matching `filter`. Literals with interpolation and
    /// unparsable patterns have none.
    pub fn each_capture<'n>(&self, filter: CaptureFilter<'n>) -> Captures<'n> {
        self.captures_with(InterpolationHandling::Ignore, filter)
    }

    pub fn captures_with<'n>(
        &self,
        interpolation: InterpolationHandling,
        filter: CaptureFilter<'n>,
    ) -> Captures<'n> {
        Captures {
            tree: self.parsed_tree(interpolation).and_then(Result::ok),
            filter,
        }
    }
}

fn utf8_slice(source: &[u8], start: usize, end: usize) -> Option<&str> {
    std::str::from_utf8(source.get(start..end)?).ok()
}

/// The capturing groups of one literal. `iter()` can be called any number
/// of times; each call starts from the beginning.
#[derive(Debug, Clone)]
pub struct Captures<'n> {
    tree: Option<Arc<Expression>>,
    filter: CaptureFilter<'n>,
}

impl Captures<'_> {
    pub fn iter(&self) -> impl Iterator<Item = &Expression> {
        self.tree
            .iter()
            .flat_map(move |tree| captures(tree, self.filter))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;
    use ruby_prism::Visit;

    struct FirstRegexp<'a> {
        source: &'a [u8],
        found: Option<RegexpLiteral<'a>>,
    }

    impl<'pr> Visit<'pr> for FirstRegexp<'_> {
        fn visit_branch_node_enter(&mut self, node: ruby_prism::Node<'pr>) {
            if self.found.is_none() {
                self.found = RegexpLiteral::from_node(&node, self.source);
            }
        }

        fn visit_leaf_node_enter(&mut self, node: ruby_prism::Node<'pr>) {
            if self.found.is_none() {
                self.found = RegexpLiteral::from_node(&node, self.source);
            }
        }
    }

    fn first_literal(source: &[u8]) -> RegexpLiteral<'_> {
        let result = parse_source(source);
        let mut finder = FirstRegexp {
            source,
            found: None,
        };
        finder.visit(&result.node());
        finder.found.expect("no regexp literal in source")
    }

    #[test]
    fn plain_literal() {
        let src = b"x = /a[b]c/i\n";
        let lit = first_literal(src);
        assert_eq!(lit.opening_start, 4);
        assert_eq!(lit.opening_end, 5);
        assert_eq!(lit.normalized_pattern(), "a[b]c");
        assert!(!lit.has_interpolation());
        assert!(!lit.is_extended());
    }

    #[test]
    fn percent_r_literal() {
        let src = b"%r{[a]}\n";
        let lit = first_literal(src);
        assert_eq!((lit.opening_start, lit.opening_end), (0, 3));
        assert_eq!(lit.normalized_pattern(), "[a]");
        assert_eq!(lit.segments[0].start, 3);
    }

    #[test]
    fn interpolated_literal_offsets_line_up() {
        let src = b"/[a]#{b}[c]/\n";
        let lit = first_literal(src);
        assert!(lit.has_interpolation());
        let pattern = lit.normalized_pattern();
        assert_eq!(pattern, "[a]    [c]");
        let body = &src[lit.opening_end..lit.opening_end + pattern.len()];
        assert_eq!(body, b"[a]#{b}[c]");
    }

    #[test]
    fn extended_literal_blanks_comments() {
        let src = b"/a # [b]\n[c]/x\n";
        let lit = first_literal(src);
        assert!(lit.is_extended());
        assert_eq!(lit.normalized_pattern(), "a      \n[c]");
    }

    #[test]
    fn ignore_policy_skips_interpolation() {
        let src = b"/(a)#{b}/\n";
        let lit = first_literal(src);
        assert!(lit.parsed_tree(InterpolationHandling::Ignore).is_none());
        let tree = lit
            .parsed_tree(InterpolationHandling::Blank)
            .unwrap()
            .unwrap();
        assert_eq!(tree.text, "(a)    ");
    }

    #[test]
    fn parsed_tree_is_shared_through_cache() {
        let cache = ParseCache::new();
        let lit = first_literal(b"/[x]y/\n");
        let a = lit
            .parsed_tree_in(&cache, InterpolationHandling::Ignore)
            .unwrap()
            .unwrap();
        let b = lit
            .parsed_tree_in(&cache, InterpolationHandling::Blank)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn each_capture_filters() {
        let lit = first_literal(b"/(?<y>\\d+)-(?<m>\\d+)(x)/\n");
        let all = lit.each_capture(CaptureFilter::Any);
        assert_eq!(all.iter().count(), 3);
        // restartable
        assert_eq!(all.iter().count(), 3);
        let named: Vec<&str> = lit
            .each_capture(CaptureFilter::Named("m"))
            .iter()
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(named, vec![r"(?<m>\d+)"]);
    }

    #[test]
    fn each_capture_empty_for_interpolation_and_malformed() {
        assert!(first_literal(b"/(a)#{b}/\n").each_capture(CaptureFilter::Any).is_empty());
        assert!(
            first_literal(b"/(a)(?(1)b|c)/\n")
                .each_capture(CaptureFilter::Any)
                .is_empty()
        );
    }

    #[test]
    fn captures_with_blank_policy_sees_through_interpolation() {
        let lit = first_literal(b"/(?<a>x)#{b}(y)/\n");
        assert!(lit.each_capture(CaptureFilter::Any).is_empty());
        let blank = lit.captures_with(InterpolationHandling::Blank, CaptureFilter::Any);
        let found: Vec<&str> = blank.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(found, vec!["(?<a>x)", "(y)"]);
    }

    #[test]
    fn interpolation_handling_from_str() {
        assert_eq!("ignore".parse(), Ok(InterpolationHandling::Ignore));
        assert_eq!("blank".parse(), Ok(InterpolationHandling::Blank));
        let err = "skip".parse::<InterpolationHandling>().unwrap_err();
        assert_eq!(err, RegexpError::InvalidInterpolation("skip".to_string()));
        assert_eq!(
            err.to_string(),
            "interpolation must be one of `ignore` or `blank`, got `skip`"
        );
        assert_eq!(InterpolationHandling::default(), InterpolationHandling::Ignore);
    }

    #[test]
    fn bare_regexp_in_condition() {
        let lit = first_literal(b"puts 1 if /[a]b/\n");
        assert_eq!(lit.normalized_pattern(), "[a]b");
        assert_eq!(lit.opening_start, 10);
    }

    #[test]
    fn non_regexp_node_is_none() {
        let src = b"'[a]'\n";
        let result = parse_source(src);
        let mut finder = FirstRegexp {
            source: src,
            found: None,
        };
        finder.visit(&result.node());
        assert!(finder.found.is_none());
    }
}
