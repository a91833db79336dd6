use std::sync::LazyLock;

/// Unescaped `#` through end of line: a comment in free-spacing mode.
/// Needs look-behind, hence fancy_regex.
static FREE_SPACING_COMMENT: LazyLock<fancy_regex::Regex> =
    LazyLock::new(|| fancy_regex::Regex::new(r"(?<!\\)#.*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Pattern text written directly in the literal.
    Literal,
    /// `#{...}`, `#@ivar` or `#$gvar`.
    Interpolation,
}

/// One contiguous piece of a regexp literal's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
    /// Absolute byte offset of `text` in the source file.
    pub start: usize,
}

impl<'a> Segment<'a> {
    pub fn literal(text: &'a str, start: usize) -> Self {
        Self {
            kind: SegmentKind::Literal,
            text,
            start,
        }
    }

    pub fn interpolation(text: &'a str, start: usize) -> Self {
        Self {
            kind: SegmentKind::Interpolation,
            text,
            start,
        }
    }
}

/// Join segments into the pattern handed to the parser.
///
/// Interpolations, and in free-spacing mode `#` comments, are replaced with
/// spaces of the same byte width so that every offset in the result lines
/// up with the original source.
pub fn normalize(segments: &[Segment<'_>], free_spacing: bool) -> String {
    let mut pattern = String::with_capacity(segments.iter().map(|s| s.text.len()).sum());
    for segment in segments {
        match segment.kind {
            SegmentKind::Interpolation => push_blank(&mut pattern, segment.text.len()),
            SegmentKind::Literal if free_spacing => blank_comments(&mut pattern, segment.text),
            SegmentKind::Literal => pattern.push_str(segment.text),
        }
    }
    pattern
}

fn blank_comments(out: &mut String, text: &str) {
    let mut cursor = 0;
    for found in FREE_SPACING_COMMENT.find_iter(text) {
        // Backtracking limit exceeded: keep the rest verbatim.
        let Ok(m) = found else { break };
        out.push_str(&text[cursor..m.start()]);
        push_blank(out, m.end() - m.start());
        cursor = m.end();
    }
    out.push_str(&text[cursor..]);
}

fn push_blank(out: &mut String, width: usize) {
    out.extend(std::iter::repeat_n(' ', width));
}
