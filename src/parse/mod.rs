pub mod source;

/// Parse Ruby source bytes using Prism.
///
/// `ParseResult` is `!Send`, so call this on the thread that uses it.
pub fn parse_source(source: &[u8]) -> ruby_prism::ParseResult<'_> {
    ruby_prism::parse(source)
}
