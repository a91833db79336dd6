use thiserror::Error;

use super::expression::{ExprKind, Expression};

/// Why a pattern could not be parsed into a tree.
///
/// Offsets are byte offsets into the pattern. These are expected failures:
/// the pattern is either invalid or uses syntax outside this grammar (for
/// example conditional groups), and callers treat both the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unmatched close parenthesis at offset {0}")]
    UnmatchedParen(usize),
    #[error("end pattern with unmatched parenthesis (group opened at offset {0})")]
    UnclosedGroup(usize),
    #[error("premature end of char-class (class opened at offset {0})")]
    UnclosedSet(usize),
    #[error("too short escape sequence at offset {0}")]
    TrailingBackslash(usize),
    #[error("target of repeat operator is not specified at offset {0}")]
    NothingToRepeat(usize),
    #[error("undefined group option at offset {0}")]
    UnknownGroup(usize),
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("invalid character class range at offset {0}")]
    InvalidRange(usize),
    #[error("invalid group name at offset {0}")]
    InvalidGroupName(usize),
    #[error("nesting deeper than {MAX_DEPTH} levels at offset {0}")]
    TooDeep(usize),
}

/// Limit on nested groups, sets and stacked quantifiers. Deeper patterns
/// are rejected instead of risking the worker thread's stack.
pub const MAX_DEPTH: usize = 256;

/// Parse a Ruby (Onigmo) regexp pattern into an expression tree.
///
/// The pattern is taken as-is: no option flags are applied, so in
/// free-spacing patterns whitespace shows up as literals. Callers blank
/// comments beforehand.
pub fn parse(pattern: &str) -> Result<Expression, ParseError> {
    let mut parser = Parser {
        pattern,
        pos: 0,
        depth: 0,
    };
    let children = parser.parse_alternation()?;
    if parser.peek().is_some() {
        // parse_alternation only stops early on `)`
        return Err(ParseError::UnmatchedParen(parser.pos));
    }
    Ok(Expression::new(ExprKind::Root, pattern, 0, pattern.len()).with_children(children))
}

struct Parser<'p> {
    pattern: &'p str,
    /// Byte offset of the next unread character.
    pos: usize,
    /// Groups and sets currently open.
    depth: usize,
}

impl<'p> Parser<'p> {
    fn rest(&self) -> &'p str {
        &self.pattern[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(&pred) {
            self.bump();
            count += 1;
        }
        count
    }

    fn skip_up_to(&mut self, max: usize, pred: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while count < max && self.peek().is_some_and(&pred) {
            self.bump();
            count += 1;
        }
        count
    }

    /// Build an expression spanning `ts` to the current position.
    fn expr(&self, kind: ExprKind, ts: usize) -> Expression {
        Expression::new(kind, self.pattern, ts, self.pos)
    }

    fn parse_alternation(&mut self) -> Result<Vec<Expression>, ParseError> {
        let start = self.pos;
        let first = self.parse_sequence()?;
        if self.peek() != Some('|') {
            return Ok(first);
        }

        let mut branches = vec![self.expr(ExprKind::Alternative, start).with_children(first)];
        while self.eat('|') {
            let branch_start = self.pos;
            let sequence = self.parse_sequence()?;
            branches.push(self.expr(ExprKind::Alternative, branch_start).with_children(sequence));
        }
        Ok(vec![self.expr(ExprKind::Alternation, start).with_children(branches)])
    }

    fn parse_sequence(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut sequence = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let mut atom = self.parse_atom()?;
            // Onigmo accepts stacked quantifiers such as `a**`.
            let mut stacked = 0;
            while self.eat_quantifier() {
                let ts = atom.ts;
                stacked += 1;
                if self.depth + stacked > MAX_DEPTH {
                    return Err(ParseError::TooDeep(ts));
                }
                atom = self.expr(ExprKind::Quantifier, ts).with_children(vec![atom]);
            }
            sequence.push(atom);
        }
        Ok(sequence)
    }

    fn parse_atom(&mut self) -> Result<Expression, ParseError> {
        let ts = self.pos;
        match self.peek() {
            Some('(') => self.nested(Self::parse_group),
            Some('[') => self.nested(Self::parse_set),
            Some('\\') => self.parse_escape(false),
            Some('.') => {
                self.bump();
                Ok(self.expr(ExprKind::Dot, ts))
            }
            Some('^' | '$') => {
                self.bump();
                Ok(self.expr(ExprKind::Anchor, ts))
            }
            Some('*' | '+' | '?') => Err(ParseError::NothingToRepeat(ts)),
            Some('{') if self.interval_end().is_some() => Err(ParseError::NothingToRepeat(ts)),
            Some(_) => {
                self.bump();
                Ok(self.expr(ExprKind::Literal, ts))
            }
            None => Err(ParseError::UnclosedGroup(ts)),
        }
    }

    /// Consume one quantifier (with its lazy/possessive suffix) if present.
    fn eat_quantifier(&mut self) -> bool {
        match self.peek() {
            Some('*' | '+' | '?') => {
                self.bump();
                if matches!(self.peek(), Some('?' | '+')) {
                    self.bump();
                }
                true
            }
            Some('{') => match self.interval_end() {
                Some(end) => {
                    self.pos = end;
                    self.eat('?');
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// If the input starts with a valid `{n}`, `{n,}`, `{,m}` or `{n,m}`
    /// interval, return the offset just past its `}`. Anything else is a
    /// literal brace.
    fn interval_end(&self) -> Option<usize> {
        let bytes = self.rest().as_bytes();
        let digits_from = |i: usize| bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();

        let mut i = 1;
        let min_digits = digits_from(i);
        i += min_digits;
        let mut max_digits = 0;
        if bytes.get(i) == Some(&b',') {
            i += 1;
            max_digits = digits_from(i);
            i += max_digits;
        }
        if bytes.get(i) != Some(&b'}') || (min_digits == 0 && max_digits == 0) {
            return None;
        }
        Some(self.pos + i + 1)
    }

    /// Run `parse` one nesting level deeper.
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expression, ParseError>,
    ) -> Result<Expression, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep(self.pos));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_group(&mut self) -> Result<Expression, ParseError> {
        let ts = self.pos;
        self.bump();

        let (kind, name) = if self.eat('?') {
            let Some(c) = self.bump() else {
                return Err(ParseError::UnclosedGroup(ts));
            };
            match c {
                ':' | '>' | '~' => (ExprKind::Group, None),
                '=' | '!' => (ExprKind::Assertion, None),
                '<' if matches!(self.peek(), Some('=' | '!')) => {
                    self.bump();
                    (ExprKind::Assertion, None)
                }
                '<' => (ExprKind::Capture, Some(self.group_name('>')?)),
                '\'' => (ExprKind::Capture, Some(self.group_name('\'')?)),
                '#' => return self.parse_comment(ts),
                c if is_option_flag(c) || c == '-' => {
                    self.skip_while(|c| is_option_flag(c) || c == '-');
                    if self.eat(')') {
                        return Ok(self.expr(ExprKind::Options, ts));
                    }
                    if !self.eat(':') {
                        return Err(ParseError::UnknownGroup(ts));
                    }
                    (ExprKind::Options, None)
                }
                _ => return Err(ParseError::UnknownGroup(ts)),
            }
        } else {
            (ExprKind::Capture, None)
        };

        let children = self.parse_alternation()?;
        if !self.eat(')') {
            return Err(ParseError::UnclosedGroup(ts));
        }
        Ok(self.expr(kind, ts).with_children(children).named(name))
    }

    fn group_name(&mut self, close: char) -> Result<String, ParseError> {
        let start = self.pos;
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(ParseError::InvalidGroupName(start));
        }
        self.skip_while(|c| c.is_alphanumeric() || c == '_');
        let name = &self.pattern[start..self.pos];
        if name.is_empty() || !self.eat(close) {
            return Err(ParseError::InvalidGroupName(start));
        }
        Ok(name.to_string())
    }

    fn parse_comment(&mut self, ts: usize) -> Result<Expression, ParseError> {
        loop {
            match self.bump() {
                Some(')') => return Ok(self.expr(ExprKind::Comment, ts)),
                Some('\\') => {
                    self.bump();
                }
                Some(_) => {}
                None => return Err(ParseError::UnclosedGroup(ts)),
            }
        }
    }

    fn parse_escape(&mut self, in_set: bool) -> Result<Expression, ParseError> {
        let ts = self.pos;
        self.bump();
        let Some(c) = self.bump() else {
            return Err(ParseError::TrailingBackslash(ts));
        };

        let kind = match c {
            // Inside a class `\b` is backspace, outside it is a word boundary.
            'b' if in_set => ExprKind::Escape,
            'A' | 'z' | 'Z' | 'G' | 'b' | 'B' if !in_set => ExprKind::Anchor,
            'd' | 'D' | 'w' | 'W' | 's' | 'S' | 'h' | 'H' => ExprKind::CharType,
            'R' | 'X' if !in_set => ExprKind::CharType,
            'p' | 'P' => {
                self.braced(ts)?;
                ExprKind::Property
            }
            'k' if !in_set => {
                self.reference_name(ts)?;
                ExprKind::Backref
            }
            'g' if !in_set => {
                self.reference_name(ts)?;
                ExprKind::Call
            }
            'K' if !in_set => ExprKind::Keep,
            '1'..='9' if !in_set => {
                self.skip_while(|c| c.is_ascii_digit());
                ExprKind::Backref
            }
            '0'..='7' => {
                self.skip_up_to(2, |c| ('0'..='7').contains(&c));
                ExprKind::Escape
            }
            'x' => {
                if self.skip_up_to(2, |c| c.is_ascii_hexdigit()) == 0 {
                    return Err(ParseError::InvalidEscape(ts));
                }
                ExprKind::Escape
            }
            'u' => {
                self.unicode_escape(ts)?;
                ExprKind::Escape
            }
            'c' => {
                self.control_target(ts)?;
                ExprKind::Escape
            }
            'C' | 'M' => {
                if !self.eat('-') {
                    return Err(ParseError::InvalidEscape(ts));
                }
                self.control_target(ts)?;
                ExprKind::Escape
            }
            _ => ExprKind::Escape,
        };
        Ok(self.expr(kind, ts))
    }

    /// `{...}` after `\p`/`\P`.
    fn braced(&mut self, ts: usize) -> Result<(), ParseError> {
        if !self.eat('{') || self.skip_while(|c| c != '}') == 0 || !self.eat('}') {
            return Err(ParseError::InvalidEscape(ts));
        }
        Ok(())
    }

    /// `<name>` or `'name'` after `\k`/`\g`. Relative refs like `<-1>` are allowed.
    fn reference_name(&mut self, ts: usize) -> Result<(), ParseError> {
        let close = match self.bump() {
            Some('<') => '>',
            Some('\'') => '\'',
            _ => return Err(ParseError::InvalidEscape(ts)),
        };
        let len = self.skip_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '+'));
        if len == 0 || !self.eat(close) {
            return Err(ParseError::InvalidEscape(ts));
        }
        Ok(())
    }

    /// `\uHHHH` or `\u{H...}` (several space-separated code points allowed).
    fn unicode_escape(&mut self, ts: usize) -> Result<(), ParseError> {
        if self.eat('{') {
            let mut hex = 0;
            while let Some(c) = self.peek() {
                match c {
                    '}' => break,
                    ' ' => {}
                    c if c.is_ascii_hexdigit() => hex += 1,
                    _ => return Err(ParseError::InvalidEscape(ts)),
                }
                self.bump();
            }
            if hex == 0 || !self.eat('}') {
                return Err(ParseError::InvalidEscape(ts));
            }
            return Ok(());
        }
        if self.skip_up_to(4, |c| c.is_ascii_hexdigit()) != 4 {
            return Err(ParseError::InvalidEscape(ts));
        }
        Ok(())
    }

    /// The character after `\c`, `\C-` or `\M-`, which may itself be an escape
    /// (`\M-\C-x`).
    fn control_target(&mut self, ts: usize) -> Result<(), ParseError> {
        match self.bump() {
            None => Err(ParseError::InvalidEscape(ts)),
            Some('\\') => match self.bump() {
                None => Err(ParseError::TrailingBackslash(ts)),
                Some('c') => self.control_target(ts),
                Some('C' | 'M') => {
                    if !self.eat('-') {
                        return Err(ParseError::InvalidEscape(ts));
                    }
                    self.control_target(ts)
                }
                Some(_) => Ok(()),
            },
            Some(_) => Ok(()),
        }
    }

    fn parse_set(&mut self) -> Result<Expression, ParseError> {
        let ts = self.pos;
        self.bump();
        let negated = self.eat('^');

        let mut members = Vec::new();
        let mut operands = Vec::new();
        let mut operand_start = self.pos;
        // A `]` right after `[` or `[^` is a literal.
        let mut first = true;
        loop {
            let Some(c) = self.peek() else {
                return Err(ParseError::UnclosedSet(ts));
            };
            if c == ']' && !first {
                break;
            }
            first = false;
            if self.rest().starts_with("&&") {
                let operand = Expression::new(ExprKind::Alternative, self.pattern, operand_start, self.pos)
                    .with_children(std::mem::take(&mut members));
                operands.push(operand);
                self.pos += 2;
                operand_start = self.pos;
                continue;
            }
            members.push(self.parse_set_member()?);
        }

        let children = if operands.is_empty() {
            members
        } else {
            operands.push(self.expr(ExprKind::Alternative, operand_start).with_children(members));
            let intersection_start = operands[0].ts;
            vec![self.expr(ExprKind::Intersection, intersection_start).with_children(operands)]
        };
        self.bump();
        Ok(self.expr(ExprKind::Set, ts).with_children(children).negated(negated))
    }

    fn parse_set_member(&mut self) -> Result<Expression, ParseError> {
        let ts = self.pos;
        let low = match self.peek() {
            Some('[') => {
                if let Some(posix) = self.parse_posix_class() {
                    return Ok(posix);
                }
                return self.nested(Self::parse_set);
            }
            Some('\\') => self.parse_escape(true)?,
            Some(_) => {
                self.bump();
                self.expr(ExprKind::Literal, ts)
            }
            None => return Err(ParseError::UnclosedSet(ts)),
        };

        if !matches!(low.kind, ExprKind::Literal | ExprKind::Escape) {
            return Ok(low);
        }
        // A `-` right before the closing bracket is a literal.
        if self.peek() != Some('-') || matches!(self.peek_nth(1), Some(']') | None) {
            return Ok(low);
        }
        self.bump();

        let high_start = self.pos;
        let high = match self.peek() {
            Some('\\') => self.parse_escape(true)?,
            Some('[') => return Err(ParseError::InvalidRange(ts)),
            Some(_) => {
                self.bump();
                self.expr(ExprKind::Literal, high_start)
            }
            None => return Err(ParseError::UnclosedSet(ts)),
        };
        if !matches!(high.kind, ExprKind::Literal | ExprKind::Escape) {
            return Err(ParseError::InvalidRange(ts));
        }
        Ok(self.expr(ExprKind::Range, ts).with_children(vec![low, high]))
    }

    /// `[:name:]` or `[:^name:]`. Leaves the position untouched when the
    /// input is an ordinary nested set.
    fn parse_posix_class(&mut self) -> Option<Expression> {
        let rest = self.rest();
        let body = rest.strip_prefix("[:")?;
        let (negated, body) = match body.strip_prefix('^') {
            Some(b) => (true, b),
            None => (false, body),
        };
        let name_len = body.bytes().take_while(u8::is_ascii_alphabetic).count();
        if name_len == 0 || !body[name_len..].starts_with(":]") {
            return None;
        }
        let ts = self.pos;
        self.pos += rest.len() - body.len() + name_len + 2;
        Some(self.expr(ExprKind::PosixClass, ts).negated(negated))
    }
}

fn is_option_flag(c: char) -> bool {
    matches!(c, 'i' | 'm' | 'x' | 'a' | 'd' | 'u')
}
