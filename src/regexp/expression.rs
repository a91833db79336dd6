/// The structural type of a parsed regexp expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// The whole pattern. Always the tree root.
    Root,
    /// A single literal character, e.g. `a` or `é`.
    Literal,
    /// An escape sequence that denotes one character: `\n`, `\x41`, `\.`, `\]`.
    Escape,
    /// A shorthand character type: `\d`, `\w`, `\s`, `\h`, `\R`, `\X`.
    CharType,
    /// A Unicode property: `\p{Alpha}`, `\P{Digit}`, `\p{^Greek}`.
    Property,
    /// The `.` wildcard.
    Dot,
    /// `^`, `$`, `\A`, `\z`, `\Z`, `\G`, `\b`, `\B`.
    Anchor,
    /// `\1`, `\k<name>`, `\k'name'`.
    Backref,
    /// Subexpression call: `\g<name>`, `\g'1'`.
    Call,
    /// `\K`
    Keep,
    /// Non-capturing, atomic or absence group: `(?:..)`, `(?>..)`, `(?~..)`.
    Group,
    /// Capturing group, optionally named.
    Capture,
    /// Look-ahead and look-behind: `(?=..)`, `(?!..)`, `(?<=..)`, `(?<!..)`.
    Assertion,
    /// Option switch, `(?i)` or `(?mi-x:..)`.
    Options,
    /// `(?#...)`
    Comment,
    /// `a|b|c`; children are `Alternative` branches.
    Alternation,
    /// One branch of an alternation or one operand of an intersection.
    Alternative,
    /// A repeated expression; its single child is the repeated target.
    Quantifier,
    /// Bracketed character class `[...]`.
    Set,
    /// `a-z` inside a set; children are the two endpoints.
    Range,
    /// `a&&b` inside a set; children are `Alternative` operands.
    Intersection,
    /// `[:alpha:]` inside a set.
    PosixClass,
}

/// A node in a parsed regexp tree.
///
/// `ts`/`te` are byte offsets (half-open) into the pattern the tree was
/// parsed from, and `text` is exactly `pattern[ts..te]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub kind: ExprKind,
    /// Only meaningful for `Set` and `PosixClass`.
    pub negated: bool,
    pub ts: usize,
    pub te: usize,
    pub text: String,
    /// Group name for named captures.
    pub name: Option<String>,
    pub children: Vec<Expression>,
}

impl Expression {
    pub fn new(kind: ExprKind, pattern: &str, ts: usize, te: usize) -> Self {
        Self {
            kind,
            negated: false,
            ts,
            te,
            text: pattern[ts..te].to_string(),
            name: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Expression>) -> Self {
        self.children = children;
        self
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn named(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn is_capture(&self) -> bool {
        self.kind == ExprKind::Capture
    }
}
