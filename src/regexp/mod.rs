//! Regexp literal analysis shared by the regexp cops: normalizing a
//! literal's body, parsing it into an expression tree, caching trees per
//! pattern, and walking them.

pub mod cache;
pub mod expression;
pub mod literal;
pub mod normalize;
pub mod parser;
pub mod traverse;

pub use cache::{MalformedPattern, ParseCache, ParseResult, get_or_parse};
pub use expression::{ExprKind, Expression};
pub use literal::{Captures, InterpolationHandling, RegexpError, RegexpLiteral};
pub use normalize::{Segment, SegmentKind, normalize};
pub use parser::{ParseError, parse};
pub use traverse::{CaptureFilter, Event, Traverse, captures, traverse};
