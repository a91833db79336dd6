use super::expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Enter,
    Exit,
}

enum Frame<'t> {
    Enter(&'t Expression, usize),
    Exit(&'t Expression, usize),
}

/// Depth-first walk over a tree, yielding `(event, expression, index)` where
/// `index` is the expression's position among its parent's children (0 for
/// the root).
///
/// Every expression produces an `Enter` before any of its descendants and
/// an `Exit` after all of them, left to right.
pub struct Traverse<'t> {
    stack: Vec<Frame<'t>>,
}

impl<'t> Iterator for Traverse<'t> {
    type Item = (Event, &'t Expression, usize);

    fn next(&mut self) -> Option<Self::Item> {
        match self.stack.pop()? {
            Frame::Enter(expr, index) => {
                self.stack.push(Frame::Exit(expr, index));
                self.stack.extend(
                    expr.children
                        .iter()
                        .enumerate()
                        .rev()
                        .map(|(i, child)| Frame::Enter(child, i)),
                );
                Some((Event::Enter, expr, index))
            }
            Frame::Exit(expr, index) => Some((Event::Exit, expr, index)),
        }
    }
}

/// Start a fresh walk at `root`. Each call walks from the beginning.
pub fn traverse(root: &Expression) -> Traverse<'_> {
    Traverse {
        stack: vec![Frame::Enter(root, 0)],
    }
}

/// Which capturing groups to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFilter<'n> {
    /// Every capturing group, named or numbered.
    Any,
    /// Only named captures with exactly this name.
    Named(&'n str),
}

impl CaptureFilter<'_> {
    pub fn matches(&self, expr: &Expression) -> bool {
        if !expr.is_capture() {
            return false;
        }
        match self {
            CaptureFilter::Any => true,
            CaptureFilter::Named(name) => expr.name.as_deref() == Some(*name),
        }
    }
}

/// Capturing groups under `root` accepted by `filter`, in document order.
pub fn captures<'t>(
    root: &'t Expression,
    filter: CaptureFilter<'_>,
) -> impl Iterator<Item = &'t Expression> {
    traverse(root).filter_map(move |(event, expr, _)| {
        (event == Event::Enter && filter.matches(expr)).then_some(expr)
    })
}
