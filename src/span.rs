use std::ops::Range;

use miette::SourceSpan;

/// Holds a view into a source line, or into a whole source once shifted with [`Span::offset`].
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Debug)]
pub struct Span {
    start: usize,
    len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Span { start, len }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Shift a line-relative span to an absolute position.
    pub fn offset(self, base: usize) -> Self {
        Span {
            start: self.start + base,
            len: self.len,
        }
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.start.into(), value.len)
    }
}
