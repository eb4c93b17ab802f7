use crate::span::Span;

/// Represents a single whitespace-separated field of a source line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token<'a> {
    /// Text of the field, as written
    pub val: &'a str,
    /// Position inside the line
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(val: &'a str, start: usize) -> Self {
        Token {
            val,
            span: Span::new(start, val.len()),
        }
    }

    /// Uppercase copy of the field, for case-insensitive comparison.
    pub fn upper(&self) -> String {
        self.val.to_ascii_uppercase()
    }

    pub fn is(&self, word: &str) -> bool {
        self.val.eq_ignore_ascii_case(word)
    }
}
