// Field scanner over a single source line. Adapted from the `rustc_lexer` cursor design.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use crate::token::Token;

/// Walks a line, handing out whitespace-separated fields with their positions.
pub struct Cursor<'a> {
    /// Index that the cursor is pointing to in the line
    curr_pt: usize,
    line: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(line: &'a str) -> Cursor<'a> {
        Cursor { curr_pt: 0, line }
    }

    /// Return slice of input starting at the current point of the cursor
    pub fn at_curr_pt(&self) -> &'a str {
        &self.line[self.curr_pt..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.at_curr_pt();
        self.curr_pt += rest.len() - rest.trim_start().len();
    }

    /// Next whitespace-separated field
    pub fn advance_field(&mut self) -> Option<Token<'a>> {
        self.skip_whitespace();
        let rest = self.at_curr_pt();
        if rest.is_empty() {
            return None;
        }
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let tok = Token::new(&rest[..len], self.curr_pt);
        self.curr_pt += len;
        Some(tok)
    }

    /// Everything left on the line as one field, surrounding whitespace removed
    pub fn advance_rest(&mut self) -> Option<Token<'a>> {
        self.skip_whitespace();
        let rest = self.at_curr_pt().trim_end();
        if rest.is_empty() {
            return None;
        }
        let tok = Token::new(rest, self.curr_pt);
        self.curr_pt = self.line.len();
        Some(tok)
    }
}
