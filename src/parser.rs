use crate::{
    lexer::{classify, cursor::Cursor},
    table::{self, Descriptor},
    token::Token,
};

/// Statement form of a single source line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stmt<'a> {
    /// Blank or comment-only line
    Empty,
    /// `ORG <addr>`: move the location counter
    Org {
        keyword: Token<'a>,
        operand: Option<Token<'a>>,
    },
    /// `END` or `.END`, optionally labelled
    End { label: Option<Token<'a>> },
    /// Label alone on its line
    Label(Token<'a>),
    /// Instruction, valid or not, with an optional prefix label
    Instr {
        label: Option<Token<'a>>,
        mnemonic: Token<'a>,
        operand: Option<Token<'a>>,
    },
}

/// Parsed view of one line of source. Cheap to build and never cached between passes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SourceLine<'a> {
    /// 0-based line index
    pub idx: usize,
    pub text: &'a str,
    pub stmt: Stmt<'a>,
}

impl<'a> SourceLine<'a> {
    /// Prefix label defined by this line, if any.
    pub fn label(&self) -> Option<Token<'a>> {
        match self.stmt {
            Stmt::Label(label) => Some(label),
            Stmt::End { label } | Stmt::Instr { label, .. } => label,
            Stmt::Empty | Stmt::Org { .. } => None,
        }
    }

    /// Descriptor of the instruction on this line, if it is a valid one.
    pub fn descriptor(&self) -> Option<Descriptor> {
        match self.stmt {
            Stmt::Instr {
                mnemonic, operand, ..
            } => table::lookup(mnemonic.val, classify(operand.map(|op| op.val))),
            _ => None,
        }
    }
}

/// Whether the line holds no code at all.
fn is_comment(line: &str) -> bool {
    matches!(line.trim_start().chars().next(), Some('*' | ';'))
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parse a single line of source.
///
/// The first field is tried as a mnemonic with the second field as its operand. If that is
/// not a valid instruction, the first field is taken to be a label and the remaining fields
/// are read as mnemonic and operand instead.
pub fn parse_line(idx: usize, text: &str) -> SourceLine<'_> {
    let stmt = if is_comment(text) {
        Stmt::Empty
    } else {
        parse_stmt(strip_comment(text))
    };
    SourceLine { idx, text, stmt }
}

fn parse_stmt(code: &str) -> Stmt<'_> {
    let mut cur = Cursor::new(code);
    let Some(first) = cur.advance_field() else {
        return Stmt::Empty;
    };
    if first.is("ORG") {
        return Stmt::Org {
            keyword: first,
            operand: cur.advance_field(),
        };
    }
    if is_end(&first) {
        return Stmt::End { label: None };
    }

    let second = cur.advance_field();
    if table::lookup(first.val, classify(second.map(|tok| tok.val))).is_some() {
        return Stmt::Instr {
            label: None,
            mnemonic: first,
            operand: second,
        };
    }

    match second {
        None => Stmt::Label(first),
        Some(mnemonic) if is_end(&mnemonic) => Stmt::End { label: Some(first) },
        Some(mnemonic) => Stmt::Instr {
            label: Some(first),
            mnemonic,
            operand: cur.advance_rest(),
        },
    }
}

fn is_end(tok: &Token) -> bool {
    tok.is("END") || tok.is(".END")
}

/// Parse every line of a source.
pub fn parse_lines<'a>(lines: &'a [&'a str]) -> impl Iterator<Item = SourceLine<'a>> + 'a {
    lines
        .iter()
        .enumerate()
        .map(|(idx, text)| parse_line(idx, text))
}
