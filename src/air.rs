use std::fmt;

use crate::{
    error::{AsmError, ERROR_MARKER},
    span::Span,
    symbol::SymbolTable,
};

/// Assembler output for one source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmLine {
    /// Blank line, comment, directive, or lone label
    Empty,
    /// Encoded instruction
    Bytes(Vec<u8>),
    /// Line-local failure, with the position of the offending token inside the line
    Error { err: AsmError, span: Span },
}

impl AsmLine {
    pub fn bytes(&self) -> &[u8] {
        match self {
            AsmLine::Bytes(bytes) => bytes,
            AsmLine::Empty | AsmLine::Error { .. } => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AsmLine::Error { .. })
    }
}

/// Renders as the line's machine code: `""`, `"86 05"`, or `"ERROR: ..."`.
impl fmt::Display for AsmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmLine::Empty => Ok(()),
            AsmLine::Bytes(bytes) => {
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            AsmLine::Error { err, .. } => write!(f, "{ERROR_MARKER} {err}"),
        }
    }
}

/// Assembly intermediate representation: one output line per source line, plus the origin
/// and the labels the program defined.
#[derive(Clone, Debug)]
pub struct Air {
    /// Active origin after the last `ORG`
    orig: u16,
    lines: Vec<AsmLine>,
    /// Location counter at the start of each line
    addrs: Vec<u16>,
    symbols: SymbolTable,
}

impl Air {
    pub fn new(orig: u16, lines: Vec<(u16, AsmLine)>, symbols: SymbolTable) -> Self {
        let (addrs, lines) = lines.into_iter().unzip();
        Air {
            orig,
            lines,
            addrs,
            symbols,
        }
    }

    pub fn orig(&self) -> u16 {
        self.orig
    }

    pub fn lines(&self) -> &[AsmLine] {
        &self.lines
    }

    /// Address the second pass assigned to line `idx`.
    pub fn addr(&self, idx: usize) -> Option<u16> {
        self.addrs.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Line index and error of every failed line.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &AsmError, Span)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| match line {
                AsmLine::Error { err, span } => Some((idx, err, *span)),
                _ => None,
            })
    }

    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(AsmLine::is_error)
    }

    /// Machine code text, one line per source line. This is what the emulator loads.
    pub fn machine_code(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every emitted byte in order, skipping empty and failed lines.
    pub fn image(&self) -> Vec<u8> {
        self.lines
            .iter()
            .flat_map(|line| line.bytes().iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_display() {
        assert_eq!(AsmLine::Empty.to_string(), "");
        assert_eq!(AsmLine::Bytes(vec![0xCE, 0x12, 0x34]).to_string(), "CE 12 34");
        let err = AsmLine::Error {
            err: AsmError::InvalidInstruction {
                mnemonic: "FOO".to_string(),
            },
            span: Span::new(0, 3),
        };
        assert_eq!(err.to_string(), "ERROR: invalid instruction -> FOO");
        assert!(err.bytes().is_empty());
    }

    #[test]
    fn machine_code_keeps_line_count() {
        let air = Air::new(
            0xC000,
            vec![
                (0xC000, AsmLine::Empty),
                (0xC000, AsmLine::Bytes(vec![0x86, 0x05])),
                (0xC002, AsmLine::Bytes(vec![0x4C])),
            ],
            SymbolTable::new(),
        );
        assert_eq!(air.machine_code(), "\n86 05\n4C");
        assert_eq!(air.image(), vec![0x86, 0x05, 0x4C]);
        assert_eq!(air.addr(2), Some(0xC002));
        assert!(!air.has_errors());
    }
}
