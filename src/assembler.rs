use crate::{
    air::{Air, AsmLine},
    error::AsmError,
    lexer::{fits_byte, fits_word, parse_literal, IMMEDIATE_MARKER, INDEX_SUFFIX},
    parser::{parse_lines, Stmt},
    symbol::{Mode, SymbolTable},
    table::Descriptor,
    token::Token,
    LOAD_ADDR,
};

/// Two-pass assembler over a fixed list of source lines.
///
/// The first pass sizes every line and records labels; the second pass encodes. Both passes
/// parse each line from scratch, so they always agree on how a line is read.
pub struct Assembler<'a> {
    lines: Vec<&'a str>,
    /// Origin in effect before any `ORG`
    base: u16,
    /// Origin after the last `ORG` seen by the most recent pass
    orig: u16,
    symbols: SymbolTable,
}

impl<'a> Assembler<'a> {
    pub fn new(lines: Vec<&'a str>) -> Self {
        Assembler {
            lines,
            base: LOAD_ADDR,
            orig: LOAD_ADDR,
            symbols: SymbolTable::new(),
        }
    }

    pub fn from_source(src: &'a str) -> Self {
        Self::new(src.lines().collect())
    }

    /// Start the location counter at `base` instead of the load address.
    pub fn with_origin(mut self, base: u16) -> Self {
        self.base = base;
        self.orig = base;
        self
    }

    pub fn orig(&self) -> u16 {
        self.orig
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Run both passes.
    pub fn assemble(mut self) -> Air {
        self.first_pass();
        self.second_pass()
    }

    /// Size every line and bind each label to the location counter.
    pub fn first_pass(&mut self) -> &SymbolTable {
        let mut symbols = SymbolTable::new();
        let mut lc = self.base;
        self.orig = self.base;

        let lines = self.lines.clone();
        for line in parse_lines(&lines) {
            if let Some(label) = line.label() {
                symbols.insert(label.val, lc);
            }
            match line.stmt {
                Stmt::Org { operand, .. } => {
                    if let Some(addr) = operand.and_then(|op| parse_addr(op.val)) {
                        self.orig = addr;
                        lc = addr;
                    }
                }
                // Unknown instructions still take a byte
                Stmt::Instr { .. } => {
                    let len = line.descriptor().map_or(1, |desc| desc.length());
                    lc = lc.wrapping_add(len as u16);
                }
                Stmt::Empty | Stmt::End { .. } | Stmt::Label(_) => {}
            }
        }

        self.symbols = symbols;
        &self.symbols
    }

    /// Encode every line using the symbol table of the first pass.
    ///
    /// Failing lines become [`AsmLine::Error`] and do not move the location counter, so
    /// addresses after a failure may disagree with the first pass.
    pub fn second_pass(&mut self) -> Air {
        let mut lc = self.base;
        self.orig = self.base;
        let mut out = Vec::with_capacity(self.lines.len());

        let lines = self.lines.clone();
        for line in parse_lines(&lines) {
            let addr = lc;
            let asm = match line.stmt {
                Stmt::Empty | Stmt::End { .. } | Stmt::Label(_) => AsmLine::Empty,
                Stmt::Org { keyword, operand } => {
                    match operand.and_then(|op| parse_addr(op.val)) {
                        Some(addr) => {
                            self.orig = addr;
                            lc = addr;
                            AsmLine::Empty
                        }
                        None => {
                            let tok = operand.unwrap_or(keyword);
                            AsmLine::Error {
                                err: AsmError::BadOrigin {
                                    operand: tok.val.to_string(),
                                },
                                span: tok.span,
                            }
                        }
                    }
                }
                Stmt::Instr {
                    mnemonic, operand, ..
                } => match line.descriptor() {
                    None => AsmLine::Error {
                        err: AsmError::InvalidInstruction {
                            mnemonic: mnemonic.upper(),
                        },
                        span: mnemonic.span,
                    },
                    Some(desc) => match self.encode(desc, operand, lc) {
                        Ok(bytes) => {
                            lc = lc.wrapping_add(desc.length() as u16);
                            AsmLine::Bytes(bytes)
                        }
                        Err(err) => AsmLine::Error {
                            err,
                            span: operand.unwrap_or(mnemonic).span,
                        },
                    },
                },
            };
            out.push((addr, asm));
        }

        Air::new(self.orig, out, self.symbols.clone())
    }

    /// Encode one instruction located at `lc`.
    fn encode(&self, desc: Descriptor, operand: Option<Token>, lc: u16) -> Result<Vec<u8>, AsmError> {
        let text = operand.map_or("", |op| op.val.trim());
        let mut bytes = Vec::with_capacity(desc.length() as usize);
        bytes.push(desc.opcode);

        match desc.mode {
            Mode::Inherent => {}
            Mode::Immediate => {
                let val = self.resolve_immediate(text)?;
                if !fits_byte(val) {
                    return Err(out_of_range(text, val));
                }
                bytes.push(val as u8);
            }
            Mode::Immediate16 => {
                let val = self.resolve_immediate(text)?;
                if !fits_word(val) {
                    return Err(out_of_range(text, val));
                }
                bytes.extend_from_slice(&(val as u16).to_be_bytes());
            }
            Mode::Direct => {
                let val = self.resolve(text)?;
                bytes.push(val as u8);
            }
            Mode::Indexed => {
                let offs = strip_index(text).trim();
                let val = if offs.is_empty() {
                    0
                } else {
                    self.resolve(offs).map_err(|_| unresolved(text))?
                };
                bytes.push(val as u8);
            }
            Mode::Extended => {
                let val = self.resolve(text)?;
                if !fits_word(val) {
                    return Err(out_of_range(text, val));
                }
                bytes.extend_from_slice(&(val as u16).to_be_bytes());
            }
            Mode::Relative => {
                let target = self.resolve(text)?;
                // Relative to the address after the branch
                let offset = target - (lc as i32 + desc.length() as i32);
                if !(-128..=127).contains(&offset) {
                    return Err(AsmError::BranchOutOfRange {
                        operand: text.to_string(),
                        offset,
                    });
                }
                bytes.push(offset as u8);
            }
        }
        Ok(bytes)
    }

    /// Label address, else numeric literal.
    fn resolve(&self, text: &str) -> Result<i32, AsmError> {
        if let Some(addr) = self.symbols.get(text) {
            return Ok(addr as i32);
        }
        parse_literal(text).map_err(|_| unresolved(text))
    }

    fn resolve_immediate(&self, text: &str) -> Result<i32, AsmError> {
        let value = text.strip_prefix(IMMEDIATE_MARKER).unwrap_or(text);
        self.resolve(value).map_err(|_| unresolved(text))
    }
}

/// Assemble a whole source in one go.
pub fn assemble(src: &str) -> Air {
    Assembler::from_source(src).assemble()
}

fn parse_addr(text: &str) -> Option<u16> {
    parse_literal(text).ok().and_then(|val| u16::try_from(val).ok())
}

fn strip_index(text: &str) -> &str {
    let Some(cut) = text.len().checked_sub(INDEX_SUFFIX.len()) else {
        return text;
    };
    match text.get(cut..) {
        Some(suffix) if suffix.eq_ignore_ascii_case(INDEX_SUFFIX) => &text[..cut],
        _ => text,
    }
}

fn unresolved(text: &str) -> AsmError {
    AsmError::UnresolvedOperand {
        operand: text.to_string(),
    }
}

fn out_of_range(text: &str, value: i32) -> AsmError {
    AsmError::ValueOutOfRange {
        operand: text.to_string(),
        value,
    }
}
