use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::{span::Span, table};

/// Prefix of every error line in assembler output.
pub const ERROR_MARKER: &str = "ERROR:";

/// Error confined to a single line of source.
///
/// Every variant carries the offending token, as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmError {
    /// `ORG` without a readable address.
    BadOrigin { operand: String },
    /// Mnemonic does not exist, or not in the addressing mode of its operand.
    InvalidInstruction { mnemonic: String },
    /// Operand is neither a known label nor a numeric literal.
    UnresolvedOperand { operand: String },
    /// Operand value does not fit the field it is encoded into.
    ValueOutOfRange { operand: String, value: i32 },
    /// Branch target is further than a signed byte away.
    BranchOutOfRange { operand: String, offset: i32 },
}

impl AsmError {
    /// Text of the offending token.
    pub fn token(&self) -> &str {
        match self {
            Self::BadOrigin { operand }
            | Self::UnresolvedOperand { operand }
            | Self::ValueOutOfRange { operand, .. }
            | Self::BranchOutOfRange { operand, .. } => operand,
            Self::InvalidInstruction { mnemonic } => mnemonic,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::BadOrigin { .. } => "asm::origin",
            Self::InvalidInstruction { .. } => "asm::instruction",
            Self::UnresolvedOperand { .. } => "asm::operand",
            Self::ValueOutOfRange { .. } => "asm::range",
            Self::BranchOutOfRange { .. } => "asm::branch",
        }
    }

    fn help(&self) -> String {
        match self {
            Self::BadOrigin { .. } => "ORG expects an address like $C000".to_string(),
            Self::InvalidInstruction { mnemonic } if table::is_mnemonic(mnemonic) => {
                format!("{} does not support this addressing mode", mnemonic.to_uppercase())
            }
            Self::InvalidInstruction { .. } => {
                "check the list of supported mnemonics in the documentation".to_string()
            }
            Self::UnresolvedOperand { .. } => {
                "operands are labels, decimal literals, or hex literals like $1F".to_string()
            }
            Self::ValueOutOfRange { .. } => "the value does not fit in this operand".to_string(),
            Self::BranchOutOfRange { .. } => {
                "branches reach 128 bytes back or 127 bytes forward; try JMP".to_string()
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::BadOrigin { .. } => "bad origin",
            Self::InvalidInstruction { .. } => "invalid instruction",
            Self::UnresolvedOperand { .. } => "unresolved operand",
            Self::ValueOutOfRange { .. } => "out of range",
            Self::BranchOutOfRange { .. } => "branch too far",
        }
    }
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadOrigin { operand } => write!(f, "cannot resolve origin -> {operand}"),
            Self::InvalidInstruction { mnemonic } => {
                write!(f, "invalid instruction -> {mnemonic}")
            }
            Self::UnresolvedOperand { operand } => {
                write!(f, "cannot resolve operand -> {operand}")
            }
            Self::ValueOutOfRange { operand, value } => {
                write!(f, "value {value} out of range -> {operand}")
            }
            Self::BranchOutOfRange { operand, offset } => {
                write!(f, "branch offset {offset} out of range -> {operand}")
            }
        }
    }
}

/// Build a diagnostic for an error on line `line_idx`, pointing at `span` within that line.
pub fn report(name: &str, src: &str, line_idx: usize, span: Span, err: &AsmError) -> Report {
    let line_start = src
        .split_inclusive('\n')
        .take(line_idx)
        .map(str::len)
        .sum::<usize>();
    miette!(
        severity = Severity::Error,
        code = err.code(),
        help = err.help(),
        labels = vec![LabeledSpan::at(span.offset(line_start), err.label())],
        "Line {}: {err}",
        line_idx + 1,
    )
    .with_source_code(NamedSource::new(name, src.to_string()))
}
