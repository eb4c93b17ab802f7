use std::{error::Error, fmt};

use lazy_static::lazy_static;
use regex::Regex;

use crate::symbol::Mode;

pub mod cursor;

lazy_static! {
    /// Four hex digits after `$`, or four decimal digits
    static ref EXTENDED: Regex = Regex::new(r"^(\$[0-9A-F]{4}|[0-9]{4})$").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^-?[0-9]+$").unwrap();
    static ref IDENT: Regex = Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap();
}

/// Marks an immediate operand.
pub const IMMEDIATE_MARKER: char = '#';
/// Suffix of an indexed operand.
pub const INDEX_SUFFIX: &str = ",X";

/// Infer the addressing mode of an operand from its lexical shape.
///
/// Rules are checked in order; the first one that matches wins.
pub fn classify(operand: Option<&str>) -> Mode {
    let operand = match operand.map(str::trim) {
        None | Some("") => return Mode::Inherent,
        Some(op) => op.to_ascii_uppercase(),
    };

    if let Some(value) = operand.strip_prefix(IMMEDIATE_MARKER) {
        return match parse_literal(value) {
            Ok(val) if !fits_byte(val) => Mode::Immediate16,
            // Symbolic immediates are sized as bytes and checked when encoded
            _ => Mode::Immediate,
        };
    }
    if operand.ends_with(INDEX_SUFFIX) {
        return Mode::Indexed;
    }
    if EXTENDED.is_match(&operand) {
        return Mode::Extended;
    }
    if INTEGER.is_match(&operand) || IDENT.is_match(&operand) {
        return Mode::Relative;
    }
    Mode::Direct
}

/// Numeric literal that could not be read.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LiteralError {
    /// No digits, a second sign, or digits outside the radix
    Malformed,
    /// Does not fit in 32 bits
    Overflow,
}

impl Error for LiteralError {}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed literal"),
            Self::Overflow => write!(f, "literal too large"),
        }
    }
}

/// Parse a numeric literal: decimal (`42`, `-3`) or hexadecimal (`$2A`, `0x2A`).
///
/// A leading immediate marker is ignored. Only one sign is allowed, and it goes before the
/// radix marker.
pub fn parse_literal(text: &str) -> Result<i32, LiteralError> {
    let text = text.trim();
    let text = text.strip_prefix(IMMEDIATE_MARKER).unwrap_or(text);
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (radix, digits) = if let Some(hex) = text.strip_prefix('$') {
        (16, hex)
    } else if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (16, hex)
    } else {
        (10, text)
    };
    // `from_str_radix` takes its own sign, which must not get through
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return Err(LiteralError::Malformed);
    }
    let value = i32::from_str_radix(digits, radix).map_err(|_| LiteralError::Overflow)?;
    if negative {
        value.checked_neg().ok_or(LiteralError::Overflow)
    } else {
        Ok(value)
    }
}

/// Value is representable as an unsigned or signed byte.
pub fn fits_byte(val: i32) -> bool {
    (-128..=255).contains(&val)
}

/// Value is representable as an unsigned or signed word.
pub fn fits_word(val: i32) -> bool {
    (-32768..=65535).contains(&val)
}
