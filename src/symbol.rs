use std::fmt;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Symbol table of label -> address, built by the first pass and read by the second.
///
/// Labels are case-insensitive and are stored uppercase. Iteration follows definition order.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    table: FxMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            table: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Bind `label` to `addr`. A redefinition replaces the previous address.
    pub fn insert(&mut self, label: &str, addr: u16) {
        self.table.insert(label.to_ascii_uppercase(), addr);
    }

    pub fn get(&self, label: &str) -> Option<u16> {
        self.table.get(&label.to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.table.iter().map(|(label, addr)| (label.as_str(), *addr))
    }
}

/// Addressing mode of an instruction, as inferred from the shape of its operand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mode {
    /// `#5`, `#$1F`
    Immediate,
    /// `#$1234`
    Immediate16,
    /// `$10`
    Direct,
    /// `5,X`
    Indexed,
    /// `$C000`, `1024`
    Extended,
    /// `LOOP`, `-2`
    Relative,
    /// No operand
    Inherent,
}

impl Mode {
    /// Total instruction length in bytes, opcode included.
    pub const fn length(self) -> u8 {
        match self {
            Mode::Inherent => 1,
            Mode::Immediate | Mode::Direct | Mode::Indexed | Mode::Relative => 2,
            Mode::Immediate16 | Mode::Extended => 3,
        }
    }

    /// Modes to try, in order, when looking up a mnemonic classified as `self`.
    ///
    /// A bare identifier may name a branch target or an absolute address, an address may be
    /// a branch target, and a small immediate may belong to a 16-bit register load.
    pub(crate) const fn candidates(self) -> &'static [Mode] {
        match self {
            Mode::Immediate => &[Mode::Immediate, Mode::Immediate16],
            Mode::Relative => &[Mode::Relative, Mode::Extended],
            Mode::Immediate16 => &[Mode::Immediate16],
            Mode::Direct => &[Mode::Direct, Mode::Relative],
            Mode::Indexed => &[Mode::Indexed],
            Mode::Extended => &[Mode::Extended, Mode::Relative],
            Mode::Inherent => &[Mode::Inherent],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Immediate => "IMM",
            Mode::Immediate16 => "IMM16",
            Mode::Direct => "DIR",
            Mode::Indexed => "IDX",
            Mode::Extended => "EXT",
            Mode::Relative => "REL",
            Mode::Inherent => "INH",
        };
        f.pad(name)
    }
}

/// Represents the CPU registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    /// 8-bit accumulator A
    A,
    /// 8-bit accumulator B
    B,
    /// 16-bit index register
    X,
    /// Program counter
    Pc,
}

impl Register {
    pub const ALL: [Register; 4] = [Register::A, Register::B, Register::X, Register::Pc];

    pub const fn is_wide(self) -> bool {
        matches!(self, Register::X | Register::Pc)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::A => "A",
            Register::B => "B",
            Register::X => "X",
            Register::Pc => "PC",
        };
        f.pad(name)
    }
}
