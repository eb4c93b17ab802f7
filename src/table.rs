use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::symbol::Mode;

/// Static encoding information for one (mnemonic, addressing mode) pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Descriptor {
    pub mnemonic: &'static str,
    pub mode: Mode,
    pub opcode: u8,
}

impl Descriptor {
    /// Total length in bytes, opcode included.
    pub fn length(&self) -> u8 {
        self.mode.length()
    }
}

#[rustfmt::skip]
const INSTRUCTIONS: &[(&str, Mode, u8)] = &[
    // Immediate
    ("LDAA", Mode::Immediate, 0x86),
    ("LDAB", Mode::Immediate, 0xC6),
    ("ADDA", Mode::Immediate, 0x8B),
    ("ADDB", Mode::Immediate, 0xCB),
    ("SUBA", Mode::Immediate, 0x80),
    ("SUBB", Mode::Immediate, 0xC0),
    ("CMPA", Mode::Immediate, 0x81),
    ("CMPB", Mode::Immediate, 0xC1),
    ("ANDA", Mode::Immediate, 0x84),
    ("LDX",  Mode::Immediate16, 0xCE),
    // Direct
    ("LDAA", Mode::Direct, 0x96),
    ("LDAB", Mode::Direct, 0xD6),
    ("STAA", Mode::Direct, 0x97),
    ("STAB", Mode::Direct, 0xD7),
    ("LDX",  Mode::Direct, 0xDE),
    ("STX",  Mode::Direct, 0xDF),
    ("CMPA", Mode::Direct, 0x91),
    ("CMPB", Mode::Direct, 0xD1),
    ("ANDA", Mode::Direct, 0x94),
    ("ADDA", Mode::Direct, 0x9B),
    ("SUBA", Mode::Direct, 0x90),
    // Indexed
    ("LDAA", Mode::Indexed, 0xA6),
    ("LDAB", Mode::Indexed, 0xE6),
    ("STAA", Mode::Indexed, 0xA7),
    ("STAB", Mode::Indexed, 0xE7),
    ("LDX",  Mode::Indexed, 0xEE),
    ("STX",  Mode::Indexed, 0xEF),
    // Extended
    ("LDAA", Mode::Extended, 0xB6),
    ("LDAB", Mode::Extended, 0xF6),
    ("STAA", Mode::Extended, 0xB7),
    ("STAB", Mode::Extended, 0xF7),
    ("LDX",  Mode::Extended, 0xFE),
    ("STX",  Mode::Extended, 0xFF),
    ("CMPA", Mode::Extended, 0xB1),
    ("CMPB", Mode::Extended, 0xF1),
    ("ANDA", Mode::Extended, 0xB4),
    ("ADDA", Mode::Extended, 0xBB),
    ("SUBA", Mode::Extended, 0xB0),
    ("JMP",  Mode::Extended, 0x7E),
    ("JSR",  Mode::Extended, 0xBD),
    // Relative
    ("BRA",  Mode::Relative, 0x20),
    ("BNE",  Mode::Relative, 0x26),
    ("BEQ",  Mode::Relative, 0x27),
    ("BPL",  Mode::Relative, 0x2A),
    ("BMI",  Mode::Relative, 0x2B),
    ("BSR",  Mode::Relative, 0x8D),
    // Inherent
    ("NOP",  Mode::Inherent, 0x01),
    ("INX",  Mode::Inherent, 0x08),
    ("DEX",  Mode::Inherent, 0x09),
    ("CLC",  Mode::Inherent, 0x0C),
    ("SEC",  Mode::Inherent, 0x0D),
    ("SBA",  Mode::Inherent, 0x10),
    ("CBA",  Mode::Inherent, 0x11),
    ("TAB",  Mode::Inherent, 0x16),
    ("TBA",  Mode::Inherent, 0x17),
    ("ABA",  Mode::Inherent, 0x1B),
    ("RTS",  Mode::Inherent, 0x39),
    ("LSRA", Mode::Inherent, 0x44),
    ("RORA", Mode::Inherent, 0x46),
    ("ASRA", Mode::Inherent, 0x47),
    ("ASLA", Mode::Inherent, 0x48),
    ("ROLA", Mode::Inherent, 0x49),
    ("DECA", Mode::Inherent, 0x4A),
    ("INCA", Mode::Inherent, 0x4C),
    ("CLRA", Mode::Inherent, 0x4F),
    ("LSRB", Mode::Inherent, 0x54),
    ("RORB", Mode::Inherent, 0x56),
    ("ASRB", Mode::Inherent, 0x57),
    ("ASLB", Mode::Inherent, 0x58),
    ("ROLB", Mode::Inherent, 0x59),
    ("DECB", Mode::Inherent, 0x5A),
    ("INCB", Mode::Inherent, 0x5C),
    ("CLRB", Mode::Inherent, 0x5F),
];

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

lazy_static! {
    static ref BY_NAME: FxMap<&'static str, Vec<Descriptor>> = {
        let mut table: FxMap<&'static str, Vec<Descriptor>> = FxMap::default();
        for &(mnemonic, mode, opcode) in INSTRUCTIONS {
            table
                .entry(mnemonic)
                .or_default()
                .push(Descriptor { mnemonic, mode, opcode });
        }
        table
    };
    static ref BY_OPCODE: [Option<Descriptor>; 256] = {
        let mut table = [None; 256];
        for desc in BY_NAME.values().flatten() {
            table[desc.opcode as usize] = Some(*desc);
        }
        table
    };
}

/// Find the descriptor for `mnemonic` in `mode`.
///
/// Returns `None` for combinations that do not exist, which is how the parser tells labels
/// apart from instructions. Some modes fall back to a wider form (see [`Mode::candidates`]).
pub fn lookup(mnemonic: &str, mode: Mode) -> Option<Descriptor> {
    let forms = BY_NAME.get(mnemonic.to_ascii_uppercase().as_str())?;
    mode.candidates()
        .iter()
        .find_map(|&mode| forms.iter().find(|desc| desc.mode == mode).copied())
}

/// Decode an opcode byte.
pub fn by_opcode(opcode: u8) -> Option<Descriptor> {
    BY_OPCODE[opcode as usize]
}

/// Whether `mnemonic` names any instruction, regardless of mode.
pub fn is_mnemonic(mnemonic: &str) -> bool {
    BY_NAME.contains_key(mnemonic.to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_exact() {
        let desc = lookup("ldaa", Mode::Immediate).unwrap();
        assert_eq!(desc.opcode, 0x86);
        assert_eq!(desc.length(), 2);
        assert_eq!(lookup("LDX", Mode::Immediate16).unwrap().opcode, 0xCE);
        assert_eq!(lookup("BRA", Mode::Relative).unwrap().opcode, 0x20);
        assert_eq!(lookup("NOP", Mode::Inherent).unwrap().length(), 1);
    }

    #[test]
    fn lookup_missing() {
        assert_eq!(lookup("LOOP", Mode::Relative), None);
        assert_eq!(lookup("STAA", Mode::Immediate), None);
        assert_eq!(lookup("INCA", Mode::Extended), None);
        assert_eq!(lookup("LDAA", Mode::Immediate16), None);
    }

    #[test]
    fn lookup_widens() {
        // Small immediate into the index register
        assert_eq!(lookup("LDX", Mode::Immediate).unwrap().mode, Mode::Immediate16);
        // Label operand to an absolute jump
        assert_eq!(lookup("JMP", Mode::Relative).unwrap().opcode, 0x7E);
        // Branches keep their relative form, whatever the target looks like
        assert_eq!(lookup("BNE", Mode::Relative).unwrap().mode, Mode::Relative);
        assert_eq!(lookup("BEQ", Mode::Extended).unwrap().opcode, 0x27);
        // Absolute addresses never narrow
        assert_eq!(lookup("LDAA", Mode::Extended).unwrap().mode, Mode::Extended);
    }

    #[test]
    fn opcodes_are_unique() {
        for &(mnemonic, mode, opcode) in INSTRUCTIONS {
            let desc = by_opcode(opcode).unwrap();
            assert_eq!((desc.mnemonic, desc.mode), (mnemonic, mode), "opcode {opcode:02X}");
        }
        assert_eq!(by_opcode(0x00), None);
    }

    #[test]
    fn mnemonic_names() {
        assert!(is_mnemonic("abA"));
        assert!(!is_mnemonic("LOOP"));
    }
}
