/// Contents of one machine-code line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Code {
    /// Nothing on the line
    Blank,
    /// Decoded hex bytes, opcode first
    Bytes(Vec<u8>),
    /// Text that is not a hex byte sequence, such as an assembler error line
    Invalid(String),
}

impl Code {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Code::Blank;
        }
        let bytes = line
            .split_whitespace()
            .map(|tok| match tok.len() {
                1 | 2 if tok.chars().all(|ch| ch.is_ascii_hexdigit()) => {
                    u8::from_str_radix(tok, 16).ok()
                }
                _ => None,
            })
            .collect::<Option<Vec<_>>>();
        match bytes {
            Some(bytes) => Code::Bytes(bytes),
            None => Code::Invalid(line.to_string()),
        }
    }

    /// Bytes the line occupies in the address space.
    pub fn len(&self) -> usize {
        match self {
            Code::Bytes(bytes) => bytes.len(),
            Code::Blank | Code::Invalid(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Line of machine code along with the address it was assembled at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub addr: u16,
    pub code: Code,
}

/// Machine code held line by line, each line tagged with its address.
///
/// Addresses are re-derived the way the assembler's second pass counted them: starting from
/// the load address and moving only past encoded bytes.
#[derive(Clone, Debug, Default)]
pub struct Program {
    entries: Vec<Entry>,
}

impl Program {
    pub fn parse(machine_code: &str, base: u16) -> Self {
        let mut addr = base;
        let entries = machine_code
            .lines()
            .map(|line| {
                let code = Code::parse(line);
                let entry = Entry { addr, code };
                addr = addr.wrapping_add(entry.code.len() as u16);
                entry
            })
            .collect();
        Program { entries }
    }

    pub fn get(&self, idx: usize) -> Option<&Entry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Index of the line holding the instruction at `addr`.
    pub fn index_of(&self, addr: u16) -> Option<usize> {
        let is_target = |entry: &Entry| entry.addr == addr && !entry.code.is_empty();
        let start = self.entries.partition_point(|entry| entry.addr < addr);
        self.entries[start..]
            .iter()
            .take_while(|entry| entry.addr == addr)
            .position(is_target)
            .map(|offs| start + offs)
            // Addresses are only sorted until they wrap past $FFFF
            .or_else(|| self.entries.iter().position(is_target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lines() {
        let program = Program::parse("86 05\n\nERROR: invalid instruction -> FOO\n4c", 0xC000);
        assert_eq!(program.len(), 4);
        assert_eq!(program.get(0).unwrap().code, Code::Bytes(vec![0x86, 0x05]));
        assert_eq!(program.get(1).unwrap().code, Code::Blank);
        assert!(matches!(program.get(2).unwrap().code, Code::Invalid(_)));
        assert_eq!(program.get(3).unwrap().code, Code::Bytes(vec![0x4C]));
    }

    #[test]
    fn rejects_signed_bytes() {
        let program = Program::parse("+5\n86 -1\n8B 03", 0xC000);
        assert!(matches!(program.get(0).unwrap().code, Code::Invalid(_)));
        assert!(matches!(program.get(1).unwrap().code, Code::Invalid(_)));
        assert_eq!(program.get(2).unwrap().addr, 0xC000);
    }

    #[test]
    fn addresses_skip_empty_lines() {
        let program = Program::parse("\n86 05\n\nCE 12 34\n4C", 0xC000);
        let addrs = program.iter().map(|entry| entry.addr).collect::<Vec<_>>();
        assert_eq!(addrs, [0xC000, 0xC000, 0xC002, 0xC002, 0xC005]);
    }

    #[test]
    fn reverse_lookup() {
        let program = Program::parse("\n86 05\n\nCE 12 34\n4C", 0xC000);
        // Lands on the instruction, not the blank line sharing its address
        assert_eq!(program.index_of(0xC000), Some(1));
        assert_eq!(program.index_of(0xC002), Some(3));
        assert_eq!(program.index_of(0xC005), Some(4));
        // Middle of an instruction
        assert_eq!(program.index_of(0xC001), None);
        assert_eq!(program.index_of(0x0000), None);
    }

    #[test]
    fn reverse_lookup_after_wrap() {
        let program = Program::parse("CE 12 34\n4C", 0xFFFE);
        assert_eq!(program.index_of(0xFFFE), Some(0));
        assert_eq!(program.index_of(0x0001), Some(1));
    }
}
