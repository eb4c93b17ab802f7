use std::collections::BTreeMap;
use std::fmt;

use crate::{
    program::{Code, Program},
    symbol::{Mode, Register},
    table::{self, Descriptor},
    LOAD_ADDR, STEP_LIMIT,
};

/// Represents complete CPU state during a run.
///
/// Accumulators are bytes and X/PC are words, so every register stays masked to its width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunState {
    a: u8,
    b: u8,
    x: u16,
    pc: u16,
    /// Sparse memory; absent addresses read as zero
    mem: BTreeMap<u16, u8>,
}

impl RunState {
    pub fn new(pc: u16) -> Self {
        RunState {
            a: 0,
            b: 0,
            x: 0,
            pc,
            mem: BTreeMap::new(),
        }
    }

    pub fn reg(&self, reg: Register) -> u16 {
        match reg {
            Register::A => self.a as u16,
            Register::B => self.b as u16,
            Register::X => self.x,
            Register::Pc => self.pc,
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn mem(&self, addr: u16) -> u8 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    pub fn memory(&self) -> &BTreeMap<u16, u8> {
        &self.mem
    }

    fn set_mem(&mut self, addr: u16, val: u8) {
        self.mem.insert(addr, val);
    }

    fn mem_word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.mem(addr), self.mem(addr.wrapping_add(1))])
    }

    fn set_mem_word(&mut self, addr: u16, val: u16) {
        let [hi, lo] = val.to_be_bytes();
        self.set_mem(addr, hi);
        self.set_mem(addr.wrapping_add(1), lo);
    }
}

/// Lifecycle of an emulator session.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Status {
    /// Nothing loaded yet
    #[default]
    Idle,
    Running,
    /// Stopped by the step ceiling
    Halted,
    /// Line cursor ran past the last line
    Completed,
}

/// Observable result of one executed instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    /// Register now holds `val`
    Reg { reg: Register, val: u16 },
    /// Memory at `addr` now holds `val` (two bytes for X)
    Store { addr: u16, val: u16 },
    /// Comparison, traced as the difference it would set flags from
    Compare { expr: &'static str, diff: i16 },
    Branch { taken: bool, target: u16 },
    Jump { target: u16 },
    /// Subroutine return; no call stack is kept
    Return,
    Nothing,
    /// Instruction only affects condition codes, which are not modelled
    NotSimulated,
}

impl Effect {
    /// Address control moves to, if not the next instruction.
    fn target(&self) -> Option<u16> {
        match *self {
            Effect::Branch { taken: true, target } | Effect::Jump { target } => Some(target),
            _ => None,
        }
    }
}

/// Human-readable description of one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trace {
    Exec {
        pc: u16,
        mnemonic: &'static str,
        effect: Effect,
    },
    Blank { pc: u16 },
    /// Line could not be decoded as hex bytes
    Invalid { pc: u16, text: String },
    UnknownOpcode { pc: u16, opcode: u8 },
    LimitReached { limit: usize },
    Completed,
    NotLoaded,
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trace::Exec {
                pc,
                mnemonic,
                effect,
            } => {
                write!(f, "PC: ${pc:04X} -> {mnemonic}")?;
                match *effect {
                    Effect::Reg { reg, val } if reg.is_wide() => write!(f, " -> {reg} = ${val:04X}"),
                    Effect::Reg { reg, val } => write!(f, " -> {reg} = {val}"),
                    Effect::Store { addr, val } => write!(f, " -> [${addr:04X}] = {val}"),
                    Effect::Compare { expr, diff } => write!(f, " -> {expr} = {diff}"),
                    Effect::Branch { taken: true, target } => write!(f, " taken -> ${target:04X}"),
                    Effect::Branch { taken: false, .. } => write!(f, " not taken -> continue"),
                    Effect::Jump { target } => write!(f, " -> PC = ${target:04X}"),
                    Effect::Return => write!(f, " -> return"),
                    Effect::Nothing => write!(f, " -> no operation"),
                    Effect::NotSimulated => write!(f, " -> not simulated"),
                }
            }
            Trace::Blank { pc } => write!(f, "PC: ${pc:04X} -> blank line skipped"),
            Trace::Invalid { pc, text } => write!(f, "PC: ${pc:04X} -> cannot decode: {text}"),
            Trace::UnknownOpcode { pc, opcode } => {
                write!(f, "PC: ${pc:04X} -> unknown opcode: {opcode:02X}")
            }
            Trace::LimitReached { limit } => {
                write!(f, "Stopped after {limit} steps (infinite loop detected)")
            }
            Trace::Completed => write!(f, "Simulation complete"),
            Trace::NotLoaded => write!(f, "No program loaded"),
        }
    }
}

/// Resolved operand of the instruction being executed.
#[derive(Clone, Copy, Debug)]
enum Operand {
    None,
    Value(u16),
    Addr(u16),
}

/// One emulator session: CPU state, the loaded program, and a line cursor into it.
#[derive(Clone, Debug)]
pub struct Emulator {
    state: RunState,
    program: Program,
    /// Index of the next line to execute
    cursor: usize,
    steps: usize,
    limit: usize,
    status: Status,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator {
    pub fn new() -> Self {
        Emulator {
            state: RunState::new(LOAD_ADDR),
            program: Program::default(),
            cursor: 0,
            steps: 0,
            limit: STEP_LIMIT,
            status: Status::Idle,
        }
    }

    /// Ceiling on the amount of steps a single run may take.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Discard all state and load machine code, one instruction per line.
    pub fn load(&mut self, machine_code: &str) {
        self.state = RunState::new(LOAD_ADDR);
        self.program = Program::parse(machine_code, LOAD_ADDR);
        self.cursor = 0;
        self.steps = 0;
        self.status = Status::Running;
    }

    pub fn has_next_step(&self) -> bool {
        self.status == Status::Running && self.cursor < self.program.len()
    }

    /// Execute the line under the cursor.
    pub fn step(&mut self) -> Trace {
        match self.status {
            Status::Idle => return Trace::NotLoaded,
            Status::Halted => return Trace::LimitReached { limit: self.limit },
            Status::Completed => return Trace::Completed,
            Status::Running => {}
        }
        if self.steps >= self.limit {
            self.status = Status::Halted;
            return Trace::LimitReached { limit: self.limit };
        }
        let Some(entry) = self.program.get(self.cursor) else {
            self.status = Status::Completed;
            return Trace::Completed;
        };
        self.steps += 1;

        let pc = self.state.pc;
        let trace = match entry.code.clone() {
            Code::Blank => {
                // Takes a step but no address, so PC keeps matching the assembled addresses
                self.cursor += 1;
                Trace::Blank { pc }
            }
            Code::Invalid(text) => {
                self.cursor += 1;
                Trace::Invalid { pc, text }
            }
            Code::Bytes(bytes) => match table::by_opcode(bytes[0]) {
                Some(desc) => {
                    let effect = self.execute(desc, &bytes[1..]);
                    self.advance(desc, effect);
                    Trace::Exec {
                        pc,
                        mnemonic: desc.mnemonic,
                        effect,
                    }
                }
                None => {
                    self.state.pc = pc.wrapping_add(bytes.len() as u16);
                    self.cursor += 1;
                    Trace::UnknownOpcode {
                        pc,
                        opcode: bytes[0],
                    }
                }
            },
        };

        if self.cursor >= self.program.len() {
            self.status = Status::Completed;
        }
        trace
    }

    /// Step until the program completes or the step ceiling is hit. The last trace of a halted
    /// run is [`Trace::LimitReached`].
    pub fn run(&mut self) -> Vec<Trace> {
        let mut log = Vec::new();
        while self.has_next_step() {
            log.push(self.step());
        }
        log
    }

    /// Move PC and the cursor past an executed instruction.
    fn advance(&mut self, desc: Descriptor, effect: Effect) {
        match effect.target() {
            Some(target) => {
                self.state.pc = target;
                // A target outside the program ends the run
                self.cursor = self.program.index_of(target).unwrap_or(self.program.len());
            }
            None => {
                self.state.pc = self.state.pc.wrapping_add(desc.length() as u16);
                self.cursor += 1;
            }
        }
    }

    fn operand(&self, desc: Descriptor, operands: &[u8]) -> Operand {
        // Missing operand bytes read as zero
        let byte = |idx: usize| operands.get(idx).copied().unwrap_or(0);
        let word = u16::from_be_bytes([byte(0), byte(1)]);
        match desc.mode {
            Mode::Inherent => Operand::None,
            Mode::Immediate => Operand::Value(byte(0) as u16),
            Mode::Immediate16 => Operand::Value(word),
            Mode::Direct => Operand::Addr(byte(0) as u16),
            Mode::Indexed => Operand::Addr(self.state.x.wrapping_add(byte(0) as u16)),
            Mode::Extended => Operand::Addr(word),
            Mode::Relative => {
                let next = self.state.pc.wrapping_add(desc.length() as u16);
                Operand::Addr(next.wrapping_add(byte(0) as i8 as u16))
            }
        }
    }

    fn read_byte(&self, operand: Operand) -> u8 {
        match operand {
            Operand::Value(val) => val as u8,
            Operand::Addr(addr) => self.state.mem(addr),
            Operand::None => 0,
        }
    }

    fn read_word(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Value(val) => val,
            Operand::Addr(addr) => self.state.mem_word(addr),
            Operand::None => 0,
        }
    }

    fn addr(operand: Operand) -> u16 {
        match operand {
            Operand::Addr(addr) => addr,
            Operand::Value(val) => val,
            Operand::None => 0,
        }
    }

    fn set_a(&mut self, val: u8) -> Effect {
        self.state.a = val;
        Effect::Reg {
            reg: Register::A,
            val: val as u16,
        }
    }

    fn set_b(&mut self, val: u8) -> Effect {
        self.state.b = val;
        Effect::Reg {
            reg: Register::B,
            val: val as u16,
        }
    }

    fn set_x(&mut self, val: u16) -> Effect {
        self.state.x = val;
        Effect::Reg {
            reg: Register::X,
            val,
        }
    }

    fn store(&mut self, addr: u16, val: u8) -> Effect {
        self.state.set_mem(addr, val);
        Effect::Store {
            addr,
            val: val as u16,
        }
    }

    fn branch(taken: bool, target: u16) -> Effect {
        Effect::Branch { taken, target }
    }

    fn compare(expr: &'static str, lhs: u8, rhs: u8) -> Effect {
        Effect::Compare {
            expr,
            diff: lhs as i16 - rhs as i16,
        }
    }

    fn execute(&mut self, desc: Descriptor, operands: &[u8]) -> Effect {
        let op = self.operand(desc, operands);
        let RunState { a, b, x, .. } = self.state;
        match desc.mnemonic {
            // Loads and stores
            "LDAA" => self.set_a(self.read_byte(op)),
            "LDAB" => self.set_b(self.read_byte(op)),
            "LDX" => self.set_x(self.read_word(op)),
            "STAA" => self.store(Self::addr(op), a),
            "STAB" => self.store(Self::addr(op), b),
            "STX" => {
                let addr = Self::addr(op);
                self.state.set_mem_word(addr, x);
                Effect::Store { addr, val: x }
            }
            "TAB" => self.set_b(a),
            "TBA" => self.set_a(b),
            "CLRA" => self.set_a(0),
            "CLRB" => self.set_b(0),

            // Arithmetic and logic
            "ADDA" => self.set_a(a.wrapping_add(self.read_byte(op))),
            "ADDB" => self.set_b(b.wrapping_add(self.read_byte(op))),
            "SUBA" => self.set_a(a.wrapping_sub(self.read_byte(op))),
            "SUBB" => self.set_b(b.wrapping_sub(self.read_byte(op))),
            "ANDA" => self.set_a(a & self.read_byte(op)),
            "ABA" => self.set_a(a.wrapping_add(b)),
            "SBA" => self.set_a(a.wrapping_sub(b)),
            "INCA" => self.set_a(a.wrapping_add(1)),
            "DECA" => self.set_a(a.wrapping_sub(1)),
            "INCB" => self.set_b(b.wrapping_add(1)),
            "DECB" => self.set_b(b.wrapping_sub(1)),
            "INX" => self.set_x(x.wrapping_add(1)),
            "DEX" => self.set_x(x.wrapping_sub(1)),

            // Shifts and rotates
            "ASLA" => self.set_a(a << 1),
            "ASLB" => self.set_b(b << 1),
            "LSRA" => self.set_a(a >> 1),
            "LSRB" => self.set_b(b >> 1),
            "ASRA" => self.set_a(((a as i8) >> 1) as u8),
            "ASRB" => self.set_b(((b as i8) >> 1) as u8),
            "ROLA" => self.set_a(a.rotate_left(1)),
            "ROLB" => self.set_b(b.rotate_left(1)),
            "RORA" => self.set_a(a.rotate_right(1)),
            "RORB" => self.set_b(b.rotate_right(1)),

            // Comparisons
            "CMPA" => Self::compare("A - M", a, self.read_byte(op)),
            "CMPB" => Self::compare("B - M", b, self.read_byte(op)),
            "CBA" => Self::compare("A - B", a, b),

            // Control flow
            "BRA" | "BSR" => Self::branch(true, Self::addr(op)),
            "BEQ" => Self::branch(b == 0, Self::addr(op)),
            "BNE" => Self::branch(b != 0, Self::addr(op)),
            "BMI" => Self::branch(a & 0x80 != 0, Self::addr(op)),
            "BPL" => Self::branch(a & 0x80 == 0, Self::addr(op)),
            "JMP" | "JSR" => Effect::Jump {
                target: Self::addr(op),
            },
            "RTS" => Effect::Return,

            "NOP" => Effect::Nothing,
            _ => Effect::NotSimulated,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn reg(&self, reg: Register) -> u16 {
        self.state.reg(reg)
    }

    pub fn a(&self) -> u8 {
        self.state.a
    }

    pub fn b(&self) -> u8 {
        self.state.b
    }

    pub fn x(&self) -> u16 {
        self.state.x
    }

    pub fn pc(&self) -> u16 {
        self.state.pc
    }

    pub fn memory(&self) -> &BTreeMap<u16, u8> {
        self.state.memory()
    }

    /// Steps taken since the last load.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn loaded(src: &str) -> Emulator {
        let mut emu = Emulator::new();
        emu.load(&assemble(src).machine_code());
        emu
    }

    #[test]
    fn fresh_load() {
        let mut emu = Emulator::new();
        assert_eq!(emu.status(), Status::Idle);
        assert_eq!(emu.step(), Trace::NotLoaded);

        emu.load("86 05");
        assert_eq!(emu.status(), Status::Running);
        assert_eq!((emu.a(), emu.b(), emu.x(), emu.pc()), (0, 0, 0, LOAD_ADDR));
        assert!(emu.memory().is_empty());
    }

    #[test]
    fn load_discards_state() {
        let mut emu = loaded("LDAA #9\nSTAA $10");
        emu.run();
        assert_eq!(emu.memory().get(&0x10), Some(&9));
        emu.load("01");
        assert_eq!((emu.a(), emu.pc(), emu.steps()), (0, LOAD_ADDR, 0));
        assert!(emu.memory().is_empty());
        assert!(emu.has_next_step());
    }

    #[test]
    fn load_then_add() {
        let mut emu = loaded("LDAA #5\nADDA #3");
        assert_eq!(
            emu.step().to_string(),
            "PC: $C000 -> LDAA -> A = 5"
        );
        assert_eq!((emu.a(), emu.pc()), (5, 0xC002));
        emu.step();
        assert_eq!((emu.a(), emu.pc()), (8, 0xC004));
        assert!(!emu.has_next_step());
        assert_eq!(emu.status(), Status::Completed);
        assert_eq!(emu.step(), Trace::Completed);
    }

    #[test]
    fn registers_wrap() {
        let mut emu = loaded("LDAA #$FF\nINCA\nLDAB #0\nDECB\nLDX #0\nDEX");
        emu.run();
        assert_eq!((emu.a(), emu.b(), emu.x()), (0, 0xFF, 0xFFFF));
    }

    #[test]
    fn memory_modes() {
        let src = "\
  LDX #$0100
  LDAA #7
  STAA 2,X
  LDAB 2,X
  STAB $20
  LDAA #0
  ADDA $20
  STAA $0200
  STX $30
  LDX #0
  LDX $30";
        let mut emu = loaded(src);
        emu.run();
        assert_eq!(emu.state().mem(0x0102), 7);
        assert_eq!(emu.b(), 7);
        assert_eq!(emu.state().mem(0x20), 7);
        assert_eq!(emu.a(), 7);
        assert_eq!(emu.state().mem(0x0200), 7);
        assert_eq!((emu.state().mem(0x30), emu.state().mem(0x31)), (0x01, 0x00));
        assert_eq!(emu.x(), 0x0100);
        // Unwritten memory reads as zero
        assert_eq!(emu.state().mem(0x4000), 0);
    }

    #[test]
    fn shifts() {
        let mut emu = loaded("LDAA #$81\nASRA");
        emu.run();
        assert_eq!(emu.a(), 0xC0);
        let mut emu = loaded("LDAA #$81\nLSRA");
        emu.run();
        assert_eq!(emu.a(), 0x40);
        let mut emu = loaded("LDAA #$81\nROLA");
        emu.run();
        assert_eq!(emu.a(), 0x03);
        let mut emu = loaded("LDAB #$81\nRORB\nTBA\nASLA");
        emu.run();
        assert_eq!((emu.a(), emu.b()), (0x80, 0xC0));
    }

    #[test]
    fn counting_loop() {
        let src = "  LDAB #3\nLOOP INCA\n  DECB\n  BNE LOOP\n  NOP";
        let mut emu = loaded(src);
        let log = emu.run();
        assert_eq!(emu.a(), 3);
        assert_eq!(emu.b(), 0);
        assert_eq!(emu.status(), Status::Completed);
        assert!(log.contains(&Trace::Exec {
            pc: 0xC004,
            mnemonic: "BNE",
            effect: Effect::Branch {
                taken: true,
                target: 0xC002
            },
        }));
        assert_eq!(log.last().unwrap().to_string(), "PC: $C006 -> NOP -> no operation");
        // 1 + 3 * 3 + 1
        assert_eq!(emu.steps(), 11);
    }

    #[test]
    fn branch_on_sign() {
        let mut emu = loaded("  LDAA #$80\n  BMI NEG\n  LDAB #1\nNEG BPL NEG");
        emu.run();
        assert_eq!(emu.b(), 0);
        assert_eq!(emu.status(), Status::Completed);
    }

    #[test]
    fn jump_and_call() {
        let src = "  JSR SUB\n  NOP\nSUB LDAA #1\n  JMP END1\n  LDAA #2\nEND1 RTS";
        let mut emu = loaded(src);
        let log = emu.run();
        assert_eq!(emu.a(), 1);
        assert_eq!(log[0].to_string(), "PC: $C000 -> JSR -> PC = $C004");
        assert_eq!(log.last().unwrap().to_string(), "PC: $C00B -> RTS -> return");
        // No call stack: RTS falls through to the end of the program
        assert_eq!(emu.pc(), 0xC00C);
        assert_eq!(emu.status(), Status::Completed);
    }

    #[test]
    fn branch_to_self_halts() {
        let mut emu = loaded("HERE BRA HERE").with_step_limit(10);
        let log = emu.run();
        assert_eq!(log.len(), 11);
        assert_eq!(log[10], Trace::LimitReached { limit: 10 });
        assert_eq!(emu.status(), Status::Halted);
        assert!(!emu.has_next_step());
        assert_eq!(emu.pc(), LOAD_ADDR);
        // Further steps leave state alone
        assert_eq!(emu.step(), Trace::LimitReached { limit: 10 });
        assert_eq!(emu.steps(), 10);
    }

    #[test]
    fn default_limit() {
        let mut emu = loaded("HERE BRA HERE");
        let log = emu.run();
        assert_eq!(log.len(), STEP_LIMIT + 1);
        assert_eq!(
            log.last().unwrap().to_string(),
            "Stopped after 100 steps (infinite loop detected)"
        );
    }

    #[test]
    fn unknown_and_invalid_lines() {
        let mut emu = Emulator::new();
        emu.load("00 12\nERROR: invalid instruction -> FOO\n\n4C");
        assert_eq!(
            emu.step(),
            Trace::UnknownOpcode {
                pc: 0xC000,
                opcode: 0x00
            }
        );
        assert_eq!(emu.pc(), 0xC002);
        assert!(matches!(emu.step(), Trace::Invalid { pc: 0xC002, .. }));
        assert_eq!(emu.step(), Trace::Blank { pc: 0xC002 });
        assert_eq!((emu.a(), emu.b(), emu.x()), (0, 0, 0));
        emu.step();
        assert_eq!((emu.a(), emu.pc()), (1, 0xC003));
    }

    #[test]
    fn blank_line_keeps_pc() {
        let mut emu = Emulator::new();
        emu.load("\n\n86 05\n\n4C");
        assert_eq!(emu.step(), Trace::Blank { pc: LOAD_ADDR });
        assert_eq!(emu.step(), Trace::Blank { pc: LOAD_ADDR });
        assert_eq!(emu.pc(), LOAD_ADDR);
        emu.step();
        assert_eq!((emu.a(), emu.pc()), (5, 0xC002));
        assert_eq!(emu.step(), Trace::Blank { pc: 0xC002 });
        assert_eq!(emu.pc(), 0xC002);
        emu.step();
        assert_eq!((emu.a(), emu.pc(), emu.steps()), (6, 0xC003, 5));
    }

    #[test]
    fn compare_leaves_state() {
        let mut emu = loaded("LDAA #3\nCMPA #5");
        let log = emu.run();
        assert_eq!(log[1].to_string(), "PC: $C002 -> CMPA -> A - M = -2");
        assert_eq!(emu.a(), 3);
    }

    #[test]
    fn branch_out_of_program_completes() {
        let mut emu = Emulator::new();
        emu.load("7E 00 00\n01");
        emu.step();
        assert_eq!(emu.pc(), 0x0000);
        assert_eq!(emu.status(), Status::Completed);
    }
}
