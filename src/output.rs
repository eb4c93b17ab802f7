use std::cell::RefCell;
use std::collections::BTreeMap;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::{
    air::{Air, AsmLine},
    runtime::{Effect, Emulator, Trace},
    symbol::{Register, SymbolTable},
};

/// Bytes per row of a memory dump.
const DUMP_WIDTH: usize = 16;

#[derive(Clone, Copy, Debug)]
pub enum Output {
    /// Results the user asked for, never hidden
    Normal,
    /// Decoration around results
    Info(Condition),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// Dropped if `--minimal`
    Sometimes,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_str(&self, string: &str) {
        match (self, Self::is_minimal()) {
            (Self::Normal, false) => print!("{}", string),
            // Always remove color if `--minimal`
            (Self::Normal, true) | (Self::Info(Condition::Always), true) => {
                print_colorless(string)
            }
            (Self::Info(_), false) => print!("{}", ColoredString::from(string).blue()),
            (Self::Info(Condition::Sometimes), true) => (),
        }
    }

    pub fn println(&self, string: &str) {
        self.print_str(string);
        self.print_str("\n");
    }

    /// Print one emulator step, coloured by what happened.
    pub fn print_trace(&self, trace: &Trace) {
        let text = trace.to_string();
        let line = match trace {
            Trace::Blank { .. } => {
                Output::Info(Condition::Sometimes).println(&text);
                return;
            }
            Trace::Exec {
                effect: Effect::NotSimulated,
                ..
            } => text.dimmed(),
            Trace::Exec { .. } => text.normal(),
            Trace::Invalid { .. } | Trace::UnknownOpcode { .. } => text.yellow(),
            Trace::LimitReached { .. } | Trace::NotLoaded => text.red(),
            Trace::Completed => text.green(),
        };
        self.println(&line.to_string());
    }

    pub fn print_registers(&self, emu: &Emulator) {
        if Self::is_minimal() {
            for reg in Register::ALL {
                self.print_str(&format!("{} {}\n", reg, emu.reg(reg)));
            }
            return;
        }

        self.print_str("\x1b[2m┌───────────────────────────┐\x1b[0m\n");
        self.print_str("\x1b[2m│         \x1b[3mhex     int    uint\x1b[0m\x1b[2m │\x1b[0m\n");
        for reg in Register::ALL {
            self.print_str("\x1b[2m│\x1b[0m");
            self.print_str(&format!(" \x1b[1m{:<3}\x1b[0m  ", reg));
            self.print_str(&register_cells(reg, emu.reg(reg)));
            self.print_str(" \x1b[2m│\x1b[0m\n");
        }
        self.print_str("\x1b[2m└───────────────────────────┘\x1b[0m\n");
    }

    /// Print every written memory cell, in address order.
    pub fn print_memory(&self, mem: &BTreeMap<u16, u8>) {
        if mem.is_empty() {
            Output::Info(Condition::Sometimes).println("memory untouched");
            return;
        }
        for (addr, val) in mem {
            self.println(&format!("${addr:04X} = ${val:02X} ({val})"));
        }
    }

    /// Print a listing of address, encoded bytes and source, one row per source line.
    pub fn print_listing(&self, air: &Air, src: &str) {
        for (idx, (line, text)) in air.lines().iter().zip(src.lines()).enumerate() {
            let addr = air.addr(idx).unwrap_or(air.orig());
            let row = listing_row(addr, line, text);
            if line.is_error() {
                self.println(&row.red().to_string());
            } else {
                self.println(&row);
            }
        }
    }

    pub fn print_symbols(&self, symbols: &SymbolTable) {
        for (label, addr) in symbols.iter() {
            self.println(&format!("{label:<12} ${addr:04X}"));
        }
    }

    /// Print a memory image, 16 bytes per row, starting at `orig`.
    pub fn print_image(&self, orig: u16, image: &[u8]) {
        for row in dump_rows(orig, image) {
            self.println(&row);
        }
    }
}

fn register_cells(reg: Register, value: u16) -> String {
    if reg.is_wide() {
        format!("0x{:04x}  {:-6}  {:-6}", value, value as i16, value)
    } else {
        format!("  0x{:02x}  {:-6}  {:-6}", value, value as u8 as i8, value)
    }
}

fn listing_row(addr: u16, line: &AsmLine, text: &str) -> String {
    match line {
        AsmLine::Empty => format!("{:<4}  {:<8}  {}", "", "", text),
        AsmLine::Bytes(_) => format!("{addr:04X}  {:<8}  {}", line.to_string(), text),
        AsmLine::Error { .. } => format!("{addr:04X}  {:<8}  {}\n      {line}", "", text),
    }
}

/// Memory image as `XXXX: .. ..` rows.
fn dump_rows(orig: u16, image: &[u8]) -> Vec<String> {
    image
        .chunks(DUMP_WIDTH)
        .enumerate()
        .map(|(i, chunk)| {
            let addr = orig.wrapping_add((i * DUMP_WIDTH) as u16);
            let bytes = chunk
                .iter()
                .map(|byte| format!("{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{addr:04X}: {bytes}")
        })
        .collect()
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn print_colorless(string: &str) {
    print!("{}", Decolored::new(string).collect::<String>());
}
