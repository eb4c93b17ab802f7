// Assembling
mod lexer;
mod parser;
mod span;
pub use span::Span;
mod table;
mod token;
mod assembler;
pub use assembler::{assemble, Assembler};
mod air;
pub use air::{Air, AsmLine};
mod symbol;
pub use symbol::{Mode, Register, SymbolTable};

// Running
mod program;
pub use program::{Code, Entry, Program};
mod runtime;
pub use runtime::{Effect, Emulator, RunState, Status, Trace};
pub mod output;

mod error;
pub use error::{report, AsmError, ERROR_MARKER};

pub mod env;

/// Default origin for assembly and the address programs are loaded at.
pub const LOAD_ADDR: u16 = 0xC000;

/// Amount of steps a run may take before it is considered stuck.
pub const STEP_LIMIT: usize = 100;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
