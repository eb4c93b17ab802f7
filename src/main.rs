use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use m6800::output::{Condition, Output};
use m6800::{assemble, Air, Emulator, Status, STEP_LIMIT};

/// Two-pass assembler and step emulator for a subset of the Motorola 6800.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file and show the listing
    Asm {
        /// `.asm` file to assemble
        name: PathBuf,
        /// Destination to write machine code to, one line per source line
        dest: Option<PathBuf>,
    },
    /// Check a `.asm` file without running or writing machine code
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Run a `.asm` file, or machine code written by `asm`, and trace every step
    Run {
        /// `.asm` or `.hex` file to run
        name: PathBuf,
        /// Stop after this many steps
        #[arg(short = 's', long)]
        max_steps: Option<usize>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Print the memory image of a `.asm` file, 16 bytes per row
    Dump {
        /// `.asm` file to assemble
        name: PathBuf,
    },
    /// Place a watch on a `.asm` file to receive constant assembler updates
    Watch {
        /// `.asm` file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    m6800::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(m6800::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        return match args.path {
            Some(path) => run(&path, None, false),
            None => {
                println!("{SHORT_INFO}");
                Ok(())
            }
        };
    };

    match command {
        Command::Asm { name, dest } => {
            file_message(Green, "Assembling", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let air = assemble(&src);
            Output::Normal.print_listing(&air, &src);

            if !air.symbols().is_empty() {
                message(Cyan, "Symbols", "defined labels");
                Output::Normal.print_symbols(air.symbols());
            }
            if let Some(dest) = dest {
                fs::write(&dest, air.machine_code() + "\n").into_diagnostic()?;
                file_message(Green, "Saved", &dest);
            }
            finish(&air);
            Ok(())
        }
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let air = assemble(&src);
            print_reports(&name, &src, &air);
            if air.has_errors() {
                bail!("found {} errors", air.errors().count());
            }
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Command::Run {
            name,
            max_steps,
            minimal,
        } => run(&name, max_steps, minimal),
        Command::Dump { name } => {
            file_message(Green, "Assembling", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let air = assemble(&src);
            Output::Normal.print_image(air.orig(), &air.image());
            finish(&air);
            Ok(())
        }
        Command::Watch { name } => {
            if !name.exists() {
                bail!("File does not exist. Exiting...")
            }
            // Vim breaks if watching a single file
            let folder_path = match name.parent() {
                Some(pth) if pth.is_dir() => pth.to_path_buf(),
                _ => Path::new(".").to_path_buf(),
            };

            // Clear screen and move cursor to top left
            print!("\x1B[2J\x1B[2;1H");
            file_message(Green, "Watching", &name);
            message(Cyan, "Help", "press CTRL+C to exit");

            let mut watcher =
                Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

            watcher
                .watch(folder_path, move |event: Event| match event.kind {
                    // Watch remove for vim changes
                    EventKind::Modify(_) | EventKind::Remove(_) => {
                        print!("\x1B[2J\x1B[2;1H");
                        file_message(Green, "Watching", &name);
                        message(Green, "Re-checking", "file change detected");
                        message(Cyan, "Help", "press CTRL+C to exit");

                        // Makes reruns more obvious
                        sleep(Duration::from_millis(50));

                        let src = match fs::read_to_string(&name) {
                            Ok(src) => src,
                            Err(e) => {
                                eprintln!("{e}. Exiting...");
                                std::process::exit(1)
                            }
                        };
                        let air = assemble(&src);
                        print_reports(&name, &src, &air);
                        if !air.has_errors() {
                            message(Green, "Success", "no errors found!");
                        }
                        Flow::Continue
                    }
                    _ => Flow::Continue,
                })
                .into_diagnostic()?;
            watcher.run();
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    if Output::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

/// Report assembly errors as diagnostics on stderr.
fn print_reports(name: &Path, src: &str, air: &Air) {
    let name = name.display().to_string();
    for (idx, err, span) in air.errors() {
        let report = m6800::report(&name, src, idx, span, err);
        eprintln!("{:?}", report);
    }
}

fn finish(air: &Air) {
    match air.errors().count() {
        0 => message(MsgColor::Green, "Finished", "no errors"),
        n => message(MsgColor::Red, "Finished", &format!("with {n} errors")),
    }
}

fn run(name: &Path, max_steps: Option<usize>, minimal: bool) -> Result<()> {
    Output::set_minimal(minimal);
    let src = fs::read_to_string(name).into_diagnostic()?;

    let machine_code = match name.extension().and_then(|ext| ext.to_str()) {
        Some("asm") => {
            file_message(MsgColor::Green, "Assembling", name);
            let air = assemble(&src);
            // Failed lines are kept and skipped by the emulator
            for (idx, err, _) in air.errors() {
                message(MsgColor::Red, "Error", &format!("line {}: {err}", idx + 1));
            }
            air.machine_code()
        }
        Some("hex") => src,
        Some(_) => bail!("File has unknown extension. Exiting..."),
        None => bail!("File has no extension. Exiting..."),
    };

    let limit = max_steps.or_else(m6800::env::step_limit).unwrap_or(STEP_LIMIT);
    let mut emu = Emulator::new().with_step_limit(limit);
    emu.load(&machine_code);

    message(MsgColor::Green, "Running", "loaded program");
    for trace in emu.run() {
        Output::Normal.print_trace(&trace);
    }

    Output::Info(Condition::Sometimes).println("Registers");
    Output::Normal.print_registers(&emu);
    Output::Info(Condition::Sometimes).println("Memory");
    Output::Normal.print_memory(emu.memory());

    match emu.status() {
        Status::Halted => file_message(MsgColor::Red, "Halted", name),
        _ => file_message(MsgColor::Green, "Completed", name),
    }
    Ok(())
}

const SHORT_INFO: &str = r"
m6800: a two-pass assembler and step emulator for a subset of the Motorola 6800.
Please use `-h` or `--help` to access the usage instructions and documentation.
";
