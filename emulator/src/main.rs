mod demo;
mod headless;
mod tui_debugger;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use bal370_engine::{load_obj_bytes, Engine, EngineError, Memory};

/// A System/370 BAL instruction-set emulator: runs a loaded OBJ image
/// headless, or opens an interactive terminal debugger with `--debug`.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Open the interactive terminal debugger instead of running headless.
    #[arg(long)]
    debug: bool,

    /// Path to a raw OBJ byte stream. Omit to run the built-in demo program.
    program: Option<PathBuf>,
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new().init().ok();

    let cli = Cli::parse();

    let memory_bytes = match load_program(cli.program.as_deref()) {
        Ok(bytes) => bytes,
        Err(message) => {
            error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let mut memory = Memory::new(memory_bytes.len());
    if memory.write(0, &memory_bytes).is_err() {
        error!("failed to load program image into memory");
        return ExitCode::FAILURE;
    }
    let engine = Engine::new(memory);

    let result = if cli.debug {
        tui_debugger::Debugger::new(engine, Default::default(), Default::default()).run()
    } else {
        let mut engine = engine;
        headless::run(&mut engine)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(EngineError::TerminalTooSmall {
            rows,
            cols,
            need_rows,
            need_cols,
        }) => {
            error!(
                "terminal is {cols}x{rows}, need at least {need_cols}x{need_rows}"
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_program(path: Option<&std::path::Path>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(|e| format!("could not read {path:?}: {e}"))?;
            load_obj_bytes(&bytes).map_err(|e| e.to_string())
        }
        None => Ok(demo::program_bytes()),
    }
}
