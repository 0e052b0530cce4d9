//! Runs a loaded image to completion with no terminal UI, printing SVC
//! output straight to stdout -- the teacher's `nes-core` headless `run()`,
//! retargeted from a frame-driven loop to this engine's SVC-output model.

use colored::Colorize;
use log::info;

use bal370_engine::{executor, Engine, EngineResult};

pub fn run(engine: &mut Engine) -> EngineResult<()> {
    loop {
        let event = executor::step(engine)?;

        if let Some(output) = engine.pending_output.take() {
            print_output(output);
        }

        if event.halted {
            info!("halted at pc={:06X}", event.pc_before);
            return Ok(());
        }
    }
}

fn print_output(output: bal370_engine::SvcOutput) {
    use bal370_engine::SvcOutput::*;
    match output {
        Terminal(text) => println!("{}", text),
        RegisterDump(dump) => println!("{}", dump.cyan()),
        ConditionCodeDump(cc) => println!("{}", cc.yellow()),
    }
}
