//! The fetch-decode-execute loop and the opcode dispatch table.

use log::trace;

use crate::decode::{Decoded, Format};
use crate::engine::{Control, Engine, StepEvent, EXECUTE_STAGED_PC, NORMAL_TERMINATION_PC};
use crate::error::{EngineError, EngineResult};
use crate::instructions;

/// What a handler wants the executor to do with the program counter next.
/// Most handlers just fall through to the next instruction; branches and
/// EXECUTE override this explicitly rather than the executor guessing from
/// a returned address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Fall through to `pc + format.length()`.
    Advance,
    /// Branch to this absolute address.
    Branch(usize),
    /// The handler already set `engine.control` itself (EXECUTE staging).
    ControlSet,
    /// Normal termination (branch to R14's sentinel return address).
    Halt,
}

pub type Handler = fn(&mut Engine, Decoded, usize) -> EngineResult<Next>;

/// Maps an opcode byte to its format and handler. Grouped by family in the
/// order the reference engine's own `mach_inst` table lists them, and using
/// the same opcode byte values, so a listing produced against the original
/// assembles and runs unchanged here.
fn opcode_table(opcode: u8) -> Option<(Format, Handler)> {
    use Format::*;
    use instructions::*;
    Some(match opcode {
        0x05 => (Rr, branch::balr),
        0x46 => (Rx, branch::bct),
        0x06 => (Rr, branch::bctr),
        0x47 => (Rx, branch::bc),
        0x07 => (Rr, branch::bcr),
        0x45 => (Rx, branch::bal),
        0x58 => (Rx, move_data::l),
        0x48 => (Rx, move_data::lh),
        0x18 => (Rr, move_data::lr),
        0x41 => (Rx, move_data::la),
        0xD2 => (Ss, move_data::mvc),
        0x92 => (Si, move_data::mvi),
        0x5A => (Rx, arithmetic::a),
        0x4A => (Rx, arithmetic::ah),
        0x1A => (Rr, arithmetic::ar),
        0x5B => (Rx, arithmetic::s),
        0x4B => (Rx, arithmetic::sh),
        0x1B => (Rr, arithmetic::sr),
        0x59 => (Rx, compare::c),
        0x49 => (Rx, compare::ch),
        0x55 => (Rx, compare::cl),
        0x15 => (Rr, compare::clr),
        0x95 => (Si, compare::cli),
        0xD5 => (Ss, compare::clc),
        0xBD => (Rs, compare::clm),
        0x50 => (Rx, move_data::st),
        0x42 => (Rx, move_data::stc),
        0x40 => (Rx, move_data::sth),
        0x4F => (Rx, decimal::cvb),
        0x4E => (Rx, decimal::cvd),
        0x14 => (Rr, logical::nr),
        0x54 => (Rx, logical::n),
        0x94 => (Si, logical::ni),
        0xD4 => (Ss, logical::nc),
        0x5D => (Rx, arithmetic::d),
        0x16 => (Rr, logical::or),
        0x56 => (Rx, logical::o),
        0x96 => (Si, logical::oi),
        0xD6 => (Ss, logical::oc),
        0x1D => (Rr, arithmetic::dr),
        0x17 => (Rr, logical::xr),
        0x57 => (Rx, logical::x),
        0x97 => (Si, logical::xi),
        0xD7 => (Ss, logical::xc),
        0x5C => (Rx, arithmetic::m),
        0x43 => (Rx, move_data::ic),
        0xBF => (Rs, move_data::icm),
        0xBE => (Rs, move_data::stcm),
        0x12 => (Rr, arithmetic::ltr),
        0x44 => (Rx, branch::ex),
        0x19 => (Rr, compare::cr),
        0x91 => (Si, logical::tm),
        0xDC => (Ss, translate::tr),
        0xDD => (Ss, translate::trt),
        0xFA => (Ss2, decimal::ap),
        0xFB => (Ss2, decimal::sp),
        0xFC => (Ss2, decimal::mp),
        0xF8 => (Ss2, decimal::zap),
        0x4C => (Rx, arithmetic::mh),
        0x1C => (Rr, arithmetic::mr),
        0xF2 => (Ss2, decimal::pack),
        0xF3 => (Ss2, decimal::unpk),
        0xF9 => (Ss2, decimal::cp),
        0xFD => (Ss2, decimal::dp),
        0x90 => (Rs, move_data::stm),
        0x98 => (Rs, move_data::lm),
        0x10 => (Rr, arithmetic::lpr),
        0x11 => (Rr, arithmetic::lnr),
        0x13 => (Rr, arithmetic::lcr),
        0x5E => (Rx, arithmetic::al),
        0x1E => (Rr, arithmetic::alr),
        0x5F => (Rx, arithmetic::sl),
        0x1F => (Rr, arithmetic::slr),
        0x8B => (Rx, shift::sla),
        0x8F => (Rx, shift::slda),
        0x8D => (Rx, shift::sldl),
        0x89 => (Rx, shift::sll),
        0x8A => (Rx, shift::sra),
        0x8E => (Rx, shift::srda),
        0x8C => (Rx, shift::srdl),
        0x88 => (Rx, shift::srl),
        0xD1 => (Ss, move_data::mvn),
        0xF1 => (Ss2, decimal::mvo),
        0xD3 => (Ss, move_data::mvz),
        0x0F => (Rr, compare::clcl),
        0x0E => (Rr, compare::mvcl),
        0xBA => (Rs, arithmetic::cs),
        0xBB => (Rs, arithmetic::cds),
        0xF0 => (Ss2, decimal::srp),
        0xDE => (Ss, decimal::ed),
        0xDF => (Ss, decimal::edmk),
        0x86 => (Rs, branch::bxh),
        0x87 => (Rs, branch::bxle),
        0x0A => (Rr, svc_instr::svc),
        _ => return None,
    })
}

/// Looks up the instruction format for an opcode byte without dispatching
/// it -- used by EX to size and slice its staged subject instruction.
pub fn format_for_opcode(opcode: u8) -> Option<Format> {
    opcode_table(opcode).map(|(f, _)| f)
}

/// Runs one fetch-decode-execute cycle, mutating `engine` in place and
/// returning an observation of what happened.
pub fn step(engine: &mut Engine) -> EngineResult<StepEvent> {
    let pc_before = match engine.control {
        Control::Halted => {
            return Ok(StepEvent {
                pc_before: NORMAL_TERMINATION_PC,
                cc: engine.cc,
                registers: snapshot(engine),
                breakpoint_hit: false,
                halted: true,
            })
        }
        Control::Fetch(pc) => pc,
        Control::FetchStaged { .. } => EXECUTE_STAGED_PC,
    };

    let breakpoint_hit = pc_before != EXECUTE_STAGED_PC && engine.has_breakpoint(pc_before);

    let (format, opcode, bytes): (Format, u8, [u8; 6]) = match engine.control.clone() {
        Control::FetchStaged { buffer, len, .. } => {
            let opcode = buffer[0];
            let format = opcode_table(opcode)
                .map(|(f, _)| f)
                .ok_or(EngineError::UnknownOpcode {
                    opcode,
                    pc: pc_before,
                })?;
            if format.length() != len {
                return Err(EngineError::ExecuteStagingExhausted);
            }
            (format, opcode, buffer)
        }
        Control::Fetch(pc) => {
            let opcode = engine
                .memory
                .read_u8(pc)
                .map_err(|_| EngineError::FetchOutOfBounds {
                    pc,
                    memory_len: engine.memory.len(),
                })?;
            let format = opcode_table(opcode)
                .map(|(f, _)| f)
                .ok_or(EngineError::UnknownOpcode { opcode, pc })?;
            let mut bytes = [0u8; 6];
            let slice = engine.memory.read(pc, format.length())?;
            bytes[..slice.len()].copy_from_slice(slice);
            (format, opcode, bytes)
        }
        Control::Halted => unreachable!("handled above"),
    };

    let (_, handler) = opcode_table(opcode).expect("looked up above");
    let decoded = fetch_and_decode_from_bytes(format, &bytes);
    trace!("pc={:06X} opcode={:02X} format={:?}", pc_before, opcode, format);

    let resume_pc = match engine.control {
        Control::FetchStaged { resume_pc, .. } => Some(resume_pc),
        _ => None,
    };

    let outcome = handler(engine, decoded, pc_before)?;

    match outcome {
        Next::Advance => {
            let next = if let Some(resume) = resume_pc {
                resume
            } else {
                pc_before + format.length()
            };
            engine.control = if next == NORMAL_TERMINATION_PC {
                Control::Halted
            } else {
                Control::Fetch(next)
            };
        }
        Next::Branch(target) => {
            engine.control = if target == NORMAL_TERMINATION_PC {
                Control::Halted
            } else {
                Control::Fetch(target)
            };
        }
        Next::ControlSet => {
            // EXECUTE already staged its buffer into engine.control.
        }
        Next::Halt => {
            engine.control = Control::Halted;
        }
    }

    Ok(StepEvent {
        pc_before,
        cc: engine.cc,
        registers: {
            let mut snap = [0u32; 16];
            for (r, v) in engine.regs.iter() {
                snap[r as usize] = v;
            }
            snap
        },
        breakpoint_hit,
        halted: engine.is_halted(),
    })
}

fn fetch_and_decode_from_bytes(format: Format, bytes: &[u8]) -> Decoded {
    crate::decode::decode(format, &bytes[..format.length()])
}

fn snapshot(engine: &Engine) -> [u32; 16] {
    let mut snap = [0u32; 16];
    for (r, v) in engine.regs.iter() {
        snap[r as usize] = v;
    }
    snap
}

/// Runs the engine to completion (normal or abnormal termination), calling
/// `on_step` after every cycle. Used by the headless runner; the
/// interactive debugger drives `step` itself so it can pause on breakpoints.
pub fn run<F: FnMut(&StepEvent)>(engine: &mut Engine, mut on_step: F) -> EngineResult<()> {
    loop {
        let event = step(engine)?;
        on_step(&event);
        if event.halted {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn unknown_opcode_is_an_error() {
        let mut memory = Memory::new(4);
        memory.write_u8(0, 0xFF).unwrap();
        let mut engine = Engine::new(memory);
        assert!(step(&mut engine).is_err());
    }

    #[test]
    fn bct_loop_then_branch_to_r14_halts() {
        // LA R3,0 ; LA R4,2 ; loop: BCT R4,loop ; LA R15,0 ; BR R14(via BCR 15,14)
        let mut memory = Memory::new(32);
        let program: &[u8] = &[
            0x41, 0x30, 0x00, 0x00, // LA R3,0
            0x41, 0x40, 0x00, 0x02, // LA R4,2
            0x46, 0x40, 0x00, 0x08, // BCT R4, loop (offset 8, this instruction's own address)
            0x07, 0xFE, // BCR 15,14
        ];
        memory.write(0, program).unwrap();
        let mut engine = Engine::new(memory);
        run(&mut engine, |_| {}).unwrap();
        assert!(engine.is_halted());
        assert_eq!(engine.regs.as_int(4), 0);
    }
}
