//! SVC as an opcode: the host-service number is `R1*16 + R2`, the two
//! nibbles following the opcode byte in the RR encoding.

use crate::decode::Decoded;
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::executor::Next;

pub fn svc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let svc_num = r1 * 16 + r2;
    let output = engine
        .svc
        .dispatch(svc_num, &mut engine.regs, &mut engine.memory, engine.cc)?;
    engine.pending_output = output;
    Ok(Next::Advance)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn svc_255_surfaces_terminal_output() {
        let mut engine = Engine::new(Memory::new(16));
        engine.memory.write(0, &[0xC1, 0xC2]).unwrap(); // EBCDIC "AB"
        engine.regs.set_int(0, 0);
        engine.regs.set_int(1, 2);
        // SVC 255 = R1*16 + R2 = 15*16 + 15
        svc(&mut engine, Decoded::Rr { r1: 15, r2: 15 }, 0).unwrap();
        match engine.pending_output {
            Some(crate::svc::SvcOutput::Terminal(ref text)) => assert_eq!(text, "AB"),
            other => panic!("unexpected output: {:?}", other),
        }
    }
}
