//! The branch family: BAL/BALR linkage, BC/BCR conditional branch, BCT/BCTR
//! decrement-and-branch, BXH/BXLE indexed loop branches, and EX.

use crate::decode::{calc_address, Decoded, Format};
use crate::engine::{Control, Engine};
use crate::error::EngineResult;
use crate::executor::Next;

pub fn bal(engine: &mut Engine, d: Decoded, pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let target = calc_address(&engine.regs, b2, x2, d2);
    engine.regs.set_int(r1, (pc + Format::Rx.length()) as i32);
    Ok(Next::Branch(target as usize))
}

pub fn balr(engine: &mut Engine, d: Decoded, pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let link = (pc + Format::Rr.length()) as i32;
    if r2 == 0 {
        engine.regs.set_int(r1, link);
        return Ok(Next::Advance);
    }
    let target = engine.regs.as_int(r2);
    engine.regs.set_int(r1, link);
    Ok(Next::Branch(target as usize))
}

/// CC is one-hot, so `mask & cc.mask() != 0` is a direct branch test; mask
/// 0 never branches, mask 0xF always does.
pub fn bc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1: mask, x2, b2, d2 } = d else { unreachable!() };
    if mask & engine.cc.mask() != 0 {
        let target = calc_address(&engine.regs, b2, x2, d2);
        Ok(Next::Branch(target as usize))
    } else {
        Ok(Next::Advance)
    }
}

pub fn bcr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1: mask, r2 } = d else { unreachable!() };
    if mask & engine.cc.mask() != 0 && r2 != 0 {
        let target = engine.regs.as_int(r2);
        Ok(Next::Branch(target as usize))
    } else {
        Ok(Next::Advance)
    }
}

/// BCT: decrement R1, branch to the RX address if the result is nonzero.
pub fn bct(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let decremented = engine.regs.as_int(r1) - 1;
    engine.regs.set_int(r1, decremented);
    if decremented != 0 {
        let target = calc_address(&engine.regs, b2, x2, d2);
        Ok(Next::Branch(target as usize))
    } else {
        Ok(Next::Advance)
    }
}

/// BCTR with R2=0 never branches (used purely to decrement R1).
pub fn bctr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let decremented = engine.regs.as_int(r1) - 1;
    engine.regs.set_int(r1, decremented);
    if decremented != 0 && r2 != 0 {
        let target = engine.regs.as_int(r2);
        Ok(Next::Branch(target as usize))
    } else {
        Ok(Next::Advance)
    }
}

/// BXH: R1 += regs[R2]; branch if the new R1 is strictly greater than the
/// compare value. If R2 is odd, R2 itself is both the increment and the
/// compare; if even, R2+1 supplies the compare value.
pub fn bxh(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2, b2, d2 } = d else { unreachable!() };
    let (increment, compare) = bxh_operands(engine, r2);
    let new_value = engine.regs.as_int(r1) + increment;
    engine.regs.set_int(r1, new_value);
    if new_value > compare {
        let target = calc_address(&engine.regs, b2, 0, d2);
        Ok(Next::Branch(target as usize))
    } else {
        Ok(Next::Advance)
    }
}

/// BXLE: same increment rule as BXH, branches while the new R1 is less than
/// or equal to the compare value.
pub fn bxle(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2, b2, d2 } = d else { unreachable!() };
    let (increment, compare) = bxh_operands(engine, r2);
    let new_value = engine.regs.as_int(r1) + increment;
    engine.regs.set_int(r1, new_value);
    if new_value <= compare {
        let target = calc_address(&engine.regs, b2, 0, d2);
        Ok(Next::Branch(target as usize))
    } else {
        Ok(Next::Advance)
    }
}

fn bxh_operands(engine: &Engine, r2: u8) -> (i32, i32) {
    let increment = engine.regs.as_int(r2);
    let compare = if r2 % 2 == 1 {
        increment
    } else {
        engine.regs.as_int(r2 + 1)
    };
    (increment, compare)
}

/// EX stages the subject instruction addressed by D2(X2,B2), OR-ing its
/// second byte with bits 24-31 of R1, and hands control to the executor's
/// staged-fetch state rather than returning an ordinary next-PC.
pub fn ex(engine: &mut Engine, d: Decoded, pc: usize) -> EngineResult<Next> {
    use crate::error::EngineError;

    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let target = calc_address(&engine.regs, b2, x2, d2) as usize;
    let opcode = engine.memory.read_u8(target)?;

    // The subject of an EX may not itself be EX (opcode 0x44).
    if opcode == 0x44 {
        return Err(EngineError::ExecuteOfExecute);
    }

    let format = crate::executor::format_for_opcode(opcode)
        .ok_or(EngineError::UnknownOpcode { opcode, pc: target })?;
    let mut buffer = [0u8; 6];
    let subject = engine.memory.read(target, format.length())?;
    buffer[..subject.len()].copy_from_slice(subject);

    let or_mask = (engine.regs.as_u32(r1) & 0xFF) as u8;
    buffer[1] |= or_mask;

    engine.control = Control::FetchStaged {
        buffer,
        len: format.length(),
        resume_pc: pc + Format::Rx.length(),
    };
    Ok(Next::ControlSet)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn bct_branches_while_nonzero() {
        let mut engine = Engine::new(Memory::new(16));
        engine.regs.set_int(4, 2);
        let outcome = bct(&mut engine, Decoded::Rx { r1: 4, x2: 0, b2: 0, d2: 8 }, 0).unwrap();
        assert_eq!(outcome, Next::Branch(8));
        assert_eq!(engine.regs.as_int(4), 1);
    }

    #[test]
    fn bct_falls_through_at_zero() {
        let mut engine = Engine::new(Memory::new(16));
        engine.regs.set_int(4, 1);
        let outcome = bct(&mut engine, Decoded::Rx { r1: 4, x2: 0, b2: 0, d2: 8 }, 0).unwrap();
        assert_eq!(outcome, Next::Advance);
        assert_eq!(engine.regs.as_int(4), 0);
    }

    #[test]
    fn balr_with_r2_zero_only_links() {
        let mut engine = Engine::new(Memory::new(16));
        let outcome = balr(&mut engine, Decoded::Rr { r1: 12, r2: 0 }, 0).unwrap();
        assert_eq!(outcome, Next::Advance);
        assert_eq!(engine.regs.as_int(12), 2);
    }
}
