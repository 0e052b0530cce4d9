//! Register shifts: SLA/SLL/SRA/SRL operate on a single register, the
//! double forms SLDA/SLDL/SRDA/SRDL on the R1/R1+1 pair. The shift amount is
//! the raw D2 field taken as-is -- the reference engine never adds the base
//! register or masks it to the usual 6-bit range, and this reproduces that
//! rather than "fixing" it.

use crate::condition_code::ConditionCode;
use crate::decode::Decoded;
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::executor::Next;

fn shift_count(d2: u16) -> u32 {
    d2 as u32
}

/// SLA: algebraic left shift of a 32-bit register, sign bit held fixed.
/// Overflow is any shifted-out bit that disagrees with the sign.
pub fn sla(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let value = engine.regs.as_u32(r1);
    let sign = value & 0x8000_0000;
    let mut numerics = value & 0x7FFF_FFFF;
    let mut overflow = false;
    for _ in 0..shift_count(d2) {
        let shifted_out = numerics & 0x4000_0000;
        if (shifted_out != 0) != (sign != 0) {
            overflow = true;
        }
        numerics = (numerics << 1) & 0x7FFF_FFFF;
    }
    let result = sign | numerics;
    engine.regs.set_u32(r1, result);
    let signed = result as i32 as i64;
    engine.cc = if overflow {
        ConditionCode::Cc3
    } else {
        ConditionCode::from_signed_result(signed, false)
    };
    Ok(Next::Advance)
}

/// SLDA: SLA's double-register form, shifting the 64-bit R1:R1+1 pair.
pub fn slda(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let value = engine.regs.as_pair_u64(r1 & 0xE);
    let sign = value & (1u64 << 63);
    let mut numerics = value & !(1u64 << 63);
    let mut overflow = false;
    for _ in 0..shift_count(d2) {
        let shifted_out = numerics & (1u64 << 62);
        if (shifted_out != 0) != (sign != 0) {
            overflow = true;
        }
        numerics = (numerics << 1) & !(1u64 << 63);
    }
    let result = sign | numerics;
    engine.regs.set_pair_u64(r1 & 0xE, result);
    let signed = result as i64;
    engine.cc = if overflow {
        ConditionCode::Cc3
    } else {
        ConditionCode::from_signed_result(signed, false)
    };
    Ok(Next::Advance)
}

/// SLL: logical left shift, zero-filled, never touches the condition code.
pub fn sll(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let count = shift_count(d2);
    let value = if count >= 32 { 0 } else { engine.regs.as_u32(r1) << count };
    engine.regs.set_u32(r1, value);
    Ok(Next::Advance)
}

pub fn sldl(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let count = shift_count(d2);
    let value = engine.regs.as_pair_u64(r1 & 0xE);
    let shifted = if count >= 64 { 0 } else { value << count };
    engine.regs.set_pair_u64(r1 & 0xE, shifted);
    Ok(Next::Advance)
}

/// SRA: algebraic right shift, sign-extending from the left.
pub fn sra(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let value = engine.regs.as_int(r1);
    let count = shift_count(d2).min(31);
    let result = value >> count;
    engine.regs.set_int(r1, result);
    engine.cc = ConditionCode::from_signed_result(result as i64, false);
    Ok(Next::Advance)
}

pub fn srda(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let value = engine.regs.as_pair_u64(r1 & 0xE) as i64;
    let count = shift_count(d2).min(63);
    let result = value >> count;
    engine.regs.set_pair_u64(r1 & 0xE, result as u64);
    engine.cc = ConditionCode::from_signed_result(result, false);
    Ok(Next::Advance)
}

/// SRL: logical right shift, zero-filled, never touches the condition code.
pub fn srl(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let count = shift_count(d2);
    let value = if count >= 32 { 0 } else { engine.regs.as_u32(r1) >> count };
    engine.regs.set_u32(r1, value);
    Ok(Next::Advance)
}

pub fn srdl(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, d2, .. } = d else { unreachable!() };
    let count = shift_count(d2);
    let value = engine.regs.as_pair_u64(r1 & 0xE);
    let shifted = if count >= 64 { 0 } else { value >> count };
    engine.regs.set_pair_u64(r1 & 0xE, shifted);
    Ok(Next::Advance)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn sla_shifts_and_preserves_sign() {
        let mut engine = Engine::new(Memory::new(8));
        engine.regs.set_int(1, -4);
        sla(&mut engine, Decoded::Rx { r1: 1, x2: 0, b2: 0, d2: 1 }, 0).unwrap();
        assert_eq!(engine.regs.as_int(1), -8);
        assert_eq!(engine.cc, ConditionCode::Cc1);
    }

    #[test]
    fn sla_overflow_sets_cc3() {
        let mut engine = Engine::new(Memory::new(8));
        engine.regs.set_int(1, i32::MAX);
        sla(&mut engine, Decoded::Rx { r1: 1, x2: 0, b2: 0, d2: 1 }, 0).unwrap();
        assert_eq!(engine.cc, ConditionCode::Cc3);
    }

    #[test]
    fn srl_is_zero_filled_and_ignores_cc() {
        let mut engine = Engine::new(Memory::new(8));
        engine.regs.set_u32(1, 0x8000_0000);
        engine.cc = ConditionCode::Cc3;
        srl(&mut engine, Decoded::Rx { r1: 1, x2: 0, b2: 0, d2: 4 }, 0).unwrap();
        assert_eq!(engine.regs.as_u32(1), 0x0800_0000);
        assert_eq!(engine.cc, ConditionCode::Cc3);
    }

    #[test]
    fn sldl_shifts_across_the_register_pair() {
        let mut engine = Engine::new(Memory::new(8));
        engine.regs.set_pair_u64(2, 1);
        sldl(&mut engine, Decoded::Rx { r1: 2, x2: 0, b2: 0, d2: 4 }, 0).unwrap();
        assert_eq!(engine.regs.as_pair_u64(2), 16);
    }
}
