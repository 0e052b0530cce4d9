//! Fixed-point arithmetic: A/AH/AR/S/SH/SR, logical AL/ALR/SL/SLR, the
//! load-complement/negative/positive/test family, and multiply/divide.

use crate::condition_code::ConditionCode;
use crate::decode::{calc_address, Decoded};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::executor::Next;
use crate::packed;

fn op2_from_storage_word(engine: &Engine, addr: i64) -> EngineResult<i32> {
    let bytes = engine.memory.read(addr as usize, 4)?;
    Ok(packed::word_to_int(&[bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn op2_from_storage_half(engine: &Engine, addr: i64) -> EngineResult<i32> {
    let bytes = engine.memory.read(addr as usize, 2)?;
    Ok(packed::sign_extend_halfword(bytes))
}

/// Signed add/subtract CC: overflow takes precedence over zero/sign.
fn add_sub_cc(result: i64) -> ConditionCode {
    let overflowed = result > i32::MAX as i64 || result < i32::MIN as i64;
    ConditionCode::from_signed_result(result as i32 as i64, overflowed)
}

pub fn a(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_word(engine, addr)? as i64;
    let op1 = engine.regs.as_int(r1) as i64;
    let result = op1 + op2;
    engine.regs.set_int(r1, result as i32);
    engine.cc = add_sub_cc(result);
    Ok(Next::Advance)
}

pub fn ah(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_half(engine, addr)? as i64;
    let op1 = engine.regs.as_int(r1) as i64;
    let result = op1 + op2;
    engine.regs.set_int(r1, result as i32);
    engine.cc = add_sub_cc(result);
    Ok(Next::Advance)
}

pub fn ar(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let result = engine.regs.as_int(r1) as i64 + engine.regs.as_int(r2) as i64;
    engine.regs.set_int(r1, result as i32);
    engine.cc = add_sub_cc(result);
    Ok(Next::Advance)
}

pub fn s(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_word(engine, addr)? as i64;
    let op1 = engine.regs.as_int(r1) as i64;
    let result = op1 - op2;
    engine.regs.set_int(r1, result as i32);
    engine.cc = add_sub_cc(result);
    Ok(Next::Advance)
}

pub fn sh(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_half(engine, addr)? as i64;
    let op1 = engine.regs.as_int(r1) as i64;
    let result = op1 - op2;
    engine.regs.set_int(r1, result as i32);
    engine.cc = add_sub_cc(result);
    Ok(Next::Advance)
}

pub fn sr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let result = engine.regs.as_int(r1) as i64 - engine.regs.as_int(r2) as i64;
    engine.regs.set_int(r1, result as i32);
    engine.cc = add_sub_cc(result);
    Ok(Next::Advance)
}

/// Logical add: carry-out is whether the (signed-read) second operand is
/// negative, per the reference engine's `Add_Sub_Logical_code`.
pub fn al(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_word(engine, addr)?;
    logical_add(engine, r1, op2);
    Ok(Next::Advance)
}

pub fn alr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let op2 = engine.regs.as_int(r2);
    logical_add(engine, r1, op2);
    Ok(Next::Advance)
}

fn logical_add(engine: &mut Engine, r1: u8, op2: i32) {
    let carry = op2 < 0;
    let result = (engine.regs.as_int(r1) as i64 + op2 as i64) as i32;
    engine.regs.set_int(r1, result);
    engine.cc = ConditionCode::from_logical_add(result != 0, carry);
}

pub fn sl(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_word(engine, addr)?;
    logical_sub(engine, r1, op2);
    Ok(Next::Advance)
}

pub fn slr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let op2 = engine.regs.as_int(r2);
    logical_sub(engine, r1, op2);
    Ok(Next::Advance)
}

/// Logical subtract: carry-out is whether the second operand is
/// non-negative. The zero-result/no-carry combination never occurs here,
/// matching the reference engine exactly.
fn logical_sub(engine: &mut Engine, r1: u8, op2: i32) {
    let carry = op2 >= 0;
    let result = (engine.regs.as_int(r1) as i64 - op2 as i64) as i32;
    engine.regs.set_int(r1, result);
    engine.cc = ConditionCode::from_logical_add(result != 0, carry);
}

pub fn lcr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let value = engine.regs.as_int(r2) as i64;
    let result = -value;
    engine.regs.set_int(r1, result as i32);
    engine.cc = add_sub_cc(result);
    Ok(Next::Advance)
}

pub fn lnr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let value = engine.regs.as_int(r2);
    let result = -(value.unsigned_abs() as i32);
    engine.regs.set_int(r1, result);
    engine.cc = ConditionCode::from_signed_result(result as i64, false);
    Ok(Next::Advance)
}

pub fn lpr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let value = engine.regs.as_int(r2) as i64;
    let result = value.abs();
    let overflowed = result > i32::MAX as i64;
    engine.regs.set_int(r1, result as i32);
    engine.cc = ConditionCode::from_signed_result(result, overflowed);
    Ok(Next::Advance)
}

pub fn ltr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let value = engine.regs.as_int(r2);
    engine.regs.set_int(r1, value);
    engine.cc = ConditionCode::from_signed_result(value as i64, false);
    Ok(Next::Advance)
}

/// Multiply: the 64-bit product of R1+1's value and the storage operand
/// lands in the even/odd pair starting at R1; R1 itself must be even (not
/// enforced, matching the reference).
pub fn m(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_word(engine, addr)? as i64;
    let op1 = engine.regs.as_int(r1 | 1) as i64;
    let product = op1 * op2;
    engine.regs.set_pair_u64(r1 & 0xE, product as u64);
    Ok(Next::Advance)
}

pub fn mr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let op1 = engine.regs.as_int(r1 | 1) as i64;
    let op2 = engine.regs.as_int(r2) as i64;
    let product = op1 * op2;
    engine.regs.set_pair_u64(r1 & 0xE, product as u64);
    Ok(Next::Advance)
}

pub fn mh(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = op2_from_storage_half(engine, addr)? as i64;
    let op1 = engine.regs.as_int(r1) as i64;
    engine.regs.set_int(r1, (op1 * op2) as i32);
    Ok(Next::Advance)
}

/// Divide: the 64-bit dividend is the even/odd pair at R1; quotient lands
/// in the odd register, remainder in the even register.
pub fn d(engine: &mut Engine, decoded: Decoded, pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = decoded else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let divisor = op2_from_storage_word(engine, addr)? as i64;
    divide(engine, r1, divisor, pc)?;
    Ok(Next::Advance)
}

pub fn dr(engine: &mut Engine, decoded: Decoded, pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = decoded else { unreachable!() };
    let divisor = engine.regs.as_int(r2) as i64;
    divide(engine, r1, divisor, pc)?;
    Ok(Next::Advance)
}

fn divide(engine: &mut Engine, r1: u8, divisor: i64, pc: usize) -> EngineResult<()> {
    if divisor == 0 {
        return Err(EngineError::DivideByZero { pc });
    }
    let dividend = engine.regs.as_pair_u64(r1 & 0xE) as i64;
    let quotient = dividend / divisor;
    if quotient > i32::MAX as i64 || quotient < i32::MIN as i64 {
        return Err(EngineError::DivideOverflow { pc });
    }
    let remainder = dividend % divisor;
    engine.regs.set_int(r1 & 0xE, remainder as i32);
    engine.regs.set_int(r1 | 1, quotient as i32);
    Ok(())
}

/// Compare-and-swap: if the register matches storage, storage is replaced
/// by the paired register; otherwise the register is loaded from storage.
pub fn cs(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let storage = engine.memory.read_u32(addr)?;
    let compare = engine.regs.as_u32(r1);
    if storage == compare {
        engine.memory.write_u32(addr, engine.regs.as_u32(r2))?;
        engine.cc = ConditionCode::Cc0;
    } else {
        engine.regs.set_u32(r1, storage);
        engine.cc = ConditionCode::Cc1;
    }
    Ok(Next::Advance)
}

pub fn cds(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let storage = engine.memory.read(addr, 8)?;
    let storage_val = u64::from_be_bytes(storage.try_into().unwrap());
    let compare = engine.regs.as_pair_u64(r1 & 0xE);
    if storage_val == compare {
        let replacement = engine.regs.as_pair_u64(r2 & 0xE);
        engine.memory.write(addr, &replacement.to_be_bytes())?;
        engine.cc = ConditionCode::Cc0;
    } else {
        engine.regs.set_pair_u64(r1 & 0xE, storage_val);
        engine.cc = ConditionCode::Cc1;
    }
    Ok(Next::Advance)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    fn engine_with(memory_size: usize) -> Engine {
        Engine::new(Memory::new(memory_size))
    }

    #[test]
    fn ar_sets_overflow_cc3() {
        let mut engine = engine_with(8);
        engine.regs.set_int(1, i32::MAX);
        engine.regs.set_int(2, 1);
        ar(&mut engine, Decoded::Rr { r1: 1, r2: 2 }, 0).unwrap();
        assert_eq!(engine.regs.as_int(1), i32::MIN);
        assert_eq!(engine.cc, ConditionCode::Cc3);
    }

    #[test]
    fn sr_negative_result_sets_cc1() {
        let mut engine = engine_with(8);
        engine.regs.set_int(1, 5);
        engine.regs.set_int(2, 10);
        sr(&mut engine, Decoded::Rr { r1: 1, r2: 2 }, 0).unwrap();
        assert_eq!(engine.regs.as_int(1), -5);
        assert_eq!(engine.cc, ConditionCode::Cc1);
    }

    #[test]
    fn alr_zero_no_carry_is_cc0() {
        let mut engine = engine_with(8);
        engine.regs.set_int(1, 0);
        engine.regs.set_int(2, 0);
        alr(&mut engine, Decoded::Rr { r1: 1, r2: 2 }, 0).unwrap();
        assert_eq!(engine.cc, ConditionCode::Cc0);
    }

    #[test]
    fn dr_computes_quotient_and_remainder() {
        let mut engine = engine_with(8);
        engine.regs.set_pair_u64(0, 7);
        engine.regs.set_int(2, 2);
        dr(&mut engine, Decoded::Rr { r1: 0, r2: 2 }, 0).unwrap();
        assert_eq!(engine.regs.as_int(0), 1); // remainder
        assert_eq!(engine.regs.as_int(1), 3); // quotient
    }

    #[test]
    fn dr_by_zero_is_an_error() {
        let mut engine = engine_with(8);
        engine.regs.set_pair_u64(0, 7);
        engine.regs.set_int(2, 0);
        assert!(dr(&mut engine, Decoded::Rr { r1: 0, r2: 2 }, 0).is_err());
    }
}
