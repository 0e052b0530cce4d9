//! Bitwise AND/OR/XOR across RR, RX, SI-immediate, and SS character forms,
//! plus TM (test-under-mask).

use crate::condition_code::ConditionCode;
use crate::decode::{calc_address, Decoded};
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::executor::Next;

/// CC for bitwise ops: 0 if the result is all-zero bytes, else 1. These
/// instructions never produce CC 2 or 3.
fn bitwise_cc(bytes: &[u8]) -> ConditionCode {
    if bytes.iter().all(|&b| b == 0) {
        ConditionCode::Cc0
    } else {
        ConditionCode::Cc1
    }
}

pub fn nr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let result = engine.regs.as_u32(r1) & engine.regs.as_u32(r2);
    engine.regs.set_u32(r1, result);
    engine.cc = bitwise_cc(&result.to_be_bytes());
    Ok(Next::Advance)
}

pub fn n(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    let operand = engine.memory.read_u32(addr)?;
    let result = engine.regs.as_u32(r1) & operand;
    engine.regs.set_u32(r1, result);
    engine.cc = bitwise_cc(&result.to_be_bytes());
    Ok(Next::Advance)
}

pub fn ni(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Si { i2, b1, d1 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let result = engine.memory.read_u8(addr)? & i2;
    engine.memory.write_u8(addr, result)?;
    engine.cc = bitwise_cc(&[result]);
    Ok(Next::Advance)
}

pub fn nc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    ss_bitwise(engine, d, |a, b| a & b)
}

pub fn or(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let result = engine.regs.as_u32(r1) | engine.regs.as_u32(r2);
    engine.regs.set_u32(r1, result);
    engine.cc = bitwise_cc(&result.to_be_bytes());
    Ok(Next::Advance)
}

pub fn o(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    let operand = engine.memory.read_u32(addr)?;
    let result = engine.regs.as_u32(r1) | operand;
    engine.regs.set_u32(r1, result);
    engine.cc = bitwise_cc(&result.to_be_bytes());
    Ok(Next::Advance)
}

pub fn oi(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Si { i2, b1, d1 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let result = engine.memory.read_u8(addr)? | i2;
    engine.memory.write_u8(addr, result)?;
    engine.cc = bitwise_cc(&[result]);
    Ok(Next::Advance)
}

pub fn oc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    ss_bitwise(engine, d, |a, b| a | b)
}

pub fn xr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let result = engine.regs.as_u32(r1) ^ engine.regs.as_u32(r2);
    engine.regs.set_u32(r1, result);
    engine.cc = bitwise_cc(&result.to_be_bytes());
    Ok(Next::Advance)
}

pub fn x(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    let operand = engine.memory.read_u32(addr)?;
    let result = engine.regs.as_u32(r1) ^ operand;
    engine.regs.set_u32(r1, result);
    engine.cc = bitwise_cc(&result.to_be_bytes());
    Ok(Next::Advance)
}

pub fn xi(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Si { i2, b1, d1 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let result = engine.memory.read_u8(addr)? ^ i2;
    engine.memory.write_u8(addr, result)?;
    engine.cc = bitwise_cc(&[result]);
    Ok(Next::Advance)
}

pub fn xc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    ss_bitwise(engine, d, |a, b| a ^ b)
}

fn ss_bitwise(engine: &mut Engine, d: Decoded, op: fn(u8, u8) -> u8) -> EngineResult<Next> {
    let Decoded::Ss { ll, b1, d1, b2, d2 } = d else { unreachable!() };
    let len = ll as usize + 1;
    let addr1 = calc_address(&engine.regs, b1, 0, d1) as usize;
    let addr2 = calc_address(&engine.regs, b2, 0, d2) as usize;
    let op1 = engine.memory.read(addr1, len)?.to_vec();
    let op2 = engine.memory.read(addr2, len)?.to_vec();
    let result: Vec<u8> = op1.iter().zip(op2.iter()).map(|(&a, &b)| op(a, b)).collect();
    engine.memory.write(addr1, &result)?;
    engine.cc = bitwise_cc(&result);
    Ok(Next::Advance)
}

/// TM: CC0 if all masked bits are zero, CC1 if mixed, CC3 if all masked
/// bits are one.
pub fn tm(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Si { i2: mask, b1, d1 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let byte = engine.memory.read_u8(addr)?;
    let selected = byte & mask;
    engine.cc = if selected == 0 {
        ConditionCode::Cc0
    } else if selected == mask {
        ConditionCode::Cc3
    } else {
        ConditionCode::Cc1
    };
    Ok(Next::Advance)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn xr_of_equal_registers_is_zero_and_cc0() {
        let mut engine = Engine::new(Memory::new(8));
        engine.regs.set_u32(1, 0xABCD);
        engine.regs.set_u32(2, 0xABCD);
        xr(&mut engine, Decoded::Rr { r1: 1, r2: 2 }, 0).unwrap();
        assert_eq!(engine.regs.as_u32(1), 0);
        assert_eq!(engine.cc, ConditionCode::Cc0);
    }

    #[test]
    fn tm_all_bits_set_is_cc3() {
        let mut engine = Engine::new(Memory::new(8));
        engine.memory.write_u8(0, 0b1111_0000).unwrap();
        tm(&mut engine, Decoded::Si { i2: 0b1111_0000, b1: 0, d1: 0 }, 0).unwrap();
        assert_eq!(engine.cc, ConditionCode::Cc3);
    }

    #[test]
    fn tm_mixed_bits_is_cc1() {
        let mut engine = Engine::new(Memory::new(8));
        engine.memory.write_u8(0, 0b1010_0000).unwrap();
        tm(&mut engine, Decoded::Si { i2: 0b1111_0000, b1: 0, d1: 0 }, 0).unwrap();
        assert_eq!(engine.cc, ConditionCode::Cc1);
    }
}
