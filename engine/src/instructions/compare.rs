//! Signed compare (C/CH/CR) and unsigned logical compare (CL/CLI/CLC/CLR/
//! CLM), plus the long compare/move CLCL/MVCL pair.

use crate::condition_code::ConditionCode;
use crate::decode::{calc_address, Decoded};
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::executor::Next;
use crate::packed;

pub fn c(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let bytes = engine.memory.read(addr as usize, 4)?;
    let op2 = packed::word_to_int(&[bytes[0], bytes[1], bytes[2], bytes[3]]) as i64;
    let op1 = engine.regs.as_int(r1) as i64;
    engine.cc = ConditionCode::from_signed_cmp(op1, op2);
    Ok(Next::Advance)
}

pub fn ch(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let bytes = engine.memory.read(addr as usize, 2)?;
    let op2 = packed::sign_extend_halfword(bytes) as i64;
    let op1 = engine.regs.as_int(r1) as i64;
    engine.cc = ConditionCode::from_signed_cmp(op1, op2);
    Ok(Next::Advance)
}

pub fn cr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let op1 = engine.regs.as_int(r1) as i64;
    let op2 = engine.regs.as_int(r2) as i64;
    engine.cc = ConditionCode::from_signed_cmp(op1, op2);
    Ok(Next::Advance)
}

/// Byte-by-byte unsigned compare, stopping at the first mismatch.
fn compare_bytes(a: &[u8], b: &[u8]) -> ConditionCode {
    for (x, y) in a.iter().zip(b.iter()) {
        if x != y {
            return ConditionCode::from_signed_cmp(*x as i64, *y as i64);
        }
    }
    ConditionCode::Cc0
}

pub fn cl(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    let op2 = engine.memory.read(addr as usize, 4)?.to_vec();
    let op1 = engine.regs.as_u32(r1).to_be_bytes();
    engine.cc = compare_bytes(&op1, &op2);
    Ok(Next::Advance)
}

pub fn clr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let op1 = engine.regs.as_u32(r1).to_be_bytes();
    let op2 = engine.regs.as_u32(r2).to_be_bytes();
    engine.cc = compare_bytes(&op1, &op2);
    Ok(Next::Advance)
}

pub fn cli(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Si { i2, b1, d1 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let op2 = engine.memory.read_u8(addr)?;
    engine.cc = ConditionCode::from_signed_cmp(i2 as i64, op2 as i64);
    Ok(Next::Advance)
}

pub fn clc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Ss { ll, b1, d1, b2, d2 } = d else { unreachable!() };
    let len = ll as usize + 1;
    let addr1 = calc_address(&engine.regs, b1, 0, d1) as usize;
    let addr2 = calc_address(&engine.regs, b2, 0, d2) as usize;
    let op1 = engine.memory.read(addr1, len)?.to_vec();
    let op2 = engine.memory.read(addr2, len)?.to_vec();
    engine.cc = compare_bytes(&op1, &op2);
    Ok(Next::Advance)
}

/// CLM: a 4-bit mask over R1's four bytes selects which ones participate;
/// CC=0 outright when the mask is zero.
pub fn clm(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2: mask, b2, d2 } = d else { unreachable!() };
    if mask == 0 {
        engine.cc = ConditionCode::Cc0;
        return Ok(Next::Advance);
    }
    let addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let op1_bytes = engine.regs.as_u32(r1).to_be_bytes();
    let selected_len = (mask.count_ones()) as usize;
    let storage = engine.memory.read(addr, selected_len)?.to_vec();
    let mut storage_iter = storage.into_iter();
    let mut result = ConditionCode::Cc0;
    for i in 0..4 {
        if mask & (0b1000 >> i) != 0 {
            let reg_byte = op1_bytes[i];
            let mem_byte = storage_iter.next().unwrap();
            if reg_byte != mem_byte {
                result = ConditionCode::from_signed_cmp(reg_byte as i64, mem_byte as i64);
                break;
            }
        }
    }
    engine.cc = result;
    Ok(Next::Advance)
}

/// CLCL: R1/R1+1 and R2/R2+1 are (address,length) pairs; shorter operand is
/// conceptually padded with R2+1's high byte. Destructive overlap (CC=3) is
/// never detected, matching the reference engine. CLCL is read-only: unlike
/// MVCL it never updates the address/length registers.
pub fn clcl(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let addr1 = engine.regs.as_int(r1) as usize;
    let len1 = engine.regs.as_int(r1 + 1) as usize;
    let addr2 = engine.regs.as_int(r2) as usize;
    let len2 = engine.regs.as_int(r2 + 1) as usize;
    let pad = (engine.regs.as_u32(r2 + 1) >> 24) as u8;

    let maxlen = len1.max(len2);
    let mut cc = ConditionCode::Cc0;
    for i in 0..maxlen {
        let b1 = if i < len1 {
            engine.memory.read_u8(addr1 + i)?
        } else {
            pad
        };
        let b2 = if i < len2 {
            engine.memory.read_u8(addr2 + i)?
        } else {
            pad
        };
        if b1 != b2 {
            cc = ConditionCode::from_signed_cmp(b1 as i64, b2 as i64);
            break;
        }
    }
    engine.cc = cc;
    Ok(Next::Advance)
}

/// MVCL: same operand shape as CLCL, but copies R2's data over R1's,
/// padding short sources with R2+1's high byte. CC reflects the length
/// comparison between destination and source.
pub fn mvcl(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let addr1 = engine.regs.as_int(r1) as usize;
    let len1 = engine.regs.as_int(r1 + 1) as usize;
    let addr2 = engine.regs.as_int(r2) as usize;
    let len2 = engine.regs.as_int(r2 + 1) as usize;
    let pad = (engine.regs.as_u32(r2 + 1) >> 24) as u8;

    for i in 0..len1 {
        let byte = if i < len2 {
            engine.memory.read_u8(addr2 + i)?
        } else {
            pad
        };
        engine.memory.write_u8(addr1 + i, byte)?;
    }
    engine.cc = ConditionCode::from_signed_cmp(len1 as i64, len2 as i64);
    engine.regs.set_int(r1, (addr1 + len1) as i32);
    engine.regs.set_int(r1 + 1, 0);
    engine.regs.set_int(r2, (addr2 + len2) as i32);
    engine.regs.set_int(r2 + 1, 0);
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
    fn clc_equal_low_high() {
        let mut engine = engine_with(16);
        engine.memory.write(0, b"ABC").unwrap();
        engine.memory.write(3, b"ABD").unwrap();
        engine.memory.write(6, b"ABC").unwrap();
        // ABC vs ABD -> low
        clc(
            &mut engine,
            Decoded::Ss { ll: 2, b1: 0, d1: 0, b2: 0, d2: 3 },
            0,
        )
        .unwrap();
        assert_eq!(engine.cc, ConditionCode::Cc1);

        // ABC vs ABC -> equal
        clc(
            &mut engine,
            Decoded::Ss { ll: 2, b1: 0, d1: 0, b2: 0, d2: 6 },
            0,
        )
        .unwrap();
        assert_eq!(engine.cc, ConditionCode::Cc0);

        // ABD vs ABC -> high
        clc(
            &mut engine,
            Decoded::Ss { ll: 2, b1: 0, d1: 3, b2: 0, d2: 0 },
            0,
        )
        .unwrap();
        assert_eq!(engine.cc, ConditionCode::Cc2);
    }
}
