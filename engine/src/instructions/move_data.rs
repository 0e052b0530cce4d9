//! Register load/store (L/LA/LH/LR/LM, ST/STC/STH/STM), partial-register
//! insert/store (IC/ICM/STCM), and storage-to-storage move (MVC/MVI/MVN/MVZ).

use crate::decode::{calc_address, Decoded};
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::executor::Next;

pub fn l(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    let value = engine.memory.read_u32(addr)?;
    engine.regs.set_u32(r1, value);
    Ok(Next::Advance)
}

pub fn lh(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    let value = crate::packed::sign_extend_halfword(engine.memory.read(addr, 2)?);
    engine.regs.set_int(r1, value);
    Ok(Next::Advance)
}

pub fn lr(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rr { r1, r2 } = d else { unreachable!() };
    let value = engine.regs.as_u32(r2);
    engine.regs.set_u32(r1, value);
    Ok(Next::Advance)
}

/// LA stores the computed address as a plain integer; per the reference
/// engine it is not masked to 24 bits, which this reproduces.
pub fn la(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2);
    engine.regs.set_int(r1, addr as i32);
    Ok(Next::Advance)
}

pub fn st(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    engine.memory.write_u32(addr, engine.regs.as_u32(r1))?;
    Ok(Next::Advance)
}

pub fn stc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    engine.memory.write_u8(addr, engine.regs.as_u32(r1) as u8)?;
    Ok(Next::Advance)
}

pub fn sth(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    engine.memory.write_u16(addr, engine.regs.as_u32(r1) as u16)?;
    Ok(Next::Advance)
}

/// LM loads the inclusive, wrapping register range R1..=R2 from
/// consecutive fullwords of storage.
pub fn lm(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2, b2, d2 } = d else { unreachable!() };
    let mut addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let mut r = r1;
    loop {
        let value = engine.memory.read_u32(addr)?;
        engine.regs.set_u32(r, value);
        addr += 4;
        if r == r2 {
            break;
        }
        r = (r + 1) % 16;
    }
    Ok(Next::Advance)
}

pub fn stm(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2, b2, d2 } = d else { unreachable!() };
    let mut addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let mut r = r1;
    loop {
        engine.memory.write_u32(addr, engine.regs.as_u32(r))?;
        addr += 4;
        if r == r2 {
            break;
        }
        r = (r + 1) % 16;
    }
    Ok(Next::Advance)
}

pub fn ic(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rx { r1, x2, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, x2, d2) as usize;
    let byte = engine.memory.read_u8(addr)?;
    let mut value = engine.regs.as_u32(r1);
    value = (value & 0xFFFF_FF00) | byte as u32;
    engine.regs.set_u32(r1, value);
    Ok(Next::Advance)
}

/// ICM inserts the storage bytes selected by the R2-slot mask into R1's
/// corresponding byte positions. Per the reference engine this never
/// inspects the inserted data's sign, so CC is always left at 0.
pub fn icm(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    use crate::condition_code::ConditionCode;
    let Decoded::Rs { r1, r2: mask, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let mut bytes = engine.regs.as_u32(r1).to_be_bytes();
    let mut mem_addr = addr;
    for i in 0..4 {
        if mask & (0b1000 >> i) != 0 {
            bytes[i] = engine.memory.read_u8(mem_addr)?;
            mem_addr += 1;
        }
    }
    engine.regs.set_u32(r1, u32::from_be_bytes(bytes));
    engine.cc = ConditionCode::Cc0;
    Ok(Next::Advance)
}

pub fn stcm(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Rs { r1, r2: mask, b2, d2 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let bytes = engine.regs.as_u32(r1).to_be_bytes();
    let mut mem_addr = addr;
    for i in 0..4 {
        if mask & (0b1000 >> i) != 0 {
            engine.memory.write_u8(mem_addr, bytes[i])?;
            mem_addr += 1;
        }
    }
    Ok(Next::Advance)
}

pub fn mvc(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Ss { ll, b1, d1, b2, d2 } = d else { unreachable!() };
    let len = ll as usize + 1;
    let src_addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let dst_addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let data = engine.memory.read(src_addr, len)?.to_vec();
    engine.memory.write(dst_addr, &data)?;
    Ok(Next::Advance)
}

pub fn mvi(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Si { i2, b1, d1 } = d else { unreachable!() };
    let addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    engine.memory.write_u8(addr, i2)?;
    Ok(Next::Advance)
}

/// MVN moves only the low (numeric) nibble of each source byte into the
/// destination, leaving the destination's zone nibble untouched.
pub fn mvn(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Ss { ll, b1, d1, b2, d2 } = d else { unreachable!() };
    let len = ll as usize + 1;
    let src_addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let dst_addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let src = engine.memory.read(src_addr, len)?.to_vec();
    let dst = engine.memory.read(dst_addr, len)?.to_vec();
    let merged: Vec<u8> = src
        .iter()
        .zip(dst.iter())
        .map(|(&s, &d)| (d & 0xF0) | (s & 0x0F))
        .collect();
    engine.memory.write(dst_addr, &merged)?;
    Ok(Next::Advance)
}

/// MVZ is MVN's mirror image: moves only the zone (high) nibble.
pub fn mvz(engine: &mut Engine, d: Decoded, _pc: usize) -> EngineResult<Next> {
    let Decoded::Ss { ll, b1, d1, b2, d2 } = d else { unreachable!() };
    let len = ll as usize + 1;
    let src_addr = calc_address(&engine.regs, b2, 0, d2) as usize;
    let dst_addr = calc_address(&engine.regs, b1, 0, d1) as usize;
    let src = engine.memory.read(src_addr, len)?.to_vec();
    let dst = engine.memory.read(dst_addr, len)?.to_vec();
    let merged: Vec<u8> = src
        .iter()
        .zip(dst.iter())
        .map(|(&s, &d)| (s & 0xF0) | (d & 0x0F))
        .collect();
    engine.memory.write(dst_addr, &merged)?;
    Ok(Next::Advance)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn la_does_not_mask_to_24_bits() {
        let mut engine = Engine::new(Memory::new(16));
        engine.regs.set_int(3, 0x00FF_FFFF);
        la(&mut engine, Decoded::Rx { r1: 1, x2: 3, b2: 0, d2: 2 }, 0).unwrap();
        assert_eq!(engine.regs.as_int(1), 0x0100_0001);
    }

    #[test]
    fn mvi_writes_immediate_byte() {
        let mut engine = Engine::new(Memory::new(8));
        mvi(&mut engine, Decoded::Si { i2: 0xF0, b1: 0, d1: 3 }, 0).unwrap();
        assert_eq!(engine.memory.read_u8(3).unwrap(), 0xF0);
    }

    #[test]
    fn lm_loads_wrapping_register_range() {
        let mut engine = Engine::new(Memory::new(16));
        engine.memory.write_u32(0, 0x11).unwrap();
        engine.memory.write_u32(4, 0x22).unwrap();
        lm(&mut engine, Decoded::Rs { r1: 15, r2: 0, b2: 0, d2: 0 }, 0).unwrap();
        assert_eq!(engine.regs.as_u32(15), 0x11);
        assert_eq!(engine.regs.as_u32(0), 0x22);
    }
}
