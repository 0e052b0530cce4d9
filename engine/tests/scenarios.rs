//! End-to-end checks against the scenarios and universal invariants the
//! engine is built to satisfy. Mirrors `burjui-risky`'s flat `#[test] fn`
//! integration style: each test drives the public engine API the same way
//! an assembled program would, rather than poking private handler internals.

use bal370_engine::{executor, ConditionCode, Engine, Memory};

fn run_program(bytes: &[u8]) -> Engine {
    let mut memory = Memory::new(bytes.len());
    memory.write(0, bytes).unwrap();
    let mut engine = Engine::new(memory);
    executor::run(&mut engine, |_| {}).unwrap();
    engine
}

/// BALR R12,0; LA R3,AREA1; LA R4,4; loop: MVI 0(R3),C'0'; LA R3,1(R3);
/// BCT R4,loop; LA R15,0; BR R14; AREA1 DC XL4'FFFFFFFF'.
#[test]
fn scenario_1_balr_loop_store() {
    let program: &[u8] = &[
        0x05, 0xC0, // BALR R12,0
        0x41, 0x30, 0x00, 0x1C, // LA R3,AREA1 (0x1C)
        0x41, 0x40, 0x00, 0x04, // LA R4,4
        0x92, 0xF0, 0x30, 0x00, // loop: MVI 0(R3),C'0'
        0x41, 0x30, 0x30, 0x01, // LA R3,1(R3)
        0x46, 0x40, 0x00, 0x0A, // BCT R4,loop
        0x41, 0xF0, 0x00, 0x00, // LA R15,0
        0x07, 0xFE, // BCR 15,14 (BR R14)
        0xFF, 0xFF, 0xFF, 0xFF, // AREA1
    ];
    let engine = run_program(program);
    assert_eq!(engine.memory.read(0x1C, 4).unwrap(), &[0xF0, 0xF0, 0xF0, 0xF0]);
    assert_eq!(engine.regs.as_int(15), 0);
    assert_eq!(engine.regs.as_int(14), 0x0EEEEE);
}

/// R1 = 0x7FFFFFFF, AR R1,R2 with R2=1 overflows into CC=3.
#[test]
fn scenario_2_signed_add_overflow() {
    use bal370_engine::{instructions::arithmetic::ar, Decoded};

    let mut engine = Engine::new(Memory::new(4));
    engine.regs.set_u32(1, 0x7FFF_FFFF);
    engine.regs.set_int(2, 1);
    ar(&mut engine, Decoded::Rr { r1: 1, r2: 2 }, 0).unwrap();
    assert_eq!(engine.regs.as_u32(1), 0x8000_0000);
    assert_eq!(engine.cc, ConditionCode::Cc3);
}

/// AP L1=2,L2=1 with op1=+123 at 0x100 and op2=-456 at 0x200 yields -333.
#[test]
fn scenario_3_packed_add() {
    use bal370_engine::{instructions::decimal::ap, Decoded};

    let mut engine = Engine::new(Memory::new(0x210));
    engine.memory.write(0x100, &[0x00, 0x12, 0x3C]).unwrap(); // +123
    engine.memory.write(0x200, &[0x45, 0x6D]).unwrap(); // -456
    ap(
        &mut engine,
        Decoded::Ss2 { l1: 2, l2: 1, b1: 0, d1: 0x100, b2: 0, d2: 0x200 },
        0,
    )
    .unwrap();
    assert_eq!(engine.memory.read(0x100, 3).unwrap(), &[0x00, 0x33, 0x3D]);
    assert_eq!(engine.cc, ConditionCode::Cc1);
}

/// CLC over "ABC"/"ABD" in both orders plus the equal case.
#[test]
fn scenario_4_clc_equal_low_high() {
    use bal370_engine::{instructions::compare::clc, Decoded};

    let mut engine = Engine::new(Memory::new(16));
    engine.memory.write(0, b"ABC").unwrap();
    engine.memory.write(3, b"ABD").unwrap();
    engine.memory.write(6, b"ABC").unwrap();

    clc(&mut engine, Decoded::Ss { ll: 2, b1: 0, d1: 0, b2: 0, d2: 3 }, 0).unwrap();
    assert_eq!(engine.cc, ConditionCode::Cc1);

    clc(&mut engine, Decoded::Ss { ll: 2, b1: 0, d1: 0, b2: 0, d2: 6 }, 0).unwrap();
    assert_eq!(engine.cc, ConditionCode::Cc0);

    clc(&mut engine, Decoded::Ss { ll: 2, b1: 0, d1: 3, b2: 0, d2: 0 }, 0).unwrap();
    assert_eq!(engine.cc, ConditionCode::Cc2);
}

/// ED over pattern `40 20 20 21 20 4B 20 20` and source `00 12 3C`: leading
/// zero digits are suppressed to the fill byte, the embedded message byte
/// passes through untouched, and CC reflects a positive nonzero result.
///
/// The exact trailing byte here is a faithful trace of the source engine's
/// digit-pointer loop (see `ed_edmk` in `decimal.rs` and its ledger entry in
/// `DESIGN.md`'s Corrections section), not the simplified worked example
/// text, since the two diverge on the final slot and this port follows the
/// algorithm over the prose.
#[test]
fn scenario_5_ed_suppress_zeros() {
    use bal370_engine::{instructions::decimal::ed, Decoded};

    let mut engine = Engine::new(Memory::new(16));
    engine
        .memory
        .write(0, &[0x40, 0x20, 0x20, 0x21, 0x20, 0x4B, 0x20, 0x20])
        .unwrap();
    engine.memory.write(8, &[0x00, 0x12, 0x3C]).unwrap();
    ed(&mut engine, Decoded::Ss { ll: 7, b1: 0, d1: 0, b2: 0, d2: 8 }, 0).unwrap();
    assert_eq!(
        engine.memory.read(0, 8).unwrap(),
        &[0x40, 0x40, 0x40, 0xF1, 0xF2, 0x4B, 0xF3, 0xFC]
    );
    assert_eq!(engine.cc, ConditionCode::Cc2);
}

/// BXLE with R1=0, R2=2 (increment), R3=10 (compare): branches while the
/// running sum stays <= 10, five times, then falls through on the sixth.
#[test]
fn scenario_6_bxle_loop() {
    use bal370_engine::{executor::Next, instructions::branch::bxle, Decoded};

    let mut engine = Engine::new(Memory::new(4));
    engine.regs.set_int(1, 0);
    engine.regs.set_int(2, 2);
    engine.regs.set_int(3, 10);

    let mut branches = 0;
    for _ in 0..6 {
        let next = bxle(&mut engine, Decoded::Rs { r1: 1, r2: 2, b2: 0, d2: 0 }, 0).unwrap();
        match next {
            Next::Branch(_) => branches += 1,
            Next::Advance => {}
            _ => panic!("unexpected control transfer"),
        }
    }
    assert_eq!(branches, 5);
    assert_eq!(engine.regs.as_int(1), 12);
}

/// SVC 249 (open) followed by SVC 248 (close) on the same handle round-trips.
#[test]
fn svc_open_close_round_trip() {
    use bal370_engine::{ebcdic, svc::SvcHost, ConditionCode, Registers};

    // Kept free of '/' and lowercase letters: the reference ASCII<->EBCDIC
    // tables are not exact inverses across the whole byte range, only
    // across the characters exercised by `ebcdic.rs`'s own round-trip
    // tests (digits, uppercase letters, a handful of punctuation marks).
    let filename = "BAL370ENGINESVCTEST.TMP";

    let mut memory = Memory::new(64);
    let ebcdic_name = ebcdic::encode(filename.as_bytes());
    memory.write(0, &ebcdic_name).unwrap();

    let mut regs = Registers::new();
    regs.set_int(0, 0); // filename address
    regs.set_u32(1, 0x0101_0000 | ebcdic_name.len() as u32); // handle 01, write mode, name length
    let mut svc = SvcHost::new();

    svc.dispatch(249, &mut regs, &mut memory, ConditionCode::Cc0)
        .unwrap();
    assert_eq!(regs.as_int(15), 0, "open should report success in R15");

    regs.set_u32(1, 0x0100_0000);
    svc.dispatch(248, &mut regs, &mut memory, ConditionCode::Cc0)
        .unwrap();
    assert_eq!(regs.as_int(15), 0, "close should report success in R15");

    std::fs::remove_file(filename).ok();
}

/// Branch-on-condition with a false mask must still advance PC by the RX
/// instruction length rather than leaving it untouched.
#[test]
fn branch_not_taken_advances_pc() {
    use bal370_engine::{instructions::branch::bc, Decoded};

    let mut engine = Engine::new(Memory::new(8));
    engine.cc = ConditionCode::Cc0;
    // Mask selects only CC1/CC2/CC3 -- current CC0 must not branch.
    let next = bc(&mut engine, Decoded::Rx { r1: 0b0111, x2: 0, b2: 0, d2: 0 }, 4).unwrap();
    assert_eq!(next, bal370_engine::executor::Next::Advance);
}

/// Every register round-trips hex<->int via two's complement.
#[test]
fn register_hex_int_round_trip() {
    let mut engine = Engine::new(Memory::new(4));
    for value in [0i32, 1, -1, i32::MIN, i32::MAX, -123456, 123456] {
        engine.regs.set_int(5, value);
        assert_eq!(engine.regs.as_int(5), value);
        let hex = engine.regs.as_hex(5);
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
