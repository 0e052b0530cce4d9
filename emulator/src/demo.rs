//! The built-in demonstration image, run when no `PROGRAM` path is given --
//! in the spirit of the teacher's `main.rs` baking in a default ROM.
//!
//! This is the in-source example program: link via BALR, fill a 4-byte
//! area with EBCDIC zeroes one byte at a time via a BCT-counted loop, then
//! branch back through R14 (preloaded by the engine with the normal
//! termination address) to halt.
//!
//!   BALR R12,0
//!   LA   R3,AREA1
//!   LA   R4,4
//! loop:
//!   MVI  0(R3),C'0'
//!   LA   R3,1(R3)
//!   BCT  R4,loop
//!   LA   R15,0
//!   BR   R14
//! AREA1 DC XL4'FFFFFFFF'
pub fn program_bytes() -> Vec<u8> {
    vec![
        0x05, 0xC0, // BALR R12,0
        0x41, 0x30, 0x00, 0x1C, // LA R3,AREA1 (0x1C)
        0x41, 0x40, 0x00, 0x04, // LA R4,4
        0x92, 0xF0, 0x30, 0x00, // loop: MVI 0(R3),C'0'
        0x41, 0x30, 0x30, 0x01, // LA R3,1(R3)
        0x46, 0x40, 0x00, 0x0A, // BCT R4,loop
        0x41, 0xF0, 0x00, 0x00, // LA R15,0
        0x07, 0xFE, // BCR 15,14 (BR R14)
        0xFF, 0xFF, 0xFF, 0xFF, // AREA1
    ]
}
