//! A System/370 BAL instruction-set core: fetch-decode-execute over a flat
//! byte-addressed memory, the sixteen general registers, and the one-hot
//! condition code, plus the OBJ-deck loader and host SVC services an
//! assembled program expects to call.

pub mod condition_code;
pub mod decode;
pub mod ebcdic;
pub mod engine;
pub mod error;
pub mod executor;
pub mod instructions;
pub mod loader;
pub mod memory;
pub mod packed;
pub mod registers;
pub mod svc;

pub use condition_code::ConditionCode;
pub use decode::{Decoded, Format};
pub use engine::{Control, Engine, StepEvent};
pub use error::{EngineError, EngineResult};
pub use executor::{run, step, Next};
pub use loader::{load_obj_bytes, LoadedImage};
pub use memory::Memory;
pub use registers::Registers;
pub use svc::{SvcHost, SvcOutput};
