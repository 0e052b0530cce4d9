use thiserror::Error;

/// Fatal engine faults. These are the only conditions that unwind out of the
/// executor as a `Result::Err`; everything the architecture itself treats as
/// recoverable (overflow, divide faults, bad SVC operands) is communicated
/// through the condition code or R15 instead, never through this type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error("no instruction handler for opcode {opcode:02X} at PC {pc:06X}")]
    UnknownOpcode { opcode: u8, pc: usize },

    #[error("fetch at PC {pc:06X} is outside of memory (size {memory_len:06X})")]
    FetchOutOfBounds { pc: usize, memory_len: usize },

    #[error("storage access at {address:06X} (len {len}) is outside of memory (size {memory_len:06X})")]
    StorageOutOfBounds {
        address: usize,
        len: usize,
        memory_len: usize,
    },

    #[error("EXECUTE staged instruction is missing or already consumed")]
    ExecuteStagingExhausted,

    #[error("EXECUTE may not target another EXECUTE instruction")]
    ExecuteOfExecute,

    #[error("register {0} is out of range (expected 0..=15)")]
    RegisterOutOfRange(u8),

    #[error("malformed packed-decimal sign nibble {0:X} in operand")]
    BadPackedSign(u8),

    #[error("divide by zero at PC {pc:06X}")]
    DivideByZero { pc: usize },

    #[error("divide overflow at PC {pc:06X}: quotient does not fit in the result field")]
    DivideOverflow { pc: usize },

    #[error("SVC {0} is not a supported host service")]
    UnknownSvc(u8),

    #[error("terminal size is too small: need at least {need_rows}x{need_cols}, got {rows}x{cols}")]
    TerminalTooSmall {
        rows: u16,
        cols: u16,
        need_rows: u16,
        need_cols: u16,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
