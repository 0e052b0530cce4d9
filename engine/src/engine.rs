use crate::condition_code::ConditionCode;
use crate::memory::Memory;
use crate::registers::Registers;
use crate::svc::{SvcHost, SvcOutput};

/// Sentinel PC meaning "fetch and run the instruction staged by EXECUTE".
pub const EXECUTE_STAGED_PC: usize = 999_999;
/// Sentinel PC meaning "branch to R14's normal-return address" -- execution
/// is complete.
pub const NORMAL_TERMINATION_PC: usize = 978_670;

/// The executor's control-flow state. Using an explicit enum instead of
/// threading the two magic PC values through ordinary arithmetic keeps them
/// from ever being mistaken for a legal address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Fetch(usize),
    FetchStaged {
        buffer: [u8; 6],
        len: usize,
        resume_pc: usize,
    },
    Halted,
}

/// All mutable machine state, owned by one struct and passed by `&mut`
/// reference into every instruction handler -- mirrors the teacher's
/// `Cpu6502` owning its registers/bus rather than relying on globals.
pub struct Engine {
    pub memory: Memory,
    pub regs: Registers,
    pub cc: ConditionCode,
    pub control: Control,
    pub svc: SvcHost,
    pub breakpoints: std::collections::HashSet<usize>,
    /// Set by the SVC handler when a service produces output for a
    /// caller (headless runner or debugger) to render; drained each step.
    pub pending_output: Option<SvcOutput>,
}

impl Engine {
    pub fn new(memory: Memory) -> Self {
        let mut regs = Registers::new();
        regs.set_int(14, NORMAL_TERMINATION_PC as i32);
        Engine {
            memory,
            regs,
            cc: ConditionCode::Cc0,
            control: Control::Fetch(0),
            svc: SvcHost::new(),
            breakpoints: std::collections::HashSet::new(),
            pending_output: None,
        }
    }

    pub fn pc(&self) -> Option<usize> {
        match self.control {
            Control::Fetch(pc) => Some(pc),
            Control::FetchStaged { .. } => Some(EXECUTE_STAGED_PC),
            Control::Halted => None,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.control, Control::Halted)
    }

    pub fn has_breakpoint(&self, pc: usize) -> bool {
        self.breakpoints.contains(&pc)
    }
}

/// Emitted after each executed instruction for a debugger (or test harness)
/// to observe; the engine itself has no notion of a UI.
#[derive(Debug, Clone)]
pub struct StepEvent {
    pub pc_before: usize,
    pub cc: ConditionCode,
    pub registers: [u32; 16],
    pub breakpoint_hit: bool,
    pub halted: bool,
}
