//! Platform intrinsics and their lowering to raw system calls.
//!
//! The emitter only ever asks for an [`Intrinsic`]; a [`Platform`] decides how
//! that turns into an inline assembly call for its target.

pub mod platform;

use crate::ir::{InlineAsm, Type, Value};

pub use self::platform::{SyscallConvention, SyscallNumbers, Target};

/// Standard output file descriptor
pub const STDOUT: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// Write `count` bytes starting at `buffer` to standard output
    WriteBytes { buffer: Value, count: u32 },
    /// Terminate the process
    ExitProcess { status: i32 },
}

impl Intrinsic {
    pub fn name(&self) -> &'static str {
        match self {
            Intrinsic::WriteBytes { .. } => "write",
            Intrinsic::ExitProcess { .. } => "exit",
        }
    }

    /// Arguments in system call order, excluding the call number
    pub fn arguments(&self) -> Vec<(Type, Value)> {
        match *self {
            Intrinsic::WriteBytes { buffer, count } => vec![
                (Type::I32, Value::i32(STDOUT)),
                (Type::Ptr, buffer),
                (Type::I32, Value::i32(count as i64)),
            ],
            Intrinsic::ExitProcess { status } => vec![(Type::I32, Value::i32(status as i64))],
        }
    }
}

/// Capability to lower intrinsics for one target.
pub trait Platform {
    /// Target triple recorded in the module
    fn triple(&self) -> &str;

    fn lower(&self, intrinsic: &Intrinsic) -> InlineAsm;
}
