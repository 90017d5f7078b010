use clap::ValueEnum;

use super::{Intrinsic, Platform};
use crate::ir::{AsmFlags, InlineAsm, Type, Value};

/// System call numbers, these are platform constants and never interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallNumbers {
    pub write: i64,
    pub exit: i64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Apple silicon macOS (`svc 0`, call number in x16)
    #[default]
    DarwinArm64,
    /// aarch64 Linux (`svc 0`, call number in x8)
    LinuxArm64,
    /// x86-64 Linux (`syscall`, call number in rax)
    LinuxX86_64,
}

impl Target {
    pub fn convention(self) -> SyscallConvention {
        match self {
            // https://go.dev/src/syscall/zsysnum_darwin_arm64.go
            Target::DarwinArm64 => SyscallConvention {
                triple: "arm64-apple-macosx12.0.0",
                trap: "svc 0",
                number_register: "x16",
                return_register: "x0",
                arg_registers: ["x0", "x1", "x2"],
                clobbers: &[],
                flags: AsmFlags::SIDE_EFFECT,
                numbers: SyscallNumbers { write: 4, exit: 1 },
            },
            Target::LinuxArm64 => SyscallConvention {
                triple: "aarch64-unknown-linux-gnu",
                trap: "svc 0",
                number_register: "x8",
                return_register: "x0",
                arg_registers: ["x0", "x1", "x2"],
                clobbers: &["memory"],
                flags: AsmFlags::SIDE_EFFECT,
                numbers: SyscallNumbers { write: 64, exit: 93 },
            },
            // `syscall` trashes rcx and r11
            Target::LinuxX86_64 => SyscallConvention {
                triple: "x86_64-unknown-linux-gnu",
                trap: "syscall",
                number_register: "rax",
                return_register: "rax",
                arg_registers: ["rdi", "rsi", "rdx"],
                clobbers: &["rcx", "r11", "memory"],
                flags: AsmFlags::SIDE_EFFECT,
                numbers: SyscallNumbers { write: 1, exit: 60 },
            },
        }
    }
}

/// A fixed register-passing template: trap instruction, call number
/// register, result register and up to three argument registers.
#[derive(Debug, Clone, PartialEq)]
pub struct SyscallConvention {
    pub triple: &'static str,
    pub trap: &'static str,
    pub number_register: &'static str,
    /// Overwritten by the kernel with the call's result
    pub return_register: &'static str,
    pub arg_registers: [&'static str; 3],
    pub clobbers: &'static [&'static str],
    pub flags: AsmFlags,
    pub numbers: SyscallNumbers,
}

impl SyscallConvention {
    pub fn with_numbers(mut self, numbers: SyscallNumbers) -> Self {
        self.numbers = numbers;
        self
    }

    fn number_for(&self, intrinsic: &Intrinsic) -> i64 {
        match intrinsic {
            Intrinsic::WriteBytes { .. } => self.numbers.write,
            Intrinsic::ExitProcess { .. } => self.numbers.exit,
        }
    }
}

impl Platform for SyscallConvention {
    fn triple(&self) -> &str {
        self.triple
    }

    fn lower(&self, intrinsic: &Intrinsic) -> InlineAsm {
        let arguments = intrinsic.arguments();
        debug_assert!(arguments.len() <= self.arg_registers.len());

        let mut constraints = vec![
            format!("={{{}}}", self.return_register),
            format!("{{{}}}", self.number_register),
        ];
        constraints.extend(
            self.arg_registers
                .iter()
                .take(arguments.len())
                .map(|reg| format!("{{{reg}}}")),
        );
        constraints.extend(self.clobbers.iter().map(|reg| format!("~{{{reg}}}")));

        let mut args = vec![(Type::I32, Value::i32(self.number_for(intrinsic)))];
        args.extend(arguments);

        InlineAsm {
            template: self.trap.to_string(),
            constraints: constraints.join(","),
            args,
            result: Type::I32,
            flags: self.flags,
        }
    }
}
