pub mod ir_interpreter;

use std::io::Write;

use thiserror::Error;

use crate::ir::Type;

pub const DEFAULT_STEP_LIMIT: usize = 10_000_000;

/// Fill byte for fresh stack allocations, so reads of memory the program
/// never initialised stand out
const UNINITIALISED: u8 = 0xCD;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("IO Error")]
    FileIO(
        #[from]
        std::io::Error,
    ),

    #[error("Pointer offset ({offset}) out of bounds (max length {len})")]
    OutOfBounds { offset: isize, len: usize },

    #[error("Expected {expected} but found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Value %{0} used before it was defined")]
    UndefinedValue(u32),

    #[error("Branch to missing block #{0}")]
    MissingBlock(u32),

    #[error("Block {0} has no terminator")]
    Unterminated(String),

    #[error("Gave up after {0} instructions")]
    StepLimit(usize),
}

/// Address of a cell: an allocation and an offset into it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    pub allocation: usize,
    pub offset: isize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeValue {
    /// Integer truncated to the width of its type
    Int(Type, u64),
    Ptr(Pointer),
}

impl RuntimeValue {
    pub fn int(ty: Type, value: i64) -> Self {
        let mask = match ty {
            Type::I1 => 0x1,
            Type::I8 => 0xff,
            Type::I32 => 0xffff_ffff,
            _ => u64::MAX,
        };
        RuntimeValue::Int(ty, value as u64 & mask)
    }

    fn describe(&self) -> String {
        match self {
            RuntimeValue::Int(ty, _) => ty.to_string(),
            RuntimeValue::Ptr(_) => "ptr".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Allocation {
    Bytes(Vec<u8>),
    Pointer(Option<Pointer>),
}

/// Memory and the output stream the interpreted program writes to
pub struct Runtime<W: Write> {
    allocations: Vec<Allocation>,

    out_stream: W,

    /// Maximum number of instructions executed before giving up
    pub step_limit: usize,
}

impl<W: Write> Runtime<W> {
    pub fn new(out_stream: W) -> Self {
        Self {
            allocations: vec![],
            out_stream,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn into_output(self) -> W {
        self.out_stream
    }

    pub fn alloca(&mut self, ty: Type) -> Pointer {
        let allocation = match ty {
            Type::ByteArray(len) => Allocation::Bytes(vec![UNINITIALISED; len]),
            Type::Ptr => Allocation::Pointer(None),
            other => Allocation::Bytes(vec![UNINITIALISED; byte_size(other)]),
        };
        self.allocations.push(allocation);
        Pointer {
            allocation: self.allocations.len() - 1,
            offset: 0,
        }
    }

    /// Read `len` bytes starting at `pointer`
    pub fn bytes(&self, pointer: Pointer, len: usize) -> Result<&[u8], RuntimeError> {
        let bytes = self.byte_allocation(pointer)?;
        let start = self.check_pointer(pointer, bytes.len(), len)?;
        Ok(&bytes[start..start + len])
    }

    pub fn load_byte(&self, pointer: Pointer) -> Result<u8, RuntimeError> {
        Ok(self.bytes(pointer, 1)?[0])
    }

    pub fn store_byte(&mut self, pointer: Pointer, value: u8) -> Result<(), RuntimeError> {
        self.fill(pointer, 1, value)
    }

    /// Set `len` bytes starting at `pointer` to `value`
    pub fn fill(&mut self, pointer: Pointer, len: usize, value: u8) -> Result<(), RuntimeError> {
        let available = self.byte_allocation(pointer)?.len();
        let start = self.check_pointer(pointer, available, len)?;
        if let Some(Allocation::Bytes(bytes)) = self.allocations.get_mut(pointer.allocation) {
            bytes[start..start + len].fill(value);
        }
        Ok(())
    }

    pub fn load_pointer(&self, slot: Pointer) -> Result<Pointer, RuntimeError> {
        match self.allocations.get(slot.allocation) {
            Some(Allocation::Pointer(Some(pointer))) if slot.offset == 0 => Ok(*pointer),
            Some(Allocation::Pointer(None)) => Err(RuntimeError::TypeMismatch {
                expected: "initialised ptr".to_string(),
                found: "uninitialised memory".to_string(),
            }),
            _ => Err(RuntimeError::TypeMismatch {
                expected: "ptr slot".to_string(),
                found: "byte memory".to_string(),
            }),
        }
    }

    pub fn store_pointer(&mut self, slot: Pointer, value: Pointer) -> Result<(), RuntimeError> {
        match self.allocations.get_mut(slot.allocation) {
            Some(Allocation::Pointer(stored)) if slot.offset == 0 => {
                *stored = Some(value);
                Ok(())
            }
            _ => Err(RuntimeError::TypeMismatch {
                expected: "ptr slot".to_string(),
                found: "byte memory".to_string(),
            }),
        }
    }

    /// Write stream in runtime from pointer
    pub fn write(&mut self, pointer: Pointer, len: usize) -> Result<(), RuntimeError> {
        let bytes = self.bytes(pointer, len)?.to_vec();
        self.out_stream.write_all(&bytes)?;
        Ok(())
    }

    fn byte_allocation(&self, pointer: Pointer) -> Result<&Vec<u8>, RuntimeError> {
        match self.allocations.get(pointer.allocation) {
            Some(Allocation::Bytes(bytes)) => Ok(bytes),
            _ => Err(RuntimeError::TypeMismatch {
                expected: "byte memory".to_string(),
                found: "ptr slot".to_string(),
            }),
        }
    }

    /// Pointers may wander anywhere, they're only checked once they're read/written
    fn check_pointer(
        &self,
        pointer: Pointer,
        available: usize,
        len: usize,
    ) -> Result<usize, RuntimeError> {
        if pointer.offset < 0 || pointer.offset as usize + len > available {
            return Err(RuntimeError::OutOfBounds {
                offset: pointer.offset,
                len: available,
            });
        }
        Ok(pointer.offset as usize)
    }
}

fn byte_size(ty: Type) -> usize {
    match ty {
        Type::I1 | Type::I8 => 1,
        Type::I32 => 4,
        Type::Ptr => 8,
        Type::ByteArray(len) => len,
    }
}
