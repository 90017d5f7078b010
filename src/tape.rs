//! Addressing rules for the byte tape.
//!
//! The tape is a `[i8 x len]` stack allocation zeroed on function entry. The
//! pointer into it is an SSA value, moving it is an unchecked
//! `getelementptr`, nothing here bounds it to the tape.

use tracing::debug;

use crate::{
    error::ConfigError,
    ir::{BinOp, BlockId, Function, Op, Type, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tape {
    length: usize,
}

impl Tape {
    pub fn new(length: usize) -> Result<Self, ConfigError> {
        if length == 0 {
            return Err(ConfigError::InvalidTapeLength(length));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn ty(&self) -> Type {
        Type::ByteArray(self.length)
    }

    /// Allocates and zeroes the tape in `block`, returns a pointer to cell 0
    pub fn allocate(&self, function: &mut Function, block: BlockId) -> Value {
        let tape = function.push_value(block, Op::Alloca(self.ty()));
        function.push(
            block,
            Op::Store {
                ty: self.ty(),
                value: Value::ZeroInit(self.ty()),
                ptr: tape,
            },
        );
        debug!(cells = self.length, "tape allocated");
        Self::offset(function, block, tape, 0)
    }

    /// A pointer `by` cells away from `pointer`
    pub fn offset(function: &mut Function, block: BlockId, pointer: Value, by: i64) -> Value {
        function.push_value(block, Op::Gep { base: pointer, offset: by })
    }

    pub fn load_cell(function: &mut Function, block: BlockId, pointer: Value) -> Value {
        function.push_value(
            block,
            Op::Load {
                ty: Type::I8,
                ptr: pointer,
            },
        )
    }

    /// `*pointer = *pointer op by`, wrapping at 8 bits
    pub fn update_cell(
        function: &mut Function,
        block: BlockId,
        pointer: Value,
        op: BinOp,
        by: i64,
    ) {
        let cell = Self::load_cell(function, block, pointer);
        let value = function.push_value(
            block,
            Op::Binary {
                op,
                ty: Type::I8,
                lhs: cell,
                rhs: Value::i8(by),
            },
        );
        function.push(
            block,
            Op::Store {
                ty: Type::I8,
                value,
                ptr: pointer,
            },
        );
    }

    /// `*pointer == 0` as an `i1`
    pub fn cell_is_zero(function: &mut Function, block: BlockId, pointer: Value) -> Value {
        let cell = Self::load_cell(function, block, pointer);
        function.push_value(
            block,
            Op::ICmpEq {
                ty: Type::I8,
                lhs: cell,
                rhs: Value::i8(0),
            },
        )
    }
}
