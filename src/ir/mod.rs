//! The basic-block IR produced by the emitter.
//!
//! A [`Module`] owns exactly one [`Function`], which in turn owns an arena of
//! [`Block`]s addressed by [`BlockId`]. Values are SSA locals numbered in the
//! order they are created. Nothing here knows about the source language; the
//! emitter is the only producer and the printer/interpreter are consumers.

pub mod printer;
pub mod verify;

use bitflags::bitflags;

use crate::syscall::Intrinsic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    I1,
    I8,
    I32,
    Ptr,
    /// `[i8 x len]`
    ByteArray(usize),
}

/// Handle of an SSA value inside a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

/// Handle of a block inside a function's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Local(ValueId),
    /// Integer constant of the given type, stored sign-extended
    Const(Type, i64),
    /// All-zero aggregate
    ZeroInit(Type),
}

impl Value {
    pub fn i8(value: i64) -> Value {
        Value::Const(Type::I8, value)
    }

    pub fn i32(value: i64) -> Value {
        Value::Const(Type::I32, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
}

bitflags! {
    /// Modifiers of an inline assembly call
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AsmFlags: u8 {
        /// The call has effects invisible to the IR and must not be removed
        const SIDE_EFFECT = 0b0001;
    }
}

/// An opaque inline assembly call: template, register constraints and the
/// typed arguments bound to those constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineAsm {
    pub template: String,
    pub constraints: String,
    pub args: Vec<(Type, Value)>,
    pub result: Type,
    pub flags: AsmFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Stack allocation of a value of the given type, yields a pointer
    Alloca(Type),
    Load { ty: Type, ptr: Value },
    Store { ty: Type, value: Value, ptr: Value },
    /// `getelementptr i8, ptr base, i32 offset`, unchecked
    Gep { base: Value, offset: i64 },
    Binary { op: BinOp, ty: Type, lhs: Value, rhs: Value },
    /// Integer equality, yields `i1`
    ICmpEq { ty: Type, lhs: Value, rhs: Value },
    /// A platform intrinsic, carried with the inline assembly it was lowered to
    Syscall { intrinsic: Intrinsic, asm: InlineAsm },
}

impl Op {
    /// The type of the value this operation defines, if any
    pub fn result_type(&self) -> Option<Type> {
        match self {
            Op::Alloca(_) | Op::Gep { .. } => Some(Type::Ptr),
            Op::Load { ty, .. } | Op::Binary { ty, .. } => Some(*ty),
            Op::ICmpEq { .. } => Some(Type::I1),
            Op::Syscall { asm, .. } => Some(asm.result),
            Op::Store { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub result: Option<ValueId>,
    pub op: Op,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Branch(BlockId),
    CondBranch {
        cond: Value,
        if_true: BlockId,
        if_false: BlockId,
    },
    Return(Value),
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match *self {
            Terminator::Branch(target) => vec![target],
            Terminator::CondBranch {
                if_true, if_false, ..
            } => vec![if_true, if_false],
            Terminator::Return(_) => vec![],
        }
    }
}

/// What a block is for; the printed label is derived from this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Entry,
    /// Re-entered on every iteration of loop `index` (nesting `depth`, 1-based)
    LoopHeader { index: usize, depth: usize },
    /// Reached once loop `index` is finished
    LoopExit { index: usize, depth: usize },
    /// Loads the current cell and returns it
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub instructions: Vec<Instruction>,
    terminator: Option<Terminator>,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            instructions: vec![],
            terminator: None,
        }
    }

    pub fn label(&self) -> String {
        match self.kind {
            BlockKind::Entry => "entry".to_string(),
            BlockKind::LoopHeader { index, .. } => format!("loop{index}.header"),
            BlockKind::LoopExit { index, .. } => format!("loop{index}.exit"),
            BlockKind::Exit => "exit".to_string(),
        }
    }

    pub fn terminator(&self) -> Option<&Terminator> {
        self.terminator.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

/// The single `i8 main()` function of a module.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    blocks: Vec<Block>,
    /// Blocks in the order they were filled, which is the order they print in
    placed: Vec<BlockId>,
    next_value: u32,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            return_type,
            blocks: vec![Block::new(BlockKind::Entry)],
            placed: vec![BlockId(0)],
            next_value: 0,
        }
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn append_block(&mut self, kind: BlockKind) -> BlockId {
        self.blocks.push(Block::new(kind));
        BlockId(self.blocks.len() as u32 - 1)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (BlockId(i as u32), block))
    }

    /// Marks `block` as the next one in layout order.
    ///
    /// A block may be created long before it is filled (a guarded loop's exit
    /// exists from its `[` on), but values are numbered as they are created,
    /// so blocks have to be laid out in the order they received instructions.
    pub fn place(&mut self, block: BlockId) {
        debug_assert!(!self.placed.contains(&block), "{block:?} placed twice");
        self.placed.push(block);
    }

    /// Placed blocks first, then any never placed in arena order
    pub fn layout(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        let mut seen = vec![false; self.blocks.len()];
        for id in self.placed.iter() {
            seen[id.index()] = true;
        }
        let unplaced = self.blocks().filter(move |(id, _)| !seen[id.index()]);

        self.placed
            .iter()
            .map(move |id| (*id, &self.blocks[id.index()]))
            .chain(unplaced)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    /// Appends `op` to an open block and returns the value it defines (if any)
    ///
    /// Panics if the block is already terminated, the emitter never does this.
    pub fn push(&mut self, block: BlockId, op: Op) -> Option<Value> {
        let result = op.result_type().map(|_| self.fresh_value());
        self.append(block, Instruction { result, op });
        result.map(Value::Local)
    }

    /// Like [`Function::push`] for operations that always define a value
    pub fn push_value(&mut self, block: BlockId, op: Op) -> Value {
        debug_assert!(op.result_type().is_some(), "{op:?} defines no value");
        let result = self.fresh_value();
        self.append(
            block,
            Instruction {
                result: Some(result),
                op,
            },
        );
        Value::Local(result)
    }

    fn append(&mut self, block: BlockId, instruction: Instruction) {
        let block = &mut self.blocks[block.index()];
        assert!(
            !block.is_terminated(),
            "appending to terminated block {}",
            block.label()
        );
        block.instructions.push(instruction);
    }

    /// Closes a block, after this it no longer accepts instructions
    pub fn terminate(&mut self, block: BlockId, terminator: Terminator) {
        let block = &mut self.blocks[block.index()];
        assert!(
            !block.is_terminated(),
            "block {} terminated twice",
            block.label()
        );
        block.terminator = Some(terminator);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub triple: String,
    pub function: Function,
}

impl Module {
    pub fn new(name: impl Into<String>, triple: impl Into<String>, function: Function) -> Self {
        Self {
            name: name.into(),
            triple: triple.into(),
            function,
        }
    }

    /// Blocks created for a `[`
    pub fn loop_headers(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.function
            .blocks()
            .filter(|(_, b)| matches!(b.kind, BlockKind::LoopHeader { .. }))
    }
}
