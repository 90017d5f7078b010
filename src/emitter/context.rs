use tracing::{debug, trace};

use crate::{
    error::CompileError,
    ir::{BinOp, BlockId, BlockKind, Function, Op, Terminator, Type, Value},
    lexer::{LexerTokenKind, Position, Token},
    options::LoopSemantics,
    syscall::{Intrinsic, Platform},
    tape::Tape,
};

/// A `[` whose `]` hasn't been seen yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenLoop {
    pub header: BlockId,
    /// Created up front when `[` has to branch around the body
    pub exit: Option<BlockId>,
    pub index: usize,
    pub depth: usize,
    pub position: Position,
}

/// All of the state of one emission pass.
///
/// The pointer is carried forward as an SSA value within a block. Blocks can
/// be entered from more than one predecessor (loop back edges), so it is
/// spilled to a stack slot before leaving a block that moved it and reloaded
/// at the top of every block after entry.
pub struct EmitterContext<'p> {
    function: Function,
    platform: &'p dyn Platform,
    loop_semantics: LoopSemantics,

    current: BlockId,
    pointer: Value,
    pointer_slot: Value,
    pointer_moved: bool,

    stack: Vec<OpenLoop>,
    /// Only used for labels
    loop_count: usize,
}

impl<'p> EmitterContext<'p> {
    pub fn new(tape: Tape, platform: &'p dyn Platform, loop_semantics: LoopSemantics) -> Self {
        let mut function = Function::new("main", Type::I8);
        let entry = function.entry();

        let pointer = tape.allocate(&mut function, entry);
        let pointer_slot = function.push_value(entry, Op::Alloca(Type::Ptr));
        function.push(
            entry,
            Op::Store {
                ty: Type::Ptr,
                value: pointer,
                ptr: pointer_slot,
            },
        );

        Self {
            function,
            platform,
            loop_semantics,
            current: entry,
            pointer,
            pointer_slot,
            pointer_moved: false,
            stack: vec![],
            loop_count: 0,
        }
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn pointer(&self) -> Value {
        self.pointer
    }

    /// Current bracket nesting depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn step(&mut self, token: &Token) -> Result<(), CompileError> {
        trace!(token = %token.kind, at = %token.position, "step");
        match token.kind {
            LexerTokenKind::DerefIncrement => self.add_to_cell(BinOp::Add),
            LexerTokenKind::DerefDecrement => self.add_to_cell(BinOp::Sub),
            LexerTokenKind::Increment => self.shift_pointer(1),
            LexerTokenKind::Decrement => self.shift_pointer(-1),
            LexerTokenKind::Write => self.write(),
            LexerTokenKind::Exit => self.exit(),
            LexerTokenKind::JumpStart => self.open_loop(token.position),
            LexerTokenKind::JumpEnd => self.close_loop(token.position)?,
            LexerTokenKind::EOF | LexerTokenKind::Comment(_) => {}
        }
        Ok(())
    }

    pub fn add_to_cell(&mut self, op: BinOp) {
        Tape::update_cell(&mut self.function, self.current, self.pointer, op, 1);
    }

    pub fn shift_pointer(&mut self, by: i64) {
        self.pointer = Tape::offset(&mut self.function, self.current, self.pointer, by);
        self.pointer_moved = true;
    }

    pub fn write(&mut self) {
        self.syscall(Intrinsic::WriteBytes {
            buffer: self.pointer,
            count: 1,
        });
    }

    /// Exit doesn't return, but the block still gets its usual terminator
    pub fn exit(&mut self) {
        self.syscall(Intrinsic::ExitProcess { status: 0 });
    }

    fn syscall(&mut self, intrinsic: Intrinsic) {
        let asm = self.platform.lower(&intrinsic);
        self.function.push(self.current, Op::Syscall { intrinsic, asm });
    }

    pub fn open_loop(&mut self, position: Position) {
        let index = self.loop_count;
        self.loop_count += 1;
        let depth = self.stack.len() + 1;

        let header = self
            .function
            .append_block(BlockKind::LoopHeader { index, depth });

        let exit = match self.loop_semantics {
            LoopSemantics::AtLeastOnce => {
                self.leave(Terminator::Branch(header));
                None
            }
            LoopSemantics::Guarded => {
                let exit = self
                    .function
                    .append_block(BlockKind::LoopExit { index, depth });
                let cond = Tape::cell_is_zero(&mut self.function, self.current, self.pointer);
                self.leave(Terminator::CondBranch {
                    cond,
                    if_true: exit,
                    if_false: header,
                });
                Some(exit)
            }
        };

        debug!(index, depth, at = %position, "loop opened");
        self.stack.push(OpenLoop {
            header,
            exit,
            index,
            depth,
            position,
        });
        self.enter(header);
    }

    pub fn close_loop(&mut self, position: Position) -> Result<(), CompileError> {
        let open = self
            .stack
            .pop()
            .ok_or_else(|| CompileError::unmatched(']', position))?;

        let cond = Tape::cell_is_zero(&mut self.function, self.current, self.pointer);
        let exit = match open.exit {
            Some(exit) => exit,
            None => self.function.append_block(BlockKind::LoopExit {
                index: open.index,
                depth: open.depth,
            }),
        };

        self.leave(Terminator::CondBranch {
            cond,
            if_true: exit,
            if_false: open.header,
        });
        debug!(index = open.index, depth = open.depth, at = %position, "loop closed");
        self.enter(exit);
        Ok(())
    }

    /// Closes the pass: every loop must be closed, the last block falls
    /// through to a block returning the current cell.
    pub fn finish(mut self) -> Result<Function, CompileError> {
        if let Some(open) = self.stack.last() {
            return Err(CompileError::unmatched('[', open.position));
        }

        let exit = self.function.append_block(BlockKind::Exit);
        self.leave(Terminator::Branch(exit));
        self.enter(exit);
        let cell = Tape::load_cell(&mut self.function, exit, self.pointer);
        self.function.terminate(exit, Terminator::Return(cell));

        debug!(blocks = self.function.block_count(), "function finished");
        Ok(self.function)
    }

    fn leave(&mut self, terminator: Terminator) {
        if self.pointer_moved {
            self.function.push(
                self.current,
                Op::Store {
                    ty: Type::Ptr,
                    value: self.pointer,
                    ptr: self.pointer_slot,
                },
            );
        }
        self.function.terminate(self.current, terminator);
    }

    fn enter(&mut self, block: BlockId) {
        self.function.place(block);
        self.current = block;
        self.pointer = self.function.push_value(
            block,
            Op::Load {
                ty: Type::Ptr,
                ptr: self.pointer_slot,
            },
        );
        self.pointer_moved = false;
    }
}
