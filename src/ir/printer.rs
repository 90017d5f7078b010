//! Textual form of a module, loosely following LLVM assembly.

use std::fmt;

use super::{
    AsmFlags, BinOp, Block, BlockKind, Function, Instruction, Module, Op, Terminator, Type, Value,
};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I1 => write!(f, "i1"),
            Type::I8 => write!(f, "i8"),
            Type::I32 => write!(f, "i32"),
            Type::Ptr => write!(f, "ptr"),
            Type::ByteArray(len) => write!(f, "[{len} x i8]"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(id) => write!(f, "%{}", id.0),
            Value::Const(Type::I1, v) => write!(f, "{}", *v != 0),
            Value::Const(_, v) => write!(f, "{v}"),
            Value::ZeroInit(_) => write!(f, "zeroinitializer"),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "add"),
            BinOp::Sub => write!(f, "sub"),
        }
    }
}

fn write_asm_flags(f: &mut fmt::Formatter<'_>, flags: AsmFlags) -> fmt::Result {
    if flags.contains(AsmFlags::SIDE_EFFECT) {
        write!(f, "sideeffect ")?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = self.result {
            write!(f, "%{} = ", result.0)?;
        }

        match &self.op {
            Op::Alloca(ty) => write!(f, "alloca {ty}"),
            Op::Load { ty, ptr } => write!(f, "load {ty}, ptr {ptr}"),
            Op::Store { ty, value, ptr } => write!(f, "store {ty} {value}, ptr {ptr}"),
            Op::Gep { base, offset } => write!(f, "getelementptr i8, ptr {base}, i32 {offset}"),
            Op::Binary { op, ty, lhs, rhs } => write!(f, "{op} {ty} {lhs}, {rhs}"),
            Op::ICmpEq { ty, lhs, rhs } => write!(f, "icmp eq {ty} {lhs}, {rhs}"),
            Op::Syscall { intrinsic, asm } => {
                write!(f, "call {} asm ", asm.result)?;
                write_asm_flags(f, asm.flags)?;
                write!(f, "{:?}, {:?}(", asm.template, asm.constraints)?;
                for (i, (ty, value)) in asm.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty} {value}")?;
                }
                write!(f, ") ; {}", intrinsic.name())
            }
        }
    }
}

struct TerminatorDisplay<'a>(&'a Function, &'a Terminator);

impl<'a> fmt::Display for TerminatorDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |id| {
            self.0
                .block(id)
                .map(Block::label)
                .unwrap_or_else(|| format!("<invalid block {}>", id.0))
        };

        match *self.1 {
            Terminator::Branch(target) => write!(f, "br label %{}", label(target)),
            Terminator::CondBranch {
                cond,
                if_true,
                if_false,
            } => write!(
                f,
                "br i1 {cond}, label %{}, label %{}",
                label(if_true),
                label(if_false)
            ),
            Terminator::Return(value) => write!(f, "ret {} {value}", self.0.return_type),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "define {} @{}() {{", self.return_type, self.name)?;
        for (i, (_, block)) in self.layout().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match block.kind {
                BlockKind::LoopHeader { depth, .. } | BlockKind::LoopExit { depth, .. } => {
                    writeln!(f, "{}:    ; depth {depth}", block.label())?
                }
                _ => writeln!(f, "{}:", block.label())?,
            }
            for instruction in block.instructions.iter() {
                writeln!(f, "  {instruction}")?;
            }
            match block.terminator() {
                Some(terminator) => writeln!(f, "  {}", TerminatorDisplay(self, terminator))?,
                None => writeln!(f, "  ; <unterminated>")?,
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = {:?}", self.name)?;
        writeln!(f, "target triple = {:?}", self.triple)?;
        writeln!(f)?;
        write!(f, "{}", self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compile,
        ir::Function,
        options::{CompileOptions, LoopSemantics},
    };

    #[test]
    fn prints_blocks_in_arena_order() {
        let mut function = Function::new("main", Type::I8);
        let entry = function.entry();
        let exit = function.append_block(BlockKind::Exit);
        let slot = function.push(entry, Op::Alloca(Type::ByteArray(4))).unwrap();
        function.push(
            entry,
            Op::Store {
                ty: Type::ByteArray(4),
                value: Value::ZeroInit(Type::ByteArray(4)),
                ptr: slot,
            },
        );
        function.terminate(entry, Terminator::Branch(exit));
        let cell = function
            .push(exit, Op::Load { ty: Type::I8, ptr: slot })
            .unwrap();
        function.terminate(exit, Terminator::Return(cell));

        let module = Module::new("MainModule", "x86_64-unknown-linux-gnu", function);
        let text = module.to_string();

        assert_eq!(
            text,
            "; ModuleID = \"MainModule\"\n\
             target triple = \"x86_64-unknown-linux-gnu\"\n\
             \n\
             define i8 @main() {\n\
             entry:\n  \
             %0 = alloca [4 x i8]\n  \
             store [4 x i8] zeroinitializer, ptr %0\n  \
             br label %exit\n\
             \n\
             exit:\n  \
             %1 = load i8, ptr %0\n  \
             ret i8 %1\n\
             }\n"
        );
    }

    #[test]
    fn prints_conditional_branches_with_labels() {
        let mut function = Function::new("main", Type::I8);
        let header = function.append_block(BlockKind::LoopHeader { index: 0, depth: 1 });
        let exit = function.append_block(BlockKind::LoopExit { index: 0, depth: 1 });
        let terminator = Terminator::CondBranch {
            cond: Value::Const(Type::I1, 1),
            if_true: exit,
            if_false: header,
        };
        assert_eq!(
            TerminatorDisplay(&function, &terminator).to_string(),
            "br i1 true, label %loop0.exit, label %loop0.header"
        );
    }

    fn defined_values(text: &str) -> Vec<u32> {
        text.lines()
            .filter_map(|line| line.trim_start().strip_prefix('%'))
            .filter_map(|rest| rest.split_once(" = "))
            .map(|(n, _)| n.parse().unwrap())
            .collect()
    }

    #[test]
    fn nested_guarded_loops_define_values_in_order() {
        let options = CompileOptions::default().with_loop_semantics(LoopSemantics::Guarded);
        for source in ["[[]]", "+[>[-]<[>+<-]]>.", "[[[]]][]"] {
            let text = compile(source, &options).unwrap().to_string();
            let defined = defined_values(&text);
            let expected: Vec<u32> = (0..defined.len() as u32).collect();
            assert_eq!(defined, expected, "{source:?}\n{text}");
        }
    }

    #[test]
    fn exit_blocks_follow_their_loop_bodies() {
        let options = CompileOptions::default().with_loop_semantics(LoopSemantics::Guarded);
        let text = compile("[[]]", &options).unwrap().to_string();
        let labels: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split_once(':').map(|(label, _)| label))
            .filter(|label| !label.starts_with(' ') && !label.starts_with(';'))
            .collect();
        assert_eq!(
            labels,
            vec![
                "entry",
                "loop0.header",
                "loop1.header",
                "loop1.exit",
                "loop0.exit",
                "exit",
            ]
        );
    }

    #[test]
    fn pointer_steps_are_plain_getelementptr() {
        let text = compile("<>+", &CompileOptions::default()).unwrap().to_string();
        assert!(text.contains("getelementptr i8, ptr %"));
        assert!(!text.contains("inbounds"));
    }
}
