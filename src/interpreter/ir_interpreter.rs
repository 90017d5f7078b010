use std::{collections::HashMap, io::Write};

use tracing::trace;

use super::{Pointer, Runtime, RuntimeError, RuntimeValue};
use crate::{
    ir::{BinOp, Module, Op, Terminator, Type, Value, ValueId},
    syscall::Intrinsic,
};

/// How the interpreted program stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `main` returned this byte
    Returned(u8),
    /// The exit intrinsic ran with this status
    Exited(i32),
}

/// Executes a module the way the emitted code would behave once lowered,
/// syscalls included.
pub struct IrInterpreter {
    values: HashMap<ValueId, RuntimeValue>,
    steps: usize,
}

enum Flow {
    Continue,
    Stop(Outcome),
}

impl IrInterpreter {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            steps: 0,
        }
    }

    /// Instructions executed by the last `interpret`
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn interpret<W: Write>(
        &mut self,
        runtime: &mut Runtime<W>,
        module: &Module,
    ) -> Result<Outcome, RuntimeError> {
        self.values.clear();
        self.steps = 0;

        let function = &module.function;
        let mut current = function.entry();

        loop {
            let block = function
                .block(current)
                .ok_or(RuntimeError::MissingBlock(current.0))?;
            trace!(block = %block.label(), "enter");

            for instruction in block.instructions.iter() {
                self.steps += 1;
                if self.steps > runtime.step_limit {
                    return Err(RuntimeError::StepLimit(runtime.step_limit));
                }

                let (result, flow) = self.execute(runtime, &instruction.op)?;
                if let (Some(id), Some(value)) = (instruction.result, result) {
                    self.values.insert(id, value);
                }
                if let Flow::Stop(outcome) = flow {
                    return Ok(outcome);
                }
            }

            current = match block.terminator() {
                Some(Terminator::Branch(target)) => *target,
                Some(Terminator::CondBranch {
                    cond,
                    if_true,
                    if_false,
                }) => {
                    if self.int(cond)? != 0 {
                        *if_true
                    } else {
                        *if_false
                    }
                }
                Some(Terminator::Return(value)) => {
                    return Ok(Outcome::Returned(self.int(value)? as u8));
                }
                None => return Err(RuntimeError::Unterminated(block.label())),
            };
        }
    }

    fn execute<W: Write>(
        &mut self,
        runtime: &mut Runtime<W>,
        op: &Op,
    ) -> Result<(Option<RuntimeValue>, Flow), RuntimeError> {
        let value = match op {
            Op::Alloca(ty) => Some(RuntimeValue::Ptr(runtime.alloca(*ty))),
            Op::Load { ty: Type::Ptr, ptr } => {
                Some(RuntimeValue::Ptr(runtime.load_pointer(self.pointer(ptr)?)?))
            }
            Op::Load { ty, ptr } => {
                let byte = runtime.load_byte(self.pointer(ptr)?)?;
                Some(RuntimeValue::int(*ty, byte as i64))
            }
            Op::Store {
                ty: Type::Ptr,
                value,
                ptr,
            } => {
                runtime.store_pointer(self.pointer(ptr)?, self.pointer(value)?)?;
                None
            }
            Op::Store {
                ty: Type::ByteArray(len),
                value: Value::ZeroInit(_),
                ptr,
            } => {
                runtime.fill(self.pointer(ptr)?, *len, 0)?;
                None
            }
            Op::Store { value, ptr, .. } => {
                let byte = self.int(value)? as u8;
                runtime.store_byte(self.pointer(ptr)?, byte)?;
                None
            }
            Op::Gep { base, offset } => {
                let base = self.pointer(base)?;
                Some(RuntimeValue::Ptr(Pointer {
                    offset: base.offset.wrapping_add(*offset as isize),
                    ..base
                }))
            }
            Op::Binary { op, ty, lhs, rhs } => {
                let (lhs, rhs) = (self.int(lhs)?, self.int(rhs)?);
                let result = match op {
                    BinOp::Add => lhs.wrapping_add(rhs),
                    BinOp::Sub => lhs.wrapping_sub(rhs),
                };
                Some(RuntimeValue::int(*ty, result as i64))
            }
            Op::ICmpEq { lhs, rhs, .. } => {
                let equal = self.int(lhs)? == self.int(rhs)?;
                Some(RuntimeValue::int(Type::I1, equal as i64))
            }
            Op::Syscall { intrinsic, .. } => match *intrinsic {
                Intrinsic::WriteBytes { buffer, count } => {
                    runtime.write(self.pointer(&buffer)?, count as usize)?;
                    Some(RuntimeValue::int(Type::I32, count as i64))
                }
                Intrinsic::ExitProcess { status } => {
                    return Ok((None, Flow::Stop(Outcome::Exited(status))));
                }
            },
        };
        Ok((value, Flow::Continue))
    }

    fn resolve(&self, value: &Value) -> Result<RuntimeValue, RuntimeError> {
        match *value {
            Value::Local(id) => self
                .values
                .get(&id)
                .copied()
                .ok_or(RuntimeError::UndefinedValue(id.0)),
            Value::Const(ty, v) => Ok(RuntimeValue::int(ty, v)),
            Value::ZeroInit(ty) => Err(RuntimeError::TypeMismatch {
                expected: "scalar".to_string(),
                found: ty.to_string(),
            }),
        }
    }

    fn int(&self, value: &Value) -> Result<u64, RuntimeError> {
        match self.resolve(value)? {
            RuntimeValue::Int(_, v) => Ok(v),
            other => Err(RuntimeError::TypeMismatch {
                expected: "integer".to_string(),
                found: other.describe(),
            }),
        }
    }

    fn pointer(&self, value: &Value) -> Result<Pointer, RuntimeError> {
        match self.resolve(value)? {
            RuntimeValue::Ptr(pointer) => Ok(pointer),
            other => Err(RuntimeError::TypeMismatch {
                expected: "ptr".to_string(),
                found: other.describe(),
            }),
        }
    }
}

impl Default for IrInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, options::CompileOptions, options::LoopSemantics};

    fn run(source: &str, options: &CompileOptions) -> (Result<Outcome, RuntimeError>, Vec<u8>) {
        let module = compile(source, options).unwrap();
        let mut runtime = Runtime::new(vec![]).with_step_limit(100_000);
        let outcome = IrInterpreter::new().interpret(&mut runtime, &module);
        (outcome, runtime.into_output())
    }

    #[test]
    fn returns_the_current_cell() {
        let (outcome, output) = run("+++>++", &CompileOptions::default());
        assert_eq!(outcome.unwrap(), Outcome::Returned(2));
        assert!(output.is_empty());
    }

    #[test]
    fn decrement_wraps_to_255() {
        let (outcome, _) = run("-", &CompileOptions::default());
        assert_eq!(outcome.unwrap(), Outcome::Returned(255));
    }

    #[test]
    fn exit_stops_before_later_writes() {
        let (outcome, output) = run("+.e.", &CompileOptions::default());
        assert_eq!(outcome.unwrap(), Outcome::Exited(0));
        assert_eq!(output, vec![1]);
    }

    #[test]
    fn transfer_loop_moves_the_value() {
        // cell0 = 5; while cell0 { cell0 -= 1; cell1 += 2 }; print cell1
        let (outcome, output) = run("+++++[->++<]>.", &CompileOptions::default());
        assert_eq!(output, vec![10]);
        assert_eq!(outcome.unwrap(), Outcome::Returned(10));
    }

    #[test]
    fn unbalanced_loop_walks_the_tape() {
        // Scan right to the first zero cell
        let (outcome, _) = run("+>+>+<<[>]+", &CompileOptions::default());
        assert_eq!(outcome.unwrap(), Outcome::Returned(1));
    }

    #[test]
    fn zero_trip_body_depends_on_loop_semantics() {
        let at_least_once = CompileOptions::default();
        let (outcome, output) = run("[.]", &at_least_once);
        assert_eq!(outcome.unwrap(), Outcome::Returned(0));
        assert_eq!(output, vec![0]);

        let guarded = CompileOptions::default().with_loop_semantics(LoopSemantics::Guarded);
        let (outcome, output) = run("[.]", &guarded);
        assert_eq!(outcome.unwrap(), Outcome::Returned(0));
        assert!(output.is_empty());
    }

    #[test]
    fn walking_off_the_tape_is_reported() {
        let (outcome, _) = run("<+", &CompileOptions::default());
        assert!(matches!(outcome, Err(RuntimeError::OutOfBounds { offset: -1, .. })));
    }

    #[test]
    fn infinite_loops_hit_the_step_limit() {
        let (outcome, _) = run("+[]", &CompileOptions::default());
        assert!(matches!(outcome, Err(RuntimeError::StepLimit(100_000))));
    }
}
