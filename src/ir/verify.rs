//! Structural checks on a finished function.

use std::collections::HashSet;

use thiserror::Error;

use super::{BlockId, Function};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("block {label} has no terminator")]
    Unterminated { label: String },

    #[error("block {label} branches to missing block #{target}")]
    DanglingTarget { label: String, target: u32 },

    #[error("block {label} is unreachable from entry")]
    Unreachable { label: String },
}

/// Every block has exactly one terminator, every branch target exists and
/// every block can be reached from the entry block.
pub fn verify(function: &Function) -> Result<(), VerifyError> {
    for (_, block) in function.blocks() {
        let terminator = block.terminator().ok_or_else(|| VerifyError::Unterminated {
            label: block.label(),
        })?;
        for target in terminator.successors() {
            if function.block(target).is_none() {
                return Err(VerifyError::DanglingTarget {
                    label: block.label(),
                    target: target.0,
                });
            }
        }
    }

    let reachable = reachable_blocks(function);
    match function.blocks().find(|(id, _)| !reachable.contains(id)) {
        Some((_, block)) => Err(VerifyError::Unreachable {
            label: block.label(),
        }),
        None => Ok(()),
    }
}

pub fn reachable_blocks(function: &Function) -> HashSet<BlockId> {
    let mut seen = HashSet::new();
    let mut work = vec![function.entry()];

    while let Some(id) = work.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(terminator) = function.block(id).and_then(|b| b.terminator()) {
            work.extend(terminator.successors());
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockKind, Terminator, Type, Value};

    #[test]
    fn accepts_a_linear_function() {
        let mut function = Function::new("main", Type::I8);
        let exit = function.append_block(BlockKind::Exit);
        function.terminate(function.entry(), Terminator::Branch(exit));
        function.terminate(exit, Terminator::Return(Value::i8(0)));
        assert_eq!(verify(&function), Ok(()));
    }

    #[test]
    fn rejects_open_blocks() {
        let function = Function::new("main", Type::I8);
        assert_eq!(
            verify(&function),
            Err(VerifyError::Unterminated {
                label: "entry".to_string()
            })
        );
    }

    #[test]
    fn rejects_dangling_targets() {
        let mut function = Function::new("main", Type::I8);
        function.terminate(function.entry(), Terminator::Branch(BlockId(7)));
        assert_eq!(
            verify(&function),
            Err(VerifyError::DanglingTarget {
                label: "entry".to_string(),
                target: 7
            })
        );
    }

    #[test]
    fn rejects_unreachable_blocks() {
        let mut function = Function::new("main", Type::I8);
        let orphan = function.append_block(BlockKind::Exit);
        function.terminate(function.entry(), Terminator::Return(Value::i8(0)));
        function.terminate(orphan, Terminator::Return(Value::i8(0)));
        assert_eq!(
            verify(&function),
            Err(VerifyError::Unreachable {
                label: "exit".to_string()
            })
        );
    }
}
