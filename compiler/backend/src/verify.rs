use std::collections::HashMap;

use itertools::Itertools;
use thiserror::Error;

use ir::{Function, Instruction, Module, Operand, ValueId};

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    #[error("function '{0}' is defined more than once")]
    DuplicateFunction(String),
    #[error("function '{func}' must have exactly one block, found {count}")]
    BlockCount { func: String, count: usize },
    #[error("block of '{0}' does not end with 'ret'")]
    MissingTerminator(String),
    #[error("'ret' in '{0}' is followed by more instructions")]
    EarlyTerminator(String),
    #[error("'{func}' uses '%{value}' before it is defined")]
    UndefinedValue { func: String, value: String },
    #[error("'{func}' defines '%{value}' twice")]
    ValueRedefined { func: String, value: String },
    #[error("'{func}' uses slot '%{value}' as an integer")]
    NotAnInteger { func: String, value: String },
    #[error("'{func}' uses '%{value}' as a slot, but it was not allocated")]
    NotASlot { func: String, value: String },
    #[error("'{func}' reads parameter {index}, which does not exist")]
    ParamOutOfRange { func: String, index: usize },
    #[error("'{func}' calls '{callee}', which is not in the module")]
    UnknownCallee { func: String, callee: String },
    #[error("'{func}' calls '{callee}' with {found} argument(s), expected {expected}")]
    CallArity {
        func: String,
        callee: String,
        expected: usize,
        found: usize,
    },
}

pub type VerifyResult<T> = Result<T, VerifyError>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Integer,
    Slot,
}

/// Checks the structural rules every module must satisfy before promotion and emission
pub fn verify(module: &Module) -> VerifyResult<()> {
    if let Some(name) = module.functions.iter().map(|f| &f.name).duplicates().next() {
        return Err(VerifyError::DuplicateFunction(name.clone()));
    }

    module
        .functions
        .iter()
        .filter(|f| !f.is_declaration())
        .try_for_each(|f| verify_function(module, f))
}

fn verify_function(module: &Module, func: &Function) -> VerifyResult<()> {
    if func.blocks.len() != 1 {
        return Err(VerifyError::BlockCount {
            func: func.name.clone(),
            count: func.blocks.len(),
        });
    }

    let instructions = &func.blocks[0].instructions;
    match instructions.iter().position(Instruction::is_terminator) {
        None => return Err(VerifyError::MissingTerminator(func.name.clone())),
        Some(index) if index != instructions.len() - 1 => {
            return Err(VerifyError::EarlyTerminator(func.name.clone()))
        }
        Some(_) => {}
    }

    let mut defined: HashMap<ValueId, ValueKind> = HashMap::new();

    for instruction in instructions {
        for operand in instruction.operands() {
            check_integer(func, &defined, operand)?;
        }

        if let Some(slot) = instruction.slot() {
            if defined.get(&slot) != Some(&ValueKind::Slot) {
                return Err(VerifyError::NotASlot {
                    func: func.name.clone(),
                    value: display_name(func, slot),
                });
            }
        }

        if let Instruction::Call { callee, args, .. } = instruction {
            let target = module
                .named_function(callee)
                .ok_or_else(|| VerifyError::UnknownCallee {
                    func: func.name.clone(),
                    callee: callee.clone(),
                })?;

            if target.arity() != args.len() {
                return Err(VerifyError::CallArity {
                    func: func.name.clone(),
                    callee: callee.clone(),
                    expected: target.arity(),
                    found: args.len(),
                });
            }
        }

        if let Some(dest) = instruction.dest() {
            let kind = match instruction {
                Instruction::Alloca { .. } => ValueKind::Slot,
                _ => ValueKind::Integer,
            };

            if dest.0 >= func.names.len() || defined.insert(dest, kind).is_some() {
                return Err(VerifyError::ValueRedefined {
                    func: func.name.clone(),
                    value: display_name(func, dest),
                });
            }
        }
    }

    Ok(())
}

fn check_integer(
    func: &Function,
    defined: &HashMap<ValueId, ValueKind>,
    operand: &Operand,
) -> VerifyResult<()> {
    match operand {
        Operand::Const(_) | Operand::Undef => Ok(()),
        Operand::Param(index) if *index < func.arity() => Ok(()),
        Operand::Param(index) => Err(VerifyError::ParamOutOfRange {
            func: func.name.clone(),
            index: *index,
        }),
        Operand::Value(id) => match defined.get(id) {
            Some(ValueKind::Integer) => Ok(()),
            Some(ValueKind::Slot) => Err(VerifyError::NotAnInteger {
                func: func.name.clone(),
                value: display_name(func, *id),
            }),
            None => Err(VerifyError::UndefinedValue {
                func: func.name.clone(),
                value: display_name(func, *id),
            }),
        },
    }
}

fn display_name(func: &Function, id: ValueId) -> String {
    func.names
        .get(id.0)
        .cloned()
        .unwrap_or_else(|| format!("#{}", id.0))
}
