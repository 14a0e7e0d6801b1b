use std::collections::{HashMap, HashSet};

use ir::{BinaryOp, Function, Instruction, Module, Operand, ValueId};

/// Evaluates arithmetic on constants and removes pure instructions nobody reads.
///
/// `add`, `sub` and `mul` wrap. `sdiv` is only folded when the result is defined,
/// so a division by zero or `i32::MIN / -1` stays in the code.
pub fn fold_constants(module: &mut Module) {
    for func in module.functions.iter_mut().filter(|f| !f.is_declaration()) {
        fold_function(func);
        remove_dead_code(func);
    }
}

pub fn evaluate(op: BinaryOp, lhs: i32, rhs: i32) -> Option<i32> {
    match op {
        BinaryOp::Add => Some(lhs.wrapping_add(rhs)),
        BinaryOp::Sub => Some(lhs.wrapping_sub(rhs)),
        BinaryOp::Mul => Some(lhs.wrapping_mul(rhs)),
        BinaryOp::SDiv => lhs.checked_div(rhs),
    }
}

fn fold_function(func: &mut Function) {
    let mut known: HashMap<ValueId, i32> = HashMap::new();

    for block in func.blocks.iter_mut() {
        let instructions = std::mem::take(&mut block.instructions);
        block.instructions = instructions
            .into_iter()
            .filter_map(|mut instruction| {
                for operand in instruction.operands_mut() {
                    if let Operand::Value(id) = operand {
                        if let Some(c) = known.get(id) {
                            *operand = Operand::Const(*c);
                        }
                    }
                }

                if let Instruction::Binary {
                    op,
                    lhs: Operand::Const(lhs),
                    rhs: Operand::Const(rhs),
                    dest,
                } = instruction
                {
                    if let Some(value) = evaluate(op, lhs, rhs) {
                        known.insert(dest, value);
                        return None;
                    }
                }

                Some(instruction)
            })
            .collect();
    }
}

fn is_pure(instruction: &Instruction) -> bool {
    match instruction {
        Instruction::Alloca { .. } | Instruction::Load { .. } => true,
        Instruction::Binary { op, .. } => *op != BinaryOp::SDiv,
        Instruction::Store { .. } | Instruction::Call { .. } | Instruction::Return(_) => false,
    }
}

fn remove_dead_code(func: &mut Function) {
    for block in func.blocks.iter_mut() {
        let mut used: HashSet<ValueId> = HashSet::new();
        let mut kept = Vec::with_capacity(block.instructions.len());

        for instruction in block.instructions.drain(..).rev() {
            let dead = is_pure(&instruction)
                && instruction.dest().is_some_and(|dest| !used.contains(&dest));
            if dead {
                continue;
            }

            used.extend(instruction.operands().into_iter().filter_map(|op| match op {
                Operand::Value(id) => Some(*id),
                _ => None,
            }));
            used.extend(instruction.slot());
            kept.push(instruction);
        }

        kept.reverse();
        block.instructions = kept;
    }
}
