use std::collections::{HashMap, HashSet};

use ir::{Function, Instruction, Module, Operand, ValueId};

/// Replaces slot traffic with the values flowing through it.
///
/// Every `load` becomes the operand last stored to its slot, or `undef` when the
/// slot was never written. Stores and allocas are then removed. Functions are
/// straight-line, so one forward walk per block sees every store before the
/// loads that depend on it.
pub fn promote_memory_to_registers(module: &mut Module) {
    for func in module.functions.iter_mut().filter(|f| !f.is_declaration()) {
        promote_function(func);
    }
}

fn promote_function(func: &mut Function) {
    for block in func.blocks.iter_mut() {
        let mut slots: HashSet<ValueId> = HashSet::new();
        let mut current: HashMap<ValueId, Operand> = HashMap::new();
        let mut replaced: HashMap<ValueId, Operand> = HashMap::new();

        let instructions = std::mem::take(&mut block.instructions);
        block.instructions = instructions
            .into_iter()
            .filter_map(|mut instruction| {
                for operand in instruction.operands_mut() {
                    if let Operand::Value(id) = operand {
                        if let Some(value) = replaced.get(id) {
                            *operand = *value;
                        }
                    }
                }

                match instruction {
                    Instruction::Alloca { dest } => {
                        slots.insert(dest);
                        None
                    }
                    Instruction::Store { value, slot } if slots.contains(&slot) => {
                        current.insert(slot, value);
                        None
                    }
                    Instruction::Load { dest, slot } if slots.contains(&slot) => {
                        let value = current.get(&slot).copied().unwrap_or(Operand::Undef);
                        replaced.insert(dest, value);
                        None
                    }
                    other => Some(other),
                }
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use ir::parse_module;
    use pretty_assertions::assert_eq;

    use super::*;

    fn promote(text: &str) -> String {
        let mut module = parse_module("m", text).unwrap();
        promote_memory_to_registers(&mut module);
        module.to_string()
    }

    #[test]
    fn loads_become_stored_values() {
        let text = indoc! {"
            define i32 @main() {
            entry:
              %i = alloca i32, align 4
              %mul_tmp = mul i32 5, 2
              store i32 %mul_tmp, ptr %i, align 4
              %i1 = load i32, ptr %i, align 4
              ret i32 %i1
            }
        "};

        assert_eq!(
            promote(text),
            indoc! {"
                ; ModuleID = 'm'
                source_filename = \"m\"

                define i32 @main() {
                entry:
                  %mul_tmp = mul i32 5, 2
                  ret i32 %mul_tmp
                }
            "}
        );
    }

    #[test]
    fn later_stores_win() {
        let text = indoc! {"
            define i32 @f(i32 %aArg) {
            entry:
              %a = alloca i32, align 4
              store i32 %aArg, ptr %a, align 4
              %a1 = load i32, ptr %a, align 4
              store i32 4, ptr %a, align 4
              %a2 = load i32, ptr %a, align 4
              %add_tmp = add i32 %a1, %a2
              ret i32 %add_tmp
            }
        "};

        assert_eq!(
            promote(text),
            indoc! {"
                ; ModuleID = 'm'
                source_filename = \"m\"

                define i32 @f(i32 %aArg) {
                entry:
                  %add_tmp = add i32 %aArg, 4
                  ret i32 %add_tmp
                }
            "}
        );
    }

    #[test]
    fn unwritten_slot_is_undef() {
        let text = indoc! {"
            define i32 @f() {
            entry:
              %x = alloca i32, align 4
              %x1 = load i32, ptr %x, align 4
              ret i32 %x1
            }
        "};

        let mut module = parse_module("m", text).unwrap();
        promote_memory_to_registers(&mut module);

        assert_eq!(
            module.functions[0].blocks[0].instructions,
            vec![Instruction::Return(Operand::Undef)]
        );
    }

    #[test]
    fn stored_loads_are_chased() {
        let text = indoc! {"
            define i32 @f() {
            entry:
              %a = alloca i32, align 4
              %b = alloca i32, align 4
              store i32 7, ptr %a, align 4
              %a1 = load i32, ptr %a, align 4
              store i32 %a1, ptr %b, align 4
              %b1 = load i32, ptr %b, align 4
              ret i32 %b1
            }
        "};

        let mut module = parse_module("m", text).unwrap();
        promote_memory_to_registers(&mut module);

        assert_eq!(
            module.functions[0].blocks[0].instructions,
            vec![Instruction::Return(Operand::Const(7))]
        );
    }
}
