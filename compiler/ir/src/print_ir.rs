use std::fmt::{Display, Formatter, Result};

use itertools::Itertools;

use crate::*;

// Output is LLVM textual IR, with slots as opaque pointers

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;

        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }

        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_declaration() {
            return writeln!(
                f,
                "declare i32 @{}({})",
                self.name,
                self.params.iter().map(|_| "i32").join(", ")
            );
        }

        writeln!(
            f,
            "define i32 @{}({}) {{",
            self.name,
            self.params.iter().map(|p| format!("i32 %{}", p)).join(", ")
        )?;

        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;

            for instruction in &block.instructions {
                writeln!(f, "  {}", format_instruction(self, instruction))?;
            }
        }

        writeln!(f, "}}")
    }
}

fn format_instruction(func: &Function, instr: &Instruction) -> String {
    let value = |id: &ValueId| format!("%{}", func.value_name(*id));

    match instr {
        Instruction::Alloca { dest } => format!("{} = alloca i32, align 4", value(dest)),
        Instruction::Load { dest, slot } => {
            format!("{} = load i32, ptr {}, align 4", value(dest), value(slot))
        }
        Instruction::Store { value: stored, slot } => format!(
            "store i32 {}, ptr {}, align 4",
            format_operand(func, stored),
            value(slot)
        ),
        Instruction::Binary { op, lhs, rhs, dest } => format!(
            "{} = {} i32 {}, {}",
            value(dest),
            format_binary(op),
            format_operand(func, lhs),
            format_operand(func, rhs)
        ),
        Instruction::Call { callee, args, dest } => format!(
            "{} = call i32 @{}({})",
            value(dest),
            callee,
            args.iter()
                .map(|a| format!("i32 {}", format_operand(func, a)))
                .join(", ")
        ),
        Instruction::Return(val) => format!("ret i32 {}", format_operand(func, val)),
    }
}

pub(crate) fn format_operand(func: &Function, operand: &Operand) -> String {
    match operand {
        Operand::Const(c) => format!("{}", c),
        Operand::Param(index) => format!("%{}", func.params[*index]),
        Operand::Value(id) => format!("%{}", func.value_name(*id)),
        Operand::Undef => "undef".to_string(),
    }
}

pub(crate) fn format_binary(op: &BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::SDiv => "sdiv",
    }
}
