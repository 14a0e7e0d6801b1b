use std::collections::HashMap;
use std::io::Write;

use thiserror::Error;

use ir::{BinaryOp, Function, Instruction, Module, Operand, ValueId};

use crate::Promoted;

/// Deepest chain of nested calls before execution gives up
pub const MAX_CALL_DEPTH: usize = 256;

/// Runtime routine supplied when no module defines it
pub const PRINTNUM: &str = "printnum";

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("division by zero in '{0}'")]
    DivisionByZero(String),
    #[error("signed division overflow (i32::MIN / -1) in '{0}'")]
    DivisionOverflow(String),
    #[error("unresolved symbol '{0}'")]
    UnresolvedSymbol(String),
    #[error("'{name}' called with {found} argument(s), expected {expected}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("call depth limit exceeded while calling '{0}'")]
    CallDepthExceeded(String),
    #[error("'{func}' reads '%{value}' before it is written")]
    UninitializedValue { func: String, value: String },
    #[error("failed to write program output")]
    Output(#[from] std::io::Error),
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Interprets a promoted module, writing `printnum` output to `out`.
///
/// `undef` operands read as 0.
pub struct Executor<'m, W: Write> {
    module: &'m Module,
    out: W,
    depth: usize,
}

impl<'m, W: Write> Executor<'m, W> {
    pub fn new(program: &'m Promoted, out: W) -> Self {
        Self {
            module: program.module(),
            out,
            depth: 0,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Calls `name` with `args` and returns its result
    pub fn run(&mut self, name: &str, args: &[i32]) -> ExecResult<i32> {
        let func = self.module.named_function(name);

        match func {
            Some(func) if !func.is_declaration() => {
                check_arity(name, func.arity(), args.len())?;
                self.call(func, args)
            }
            _ if name == PRINTNUM => {
                check_arity(name, 1, args.len())?;
                writeln!(self.out, "{}", args[0])?;
                Ok(args[0])
            }
            _ => Err(ExecError::UnresolvedSymbol(name.to_string())),
        }
    }

    fn call(&mut self, func: &'m Function, args: &[i32]) -> ExecResult<i32> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ExecError::CallDepthExceeded(func.name.clone()));
        }

        self.depth += 1;
        let result = self.execute(func, args);
        self.depth -= 1;

        result
    }

    fn execute(&mut self, func: &'m Function, args: &[i32]) -> ExecResult<i32> {
        let mut frame = Frame {
            func,
            args,
            values: vec![None; func.names.len()],
            memory: HashMap::new(),
        };

        for instruction in func.instructions() {
            match instruction {
                Instruction::Alloca { dest } => {
                    frame.memory.insert(*dest, None);
                }
                Instruction::Load { dest, slot } => {
                    let value = frame.memory.get(slot).copied().flatten().unwrap_or(0);
                    frame.values[dest.0] = Some(value);
                }
                Instruction::Store { value, slot } => {
                    let value = frame.read(value)?;
                    frame.memory.insert(*slot, Some(value));
                }
                Instruction::Binary { op, lhs, rhs, dest } => {
                    let lhs = frame.read(lhs)?;
                    let rhs = frame.read(rhs)?;
                    frame.values[dest.0] = Some(binary(&func.name, *op, lhs, rhs)?);
                }
                Instruction::Call { callee, args, dest } => {
                    let args = args
                        .iter()
                        .map(|a| frame.read(a))
                        .collect::<ExecResult<Vec<_>>>()?;
                    frame.values[dest.0] = Some(self.run(callee, &args)?);
                }
                Instruction::Return(value) => return frame.read(value),
            }
        }

        // Verified functions always end in 'ret'
        Ok(0)
    }
}

struct Frame<'a> {
    func: &'a Function,
    args: &'a [i32],
    values: Vec<Option<i32>>,
    memory: HashMap<ValueId, Option<i32>>,
}

impl Frame<'_> {
    fn read(&self, operand: &Operand) -> ExecResult<i32> {
        match operand {
            Operand::Const(c) => Ok(*c),
            Operand::Undef => Ok(0),
            Operand::Param(index) => Ok(self.args[*index]),
            Operand::Value(id) => self.values.get(id.0).copied().flatten().ok_or_else(|| {
                ExecError::UninitializedValue {
                    func: self.func.name.clone(),
                    value: self
                        .func
                        .names
                        .get(id.0)
                        .cloned()
                        .unwrap_or_else(|| format!("#{}", id.0)),
                }
            }),
        }
    }
}

fn binary(func: &str, op: BinaryOp, lhs: i32, rhs: i32) -> ExecResult<i32> {
    match op {
        BinaryOp::SDiv if rhs == 0 => Err(ExecError::DivisionByZero(func.to_string())),
        BinaryOp::SDiv if lhs == i32::MIN && rhs == -1 => {
            Err(ExecError::DivisionOverflow(func.to_string()))
        }
        _ => Ok(crate::evaluate(op, lhs, rhs).unwrap_or_default()),
    }
}

fn check_arity(name: &str, expected: usize, found: usize) -> ExecResult<()> {
    if expected != found {
        return Err(ExecError::ArityMismatch {
            name: name.to_string(),
            expected,
            found,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use ir::parse_module;

    use super::*;
    use crate::finalize;

    fn program(text: &str) -> Promoted {
        finalize(parse_module("test", text).unwrap()).unwrap()
    }

    fn run_main(text: &str) -> (ExecResult<i32>, String) {
        let program = program(text);
        let mut executor = Executor::new(&program, Vec::new());
        let result = executor.run("main", &[]);
        let output = String::from_utf8(executor.into_output()).unwrap();

        (result, output)
    }

    #[test]
    fn arithmetic_through_slots() {
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

        let (result, output) = run_main(text);
        assert_eq!(result.unwrap(), 10);
        assert_eq!(output, "");
    }

    #[test]
    fn printnum_writes_its_argument() {
        let text = indoc! {"
            declare i32 @printnum(i32)

            define i32 @twice(i32 %nArg) {
            entry:
              %mul_tmp = mul i32 %nArg, 2
              ret i32 %mul_tmp
            }

            define i32 @main() {
            entry:
              %call_tmp = call i32 @twice(i32 -21)
              %call_tmp1 = call i32 @printnum(i32 %call_tmp)
              %call_tmp2 = call i32 @printnum(i32 7)
              %add_tmp = add i32 %call_tmp1, %call_tmp2
              ret i32 %add_tmp
            }
        "};

        let (result, output) = run_main(text);
        assert_eq!(result.unwrap(), -35);
        assert_eq!(output, "-42\n7\n");
    }

    #[test]
    fn division_by_zero() {
        let text = indoc! {"
            define i32 @main() {
            entry:
              %div_tmp = sdiv i32 1, 0
              ret i32 %div_tmp
            }
        "};

        let (result, _) = run_main(text);
        assert!(matches!(result, Err(ExecError::DivisionByZero(f)) if f == "main"));
    }

    #[test]
    fn division_overflow() {
        let text = indoc! {"
            define i32 @main() {
            entry:
              %min = sub i32 -2147483647, 1
              %div_tmp = sdiv i32 %min, -1
              ret i32 %div_tmp
            }
        "};

        let (result, _) = run_main(text);
        assert!(matches!(result, Err(ExecError::DivisionOverflow(_))));
    }

    #[test]
    fn unresolved_declaration() {
        let text = indoc! {"
            declare i32 @missing(i32)

            define i32 @main() {
            entry:
              %call_tmp = call i32 @missing(i32 1)
              ret i32 %call_tmp
            }
        "};

        let (result, _) = run_main(text);
        assert!(matches!(result, Err(ExecError::UnresolvedSymbol(s)) if s == "missing"));
    }

    #[test]
    fn runaway_recursion() {
        let text = indoc! {"
            define i32 @main() {
            entry:
              %call_tmp = call i32 @main()
              ret i32 %call_tmp
            }
        "};

        let (result, _) = run_main(text);
        assert!(matches!(result, Err(ExecError::CallDepthExceeded(_))));
    }

    #[test]
    fn arguments_are_checked() {
        let text = indoc! {"
            define i32 @id(i32 %xArg) {
            entry:
              ret i32 %xArg
            }
        "};

        let program = program(text);
        let mut executor = Executor::new(&program, std::io::sink());

        assert_eq!(executor.run("id", &[9]).unwrap(), 9);
        assert!(matches!(
            executor.run("id", &[]),
            Err(ExecError::ArityMismatch {
                expected: 1,
                found: 0,
                ..
            })
        ));
        assert!(matches!(
            executor.run("main", &[]),
            Err(ExecError::UnresolvedSymbol(_))
        ));
    }
}
