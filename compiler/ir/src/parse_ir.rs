use std::collections::HashMap;

use thiserror::Error;

use crate::*;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct IrParseError {
    pub line: usize,
    pub message: String,
}

/// Reads back the textual form produced by `Display for Module`.
///
/// Comments, `source_filename`, `target` and `attributes` lines are skipped.
/// Parameters of declarations have no names in the text and are named `arg0`, `arg1`...
pub fn parse_module(name: &str, text: &str) -> Result<Module, IrParseError> {
    let mut parser = IrParser {
        module: Module::new(name),
        current: None,
        line: 0,
    };

    for (index, line) in text.lines().enumerate() {
        parser.line = index + 1;
        parser.parse_line(line.trim())?;
    }

    if let Some(open) = &parser.current {
        return Err(parser.error(format!("function '@{}' is never closed", open.func.name)));
    }

    Ok(parser.module)
}

struct IrParser {
    module: Module,
    current: Option<OpenFunction>,
    line: usize,
}

struct OpenFunction {
    func: Function,
    values: HashMap<String, ValueId>,
}

impl IrParser {
    fn error<S: Into<String>>(&self, message: S) -> IrParseError {
        IrParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn parse_line(&mut self, line: &str) -> Result<(), IrParseError> {
        if line.is_empty()
            || line.starts_with(';')
            || line.starts_with("source_filename")
            || line.starts_with("target ")
            || line.starts_with("attributes ")
        {
            return Ok(());
        }

        if self.current.is_none() {
            return if let Some(rest) = line.strip_prefix("declare ") {
                self.parse_declare(rest)
            } else if let Some(rest) = line.strip_prefix("define ") {
                self.parse_define(rest)
            } else {
                Err(self.error(format!("expected 'declare' or 'define', found '{}'", line)))
            };
        }

        if line == "}" {
            return self.close_function();
        }

        if let Some(label) = line.strip_suffix(':') {
            return self.open_block(label);
        }

        let instruction = self.parse_instruction(line)?;
        let outside = self.error("instruction outside of a block");
        let block = self
            .current
            .as_mut()
            .and_then(|open| open.func.blocks.last_mut())
            .ok_or(outside)?;

        block.instructions.push(instruction);
        Ok(())
    }

    fn parse_declare(&mut self, rest: &str) -> Result<(), IrParseError> {
        let (name, params) = self.parse_signature(rest)?;
        let params = (0..params.len()).map(|i| format!("arg{}", i)).collect();

        self.add_function(Function::new(name, params))
    }

    fn parse_define(&mut self, rest: &str) -> Result<(), IrParseError> {
        let rest = rest
            .strip_suffix('{')
            .ok_or_else(|| self.error("expected '{' after function signature"))?;
        let (name, params) = self.parse_signature(rest.trim_end())?;

        let params = params
            .iter()
            .enumerate()
            .map(|(i, param)| match param.split_whitespace().nth(1) {
                Some(p) => p
                    .strip_prefix('%')
                    .map(str::to_string)
                    .ok_or_else(|| self.error(format!("bad parameter '{}'", param))),
                None => Ok(format!("arg{}", i)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.current = Some(OpenFunction {
            func: Function::new(name, params),
            values: HashMap::new(),
        });

        Ok(())
    }

    /// Splits `i32 @name(i32 %a, i32 %b)` into the name and the raw parameter strings
    fn parse_signature<'a>(&self, sig: &'a str) -> Result<(&'a str, Vec<&'a str>), IrParseError> {
        let sig = sig
            .trim()
            .strip_prefix("i32 @")
            .ok_or_else(|| self.error(format!("expected 'i32 @name', found '{}'", sig)))?;

        let (name, params) = sig
            .split_once('(')
            .ok_or_else(|| self.error("expected '(' after function name"))?;
        let params = params
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| self.error("expected ')' after parameters"))?;

        Ok((name, split_list(params)))
    }

    fn add_function(&mut self, func: Function) -> Result<(), IrParseError> {
        if self.module.get_function(&func.name).is_some() {
            return Err(self.error(format!("function '@{}' appears twice", func.name)));
        }

        self.module.functions.push(func);
        Ok(())
    }

    fn close_function(&mut self) -> Result<(), IrParseError> {
        match self.current.take() {
            Some(open) if open.func.blocks.is_empty() => Err(self.error(format!(
                "function '@{}' has no blocks",
                open.func.name
            ))),
            Some(open) => self.add_function(open.func),
            None => Err(self.error("unexpected '}'")),
        }
    }

    fn open_block(&mut self, label: &str) -> Result<(), IrParseError> {
        if let Some(open) = self.current.as_mut() {
            open.func.blocks.push(Block {
                label: label.to_string(),
                instructions: vec![],
            });
        }

        Ok(())
    }

    fn parse_instruction(&mut self, line: &str) -> Result<Instruction, IrParseError> {
        if let Some(rest) = line.strip_prefix("store i32 ") {
            let parts = split_list(rest);
            let value = parts
                .first()
                .ok_or_else(|| self.error("store needs a value"))?;
            let slot = parts
                .get(1)
                .and_then(|p| p.strip_prefix("ptr "))
                .ok_or_else(|| self.error("store needs a 'ptr' slot"))?;

            return Ok(Instruction::Store {
                value: self.operand(value)?,
                slot: self.slot(slot)?,
            });
        }

        if let Some(rest) = line.strip_prefix("ret i32 ") {
            return Ok(Instruction::Return(self.operand(rest.trim())?));
        }

        let (dest, rhs) = line
            .split_once(" = ")
            .ok_or_else(|| self.error(format!("unrecognised instruction '{}'", line)))?;
        let dest = dest
            .strip_prefix('%')
            .ok_or_else(|| self.error(format!("bad value name '{}'", dest)))?;

        // Operands are resolved before the destination is defined
        let pending = self.parse_rhs(rhs.trim())?;
        let dest = self.define(dest)?;

        Ok(pending.with_dest(dest))
    }

    fn parse_rhs(&self, rhs: &str) -> Result<Pending, IrParseError> {
        let (opcode, rest) = rhs.split_once(' ').unwrap_or((rhs, ""));

        match opcode {
            "alloca" => Ok(Pending::Alloca),
            "load" => {
                let slot = split_list(rest)
                    .get(1)
                    .and_then(|p| p.strip_prefix("ptr "))
                    .ok_or_else(|| self.error("load needs a 'ptr' slot"))?;
                Ok(Pending::Load(self.slot(slot)?))
            }
            "add" | "sub" | "mul" | "sdiv" => {
                let op = match opcode {
                    "add" => BinaryOp::Add,
                    "sub" => BinaryOp::Sub,
                    "mul" => BinaryOp::Mul,
                    _ => BinaryOp::SDiv,
                };

                let rest = rest
                    .trim_start_matches("nsw ")
                    .trim_start_matches("nuw ")
                    .trim_start_matches("exact ");
                let rest = rest
                    .strip_prefix("i32 ")
                    .ok_or_else(|| self.error(format!("'{}' needs i32 operands", opcode)))?;

                match split_list(rest)[..] {
                    [lhs, rhs] => Ok(Pending::Binary(op, self.operand(lhs)?, self.operand(rhs)?)),
                    _ => Err(self.error(format!("'{}' takes two operands", opcode))),
                }
            }
            "call" => {
                let (callee, args) = self.parse_signature(rest)?;
                let args = args
                    .iter()
                    .map(|arg| {
                        arg.strip_prefix("i32 ")
                            .ok_or_else(|| self.error(format!("bad call argument '{}'", arg)))
                            .and_then(|a| self.operand(a))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Pending::Call(callee.to_string(), args))
            }
            _ => Err(self.error(format!("unknown opcode '{}'", opcode))),
        }
    }

    fn define(&mut self, name: &str) -> Result<ValueId, IrParseError> {
        let line = self.line;
        let open = self.current.as_mut().ok_or_else(|| IrParseError {
            line,
            message: "value outside of a function".to_string(),
        })?;

        if open.values.contains_key(name) || open.func.params.iter().any(|p| p == name) {
            return Err(IrParseError {
                line,
                message: format!("value '%{}' is defined twice", name),
            });
        }

        open.func.names.push(name.to_string());
        let id = ValueId(open.func.names.len() - 1);
        open.values.insert(name.to_string(), id);

        Ok(id)
    }

    fn operand(&self, text: &str) -> Result<Operand, IrParseError> {
        let text = text.trim();

        if text == "undef" {
            return Ok(Operand::Undef);
        }

        if let Some(name) = text.strip_prefix('%') {
            let open = self
                .current
                .as_ref()
                .ok_or_else(|| self.error("operand outside of a function"))?;

            if let Some(index) = open.func.params.iter().position(|p| p == name) {
                return Ok(Operand::Param(index));
            }

            return open
                .values
                .get(name)
                .map(|id| Operand::Value(*id))
                .ok_or_else(|| self.error(format!("use of undefined value '%{}'", name)));
        }

        text.parse::<i32>()
            .map(Operand::Const)
            .map_err(|_| self.error(format!("bad operand '{}'", text)))
    }

    fn slot(&self, text: &str) -> Result<ValueId, IrParseError> {
        match self.operand(text)? {
            Operand::Value(id) => Ok(id),
            _ => Err(self.error(format!("'{}' is not a slot", text))),
        }
    }
}

/// Instruction whose destination is not yet known
enum Pending {
    Alloca,
    Load(ValueId),
    Binary(BinaryOp, Operand, Operand),
    Call(String, Vec<Operand>),
}

impl Pending {
    fn with_dest(self, dest: ValueId) -> Instruction {
        match self {
            Pending::Alloca => Instruction::Alloca { dest },
            Pending::Load(slot) => Instruction::Load { dest, slot },
            Pending::Binary(op, lhs, rhs) => Instruction::Binary { op, lhs, rhs, dest },
            Pending::Call(callee, args) => Instruction::Call { callee, args, dest },
        }
    }
}

fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    const ADD: &str = indoc! {"
        ; ModuleID = 'lib.ll'
        source_filename = \"lib.dc\"
        target triple = \"x86_64-pc-linux-gnu\"

        declare i32 @printnum(i32)

        define i32 @add(i32 %aArg, i32 %bArg) {
        entry:
          %sum = add nsw i32 %aArg, %bArg
          %call_tmp = call i32 @printnum(i32 %sum)
          ret i32 %call_tmp
        }
    "};

    #[test]
    fn parse_library() {
        let module = parse_module("lib.ll", ADD).unwrap();

        assert_eq!(module.functions.len(), 2);

        let printnum = &module.functions[0];
        assert!(printnum.is_declaration());
        assert_eq!(printnum.params, vec!["arg0".to_string()]);

        let add = module.named_function("add").unwrap();
        assert_eq!(add.params, vec!["aArg".to_string(), "bArg".to_string()]);
        assert_eq!(
            add.blocks[0].instructions,
            vec![
                Instruction::Binary {
                    op: BinaryOp::Add,
                    lhs: Operand::Param(0),
                    rhs: Operand::Param(1),
                    dest: ValueId(0)
                },
                Instruction::Call {
                    callee: "printnum".to_string(),
                    args: vec![Operand::Value(ValueId(0))],
                    dest: ValueId(1)
                },
                Instruction::Return(Operand::Value(ValueId(1))),
            ]
        );
    }

    #[test]
    fn printed_text_reads_back() {
        let text = indoc! {"
            ; ModuleID = 'a.dc'
            source_filename = \"a.dc\"

            define i32 @main() {
            entry:
              %i = alloca i32, align 4
              store i32 -4, ptr %i, align 4
              %i1 = load i32, ptr %i, align 4
              %div_tmp = sdiv i32 %i1, undef
              ret i32 %div_tmp
            }
        "};

        let module = parse_module("a.dc", text).unwrap();
        assert_eq!(module.to_string(), text);
    }

    #[test]
    fn undefined_value() {
        let text = indoc! {"
            define i32 @f() {
            entry:
              ret i32 %nope
            }
        "};

        assert_eq!(
            parse_module("bad", text),
            Err(IrParseError {
                line: 3,
                message: "use of undefined value '%nope'".to_string()
            })
        );
    }

    #[test]
    fn unclosed_function() {
        let text = "define i32 @f() {\nentry:\n  ret i32 0\n";

        let err = parse_module("bad", text).unwrap_err();
        assert_eq!(err.message, "function '@f' is never closed");
    }

    #[test]
    fn unknown_opcode() {
        let text = indoc! {"
            define i32 @f(i32 %x) {
            entry:
              %y = shl i32 %x, 1
              ret i32 %y
            }
        "};

        let err = parse_module("bad", text).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.message, "unknown opcode 'shl'");
    }

    #[test]
    fn duplicate_function() {
        let text = "declare i32 @f()\ndeclare i32 @f(i32)\n";

        let err = parse_module("bad", text).unwrap_err();
        assert_eq!(err.line, 2);
    }
}
