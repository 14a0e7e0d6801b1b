use std::fmt::{Display, Formatter};

use ir::Module;

pub use exec::*;
pub use fold::*;
pub use link::*;
pub use promote::*;
pub use verify::*;

mod exec;
mod fold;
mod link;
mod promote;
mod verify;

/// A verified module that has been through memory-to-register promotion.
///
/// Emission and execution only accept this type, so no module reaches them
/// without promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promoted(Module);

impl Promoted {
    pub fn module(&self) -> &Module {
        &self.0
    }

    pub fn into_module(self) -> Module {
        self.0
    }

    /// Runs constant folding; the result is still promoted and verified
    pub fn fold_constants(mut self) -> Self {
        fold_constants(&mut self.0);
        self
    }
}

impl Display for Promoted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verifies `module`, promotes its slots to registers and verifies the result
pub fn finalize(mut module: Module) -> Result<Promoted, VerifyError> {
    verify(&module)?;
    promote_memory_to_registers(&mut module);
    verify(&module)?;

    Ok(Promoted(module))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use ir::{parse_module, Instruction, Operand};
    use pretty_assertions::assert_eq;

    use super::*;

    const MAIN: &str = indoc! {"
        define i32 @main() {
        entry:
          %i = alloca i32, align 4
          %mul_tmp = mul i32 5, 2
          store i32 %mul_tmp, ptr %i, align 4
          %i1 = load i32, ptr %i, align 4
          ret i32 %i1
        }
    "};

    #[test]
    fn finalize_then_fold() {
        let program = finalize(parse_module("main.dc", MAIN).unwrap()).unwrap();
        let folded = program.fold_constants();

        assert_eq!(
            folded.module().functions[0].blocks[0].instructions,
            vec![Instruction::Return(Operand::Const(10))]
        );
        assert_eq!(
            folded.to_string(),
            indoc! {"
                ; ModuleID = 'main.dc'
                source_filename = \"main.dc\"

                define i32 @main() {
                entry:
                  ret i32 10
                }
            "}
        );
    }

    #[test]
    fn invalid_module_is_not_promoted() {
        let text = indoc! {"
            define i32 @main() {
            entry:
              %x = add i32 1, 2
            }
        "};

        assert_eq!(
            finalize(parse_module("bad", text).unwrap()),
            Err(VerifyError::MissingTerminator("main".to_string()))
        );
    }
}
