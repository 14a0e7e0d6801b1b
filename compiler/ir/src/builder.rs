use thiserror::Error;

use crate::*;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("function '{0}' already exists in the module")]
    DuplicateFunction(String),
    #[error("no insertion point: open a block before emitting instructions")]
    NoInsertPoint,
    #[error("function '{func}' has no parameter {index}")]
    ParamOutOfRange { func: String, index: usize },
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Appends functions, blocks and instructions to a module being built.
///
/// Instructions go to the end of the block most recently opened with `append_block`.
pub struct Builder {
    module: Module,
    insert_point: Option<(FuncId, usize)>,
}

impl Builder {
    pub fn new<S: Into<String>>(module_name: S) -> Self {
        Self::from_module(Module::new(module_name))
    }

    pub fn from_module(module: Module) -> Self {
        Self {
            module,
            insert_point: None,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.module.get_function(name)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        self.module.function(id)
    }

    /// Declares a function taking one i32 per parameter name and returning i32
    pub fn add_function(&mut self, name: &str, params: Vec<String>) -> BuildResult<FuncId> {
        if self.module.get_function(name).is_some() {
            return Err(BuildError::DuplicateFunction(name.to_string()));
        }

        self.module.functions.push(Function::new(name, params));
        Ok(FuncId(self.module.functions.len() - 1))
    }

    /// Appends an empty block to `func` and moves the insertion point to it
    pub fn append_block(&mut self, func: FuncId, label: &str) {
        let blocks = &mut self.module.function_mut(func).blocks;
        blocks.push(Block {
            label: label.to_string(),
            instructions: vec![],
        });

        self.insert_point = Some((func, blocks.len() - 1));
    }

    pub fn param(&self, func: FuncId, index: usize) -> BuildResult<Operand> {
        let function = self.module.function(func);

        if index >= function.arity() {
            return Err(BuildError::ParamOutOfRange {
                func: function.name.clone(),
                index,
            });
        }

        Ok(Operand::Param(index))
    }

    pub fn build_alloca(&mut self, name: &str) -> BuildResult<ValueId> {
        let dest = self.fresh_value(name)?;
        self.push(Instruction::Alloca { dest })?;
        Ok(dest)
    }

    pub fn build_load(&mut self, slot: ValueId, name: &str) -> BuildResult<ValueId> {
        let dest = self.fresh_value(name)?;
        self.push(Instruction::Load { dest, slot })?;
        Ok(dest)
    }

    pub fn build_store(&mut self, value: Operand, slot: ValueId) -> BuildResult<()> {
        self.push(Instruction::Store { value, slot })
    }

    pub fn build_binary(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
        name: &str,
    ) -> BuildResult<ValueId> {
        let dest = self.fresh_value(name)?;
        self.push(Instruction::Binary { op, lhs, rhs, dest })?;
        Ok(dest)
    }

    pub fn build_call(
        &mut self,
        callee: FuncId,
        args: Vec<Operand>,
        name: &str,
    ) -> BuildResult<ValueId> {
        let callee = self.module.function(callee).name.clone();
        let dest = self.fresh_value(name)?;
        self.push(Instruction::Call { callee, args, dest })?;
        Ok(dest)
    }

    pub fn build_ret(&mut self, value: Operand) -> BuildResult<()> {
        self.push(Instruction::Return(value))
    }

    fn fresh_value(&mut self, name: &str) -> BuildResult<ValueId> {
        let (func, _) = self.insert_point.ok_or(BuildError::NoInsertPoint)?;
        Ok(self.module.function_mut(func).fresh_value(name))
    }

    fn push(&mut self, instruction: Instruction) -> BuildResult<()> {
        let (func, block) = self.insert_point.ok_or(BuildError::NoInsertPoint)?;
        self.module.function_mut(func).blocks[block]
            .instructions
            .push(instruction);

        Ok(())
    }
}
