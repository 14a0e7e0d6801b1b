use std::path::Path;

use thiserror::Error;

use backend::{link_file, LinkError};
use ir::{BinaryOp, BuildError, Builder, FuncId, Operand, ValueId};

use crate::{ArithOp, Backend};

#[derive(Error, Debug)]
pub enum IrBackendError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl Backend for Builder {
    type Function = FuncId;
    type Value = Operand;
    type Slot = ValueId;
    type Error = IrBackendError;

    fn get_function(&self, name: &str) -> Option<(FuncId, usize)> {
        Builder::get_function(self, name).map(|id| (id, self.function(id).arity()))
    }

    fn declare_function(&mut self, name: &str, params: &[String]) -> Result<FuncId, Self::Error> {
        let params = params.iter().map(|p| format!("{}Arg", p)).collect();
        Ok(self.add_function(name, params)?)
    }

    fn append_entry_block(&mut self, function: FuncId) {
        self.append_block(function, "entry");
    }

    fn param(&self, function: FuncId, index: usize) -> Result<Operand, Self::Error> {
        Ok(Builder::param(self, function, index)?)
    }

    fn alloca(&mut self, name: &str) -> Result<ValueId, Self::Error> {
        Ok(self.build_alloca(name)?)
    }

    fn load(&mut self, slot: ValueId, name: &str) -> Result<Operand, Self::Error> {
        Ok(Operand::Value(self.build_load(slot, name)?))
    }

    fn store(&mut self, value: Operand, slot: ValueId) -> Result<(), Self::Error> {
        Ok(self.build_store(value, slot)?)
    }

    fn const_int(&self, value: i32) -> Operand {
        Operand::Const(value)
    }

    fn binary(&mut self, op: ArithOp, lhs: Operand, rhs: Operand) -> Result<Operand, Self::Error> {
        let (op, name) = match op {
            ArithOp::Add => (BinaryOp::Add, "add_tmp"),
            ArithOp::Sub => (BinaryOp::Sub, "sub_tmp"),
            ArithOp::Mul => (BinaryOp::Mul, "mul_tmp"),
            ArithOp::SDiv => (BinaryOp::SDiv, "div_tmp"),
        };

        Ok(Operand::Value(self.build_binary(op, lhs, rhs, name)?))
    }

    fn call(&mut self, function: FuncId, args: Vec<Operand>) -> Result<Operand, Self::Error> {
        Ok(Operand::Value(self.build_call(function, args, "call_tmp")?))
    }

    fn ret(&mut self, value: Operand) -> Result<(), Self::Error> {
        Ok(self.build_ret(value)?)
    }

    fn link_file(&mut self, path: &Path) -> Result<(), Self::Error> {
        Ok(link_file(self.module_mut(), path)?)
    }
}
