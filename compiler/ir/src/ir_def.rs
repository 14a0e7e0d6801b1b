//! Defines the load/store IR datatypes
//!
//! Every value is a 32-bit signed integer, except the results of `Alloca`,
//! which are slots that only `Load` and `Store` may use.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    /// Textual name of each value, indexed by `ValueId`
    pub names: Vec<String>,
    /// Empty for a declaration
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: String,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Alloca {
        dest: ValueId,
    },
    Load {
        dest: ValueId,
        slot: ValueId,
    },
    Store {
        value: Operand,
        slot: ValueId,
    },
    Binary {
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
        dest: ValueId,
    },
    Call {
        callee: String,
        args: Vec<Operand>,
        dest: ValueId,
    },
    Return(Operand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Const(i32),
    Param(usize),
    Value(ValueId),
    Undef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
}

impl Module {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            functions: vec![],
        }
    }

    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(FuncId)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0]
    }

    pub fn named_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl Function {
    pub fn new<S: Into<String>>(name: S, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
            names: vec![],
            blocks: vec![],
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn value_name(&self, id: ValueId) -> &str {
        &self.names[id.0]
    }

    /// Allocates a value named after `base`, suffixed with a counter if the name is taken
    pub fn fresh_value(&mut self, base: &str) -> ValueId {
        let base = if base.is_empty() { "tmp" } else { base };

        let mut name = base.to_string();
        let mut counter = 1;
        while self.is_name_taken(&name) {
            name = format!("{}{}", base, counter);
            counter += 1;
        }

        self.names.push(name);
        ValueId(self.names.len() - 1)
    }

    fn is_name_taken(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name) || self.names.iter().any(|n| n == name)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }
}

impl Instruction {
    /// Value written by this instruction
    pub fn dest(&self) -> Option<ValueId> {
        match self {
            Instruction::Alloca { dest }
            | Instruction::Load { dest, .. }
            | Instruction::Binary { dest, .. }
            | Instruction::Call { dest, .. } => Some(*dest),
            Instruction::Store { .. } | Instruction::Return(_) => None,
        }
    }

    /// Integer operands read by this instruction, slots excluded
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instruction::Alloca { .. } | Instruction::Load { .. } => vec![],
            Instruction::Store { value, .. } => vec![value],
            Instruction::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Instruction::Call { args, .. } => args.iter().collect(),
            Instruction::Return(value) => vec![value],
        }
    }

    pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
        match self {
            Instruction::Alloca { .. } | Instruction::Load { .. } => vec![],
            Instruction::Store { value, .. } => vec![value],
            Instruction::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Instruction::Call { args, .. } => args.iter_mut().collect(),
            Instruction::Return(value) => vec![value],
        }
    }

    /// Slot read or written by this instruction
    pub fn slot(&self) -> Option<ValueId> {
        match self {
            Instruction::Load { slot, .. } | Instruction::Store { slot, .. } => Some(*slot),
            _ => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Return(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_are_unique() {
        let mut func = Function::new("f", vec!["aArg".to_string()]);

        let first = func.fresh_value("tmp");
        let second = func.fresh_value("tmp");
        let third = func.fresh_value("tmp");
        let param_clash = func.fresh_value("aArg");

        assert_eq!(func.value_name(first), "tmp");
        assert_eq!(func.value_name(second), "tmp1");
        assert_eq!(func.value_name(third), "tmp2");
        assert_eq!(func.value_name(param_clash), "aArg1");
    }

    #[test]
    fn lookup_by_name() {
        let mut module = Module::new("m");
        module.functions.push(Function::new("a", vec![]));
        module.functions.push(Function::new("b", vec!["x".to_string()]));

        assert_eq!(module.get_function("b"), Some(FuncId(1)));
        assert_eq!(module.get_function("c"), None);
        assert_eq!(module.named_function("b").map(Function::arity), Some(1));
        assert!(module.function(FuncId(0)).is_declaration());
    }
}
