use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
}

/// Everything lowering needs from an IR backend.
///
/// Instructions are appended at the end of the block most recently opened
/// with `append_entry_block`. Every value is an `i32`; slots hold one `i32` each.
pub trait Backend {
    type Function: Copy;
    type Value: Clone;
    type Slot: Copy;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Finds a function already in the module, with its parameter count
    fn get_function(&self, name: &str) -> Option<(Self::Function, usize)>;

    /// Adds an `i32 (i32, ...)` function with the given parameter names
    fn declare_function(
        &mut self,
        name: &str,
        params: &[String],
    ) -> Result<Self::Function, Self::Error>;

    fn append_entry_block(&mut self, function: Self::Function);

    fn param(&self, function: Self::Function, index: usize) -> Result<Self::Value, Self::Error>;

    fn alloca(&mut self, name: &str) -> Result<Self::Slot, Self::Error>;

    fn load(&mut self, slot: Self::Slot, name: &str) -> Result<Self::Value, Self::Error>;

    fn store(&mut self, value: Self::Value, slot: Self::Slot) -> Result<(), Self::Error>;

    fn const_int(&self, value: i32) -> Self::Value;

    fn binary(
        &mut self,
        op: ArithOp,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, Self::Error>;

    fn call(
        &mut self,
        function: Self::Function,
        args: Vec<Self::Value>,
    ) -> Result<Self::Value, Self::Error>;

    fn ret(&mut self, value: Self::Value) -> Result<(), Self::Error>;

    /// Parses a textual module from `path` and links it into the module being built
    fn link_file(&mut self, path: &Path) -> Result<(), Self::Error>;
}
