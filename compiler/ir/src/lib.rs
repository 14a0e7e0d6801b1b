pub use builder::*;
pub use ir_def::*;
pub use parse_ir::*;

mod builder;
mod ir_def;
mod parse_ir;
mod print_ir;
