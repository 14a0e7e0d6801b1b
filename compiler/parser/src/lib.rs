pub use parse_err::*;
pub use parser::*;

mod parse_err;
mod parser;
mod symbols;
