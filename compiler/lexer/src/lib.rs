pub use lex::*;
pub use stream::*;

mod lex;
mod stream;
