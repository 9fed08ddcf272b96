//! Parser module for assembly source

pub mod lexer;
pub mod number;

pub use lexer::{parse_line, split_operands, Line, Statement};
pub use number::NumberParser;
