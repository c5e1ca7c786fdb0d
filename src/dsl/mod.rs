//! Rule expression language for single-tag matching.
//!
//! One expression per line:
//!   key                     - key present, any value
//!   key=value               - exact value
//!   key=val1,val2,val3      - any of the values
//!   key!=value              - key present, value does not match
//!   foo*, *foo, *foo*       - prefix, suffix and substring patterns (key or value)
//!   *                       - anything
//!   # comment               - ignored; mid-line only after whitespace
//!
//! Whitespace around keys, values and list items is ignored. Wildcards
//! cannot be combined with a value list.

mod ast;
mod eval;
mod parser;

pub use ast::*;
pub use eval::evaluate_expr;
pub use parser::parse_expression;
