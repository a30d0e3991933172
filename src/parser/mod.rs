//! Parser for the textual constraint language
//!
//! ```text
//! a.width + b.width <= container.width @strong
//! 2 * a.left == b.center_x - 10 @weak(0.5)
//! ```

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::parse_constraint;
