//! Rule parsing, combination and evaluation
//!
//! This module turns rule strings like "age > 30 AND department = 'Sales'"
//! into ASTs, folds ASTs together and evaluates them against a Record.

mod ast;
pub mod cache;
mod combiner;
mod evaluator;
pub mod parser;
pub mod wire;


pub use ast::*;
pub use cache::*;
pub use combiner::*;
pub use evaluator::*;
pub use parser::*;
pub use wire::*;
