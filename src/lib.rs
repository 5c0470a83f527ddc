pub mod ast;
pub mod data_set;
pub mod engine;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod relation;
pub mod render;
pub mod token;
pub mod tree;
pub mod value;

pub use data_set::DataSet;
pub use error::{Error, Result};
pub use eval::{evaluate, Evaluation, Query};
pub use parser::parse;
pub use relation::Relation;
