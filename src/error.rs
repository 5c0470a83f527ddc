//! Error types shared by the lexer, parser and evaluator.
//!
//! Every variant renders to the exact message shown to the user, so callers can
//! print an error verbatim.

use thiserror::Error;

use crate::token::TokenKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    Lex(String),

    #[error("{0}")]
    Parse(String),

    #[error("Relation {name} does not exist.")]
    RelationNotFound { name: String },

    #[error("{0} does not exist.")]
    AttributeNotFound(String),

    #[error("{attribute} is ambiguous.")]
    AmbiguousAttribute { attribute: String },

    #[error("{lhs} of type {lhs_type} cannot be compared with {rhs} of type {rhs_type}.")]
    TypeMismatch {
        lhs: String,
        lhs_type: String,
        rhs: String,
        rhs_type: String,
    },

    #[error("Rename to {name} requires {expected} attributes.")]
    RenameArity { name: String, expected: usize },

    #[error("Rename to {name} contains duplicate attribute names.")]
    RenameDuplicates { name: String },

    #[error("Rename to {name} would be ambiguous.")]
    RenameAmbiguous { name: String },

    /// `operation` is capitalized: "Union", "Intersection" or "Difference".
    #[error("{operation} cannot be performed due to incompatible arity.")]
    ArityMismatch { operation: &'static str },

    #[error("Cartesian product would produce ambiguous attribute names.")]
    AmbiguousProduct,

    #[error("Ill-formed predicate")]
    IllFormedPredicate,

    /// A visitor does not handle nodes of this kind.
    #[error("No handler for {kind} nodes")]
    NoHandler { kind: TokenKind },

    #[error("Malformed expression tree: {0}")]
    MalformedTree(String),

    #[error("Invalid data set: {0}")]
    DataSet(String),
}

impl Error {
    pub(crate) fn invalid_character(c: char, position: usize) -> Self {
        Error::Lex(format!("Invalid character: {} at position {}", c, position))
    }

    pub(crate) fn unclosed_string(position: usize) -> Self {
        Error::Lex(format!("String starting at position {} is not closed", position))
    }

    pub(crate) fn type_mismatch(expected: TokenKind, found: TokenKind) -> Self {
        Error::Parse(format!(
            "Type mismatch; Expecting {} but found {}",
            expected, found
        ))
    }

    pub(crate) fn expected(construct: &str, found: impl std::fmt::Display) -> Self {
        Error::Parse(format!("Expected {}, but found {}", construct, found))
    }

    /// True for errors raised while turning text into an [`Ast`](crate::ast::Ast).
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Error::Lex(_) | Error::Parse(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::DataSet(e.to_string())
    }
}
