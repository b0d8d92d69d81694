//! Error types.

use thiserror::Error;

/// An error that occurs when translating text IR into a `Module`.
#[derive(Clone, Debug, Error)]
pub enum FrontendError {
    /// The input does not match the grammar.
    #[error("syntax error:\n{0}")]
    Syntax(String),
    #[error("undefined value `%{name}` in function `@{func}`")]
    UndefinedValue { name: String, func: String },
    #[error("undefined block `{name}` in function `@{func}`")]
    UndefinedBlock { name: String, func: String },
    #[error("call to undefined function `@{0}`")]
    UndefinedFunction(String),
    #[error("reference to undefined global `@{0}`")]
    UndefinedGlobal(String),
    #[error("reference to undefined source file `{0}`")]
    UndefinedFile(String),
    #[error("duplicate definition of {kind} `{name}`")]
    Duplicate { kind: &'static str, name: String },
    /// A `store` was given a result name.
    #[error("store cannot define `%{0}`")]
    NamedStore(String),
    #[error("integer literal `{0}` out of range")]
    BadInteger(String),
}
