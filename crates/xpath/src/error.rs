//! XPath error types. Syntax diagnostics carry the line and column of the
//! offending token plus the whole expression for context.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum XPathError {
    #[error(
        "token `{token}` at line {line}, column {column}: {message} `{expr}` is not a valid xpath expression."
    )]
    Syntax {
        expr: String,
        token: String,
        line: u32,
        column: u32,
        message: String,
    },

    #[error("`{name}` at line {line}, column {column} is not a valid xpath function.")]
    UnknownFunction {
        name: String,
        line: u32,
        column: u32,
    },

    #[error(
        "function `{name}` at line {line}, column {column} invoked with wrong number of arguments. Expected {expected} argument(s), got {got}."
    )]
    WrongArity {
        name: String,
        expected: i8,
        got: usize,
        line: u32,
        column: u32,
    },

    #[error(
        "could not evaluate the xpath expression: `{expr}`. The xpath expression is syntactically valid, but its evaluation has failed at runtime. Possible causes: {cause}"
    )]
    Eval { expr: String, cause: String },
}
