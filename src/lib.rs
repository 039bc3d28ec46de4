//! Kawaii - a minimal Lisp interpreter
//!
//! This crate reads parenthesized symbolic expressions from a source buffer and
//! evaluates them with a tree-walking evaluator. The language is deliberately
//! small: 64-bit integers, booleans, symbols, lists, user-defined functions, a
//! handful of arithmetic and relational primitives and the special forms
//! `define`, `lambda` and `if`.
//!
//! ```scheme
//! ;; factorial
//! (define (fact n) (if (<= n 1) 1 (* n (fact (- n 1)))))
//! (fact 5)             ; => 120
//! ```
//!
//! ## Scoping
//!
//! Functions do not capture their definition environment. A call frame is
//! linked to the frame that was active at the call site, so free variables in
//! a function body resolve dynamically:
//!
//! ```scheme
//! (define (show) y)
//! (define (outer y) (show))
//! (outer 7)            ; => 7
//! ```
//!
//! ## Modules
//!
//! - `ast`: value model and printing
//! - `reader`: S-expression reader over a borrowed source buffer
//! - `environment`: resizable hash-table frames and the frame chain
//! - `evaluator`: `eval`/`apply` and the special forms
//! - `builtinops`: the closed catalog of primitive operations
//! - `repl`: the read-eval-print session used by the binary

use crate::builtinops::Arity;

/// Maximum evaluation depth before a runaway recursion is reported as an error.
///
/// The native stack grows on demand (see [`stack`]), so this limit rather than
/// the OS stack size decides when deep recursion stops.
pub const MAX_EVAL_DEPTH: usize = 100_000;

/// Error types for the interpreter
///
/// Every variant is fatal for a running program; the binary prints it with an
/// `error: ` prefix and exits. The library itself only returns them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The reader could not turn the input into a value
    #[error("parse error: {0}")]
    ParseError(String),
    /// Malformed `define`, `lambda` or `if`
    #[error("syntax error: {0}")]
    SyntaxError(String),
    #[error("unbound symbol: {0}")]
    UnboundVariable(String),
    #[error("type error: {0}")]
    TypeError(String),
    /// A primitive or special form received an unsupported number of arguments
    #[error("{op}: expected {expected} argument(s), got {got}")]
    ArityError {
        op: &'static str,
        expected: Arity,
        got: usize,
    },
    #[error("too few arguments: expected {expected}, got {got}")]
    TooFewArguments { expected: usize, got: usize },
    #[error("too many arguments: expected {expected}, got {got}")]
    TooManyArguments { expected: usize, got: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0}")]
    IntegerOverflow(&'static str),
    #[error("evaluation depth limit exceeded (max: {0})")]
    DepthLimitExceeded(usize),
    /// Reached an evaluator state the reader never produces
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Create the arity error for a closure call from its parameter and argument counts
    pub fn argument_count(expected: usize, got: usize) -> Self {
        if got < expected {
            Error::TooFewArguments { expected, got }
        } else {
            Error::TooManyArguments { expected, got }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub mod ast;
pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod reader;
pub mod repl;
pub mod stack;
