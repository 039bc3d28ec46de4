//! This module defines the value model shared by the reader, the evaluator and
//! the printer. The main enum, [`Value`], is an immutable tagged union over
//! every runtime datum: the empty value, integers, booleans, symbols, lists,
//! user-defined functions and the interned primitive operators. Symbols borrow
//! their text from the loaded source buffer, so a `Value<'src>` never outlives
//! the program text it was read from.
//!
//! Values are never mutated after construction. Lists and functions are
//! reference counted, which makes cloning a value cheap and lets the same
//! sub-expression be shared by the reader, function bodies and bindings.
//! Ergonomic helpers ([`val`], [`sym`], [`list`]) are provided for building
//! expressions in tests.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::builtinops::Primitive;

/// Type alias for integer values in the interpreter
pub type IntType = i64;

/// Core value type of the interpreter
#[derive(Debug, Clone)]
pub enum Value<'src> {
    /// The unique empty value, also written `()`
    Empty,
    Int(IntType),
    Bool(bool),
    /// Identifier text, case preserved; compared case-insensitively
    Symbol(&'src str),
    /// A non-empty list. Use [`Value::list`] to build one, an empty
    /// sequence collapses to [`Value::Empty`]
    List(Rc<[Value<'src>]>),
    Function(Rc<Function<'src>>),
    /// One of the built-in operators or special forms
    Primitive(Primitive),
}

/// A user-defined function.
///
/// Functions carry no environment: a call frame is linked to whichever frame
/// is active at the call site.
#[derive(Debug)]
pub struct Function<'src> {
    /// Formal parameters. They are checked to be symbols at call time.
    pub params: Vec<Value<'src>>,
    /// Expressions evaluated in order; the last one is the call's result
    pub body: Vec<Value<'src>>,
}

impl<'src> Function<'src> {
    pub fn new(params: Vec<Value<'src>>, body: Vec<Value<'src>>) -> Self {
        Function { params, body }
    }
}

impl<'src> Value<'src> {
    /// Build a list value, collapsing an empty sequence to [`Value::Empty`]
    pub fn list(items: Vec<Value<'src>>) -> Self {
        if items.is_empty() {
            Value::Empty
        } else {
            Value::List(items.into())
        }
    }

    /// Wrap a function in a value
    pub fn function(params: Vec<Value<'src>>, body: Vec<Value<'src>>) -> Self {
        Value::Function(Rc::new(Function::new(params, body)))
    }

    /// Short name of the value's tag, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Primitive(_) => "primitive",
        }
    }

    /// Check whether this value is the symbol `name`, ignoring ASCII case
    pub fn is_symbol(&self, name: &str) -> bool {
        matches!(self, Value::Symbol(s) if s.eq_ignore_ascii_case(name))
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value<'_> {
            fn from(n: $int_type) -> Self {
                Value::Int(IntType::from(n))
            }
        }
    };
}

impl_from_integer!(i32);
impl_from_integer!(IntType);

impl<'src, T: Into<Value<'src>>> From<Vec<T>> for Value<'src> {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into).collect())
    }
}

impl<'src, T: Into<Value<'src>>, const N: usize> From<[T; N]> for Value<'src> {
    fn from(arr: [T; N]) -> Self {
        Value::list(arr.into_iter().map(Into::into).collect())
    }
}

// Fallible conversions from `Value` back into primitive Rust types.

impl TryFrom<&Value<'_>> for IntType {
    type Error = Error;

    fn try_from(value: &Value<'_>) -> Result<IntType, Error> {
        match value {
            Value::Int(n) => Ok(*n),
            other => Err(Error::TypeError(format!(
                "expected integer, got {} {other}",
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<&Value<'_>> for bool {
    type Error = Error;

    fn try_from(value: &Value<'_>) -> Result<bool, Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::TypeError(format!(
                "expected boolean, got {} {other}",
                other.type_name()
            ))),
        }
    }
}

/// Helper for creating symbols
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym(name: &str) -> Value<'_> {
    Value::Symbol(name)
}

/// Helper for creating values from Rust literals
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<'src, T: Into<Value<'src>>>(value: T) -> Value<'src> {
    value.into()
}

/// Helper for creating mixed lists
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn list<'src, const N: usize>(items: [Value<'src>; N]) -> Value<'src> {
    Value::list(items.into())
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // The empty value prints as nothing at top level
            Value::Empty => Ok(()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match elem {
                        // Keep nested empties visible so the output re-reads
                        Value::Empty => write!(f, "()")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, ")")
            }
            Value::Function(_) => write!(f, "#[function]"),
            Value::Primitive(p) => write!(f, "#[builtin {}]", p.scheme_id()),
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a.eq_ignore_ascii_case(b),
            (Value::List(a), Value::List(b)) => a == b,
            // Functions have identity, not structure
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            _ => false,
        }
    }
}
