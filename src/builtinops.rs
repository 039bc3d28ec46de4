//! Built-in operations registry.
//!
//! The interpreter ships a fixed, closed catalog of operators. Each one is a
//! [`Primitive`] variant, so a primitive value is just a tag and every
//! occurrence of `+` in a program shares the same interned operator. The
//! registry below maps each tag to its Scheme identifier, its arity and its
//! implementation.
//!
//! ```scheme
//! (+ 1 2 3)          ; => 6
//! (- 10 1 2)         ; => 7
//! (- 5)              ; => -5
//! (/ 7 2)            ; => 3
//! (<= 1 2)           ; => #t
//! (not (= 1 2))      ; => #t
//! ```
//!
//! ## Functions vs Special Forms
//!
//! - **Functions**: receive their arguments already evaluated, left to right
//!   (`+ - * / = > < >= <= != not`)
//! - **Special Forms**: receive the unevaluated argument expressions and decide
//!   what to evaluate (`define`, `lambda`, `if`)
//!
//! ## Error Handling
//!
//! - **Type Safety**: arithmetic and comparison require integers, `not`
//!   requires a boolean; nothing is coerced
//! - **Overflow Detection**: arithmetic reports overflow instead of wrapping
//! - **Arity Checking**: argument counts are validated against [`Arity`]

use std::fmt;

use crate::Error;
use crate::ast::{IntType, Value};
use crate::environment::Environment;
use crate::evaluator::{eval_define, eval_if, eval_lambda};

/// Canonical signature of a primitive function over evaluated arguments
pub type BuiltinFn = for<'src> fn(&[Value<'src>]) -> Result<Value<'src>, Error>;

/// Signature of a special form: unevaluated arguments, the active environment
/// and the current evaluation depth
pub type SpecialFormFn =
    for<'src> fn(&[Value<'src>], &mut Environment<'src>, usize) -> Result<Value<'src>, Error>;

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
}

impl Arity {
    /// Whether `arg_count` arguments are acceptable
    pub fn accepts(self, arg_count: usize) -> bool {
        match self {
            Arity::Exact(n) => arg_count == n,
            Arity::AtLeast(n) => arg_count >= n,
            Arity::Range(min, max) => (min..=max).contains(&arg_count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

/// Represents the implementation of a built-in operation
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Takes evaluated arguments
    Function(BuiltinFn),
    /// Takes unevaluated arguments and the environment
    SpecialForm(SpecialFormFn),
}

impl fmt::Debug for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// The closed set of built-in operators and special forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
    Not,
    If,
    Define,
    Lambda,
}

impl Primitive {
    /// The registry entry describing this primitive
    pub fn op(self) -> &'static BuiltinOp {
        &BUILTIN_OPS[self as usize]
    }

    /// The identifier this primitive is bound to in the global frame
    pub fn scheme_id(self) -> &'static str {
        self.op().scheme_id
    }
}

/// Definition of a built-in operation
#[derive(Debug)]
pub struct BuiltinOp {
    pub primitive: Primitive,
    /// The identifier bound in the global frame
    pub scheme_id: &'static str,
    pub op_kind: OpKind,
    /// Expected number of arguments
    pub arity: Arity,
}

impl BuiltinOp {
    /// Check if the given number of arguments is valid for this operation
    pub fn validate_arity(&self, arg_count: usize) -> Result<(), Error> {
        if self.arity.accepts(arg_count) {
            Ok(())
        } else {
            Err(Error::ArityError {
                op: self.scheme_id,
                expected: self.arity,
                got: arg_count,
            })
        }
    }
}

//
// Builtin Function Implementations
//

fn int_args(args: &[Value<'_>]) -> impl Iterator<Item = Result<IntType, Error>> {
    args.iter().map(IntType::try_from)
}

fn builtin_add<'src>(args: &[Value<'src>]) -> Result<Value<'src>, Error> {
    let mut sum: IntType = 0;
    for n in int_args(args) {
        sum = sum
            .checked_add(n?)
            .ok_or(Error::IntegerOverflow("addition"))?;
    }
    Ok(Value::Int(sum))
}

// With fewer than two arguments the running result starts at 0, so `(- 5)`
// negates and `(-)` is 0.
fn builtin_sub<'src>(args: &[Value<'src>]) -> Result<Value<'src>, Error> {
    let (mut result, rest) = match args {
        [first, rest @ ..] if !rest.is_empty() => (IntType::try_from(first)?, rest),
        _ => (0, args),
    };
    for n in int_args(rest) {
        result = result
            .checked_sub(n?)
            .ok_or(Error::IntegerOverflow("subtraction"))?;
    }
    Ok(Value::Int(result))
}

fn builtin_mul<'src>(args: &[Value<'src>]) -> Result<Value<'src>, Error> {
    let mut product: IntType = 1;
    for n in int_args(args) {
        product = product
            .checked_mul(n?)
            .ok_or(Error::IntegerOverflow("multiplication"))?;
    }
    Ok(Value::Int(product))
}

// Integer division truncates toward zero
fn builtin_div<'src>(args: &[Value<'src>]) -> Result<Value<'src>, Error> {
    let [first, rest @ ..] = args else {
        return Err(Error::ArityError {
            op: "/",
            expected: Arity::AtLeast(1),
            got: 0,
        });
    };
    let mut quotient = IntType::try_from(first)?;
    for n in int_args(rest) {
        let divisor = n?;
        if divisor == 0 {
            return Err(Error::DivisionByZero);
        }
        quotient = quotient
            .checked_div(divisor)
            .ok_or(Error::IntegerOverflow("division"))?;
    }
    Ok(Value::Int(quotient))
}

// Macro to generate binary integer comparisons
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name<'src>(args: &[Value<'src>]) -> Result<Value<'src>, Error> {
            let [lhs, rhs] = args else {
                return Err(Error::ArityError {
                    op: $op_str,
                    expected: Arity::Exact(2),
                    got: args.len(),
                });
            };
            let lhs = IntType::try_from(lhs)?;
            let rhs = IntType::try_from(rhs)?;
            Ok(Value::Bool(lhs $op rhs))
        }
    };
}

numeric_comparison!(builtin_eq, ==, "=");
numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_ge, >=, ">=");
numeric_comparison!(builtin_le, <=, "<=");
numeric_comparison!(builtin_ne, !=, "!=");

fn builtin_not<'src>(args: &[Value<'src>]) -> Result<Value<'src>, Error> {
    match args {
        [operand] => Ok(Value::Bool(!bool::try_from(operand)?)),
        _ => Err(Error::ArityError {
            op: "not",
            expected: Arity::Exact(1),
            got: args.len(),
        }),
    }
}

/// Global registry of all built-in operations, indexed by [`Primitive`]
static BUILTIN_OPS: [BuiltinOp; 14] = [
    // Arithmetic operations
    BuiltinOp {
        primitive: Primitive::Add,
        scheme_id: "+",
        op_kind: OpKind::Function(builtin_add),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        primitive: Primitive::Sub,
        scheme_id: "-",
        op_kind: OpKind::Function(builtin_sub),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        primitive: Primitive::Mul,
        scheme_id: "*",
        op_kind: OpKind::Function(builtin_mul),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        primitive: Primitive::Div,
        scheme_id: "/",
        op_kind: OpKind::Function(builtin_div),
        arity: Arity::AtLeast(1),
    },
    // Comparison operations
    BuiltinOp {
        primitive: Primitive::Eq,
        scheme_id: "=",
        op_kind: OpKind::Function(builtin_eq),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        primitive: Primitive::Gt,
        scheme_id: ">",
        op_kind: OpKind::Function(builtin_gt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        primitive: Primitive::Lt,
        scheme_id: "<",
        op_kind: OpKind::Function(builtin_lt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        primitive: Primitive::Ge,
        scheme_id: ">=",
        op_kind: OpKind::Function(builtin_ge),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        primitive: Primitive::Le,
        scheme_id: "<=",
        op_kind: OpKind::Function(builtin_le),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        primitive: Primitive::Ne,
        scheme_id: "!=",
        op_kind: OpKind::Function(builtin_ne),
        arity: Arity::Exact(2),
    },
    // Logical operations
    BuiltinOp {
        primitive: Primitive::Not,
        scheme_id: "not",
        op_kind: OpKind::Function(builtin_not),
        arity: Arity::Exact(1),
    },
    // Special forms
    BuiltinOp {
        primitive: Primitive::If,
        scheme_id: "if",
        op_kind: OpKind::SpecialForm(eval_if),
        arity: Arity::Range(2, 3),
    },
    BuiltinOp {
        primitive: Primitive::Define,
        scheme_id: "define",
        op_kind: OpKind::SpecialForm(eval_define),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        primitive: Primitive::Lambda,
        scheme_id: "lambda",
        op_kind: OpKind::SpecialForm(eval_lambda),
        arity: Arity::AtLeast(2),
    },
];

/// Get all builtin operations (for building the global frame)
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    &BUILTIN_OPS
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{sym, val};

    fn find_op(name: &str) -> &'static BuiltinOp {
        get_builtin_ops()
            .iter()
            .find(|op| op.scheme_id == name)
            .unwrap_or_else(|| panic!("builtin not found: {name}"))
    }

    fn is_special_form(op: &BuiltinOp) -> bool {
        matches!(op.op_kind, OpKind::SpecialForm(_))
    }

    /// Invoke a builtin function through the registry
    fn call_builtin<'src>(name: &str, args: &[Value<'src>]) -> Result<Value<'src>, Error> {
        let op = find_op(name);
        match op.op_kind {
            OpKind::Function(func) => {
                op.validate_arity(args.len())?;
                func(args)
            }
            OpKind::SpecialForm(_) => {
                panic!("expected function builtin in tests, got special form: {name}")
            }
        }
    }

    #[test]
    fn test_registry_is_indexed_by_primitive() {
        for (index, op) in get_builtin_ops().iter().enumerate() {
            assert_eq!(op.primitive as usize, index, "{}", op.scheme_id);
            assert!(std::ptr::eq(op.primitive.op(), op));
        }
        assert_eq!(get_builtin_ops().len(), 14);
    }

    #[test]
    fn test_builtin_ops_registry() {
        let not_op = find_op("not");
        assert_eq!(not_op.primitive, Primitive::Not);
        assert_eq!(not_op.arity, Arity::Exact(1));
        assert!(!is_special_form(not_op));

        for form in ["define", "lambda", "if"] {
            assert!(is_special_form(find_op(form)), "{form}");
        }
        for function in ["+", "-", "*", "/", "=", ">", "<", ">=", "<=", "!="] {
            assert!(!is_special_form(find_op(function)), "{function}");
        }

        assert_eq!(Primitive::Ge.scheme_id(), ">=");
        assert_eq!(Primitive::Lambda.op().arity, Arity::AtLeast(2));
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(7));
        assert!(!Arity::AtLeast(1).accepts(0));
        assert!(Arity::Range(2, 3).accepts(2));
        assert!(Arity::Range(2, 3).accepts(3));
        assert!(!Arity::Range(2, 3).accepts(4));

        assert_eq!(Arity::Exact(2).to_string(), "2");
        assert_eq!(Arity::AtLeast(1).to_string(), "at least 1");
        assert_eq!(Arity::Range(2, 3).to_string(), "2 to 3");
    }

    /// Macro to create test cases, invoking builtins via the registry.
    macro_rules! test {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_builtin($name, $args), $expected)
        };
    }

    #[test]
    fn test_builtin_function_implementations() {
        type TestCase = (&'static str, Result<Value<'static>, Error>, Option<Value<'static>>);

        let many_ones: Vec<Value> = (0..100).map(|_| val(1)).collect();

        let test_cases: Vec<TestCase> = vec![
            // Addition
            test!("+", &[], Some(val(0))),
            test!("+", &[val(5)], Some(val(5))),
            test!("+", &[val(1), val(2), val(3)], Some(val(6))),
            test!("+", &[val(-10), val(4)], Some(val(-6))),
            test!("+", &many_ones, Some(val(100))),
            test!("+", &[val(IntType::MAX), val(1)], None),
            test!("+", &[val(1), val(true)], None),
            // Subtraction
            test!("-", &[], Some(val(0))),
            test!("-", &[val(5)], Some(val(-5))),
            test!("-", &[val(10), val(3)], Some(val(7))),
            test!("-", &[val(10), val(1), val(2)], Some(val(7))),
            test!("-", &[val(IntType::MIN), val(1)], None),
            test!("-", &[sym("x"), val(1)], None),
            test!("-", &[val(1), Value::Empty], None),
            // Multiplication
            test!("*", &[], Some(val(1))),
            test!("*", &[val(7)], Some(val(7))),
            test!("*", &[val(2), val(3), val(4)], Some(val(24))),
            test!("*", &[val(IntType::MAX), val(2)], None),
            test!("*", &[val(2), val(false)], None),
            // Division truncates toward zero
            test!("/", &[val(7), val(2)], Some(val(3))),
            test!("/", &[val(-7), val(2)], Some(val(-3))),
            test!("/", &[val(100), val(5), val(2)], Some(val(10))),
            test!("/", &[val(9)], Some(val(9))),
            test!("/", &[], None),
            test!("/", &[val(1), val(0)], None),
            test!("/", &[val(IntType::MIN), val(-1)], None),
            test!("/", &[val(true)], None),
            // Comparisons take exactly two integers
            test!("=", &[val(3), val(3)], Some(val(true))),
            test!("=", &[val(3), val(4)], Some(val(false))),
            test!(">", &[val(4), val(3)], Some(val(true))),
            test!(">", &[val(3), val(3)], Some(val(false))),
            test!("<", &[val(-1), val(0)], Some(val(true))),
            test!(">=", &[val(3), val(3)], Some(val(true))),
            test!("<=", &[val(4), val(3)], Some(val(false))),
            test!("!=", &[val(4), val(3)], Some(val(true))),
            test!("!=", &[val(3), val(3)], Some(val(false))),
            test!("=", &[val(1)], None),
            test!("<", &[val(1), val(2), val(3)], None),
            test!("=", &[val(1), val(true)], None),
            test!(">", &[sym("a"), val(1)], None),
            // Logical negation
            test!("not", &[val(true)], Some(val(false))),
            test!("not", &[val(false)], Some(val(true))),
            test!("not", &[val(0)], None),
            test!("not", &[], None),
            test!("not", &[val(true), val(false)], None),
        ];

        for (i, (name, result, expected)) in test_cases.into_iter().enumerate() {
            match (result, expected) {
                (Ok(actual), Some(expected)) => {
                    assert_eq!(actual, expected, "case #{} ({name})", i + 1);
                }
                (Err(_), None) => {}
                (Ok(actual), None) => {
                    panic!("case #{} ({name}): expected error, got {actual:?}", i + 1)
                }
                (Err(err), Some(expected)) => {
                    panic!("case #{} ({name}): expected {expected:?}, got error {err}", i + 1)
                }
            }
        }
    }

    #[test]
    fn test_builtin_error_kinds() {
        assert_eq!(
            call_builtin("/", &[val(1), val(0)]).unwrap_err(),
            Error::DivisionByZero
        );
        assert_eq!(
            call_builtin("+", &[val(IntType::MAX), val(1)]).unwrap_err(),
            Error::IntegerOverflow("addition")
        );
        assert!(matches!(
            call_builtin("=", &[val(1)]).unwrap_err(),
            Error::ArityError {
                op: "=",
                expected: Arity::Exact(2),
                got: 1
            }
        ));
        assert!(matches!(
            call_builtin("not", &[val(3)]).unwrap_err(),
            Error::TypeError(_)
        ));
    }
}
