use crate::Error;
use crate::ast::{Function, Value};
use crate::builtinops::{OpKind, get_builtin_ops};
use crate::environment::Environment;
use crate::stack::ensure_sufficient_stack;

/// Create a global environment with every primitive bound to its identifier
pub fn create_global_env<'src>() -> Environment<'src> {
    let mut env = Environment::new();
    for builtin_op in get_builtin_ops() {
        env.define(builtin_op.scheme_id, Value::Primitive(builtin_op.primitive));
    }
    env
}

/// Evaluate an expression (public API)
pub fn eval<'src>(expr: &Value<'src>, env: &mut Environment<'src>) -> Result<Value<'src>, Error> {
    eval_with_depth_tracking(expr, env, 0)
}

/// Apply a function to already evaluated arguments (public API)
pub fn apply<'src>(
    func: &Function<'src>,
    args: Vec<Value<'src>>,
    env: &mut Environment<'src>,
) -> Result<Value<'src>, Error> {
    apply_with_depth_tracking(func, args, env, 0)
}

/// Evaluate an expression with depth tracking so runaway recursion is reported
/// instead of exhausting memory
fn eval_with_depth_tracking<'src>(
    expr: &Value<'src>,
    env: &mut Environment<'src>,
    depth: usize,
) -> Result<Value<'src>, Error> {
    if depth >= env.max_depth() {
        return Err(Error::DepthLimitExceeded(env.max_depth()));
    }
    ensure_sufficient_stack(|| match expr {
        // A resolved value is evaluated again, so a symbol may stand for
        // another symbol or for a stored expression
        Value::Symbol(name) => {
            let value = resolve(env, name)?;
            eval_with_depth_tracking(&value, env, depth + 1)
        }

        Value::List(elements) => eval_list(elements, env, depth),

        // Self-evaluating
        Value::Empty
        | Value::Int(_)
        | Value::Bool(_)
        | Value::Function(_)
        | Value::Primitive(_) => Ok(expr.clone()),
    })
}

/// Walk the frame chain outward for `name`
fn resolve<'src>(env: &Environment<'src>, name: &str) -> Result<Value<'src>, Error> {
    env.get(name)
        .cloned()
        .ok_or_else(|| Error::UnboundVariable(name.to_owned()))
}

/// Evaluate argument expressions strictly left to right
fn eval_args<'src>(
    args: &[Value<'src>],
    env: &mut Environment<'src>,
    depth: usize,
) -> Result<Vec<Value<'src>>, Error> {
    args.iter()
        .map(|arg| eval_with_depth_tracking(arg, env, depth + 1))
        .collect()
}

/// Evaluate a list expression: the head decides the operation
fn eval_list<'src>(
    elements: &[Value<'src>],
    env: &mut Environment<'src>,
    depth: usize,
) -> Result<Value<'src>, Error> {
    let [head, arg_exprs @ ..] = elements else {
        return Ok(Value::Empty);
    };

    // A symbol head is resolved but not evaluated further
    let operator = match head {
        Value::Symbol(name) => resolve(env, name)?,
        other => eval_with_depth_tracking(other, env, depth + 1)?,
    };

    match &operator {
        // Data in operator position flows through unchanged
        Value::Empty | Value::Int(_) | Value::List(_) => Ok(operator.clone()),

        // Chained aliasing: the alias is evaluated, not applied
        Value::Symbol(_) => eval_with_depth_tracking(&operator, env, depth + 1),

        Value::Function(func) => {
            let args = eval_args(arg_exprs, env, depth)?;
            apply_with_depth_tracking(func, args, env, depth + 1)
        }

        Value::Primitive(primitive) => {
            let op = primitive.op();
            match op.op_kind {
                OpKind::Function(f) => {
                    let args = eval_args(arg_exprs, env, depth)?;
                    op.validate_arity(args.len())?;
                    f(&args)
                }
                OpKind::SpecialForm(special_form) => {
                    op.validate_arity(arg_exprs.len())?;
                    special_form(arg_exprs, env, depth)
                }
            }
        }

        Value::Bool(_) => Err(Error::InvariantViolation(format!(
            "cannot apply {} {operator}",
            operator.type_name()
        ))),
    }
}

/// Bind parameters in a fresh frame linked to the caller's frame, evaluate the
/// body in order and release the frame.
#[tracing::instrument(level = "trace", skip_all, fields(params = func.params.len(), depth = depth))]
fn apply_with_depth_tracking<'src>(
    func: &Function<'src>,
    args: Vec<Value<'src>>,
    env: &mut Environment<'src>,
    depth: usize,
) -> Result<Value<'src>, Error> {
    let expected = func.params.len();
    let got = args.len();

    let mut frame = env.enter_frame();
    let mut params = func.params.iter();
    let mut args = args.into_iter();
    loop {
        match (params.next(), args.next()) {
            (Some(Value::Symbol(name)), Some(arg)) => frame.define(*name, arg),
            (Some(param), Some(_)) => {
                return Err(Error::TypeError(format!(
                    "parameter is not a symbol: {} {param}",
                    param.type_name()
                )));
            }
            (None, None) => break,
            _ => return Err(Error::argument_count(expected, got)),
        }
    }

    let mut result = Value::Empty;
    for expr in &func.body {
        result = eval_with_depth_tracking(expr, &mut frame, depth + 1)?;
    }
    Ok(result)
}

fn is_lambda_form(expr: &Value<'_>) -> bool {
    matches!(expr, Value::List(items) if items.first().is_some_and(|head| head.is_symbol("lambda")))
}

/// Evaluate define special form
///
/// `(define sym expr)` stores `expr` unevaluated unless it is a lambda form;
/// the stored expression is evaluated whenever `sym` is referenced.
/// `(define (name params...) body...)` binds a new function.
/// Both forms return the defined symbol.
pub(crate) fn eval_define<'src>(
    args: &[Value<'src>],
    env: &mut Environment<'src>,
    depth: usize,
) -> Result<Value<'src>, Error> {
    match args {
        [Value::Symbol(name), expr, ..] => {
            let value = if is_lambda_form(expr) {
                eval_with_depth_tracking(expr, env, depth + 1)?
            } else {
                expr.clone()
            };
            tracing::debug!(name = *name, kind = value.type_name(), "define");
            env.define(*name, value);
            Ok(Value::Symbol(*name))
        }
        [Value::List(signature), body @ ..] => {
            let [Value::Symbol(name), params @ ..] = &signature[..] else {
                return Err(Error::SyntaxError(
                    "define: expected symbol as function name".to_owned(),
                ));
            };
            tracing::debug!(name = *name, params = params.len(), "define function");
            env.define(*name, Value::function(params.to_vec(), body.to_vec()));
            Ok(Value::Symbol(*name))
        }
        _ => Err(Error::SyntaxError(
            "define: expected symbol or list".to_owned(),
        )),
    }
}

/// Evaluate lambda special form
pub(crate) fn eval_lambda<'src>(
    args: &[Value<'src>],
    _env: &mut Environment<'src>,
    _depth: usize,
) -> Result<Value<'src>, Error> {
    // A missing body is rejected by the arity check
    match args {
        [Value::List(params), body @ ..] => Ok(Value::function(params.to_vec(), body.to_vec())),
        [Value::Empty, body @ ..] => Ok(Value::function(Vec::new(), body.to_vec())),
        _ => Err(Error::SyntaxError(
            "lambda: expected parameter list".to_owned(),
        )),
    }
}

/// Evaluate if special form
pub(crate) fn eval_if<'src>(
    args: &[Value<'src>],
    env: &mut Environment<'src>,
    depth: usize,
) -> Result<Value<'src>, Error> {
    let [condition_expr, then_expr, else_expr @ ..] = args else {
        return Err(Error::SyntaxError("if: expected expression".to_owned()));
    };
    match eval_with_depth_tracking(condition_expr, env, depth + 1)? {
        Value::Bool(true) => eval_with_depth_tracking(then_expr, env, depth + 1),
        Value::Bool(false) => match else_expr {
            [else_expr, ..] => eval_with_depth_tracking(else_expr, env, depth + 1),
            [] => Ok(Value::Empty),
        },
        other => Err(Error::TypeError(format!(
            "if: expected boolean condition, got {} {other}",
            other.type_name()
        ))),
    }
}
