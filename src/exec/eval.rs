//! Evaluator for parsed exec expressions.
//!
//! Evaluation is pure: the only inputs are the two bindings, and there is no
//! way to reach the store, the filesystem, or the process from an expression.

use std::borrow::Cow;

use serde_json::{Number, Value};

use crate::error::EvalError;

use super::parser::{BinaryOp, Expr, UnaryOp};

/// Variables visible to an expression.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    /// Child key under the exec path.
    pub key: &'a str,
    /// Child value.
    pub value: &'a Value,
}

/// Returns the truthiness of a value.
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are false.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Evaluates `expr` against `bindings`.
///
/// # Errors
///
/// Returns an [`EvalError`] for type mismatches, unknown identifiers or
/// functions, and division by zero.
pub fn evaluate(expr: &Expr, bindings: Bindings<'_>) -> Result<Value, EvalError> {
    eval(expr, bindings).map(Cow::into_owned)
}

fn eval<'a>(expr: &Expr, scope: Bindings<'a>) -> Result<Cow<'a, Value>, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Owned(value.clone())),
        Expr::Var(name) => match name.as_str() {
            "key" => Ok(Cow::Owned(Value::String(scope.key.to_string()))),
            "value" => Ok(Cow::Borrowed(scope.value)),
            _ => Err(EvalError::UnknownIdentifier { name: name.clone() }),
        },
        Expr::Field(target, name) => field(eval(target, scope)?, name),
        Expr::Index(target, index) => {
            let target = eval(target, scope)?;
            let index = eval(index, scope)?;
            subscript(target, &index)
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| evaluate(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, &args).map(Cow::Owned)
        }
        Expr::Unary(UnaryOp::Not, inner) => Ok(Cow::Owned(Value::Bool(!truthy(&*eval(inner, scope)?)))),
        Expr::Unary(UnaryOp::Neg, inner) => {
            let value = eval(inner, scope)?;
            match as_num(&value) {
                Some(Num::Int(i)) => Ok(Cow::Owned(i.checked_neg().map_or_else(
                    || float(-(i as f64)),
                    |n| Ok(Value::from(n)),
                )?)),
                Some(Num::Float(f)) => float(-f).map(Cow::Owned),
                None => Err(EvalError::type_error(format!("cannot negate {}", type_name(&value)))),
            }
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            let result = truthy(&*eval(left, scope)?) && truthy(&*eval(right, scope)?);
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let result = truthy(&*eval(left, scope)?) || truthy(&*eval(right, scope)?);
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            binary(*op, &left, &right).map(Cow::Owned)
        }
        Expr::List(items) => items
            .iter()
            .map(|e| evaluate(e, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Cow::Owned(Value::Array(items))),
        Expr::Object(entries) => {
            let mut map = serde_json::Map::new();
            for (key, e) in entries {
                map.insert(key.clone(), evaluate(e, scope)?);
            }
            Ok(Cow::Owned(Value::Object(map)))
        }
    }
}

fn field<'a>(target: Cow<'a, Value>, name: &str) -> Result<Cow<'a, Value>, EvalError> {
    match target {
        Cow::Borrowed(Value::Object(map)) => Ok(map.get(name).map_or(Cow::Owned(Value::Null), Cow::Borrowed)),
        Cow::Owned(Value::Object(mut map)) => Ok(Cow::Owned(map.remove(name).unwrap_or(Value::Null))),
        other => Err(EvalError::type_error(format!(
            "cannot read field '{name}' of {}",
            type_name(&other)
        ))),
    }
}

fn subscript<'a>(target: Cow<'a, Value>, index: &Value) -> Result<Cow<'a, Value>, EvalError> {
    match (&*target, index) {
        (Value::Object(_), Value::String(name)) => field(target, name),
        (Value::Array(items), Value::Number(n)) => {
            let Some(i) = n.as_i64() else {
                return Err(EvalError::type_error("sequence index must be an integer"));
            };
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let i = if i < 0 { i + len } else { i };
            let Ok(i) = usize::try_from(i) else {
                return Ok(Cow::Owned(Value::Null));
            };
            Ok(match target {
                Cow::Borrowed(Value::Array(items)) => items.get(i).map_or(Cow::Owned(Value::Null), Cow::Borrowed),
                Cow::Owned(Value::Array(mut items)) if i < items.len() => Cow::Owned(items.swap_remove(i)),
                _ => Cow::Owned(Value::Null),
            })
        }
        (Value::String(s), Value::Number(n)) => {
            let i = n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| EvalError::type_error("string index must be a non-negative integer"))?;
            Ok(Cow::Owned(
                s.chars().nth(i).map_or(Value::Null, |c| Value::String(c.to_string())),
            ))
        }
        (t, i) => Err(EvalError::type_error(format!(
            "cannot index {} with {}",
            type_name(t),
            type_name(i)
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

fn as_num(value: &Value) -> Option<Num> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64().map(Num::Int).or_else(|| n.as_f64().map(Num::Float))
}

fn float(f: f64) -> Result<Value, EvalError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| EvalError::type_error("arithmetic produced a non-finite number"))
}

/// Equality with integer/float unification.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_num(a), as_num(b)) {
        (Some(Num::Int(x)), Some(Num::Int(y))) => x == y,
        (Some(x), Some(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, left, right),
        BinaryOp::In => contains(right, left).map(Value::Bool),
        BinaryOp::NotIn => contains(right, left).map(|found| Value::Bool(!found)),
        BinaryOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            (Value::Array(a), Value::Array(b)) => {
                Ok(Value::Array(a.iter().chain(b).cloned().collect()))
            }
            _ => arithmetic(op, left, right),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, left, right)
        }
        BinaryOp::And | BinaryOp::Or => {
            Ok(Value::Bool(match op {
                BinaryOp::And => truthy(left) && truthy(right),
                _ => truthy(left) || truthy(right),
            }))
        }
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        _ => match (as_num(left), as_num(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a.partial_cmp(&b),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => {
                return Err(EvalError::type_error(format!(
                    "cannot order {} and {}",
                    type_name(left),
                    type_name(right)
                )));
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, EvalError> {
    match (haystack, needle) {
        (Value::Array(items), _) => Ok(items.iter().any(|item| loose_eq(item, needle))),
        (Value::String(s), Value::String(sub)) => Ok(s.contains(sub.as_str())),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => Err(EvalError::type_error(format!(
            "cannot test membership of {} in {}",
            type_name(needle),
            type_name(haystack)
        ))),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (as_num(left), as_num(right)) else {
        return Err(EvalError::type_error(format!(
            "unsupported operands {} and {}",
            type_name(left),
            type_name(right)
        )));
    };

    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Rem => {
                if y == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                x.checked_rem_euclid(y).map(|r| if r != 0 && y < 0 { r + y } else { r })
            }
            _ => None,
        };
        if let Some(n) = exact {
            return Ok(Value::from(n));
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Rem if y == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => x / y,
        _ => x - y * (x / y).floor(),
    };
    float(result)
}

fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match (name, args) {
        ("len", [v]) => match v {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::Object(map) => Ok(Value::from(map.len())),
            other => Err(EvalError::type_error(format!("{} has no length", type_name(other)))),
        },
        ("str", [v]) => Ok(Value::String(match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        ("int", [v]) => match v {
            Value::Bool(b) => Ok(Value::from(i64::from(*b))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| EvalError::type_error(format!("cannot convert '{s}' to int"))),
            other => match as_num(other) {
                Some(Num::Int(i)) => Ok(Value::from(i)),
                #[allow(clippy::cast_possible_truncation)]
                Some(Num::Float(f)) => Ok(Value::from(f.trunc() as i64)),
                None => Err(EvalError::type_error(format!("cannot convert {} to int", type_name(other)))),
            },
        },
        ("float", [v]) => match v {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| EvalError::type_error(format!("cannot convert '{s}' to float")))
                .and_then(float),
            other => match as_num(other) {
                Some(n) => float(n.as_f64()),
                None => Err(EvalError::type_error(format!("cannot convert {} to float", type_name(other)))),
            },
        },
        ("lower", [Value::String(s)]) => Ok(Value::String(s.to_lowercase())),
        ("upper", [Value::String(s)]) => Ok(Value::String(s.to_uppercase())),
        ("startswith", [Value::String(s), Value::String(p)]) => Ok(Value::Bool(s.starts_with(p.as_str()))),
        ("endswith", [Value::String(s), Value::String(p)]) => Ok(Value::Bool(s.ends_with(p.as_str()))),
        ("contains", [haystack, needle]) => contains(haystack, needle).map(Value::Bool),
        ("len" | "str" | "int" | "float" | "lower" | "upper" | "startswith" | "endswith" | "contains", _) => {
            Err(EvalError::type_error(format!(
                "invalid arguments for {name}({})",
                args.iter().map(type_name).collect::<Vec<_>>().join(", ")
            )))
        }
        _ => Err(EvalError::UnknownFunction { name: name.to_string() }),
    }
}

/// Short type name used in error messages.
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
