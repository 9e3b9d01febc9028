//! Exec module: the sandboxed expression language behind `exec` actions.
//!
//! An exec action names a store path and two expressions. The predicate is
//! evaluated for every child of the path with `key` and `value` bound, and the
//! action expression turns each match into a `("DELETE", key)` or
//! `("SET", key, value)` tuple. Expressions can only see those two bindings
//! and a fixed set of pure builtins.

mod eval;
mod interpreter;
mod lexer;
mod parser;

pub use eval::{Bindings, evaluate, truthy, type_name};
pub use interpreter::{CompiledExec, ExecInterpreter};
pub use lexer::MAX_SOURCE_LEN;
pub use parser::{BinaryOp, Expr, MAX_DEPTH, UnaryOp, parse};
