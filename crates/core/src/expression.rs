//! Boundary to the expression compiler.
//!
//! Rule entries carry a serialized boolean match expression; an
//! [`ExpressionBuilder`] turns that snapshot into an evaluable predicate.
//! The operators and their evaluation order are the compiler's business —
//! this crate only invokes `build` during validation and treats the
//! compiled result as opaque.

use serde_json::Value;

/// Failure reported by an expression builder for a malformed snapshot.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ExpressionError(String);

impl ExpressionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A compiled boolean match expression.
pub trait CompiledExpression: Send + Sync {
    /// Evaluate the expression against a message payload.
    fn matches(&self, message: &Value) -> bool;
}

/// Compiles a serialized expression tree into an evaluable predicate.
pub trait ExpressionBuilder: Send + Sync {
    fn build(&self, snapshot: &Value) -> Result<Box<dyn CompiledExpression>, ExpressionError>;
}
