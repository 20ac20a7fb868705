//! Expressions: side computations over decoded values and bound parameters.
//!
//! Handles are reference-counted; cloning an [`Expression`] adds a reference.

use crate::error::DecodeError;
use crate::transform::Scope;
use crate::value::Value;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equals,
}

#[derive(Debug)]
pub enum ExpressionKind {
    Const(Value),
    /// Positional parameter of the enclosing definition.
    Param(usize),
    /// The value currently being built (the enclosing struct).
    CurrentNode,
    Member { base: Expression, key: String },
    Binary {
        op: BinaryOp,
        left: Expression,
        right: Expression,
    },
}

#[derive(Debug, Clone)]
pub struct Expression(Rc<ExpressionKind>);

impl Expression {
    pub fn constant(value: Value) -> Self {
        Expression(Rc::new(ExpressionKind::Const(value)))
    }

    pub fn param(index: usize) -> Self {
        Expression(Rc::new(ExpressionKind::Param(index)))
    }

    pub fn current_node() -> Self {
        Expression(Rc::new(ExpressionKind::CurrentNode))
    }

    pub fn member(base: Expression, key: String) -> Self {
        Expression(Rc::new(ExpressionKind::Member { base, key }))
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression(Rc::new(ExpressionKind::Binary { op, left, right }))
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.0
    }

    pub fn ptr_eq(a: &Expression, b: &Expression) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn evaluate(&self, scope: &Scope) -> Result<Value, DecodeError> {
        match self.kind() {
            ExpressionKind::Const(v) => Ok(v.clone()),
            ExpressionKind::Param(i) => scope
                .param(*i)
                .cloned()
                .ok_or(DecodeError::UnboundParameter(*i)),
            ExpressionKind::CurrentNode => {
                scope.current().cloned().ok_or(DecodeError::NoCurrentNode)
            }
            ExpressionKind::Member { base, key } => {
                let base = base.evaluate(scope)?;
                if base.as_struct().is_none() {
                    return Err(DecodeError::TypeMismatch {
                        expected: "struct",
                        found: base.kind_name(),
                    });
                }
                base.member(key)
                    .cloned()
                    .ok_or_else(|| DecodeError::MissingMember(key.clone()))
            }
            ExpressionKind::Binary { op, left, right } => {
                let l = left.evaluate(scope)?;
                let r = right.evaluate(scope)?;
                match op {
                    BinaryOp::Equals => {
                        if std::mem::discriminant(&l) != std::mem::discriminant(&r) {
                            return Err(DecodeError::TypeMismatch {
                                expected: l.kind_name(),
                                found: r.kind_name(),
                            });
                        }
                        Ok(Value::Boolean(l == r))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_compares_values() {
        let scope = Scope::default();
        let eq = Expression::binary(
            BinaryOp::Equals,
            Expression::constant(Value::Integer(3)),
            Expression::constant(Value::Integer(3)),
        );
        assert_eq!(eq.evaluate(&scope), Ok(Value::Boolean(true)));
    }

    #[test]
    fn equality_rejects_mixed_kinds() {
        let scope = Scope::default();
        let eq = Expression::binary(
            BinaryOp::Equals,
            Expression::constant(Value::Integer(1)),
            Expression::constant(Value::Boolean(true)),
        );
        assert!(matches!(
            eq.evaluate(&scope),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn member_reads_current_struct() {
        let scope = Scope::default().with_current(Value::Struct(vec![
            ("a".to_string(), Value::Integer(1)),
            ("a".to_string(), Value::Integer(2)),
        ]));
        let e = Expression::member(Expression::current_node(), "a".to_string());
        assert_eq!(e.evaluate(&scope), Ok(Value::Integer(2)));
        let missing = Expression::member(Expression::current_node(), "b".to_string());
        assert_eq!(
            missing.evaluate(&scope),
            Err(DecodeError::MissingMember("b".to_string()))
        );
    }

    #[test]
    fn unbound_parameter_fails() {
        assert_eq!(
            Expression::param(0).evaluate(&Scope::default()),
            Err(DecodeError::UnboundParameter(0))
        );
    }
}
