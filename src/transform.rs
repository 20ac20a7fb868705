//! Transforms: the compiled, executable form of a script.
//!
//! A [`Transform`] is a reference-counted handle; cloning it adds a reference
//! and dropping it releases one. The compiler only creates, passes and drops
//! handles. The decode engine in this module runs them against input.

use crate::error::DecodeError;
use crate::expression::Expression;
use crate::primitives::Primitive;
use crate::value::Value;
use std::rc::Rc;

/// One member of a struct transform. Anonymous members must produce a struct,
/// whose fields are merged into the enclosing one.
#[derive(Debug, Clone)]
pub struct NamedTransform {
    pub name: Option<String>,
    pub transform: Transform,
}

#[derive(Debug)]
pub enum TransformKind {
    Primitive(Primitive),
    Struct(Vec<NamedTransform>),
    If {
        condition: Expression,
        then_branch: Transform,
        else_branch: Transform,
    },
    /// Stages run left to right; each stage's output is the next stage's input.
    Composed(Vec<Transform>),
    /// Binds argument expressions, evaluated in the caller's scope, as the
    /// positional parameters of `inner`.
    ParamWrapper {
        inner: Transform,
        args: Vec<Expression>,
    },
    /// A definition that declares `num_params` parameters.
    Param { inner: Transform, num_params: usize },
    /// Produces the value of an expression without consuming input.
    Expression(Expression),
    /// Fails whenever it is applied.
    Invalid,
}

#[derive(Debug, Clone)]
pub struct Transform(Rc<TransformKind>);

/// Evaluation context: bound parameters and the value currently being built.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    params: Rc<Vec<Value>>,
    current: Option<Rc<Value>>,
}

impl Scope {
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }

    pub fn current(&self) -> Option<&Value> {
        self.current.as_deref()
    }

    pub fn with_current(&self, current: Value) -> Scope {
        self.with_current_rc(Rc::new(current))
    }

    pub fn with_current_rc(&self, current: Rc<Value>) -> Scope {
        Scope {
            params: Rc::clone(&self.params),
            current: Some(current),
        }
    }

    pub fn with_params(&self, params: Vec<Value>) -> Scope {
        Scope {
            params: Rc::new(params),
            current: self.current.clone(),
        }
    }
}

impl Transform {
    fn new(kind: TransformKind) -> Self {
        Transform(Rc::new(kind))
    }

    pub fn primitive(p: Primitive) -> Self {
        Self::new(TransformKind::Primitive(p))
    }

    pub fn new_struct(members: Vec<NamedTransform>) -> Self {
        Self::new(TransformKind::Struct(members))
    }

    pub fn if_else(condition: Expression, then_branch: Transform, else_branch: Transform) -> Self {
        Self::new(TransformKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    pub fn composed(stages: Vec<Transform>) -> Self {
        Self::new(TransformKind::Composed(stages))
    }

    pub fn param_wrapper(inner: Transform, args: Vec<Expression>) -> Self {
        Self::new(TransformKind::ParamWrapper { inner, args })
    }

    pub fn with_params(inner: Transform, num_params: usize) -> Self {
        Self::new(TransformKind::Param { inner, num_params })
    }

    pub fn expression(expr: Expression) -> Self {
        Self::new(TransformKind::Expression(expr))
    }

    /// A transform yielding an empty struct and consuming nothing.
    pub fn empty() -> Self {
        Self::expression(Expression::constant(Value::empty_struct()))
    }

    pub fn invalid() -> Self {
        Self::new(TransformKind::Invalid)
    }

    pub fn kind(&self) -> &TransformKind {
        &self.0
    }

    /// Number of parameters an invocation must supply.
    pub fn num_params(&self) -> usize {
        match self.kind() {
            TransformKind::Primitive(p) => p.num_params(),
            TransformKind::Param { num_params, .. } => *num_params,
            _ => 0,
        }
    }

    pub fn ptr_eq(a: &Transform, b: &Transform) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Number of live handles to this transform.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Apply to a whole input value. Byte input must be consumed entirely.
    pub fn apply(&self, scope: &Scope, input: &Value) -> Result<Value, DecodeError> {
        match self.kind() {
            TransformKind::If { .. } => self.select_branch(scope)?.apply(scope, input),
            TransformKind::Composed(stages) => {
                let mut value = input.clone();
                for stage in stages {
                    value = stage.apply(scope, &value)?;
                }
                Ok(value)
            }
            TransformKind::ParamWrapper { inner, args } => {
                inner.apply(&bind_args(scope, args)?, input)
            }
            TransformKind::Param { inner, .. } => inner.apply(scope, input),
            TransformKind::Expression(expr) => expr.evaluate(scope),
            TransformKind::Invalid => Err(DecodeError::NoMatch),
            TransformKind::Primitive(p) if !p.reads_bytes() => p.apply_value(input),
            TransformKind::Primitive(_) | TransformKind::Struct(_) => match input {
                Value::Bytes(bytes) => {
                    let (value, consumed) = self.prefix_apply(scope, bytes)?;
                    if consumed != bytes.len() {
                        return Err(DecodeError::TrailingBytes {
                            consumed,
                            total: bytes.len(),
                        });
                    }
                    Ok(value)
                }
                other => Err(DecodeError::TypeMismatch {
                    expected: "bytes",
                    found: other.kind_name(),
                }),
            },
        }
    }

    /// Decode from the start of `bytes`, returning the value and the number
    /// of bytes consumed.
    pub fn prefix_apply(&self, scope: &Scope, bytes: &[u8]) -> Result<(Value, usize), DecodeError> {
        match self.kind() {
            TransformKind::Primitive(p) => p.prefix_apply(scope, bytes),
            TransformKind::Struct(members) => decode_struct(members, scope, bytes),
            TransformKind::If { .. } => self.select_branch(scope)?.prefix_apply(scope, bytes),
            TransformKind::Composed(stages) => {
                let Some((first, rest)) = stages.split_first() else {
                    return Ok((Value::Bytes(bytes.to_vec()), bytes.len()));
                };
                let (mut value, consumed) = first.prefix_apply(scope, bytes)?;
                for stage in rest {
                    value = stage.apply(scope, &value)?;
                }
                Ok((value, consumed))
            }
            TransformKind::ParamWrapper { inner, args } => {
                inner.prefix_apply(&bind_args(scope, args)?, bytes)
            }
            TransformKind::Param { inner, .. } => inner.prefix_apply(scope, bytes),
            TransformKind::Expression(expr) => Ok((expr.evaluate(scope)?, 0)),
            TransformKind::Invalid => Err(DecodeError::NoMatch),
        }
    }

    fn select_branch(&self, scope: &Scope) -> Result<&Transform, DecodeError> {
        let TransformKind::If {
            condition,
            then_branch,
            else_branch,
        } = self.kind()
        else {
            return Ok(self);
        };
        match condition.evaluate(scope)? {
            Value::Boolean(true) => Ok(then_branch),
            Value::Boolean(false) => Ok(else_branch),
            other => Err(DecodeError::TypeMismatch {
                expected: "boolean",
                found: other.kind_name(),
            }),
        }
    }
}

fn bind_args(scope: &Scope, args: &[Expression]) -> Result<Scope, DecodeError> {
    let values = args
        .iter()
        .map(|arg| arg.evaluate(scope))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(scope.with_params(values))
}

/// Members see the fields decoded so far, on top of the enclosing struct's.
/// The visible struct is shared with each member's scope and extended in
/// place once the member is done with it.
fn decode_struct(
    members: &[NamedTransform],
    scope: &Scope,
    bytes: &[u8],
) -> Result<(Value, usize), DecodeError> {
    let inherited = scope
        .current()
        .and_then(Value::as_struct)
        .map(<[_]>::to_vec)
        .unwrap_or_default();
    let own_start = inherited.len();
    let mut visible = Rc::new(Value::Struct(inherited));
    let mut offset = 0;
    for member in members {
        let (value, consumed) = {
            let member_scope = scope.with_current_rc(Rc::clone(&visible));
            member
                .transform
                .prefix_apply(&member_scope, &bytes[offset..])?
        };
        offset += consumed;
        let fields = struct_fields_mut(&mut visible)?;
        match (&member.name, value) {
            (Some(name), value) => fields.push((name.clone(), value)),
            (None, Value::Struct(merged)) => fields.extend(merged),
            (None, other) => {
                return Err(DecodeError::TypeMismatch {
                    expected: "struct",
                    found: other.kind_name(),
                })
            }
        }
    }
    let own = struct_fields_mut(&mut visible)?.split_off(own_start);
    Ok((Value::Struct(own), offset))
}

/// Unique access to the fields of a shared struct value; copies only if a
/// member kept a reference to it.
fn struct_fields_mut(visible: &mut Rc<Value>) -> Result<&mut Vec<(String, Value)>, DecodeError> {
    let value = Rc::make_mut(visible);
    let found = value.kind_name();
    value.as_struct_mut().ok_or(DecodeError::TypeMismatch {
        expected: "struct",
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::BinaryOp;

    fn named(name: &str, transform: Transform) -> NamedTransform {
        NamedTransform {
            name: Some(name.to_string()),
            transform,
        }
    }

    #[test]
    fn struct_decodes_members_in_order() {
        let t = Transform::new_struct(vec![
            named("a", Transform::primitive(Primitive::Uint8)),
            named("b", Transform::primitive(Primitive::Uint16Be)),
        ]);
        let v = t
            .apply(&Scope::default(), &Value::Bytes(vec![1, 0, 2]))
            .unwrap();
        assert_eq!(
            v,
            Value::Struct(vec![
                ("a".to_string(), Value::Integer(1)),
                ("b".to_string(), Value::Integer(2)),
            ])
        );
    }

    #[test]
    fn apply_rejects_trailing_bytes() {
        let t = Transform::primitive(Primitive::Uint8);
        assert_eq!(
            t.apply(&Scope::default(), &Value::Bytes(vec![1, 2])),
            Err(DecodeError::TrailingBytes {
                consumed: 1,
                total: 2
            })
        );
    }

    #[test]
    fn condition_sees_earlier_members() {
        let cond = Expression::binary(
            BinaryOp::Equals,
            Expression::member(Expression::current_node(), "tag".to_string()),
            Expression::constant(Value::Integer(1)),
        );
        let body = Transform::new_struct(vec![named("x", Transform::primitive(Primitive::Uint8))]);
        let t = Transform::new_struct(vec![
            named("tag", Transform::primitive(Primitive::Uint8)),
            NamedTransform {
                name: None,
                transform: Transform::if_else(cond, body, Transform::empty()),
            },
        ]);
        let hit = t.apply(&Scope::default(), &Value::Bytes(vec![1, 9])).unwrap();
        assert_eq!(hit.member("x"), Some(&Value::Integer(9)));
        let miss = t.apply(&Scope::default(), &Value::Bytes(vec![2])).unwrap();
        assert_eq!(miss.member("x"), None);
    }

    #[test]
    fn wide_struct_extends_visible_fields_in_place() {
        let sized = |name: &str| {
            named(
                name,
                Transform::param_wrapper(
                    Transform::primitive(Primitive::KnownLength),
                    vec![Expression::member(Expression::current_node(), "len".to_string())],
                ),
            )
        };
        let mut members = vec![sized("outer"), named("len", Transform::primitive(Primitive::Uint8))];
        let names: Vec<String> = (0..50).map(|i| format!("f{}", i)).collect();
        members.extend(names.iter().map(|n| sized(n)));
        let t = Transform::new_struct(members);

        let enclosing = Value::Struct(vec![("len".to_string(), Value::Integer(2))]);
        let scope = Scope::default().with_current(enclosing.clone());
        let mut bytes = vec![0xaa, 0xbb, 3];
        bytes.extend((0..50u8).flat_map(|i| [i, i, i]));

        let (v, consumed) = t.prefix_apply(&scope, &bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        let fields = v.as_struct().unwrap();
        assert_eq!(fields.len(), 52);
        assert_eq!(fields[0].0, "outer");
        assert_eq!(v.member("outer"), Some(&Value::Bytes(vec![0xaa, 0xbb])));
        assert_eq!(v.member("f49"), Some(&Value::Bytes(vec![49, 49, 49])));
        assert_eq!(scope.current(), Some(&enclosing));
    }

    #[test]
    fn invalid_always_fails() {
        assert_eq!(
            Transform::invalid().prefix_apply(&Scope::default(), &[]),
            Err(DecodeError::NoMatch)
        );
    }

    #[test]
    fn arity_comes_from_declaration() {
        let inner = Transform::primitive(Primitive::Uint8);
        assert_eq!(inner.num_params(), 0);
        assert_eq!(Transform::with_params(inner.clone(), 2).num_params(), 2);
        let bound = Transform::param_wrapper(
            Transform::primitive(Primitive::KnownLength),
            vec![Expression::constant(Value::Integer(1))],
        );
        assert_eq!(bound.num_params(), 0);
    }
}
