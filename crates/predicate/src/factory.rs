//! Building predicates from a discriminant and typed operands.
//!
//! This is the entry point for rule compilers: they hand over the operator
//! name and its arguments and get back a validated node. Nothing here talks
//! to the identity directory.

use crate::{Comparison, Composite, Error, Leaf, Operator, Predicate, Result, UserField};
use identity::{AccountId, GroupId};

/// A typed argument to a leaf constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Text(String),
    Int(i64),
}

impl Operand {
    pub fn text(s: impl Into<String>) -> Self {
        Operand::Text(s.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            Operand::Text(_) => "text",
            Operand::Int(_) => "integer",
        }
    }
}

type LeafBuilder = fn(&str, &[Operand]) -> Result<Leaf>;

const LEAF_BUILDERS: &[(&str, LeafBuilder)] = &[
    ("uploaderin", uploader_in),
    ("approverin", approver_in),
    ("uploader", uploader_is),
    ("approver", approver_is),
    ("value", value),
];

/// Discriminants accepted by [`build_leaf`].
pub fn discriminants() -> impl Iterator<Item = &'static str> {
    LEAF_BUILDERS.iter().map(|(name, _)| *name)
}

/// Build a leaf predicate.
///
/// | discriminant | operands |
/// |--------------|----------|
/// | `uploaderin`, `approverin` | group UUID (text) |
/// | `uploader`, `approver` | account id (integer, or text holding one) |
/// | `value` | integer, or comparison (`=`, `<`, `<=`, `>`, `>=`) then integer |
pub fn build_leaf(discriminant: &str, operands: &[Operand]) -> Result<Predicate> {
    let key = discriminant.to_ascii_lowercase();
    let (_, builder) = LEAF_BUILDERS
        .iter()
        .find(|(name, _)| *name == key)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown discriminant: {discriminant}")))?;
    builder(discriminant, operands).map(Predicate::Leaf)
}

/// Build a composite predicate, enforcing the operator's arity.
pub fn build_composite(op: Operator, children: Vec<Predicate>) -> Result<Predicate> {
    Composite::new(op, children).map(Predicate::Composite)
}

fn single<'a>(discriminant: &str, operands: &'a [Operand]) -> Result<&'a Operand> {
    match operands {
        [one] => Ok(one),
        _ => Err(Error::InvalidArgument(format!(
            "{discriminant} takes 1 operand, got {}",
            operands.len()
        ))),
    }
}

fn uploader_in(discriminant: &str, operands: &[Operand]) -> Result<Leaf> {
    user_in(UserField::Uploader, discriminant, operands)
}

fn approver_in(discriminant: &str, operands: &[Operand]) -> Result<Leaf> {
    user_in(UserField::Approver, discriminant, operands)
}

fn uploader_is(discriminant: &str, operands: &[Operand]) -> Result<Leaf> {
    user_is(UserField::Uploader, discriminant, operands)
}

fn approver_is(discriminant: &str, operands: &[Operand]) -> Result<Leaf> {
    user_is(UserField::Approver, discriminant, operands)
}

fn user_in(field: UserField, discriminant: &str, operands: &[Operand]) -> Result<Leaf> {
    let group = match single(discriminant, operands)? {
        Operand::Text(s) => GroupId::parse(s.as_str())?,
        other => {
            return Err(Error::InvalidArgument(format!(
                "{discriminant} expects a group id, got {}",
                other.kind()
            )));
        }
    };
    Ok(Leaf::UserIn { field, group })
}

fn user_is(field: UserField, discriminant: &str, operands: &[Operand]) -> Result<Leaf> {
    let account = match single(discriminant, operands)? {
        Operand::Int(n) => u32::try_from(*n).ok(),
        Operand::Text(s) => s.parse().ok(),
    }
    .map(AccountId)
    .ok_or_else(|| {
        Error::InvalidArgument(format!("{discriminant} expects an account id"))
    })?;
    Ok(Leaf::UserIs { field, account })
}

fn value(discriminant: &str, operands: &[Operand]) -> Result<Leaf> {
    let (op, n) = match operands {
        [Operand::Int(n)] => (Comparison::Eq, *n),
        [Operand::Text(op), Operand::Int(n)] => (parse_comparison(op)?, *n),
        _ => {
            return Err(Error::InvalidArgument(format!(
                "{discriminant} expects [integer] or [comparison, integer]"
            )));
        }
    };
    let value = i16::try_from(n)
        .map_err(|_| Error::InvalidArgument(format!("{discriminant} out of range: {n}")))?;
    Ok(Leaf::Value { op, value })
}

fn parse_comparison(s: &str) -> Result<Comparison> {
    match s {
        "=" => Ok(Comparison::Eq),
        "<" => Ok(Comparison::Lt),
        "<=" => Ok(Comparison::Le),
        ">" => Ok(Comparison::Gt),
        ">=" => Ok(Comparison::Ge),
        other => Err(Error::InvalidArgument(format!("unknown comparison: {other}"))),
    }
}
