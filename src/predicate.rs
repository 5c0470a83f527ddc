//! Selection predicates.
//!
//! A predicate is built from the expression tree with [AttributeRef]s at its
//! leaves and is resolved by the engine into a `Predicate<Attribute>` before a
//! relation evaluates it against its tuples.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::relation::{Attribute, AttributeRef, Tuple};
use crate::token::TokenKind;
use crate::value::{DataType, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn code(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    pub fn from_kind(kind: TokenKind) -> Result<Self> {
        match kind {
            TokenKind::Eql => Ok(CompareOp::Eq),
            TokenKind::Neq => Ok(CompareOp::Ne),
            TokenKind::Grtr => Ok(CompareOp::Gt),
            TokenKind::Geq => Ok(CompareOp::Ge),
            TokenKind::Less => Ok(CompareOp::Lt),
            TokenKind::Leq => Ok(CompareOp::Le),
            _ => Err(Error::IllFormedPredicate),
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One side of a comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand<A> {
    Attribute(A),
    Literal(Value),
}

impl Operand<Attribute> {
    pub fn data_type(&self) -> DataType {
        match self {
            Operand::Attribute(attr) => attr.data_type,
            Operand::Literal(value) => value.data_type(),
        }
    }

    fn value<'t>(&'t self, tuple: &'t Tuple) -> Result<&'t Value> {
        match self {
            Operand::Attribute(attr) => tuple
                .get(&attr.qualified_name())
                .ok_or(Error::IllFormedPredicate),
            Operand::Literal(value) => Ok(value),
        }
    }
}

/// Attributes as `qualifier.attribute`, literals as their raw value.
impl<A: fmt::Display> fmt::Display for Operand<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Attribute(attr) => fmt::Display::fmt(attr, f),
            Operand::Literal(value) => fmt::Display::fmt(value, f),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate<A> {
    Compare {
        op: CompareOp,
        lhs: Operand<A>,
        rhs: Operand<A>,
    },
    And(Box<Predicate<A>>, Box<Predicate<A>>),
    Or(Box<Predicate<A>>, Box<Predicate<A>>),
    Not(Box<Predicate<A>>),
}

/// A predicate as written, before its attributes are resolved.
pub type UnresolvedPredicate = Predicate<AttributeRef>;

impl<A> Predicate<A> {
    /// Rebuilds the predicate with every operand passed through `f`.
    pub fn try_map<B, F>(&self, f: &mut F) -> Result<Predicate<B>>
    where
        F: FnMut(&Operand<A>) -> Result<Operand<B>>,
    {
        Ok(match self {
            Predicate::Compare { op, lhs, rhs } => Predicate::Compare {
                op: *op,
                lhs: f(lhs)?,
                rhs: f(rhs)?,
            },
            Predicate::And(lhs, rhs) => Predicate::And(
                Box::new(lhs.try_map(&mut *f)?),
                Box::new(rhs.try_map(&mut *f)?),
            ),
            Predicate::Or(lhs, rhs) => Predicate::Or(
                Box::new(lhs.try_map(&mut *f)?),
                Box::new(rhs.try_map(&mut *f)?),
            ),
            Predicate::Not(operand) => Predicate::Not(Box::new(operand.try_map(&mut *f)?)),
        })
    }
}

impl Predicate<Attribute> {
    /// Tests `tuple` against the predicate. `AND` and `OR` short-circuit.
    pub fn evaluate(&self, tuple: &Tuple) -> Result<bool> {
        match self {
            Predicate::Compare { op, lhs, rhs } => {
                let ordering = lhs
                    .value(tuple)?
                    .compare(rhs.value(tuple)?)
                    .ok_or(Error::IllFormedPredicate)?;
                Ok(op.holds(ordering))
            }
            Predicate::And(lhs, rhs) => Ok(lhs.evaluate(tuple)? && rhs.evaluate(tuple)?),
            Predicate::Or(lhs, rhs) => Ok(lhs.evaluate(tuple)? || rhs.evaluate(tuple)?),
            Predicate::Not(operand) => Ok(!operand.evaluate(tuple)?),
        }
    }
}

impl<A: fmt::Display> fmt::Display for Predicate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Predicate::And(lhs, rhs) => write!(f, "({} ∧ {})", lhs, rhs),
            Predicate::Or(lhs, rhs) => write!(f, "({} ∨ {})", lhs, rhs),
            Predicate::Not(operand) => write!(f, "¬({})", operand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year() -> Attribute {
        Attribute::new("movies", "year", DataType::Number)
    }

    fn title() -> Attribute {
        Attribute::new("movies", "title", DataType::String)
    }

    fn tuple(title: &str, year: i64) -> Tuple {
        [
            ("movies.title".to_string(), Value::from(title)),
            ("movies.year".to_string(), Value::from(year)),
        ]
        .into_iter()
        .collect()
    }

    fn compare(op: CompareOp, attr: Attribute, value: Value) -> Predicate<Attribute> {
        Predicate::Compare {
            op,
            lhs: Operand::Attribute(attr),
            rhs: Operand::Literal(value),
        }
    }

    #[test]
    fn test_operator_codes() {
        assert_eq!(CompareOp::Ge.to_string(), ">=");
        assert_eq!(CompareOp::Ne.code(), "!=");
        assert_eq!(
            Error::IllFormedPredicate.to_string(),
            "Ill-formed predicate"
        );
    }

    #[test]
    fn test_from_kind() {
        assert_eq!(CompareOp::from_kind(TokenKind::Geq).unwrap(), CompareOp::Ge);
        assert!(CompareOp::from_kind(TokenKind::And).is_err());
    }

    #[test]
    fn test_numeric_comparisons() {
        let drive = tuple("Drive", 2007);
        let cases = [
            (CompareOp::Eq, 2007, true),
            (CompareOp::Ne, 2007, false),
            (CompareOp::Gt, 2000, true),
            (CompareOp::Ge, 2007, true),
            (CompareOp::Lt, 2007, false),
            (CompareOp::Le, 2010, true),
        ];
        for (op, literal, expected) in cases {
            let predicate = compare(op, year(), literal.into());
            assert_eq!(predicate.evaluate(&drive).unwrap(), expected, "{}", predicate);
        }
    }

    #[test]
    fn test_string_comparisons_are_lexicographic() {
        let drive = tuple("Drive", 2007);
        assert!(compare(CompareOp::Lt, title(), "Gladiator".into())
            .evaluate(&drive)
            .unwrap());
        assert!(compare(CompareOp::Gt, title(), "Brooklyn".into())
            .evaluate(&drive)
            .unwrap());
    }

    #[test]
    fn test_logical_connectives() {
        let drive = tuple("Drive", 2007);
        let recent = compare(CompareOp::Gt, year(), 2005.into());
        let named = compare(CompareOp::Eq, title(), "Gladiator".into());

        let and = Predicate::And(Box::new(recent.clone()), Box::new(named.clone()));
        let or = Predicate::Or(Box::new(recent), Box::new(named.clone()));
        let not = Predicate::Not(Box::new(named));

        assert!(!and.evaluate(&drive).unwrap());
        assert!(or.evaluate(&drive).unwrap());
        assert!(not.evaluate(&drive).unwrap());
    }

    #[test]
    fn test_mismatched_values_are_ill_formed() {
        let predicate = compare(CompareOp::Eq, year(), "2007".into());
        assert_eq!(
            predicate.evaluate(&tuple("Drive", 2007)),
            Err(Error::IllFormedPredicate)
        );
    }

    #[test]
    fn test_display() {
        let predicate: UnresolvedPredicate = Predicate::Not(Box::new(Predicate::Compare {
            op: CompareOp::Ge,
            lhs: Operand::Attribute(AttributeRef::qualified("movies", "year")),
            rhs: Operand::Literal(Value::from(-3)),
        }));
        assert_eq!(predicate.to_string(), "¬(movies.year >= -3)");
    }
}
