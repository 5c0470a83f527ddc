//! Name resolution and validation in front of the relational operators.
//!
//! [Relation]'s operators assume well-formed input. The engine resolves the
//! attribute references written in an expression against the operand's schema
//! and checks types and arity before delegating.

use itertools::Itertools;
use tracing::debug;

use crate::data_set::DataSet;
use crate::error::{Error, Result};
use crate::predicate::{Operand, Predicate, UnresolvedPredicate};
use crate::relation::{Attribute, AttributeRef, Bindings, QualifiedName, Relation};

pub struct Engine<'a> {
    data_set: &'a DataSet,
}

impl<'a> Engine<'a> {
    pub fn new(data_set: &'a DataSet) -> Self {
        Self { data_set }
    }

    pub fn lookup(&self, name: &str) -> Result<Relation> {
        let relation = self.data_set.get(name).ok_or_else(|| Error::RelationNotFound {
            name: name.to_owned(),
        })?;
        debug!(relation = name, tuples = relation.len(), "lookup");
        Ok(relation.clone())
    }

    /// Keeps the attributes named in `projection`. An attribute named more
    /// than once is kept once, at its first position.
    pub fn project(&self, relation: &Relation, projection: &[AttributeRef]) -> Result<Relation> {
        let resolved = projection
            .iter()
            .map(|attr| resolve_attribute(attr, relation.attributes()))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unique()
            .collect::<Vec<_>>();
        let result = relation.projection(&resolved);
        debug!(attributes = resolved.len(), tuples = result.len(), "projection");
        Ok(result)
    }

    pub fn select(&self, relation: &Relation, predicate: &UnresolvedPredicate) -> Result<Relation> {
        let resolved = resolve_predicate(predicate, relation.attributes())?;
        let result = relation.selection(&resolved)?;
        debug!(
            predicate = %resolved,
            before = relation.len(),
            after = result.len(),
            "selection"
        );
        Ok(result)
    }

    /// Renames `relation` to `name`. With an empty `attributes` list every
    /// attribute keeps its name and takes `name` as its qualifier; otherwise
    /// attributes are renamed positionally, an unqualified new name taking
    /// `name` as its qualifier.
    pub fn rename(
        &self,
        relation: &Relation,
        name: &str,
        attributes: &[AttributeRef],
    ) -> Result<Relation> {
        let schema = relation.attributes();
        if !attributes.is_empty() && attributes.len() != schema.len() {
            return Err(Error::RenameArity {
                name: name.to_owned(),
                expected: schema.len(),
            });
        }

        let targets: Vec<QualifiedName> = attributes
            .iter()
            .map(|attr| {
                QualifiedName::new(attr.qualifier.as_deref().unwrap_or(name), &attr.attribute)
            })
            .collect();
        if targets.iter().duplicates().next().is_some() {
            return Err(Error::RenameDuplicates {
                name: name.to_owned(),
            });
        }

        let bare_duplicates = schema.iter().map(|a| &a.attribute).duplicates().next();
        if attributes.is_empty() && bare_duplicates.is_some() {
            return Err(Error::RenameAmbiguous {
                name: name.to_owned(),
            });
        }

        let bindings: Bindings = if attributes.is_empty() {
            schema
                .iter()
                .map(|old| (old.qualified_name(), QualifiedName::new(name, &old.attribute)))
                .collect()
        } else {
            schema
                .iter()
                .map(Attribute::qualified_name)
                .zip(targets)
                .collect()
        };

        let result = relation.rename(&bindings);
        debug!(relation = name, attributes = attributes.len(), "rename");
        Ok(result)
    }

    pub fn union(&self, x: &Relation, y: &Relation) -> Result<Relation> {
        check_arity("Union", x, y)?;
        let result = x.union(y);
        debug!(lhs = x.len(), rhs = y.len(), tuples = result.len(), "union");
        Ok(result)
    }

    pub fn intersection(&self, x: &Relation, y: &Relation) -> Result<Relation> {
        check_arity("Intersection", x, y)?;
        let result = x.intersection(y);
        debug!(lhs = x.len(), rhs = y.len(), tuples = result.len(), "intersection");
        Ok(result)
    }

    pub fn difference(&self, x: &Relation, y: &Relation) -> Result<Relation> {
        check_arity("Difference", x, y)?;
        let result = x.difference(y);
        debug!(lhs = x.len(), rhs = y.len(), tuples = result.len(), "difference");
        Ok(result)
    }

    pub fn cartesian_product(&self, x: &Relation, y: &Relation) -> Result<Relation> {
        let ambiguous = x
            .attributes()
            .iter()
            .chain(y.attributes())
            .map(|attr| (&attr.qualifier, &attr.attribute))
            .duplicates()
            .next()
            .is_some();
        if ambiguous {
            return Err(Error::AmbiguousProduct);
        }
        let result = x.cartesian_product(y);
        debug!(lhs = x.len(), rhs = y.len(), tuples = result.len(), "cartesian product");
        Ok(result)
    }

    pub fn natural_join(&self, x: &Relation, y: &Relation) -> Result<Relation> {
        let result = x.natural_join(y);
        debug!(lhs = x.len(), rhs = y.len(), tuples = result.len(), "natural join");
        Ok(result)
    }
}

/// Finds the single attribute of `schema` that `attr` refers to. A qualified
/// reference must match exactly; a bare one must match exactly one attribute
/// by name.
pub fn resolve_attribute(attr: &AttributeRef, schema: &[Attribute]) -> Result<Attribute> {
    if let Some(qualifier) = &attr.qualifier {
        return schema
            .iter()
            .find(|a| &a.qualifier == qualifier && a.attribute == attr.attribute)
            .cloned()
            .ok_or_else(|| Error::AttributeNotFound(attr.to_string()));
    }

    let mut matches = schema.iter().filter(|a| a.attribute == attr.attribute);
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found.clone()),
        (Some(_), Some(_)) => Err(Error::AmbiguousAttribute {
            attribute: attr.attribute.clone(),
        }),
        (None, _) => Err(Error::AttributeNotFound(attr.attribute.clone())),
    }
}

/// Resolves every attribute in `predicate` and checks that both sides of each
/// comparison have the same type.
pub fn resolve_predicate(
    predicate: &UnresolvedPredicate,
    schema: &[Attribute],
) -> Result<Predicate<Attribute>> {
    let resolved = predicate.try_map::<Attribute, _>(&mut |operand| match operand {
        Operand::Attribute(attr) => Ok(Operand::Attribute(resolve_attribute(attr, schema)?)),
        Operand::Literal(value) => Ok(Operand::Literal(value.clone())),
    })?;
    check_types(&resolved)?;
    Ok(resolved)
}

fn check_types(predicate: &Predicate<Attribute>) -> Result<()> {
    match predicate {
        Predicate::Compare { lhs, rhs, .. } => {
            let (lhs_type, rhs_type) = (lhs.data_type(), rhs.data_type());
            if lhs_type != rhs_type {
                return Err(Error::TypeMismatch {
                    lhs: lhs.to_string(),
                    lhs_type: lhs_type.to_string(),
                    rhs: rhs.to_string(),
                    rhs_type: rhs_type.to_string(),
                });
            }
            Ok(())
        }
        Predicate::And(lhs, rhs) | Predicate::Or(lhs, rhs) => {
            check_types(lhs)?;
            check_types(rhs)
        }
        Predicate::Not(operand) => check_types(operand),
    }
}

/// Same attribute count and the same type at every position.
fn has_same_arity(x: &[Attribute], y: &[Attribute]) -> bool {
    x.len() == y.len()
        && x.iter()
            .zip(y)
            .all(|(a, b)| a.data_type == b.data_type)
}

fn check_arity(operation: &'static str, x: &Relation, y: &Relation) -> Result<()> {
    if has_same_arity(x.attributes(), y.attributes()) {
        Ok(())
    } else {
        Err(Error::ArityMismatch { operation })
    }
}
