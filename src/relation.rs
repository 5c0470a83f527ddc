//! The relation value type and the primitive relational operators.
//!
//! Operators never touch their operands; each one builds and returns a new
//! [Relation]. Attribute references handed to them must already be resolved
//! against the schema (see [`Engine`](crate::engine::Engine)).

use std::collections::{HashMap, HashSet};
use std::fmt;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::value::{DataType, Value};

/// One row: fully-qualified attribute name to value.
pub type Tuple = HashMap<String, Value>;

/// A column of a relation's schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub attribute: String,
    pub qualifier: String,
    pub data_type: DataType,
}

impl Attribute {
    pub fn new(qualifier: &str, attribute: &str, data_type: DataType) -> Self {
        Self {
            attribute: attribute.to_owned(),
            qualifier: qualifier.to_owned(),
            data_type,
        }
    }

    /// `qualifier.attribute`, the key of this attribute in every tuple.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.qualifier, self.attribute)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.attribute)
    }
}

/// An attribute as written in an expression, qualified or not.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributeRef {
    pub qualifier: Option<String>,
    pub attribute: String,
}

impl AttributeRef {
    pub fn bare(attribute: &str) -> Self {
        Self {
            qualifier: None,
            attribute: attribute.to_owned(),
        }
    }

    pub fn qualified(qualifier: &str, attribute: &str) -> Self {
        Self {
            qualifier: Some(qualifier.to_owned()),
            attribute: attribute.to_owned(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}.{}", qualifier, self.attribute),
            None => f.write_str(&self.attribute),
        }
    }
}

/// The new name of an attribute in a rename.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub qualifier: String,
    pub attribute: String,
}

impl QualifiedName {
    pub fn new(qualifier: &str, attribute: &str) -> Self {
        Self {
            qualifier: qualifier.to_owned(),
            attribute: attribute.to_owned(),
        }
    }
}

/// Old fully-qualified name to new name.
pub type Bindings = HashMap<String, QualifiedName>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    attributes: Vec<Attribute>,
    tuples: Vec<Tuple>,
}

impl Relation {
    /// Builds a relation, checking that qualified attribute names are unique
    /// and that every tuple holds exactly the schema's attributes with values of
    /// the declared types.
    pub fn new(attributes: Vec<Attribute>, tuples: Vec<Tuple>) -> Result<Self> {
        if let Some(duplicate) = attributes
            .iter()
            .map(Attribute::qualified_name)
            .duplicates()
            .next()
        {
            return Err(Error::DataSet(format!(
                "attribute {} appears more than once",
                duplicate
            )));
        }

        for (row, tuple) in tuples.iter().enumerate() {
            if tuple.len() != attributes.len() {
                return Err(Error::DataSet(format!(
                    "tuple {} has {} values but the schema has {} attributes",
                    row,
                    tuple.len(),
                    attributes.len()
                )));
            }
            for attribute in &attributes {
                let key = attribute.qualified_name();
                let value = tuple.get(&key).ok_or_else(|| {
                    Error::DataSet(format!("tuple {} has no value for {}", row, key))
                })?;
                if value.data_type() != attribute.data_type {
                    return Err(Error::DataSet(format!(
                        "tuple {} has a {} value for {} which is of type {}",
                        row,
                        value.data_type(),
                        key,
                        attribute.data_type
                    )));
                }
            }
        }

        Ok(Self::new_unchecked(attributes, tuples))
    }

    pub(crate) fn new_unchecked(attributes: Vec<Attribute>, tuples: Vec<Tuple>) -> Self {
        Self { attributes, tuples }
    }

    /// Builds a relation whose attributes all share `qualifier` from positional rows.
    pub fn from_rows(
        qualifier: &str,
        columns: &[(&str, DataType)],
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let attributes: Vec<Attribute> = columns
            .iter()
            .map(|(name, data_type)| Attribute::new(qualifier, name, *data_type))
            .collect();

        let tuples = rows
            .into_iter()
            .enumerate()
            .map(|(row, values)| {
                if values.len() != attributes.len() {
                    return Err(Error::DataSet(format!(
                        "row {} has {} values but {} has {} attributes",
                        row,
                        values.len(),
                        qualifier,
                        attributes.len()
                    )));
                }
                Ok(attributes
                    .iter()
                    .map(Attribute::qualified_name)
                    .zip(values)
                    .collect())
            })
            .collect::<Result<Vec<Tuple>>>()?;

        Self::new(attributes, tuples)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn qualified_attributes(&self) -> Vec<String> {
        self.attributes.iter().map(Attribute::qualified_name).collect()
    }

    pub fn unqualified_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .map(|attr| attr.attribute.as_str())
            .collect()
    }

    /// The tuples as rows of values in schema order.
    pub fn rows(&self) -> Vec<Vec<&Value>> {
        let keys = self.qualified_attributes();
        self.tuples
            .iter()
            .map(|tuple| keys.iter().filter_map(|key| tuple.get(key)).collect())
            .collect()
    }

    /// Keeps exactly `attributes`, in the order given.
    pub fn projection(&self, attributes: &[Attribute]) -> Relation {
        let keys: Vec<String> = attributes.iter().map(Attribute::qualified_name).collect();
        let tuples = self
            .tuples
            .iter()
            .map(|tuple| {
                keys.iter()
                    .filter_map(|key| tuple.get(key).map(|value| (key.clone(), value.clone())))
                    .collect()
            })
            .collect();
        Relation::new_unchecked(attributes.to_vec(), tuples)
    }

    /// Keeps the tuples for which `predicate` holds.
    pub fn selection(&self, predicate: &Predicate<Attribute>) -> Result<Relation> {
        let mut tuples = Vec::new();
        for tuple in &self.tuples {
            if predicate.evaluate(tuple)? {
                tuples.push(tuple.clone());
            }
        }
        Ok(Relation::new_unchecked(self.attributes.clone(), tuples))
    }

    /// Renames attributes (and the matching tuple keys) according to `bindings`.
    /// Attributes without a binding keep their name.
    pub fn rename(&self, bindings: &Bindings) -> Relation {
        let renamed: Vec<(String, Attribute)> = self
            .attributes
            .iter()
            .map(|attr| {
                let old = attr.qualified_name();
                let new = match bindings.get(&old) {
                    Some(name) => Attribute {
                        attribute: name.attribute.clone(),
                        qualifier: name.qualifier.clone(),
                        data_type: attr.data_type,
                    },
                    None => attr.clone(),
                };
                (old, new)
            })
            .collect();

        let tuples = self
            .tuples
            .iter()
            .map(|tuple| {
                renamed
                    .iter()
                    .filter_map(|(old, new)| {
                        tuple.get(old).map(|value| (new.qualified_name(), value.clone()))
                    })
                    .collect()
            })
            .collect();

        let attributes = renamed.into_iter().map(|(_, new)| new).collect();
        Relation::new_unchecked(attributes, tuples)
    }

    /// Identity of a tuple for the set operators: its values, stringified and
    /// concatenated in the order of `keys`. Values of different types with the
    /// same text compare equal.
    fn tuple_key(tuple: &Tuple, keys: &[String]) -> String {
        keys.iter()
            .filter_map(|key| tuple.get(key))
            .map(Value::to_string)
            .collect()
    }

    fn tuple_keys(&self) -> HashSet<String> {
        let keys = self.qualified_attributes();
        self.tuples
            .iter()
            .map(|tuple| Self::tuple_key(tuple, &keys))
            .collect()
    }

    /// Appends every tuple of `other` that this relation lacks, mapped
    /// positionally onto this relation's attribute names. Only this relation's
    /// tuples are checked, so repeats within `other` are all appended.
    pub fn union(&self, other: &Relation) -> Relation {
        let x_keys = self.qualified_attributes();
        let y_keys = other.qualified_attributes();
        let existing = self.tuple_keys();
        let mut tuples = self.tuples.clone();

        for tuple in &other.tuples {
            if !existing.contains(&Self::tuple_key(tuple, &y_keys)) {
                let mapped = x_keys
                    .iter()
                    .zip(&y_keys)
                    .filter_map(|(x, y)| tuple.get(y).map(|value| (x.clone(), value.clone())))
                    .collect();
                tuples.push(mapped);
            }
        }

        Relation::new_unchecked(self.attributes.clone(), tuples)
    }

    pub fn intersection(&self, other: &Relation) -> Relation {
        self.filter_by_membership(other, true)
    }

    pub fn difference(&self, other: &Relation) -> Relation {
        self.filter_by_membership(other, false)
    }

    fn filter_by_membership(&self, other: &Relation, keep_members: bool) -> Relation {
        let members = other.tuple_keys();
        let keys = self.qualified_attributes();
        let tuples = self
            .tuples
            .iter()
            .filter(|tuple| members.contains(&Self::tuple_key(tuple, &keys)) == keep_members)
            .cloned()
            .collect();
        Relation::new_unchecked(self.attributes.clone(), tuples)
    }

    /// Every pairing of a tuple of `self` with a tuple of `other`.
    pub fn cartesian_product(&self, other: &Relation) -> Relation {
        let tuples = self
            .tuples
            .iter()
            .cartesian_product(&other.tuples)
            .map(|(x, y)| {
                x.iter()
                    .chain(y.iter())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect();

        let attributes = self
            .attributes
            .iter()
            .chain(&other.attributes)
            .cloned()
            .collect();
        Relation::new_unchecked(attributes, tuples)
    }

    /// Joins on every attribute name (ignoring qualifiers) the two schemas
    /// share, keeping this relation's copy of the shared attributes. With no
    /// shared names this is the cartesian product.
    pub fn natural_join(&self, other: &Relation) -> Relation {
        // (key in self, keys in other) for every shared attribute name
        let bindings: Vec<(String, Vec<String>)> = self
            .attributes
            .iter()
            .filter_map(|x| {
                let matches: Vec<String> = other
                    .attributes
                    .iter()
                    .filter(|y| y.attribute == x.attribute)
                    .map(Attribute::qualified_name)
                    .collect();
                (!matches.is_empty()).then(|| (x.qualified_name(), matches))
            })
            .collect();

        let bound: HashSet<&String> = bindings.iter().flat_map(|(_, ys)| ys).collect();
        let unbound: Vec<&Attribute> = other
            .attributes
            .iter()
            .filter(|y| !bound.contains(&y.qualified_name()))
            .collect();

        let mut tuples = Vec::new();
        for x in &self.tuples {
            for y in &other.tuples {
                let joins = bindings
                    .iter()
                    .all(|(xk, yks)| yks.iter().all(|yk| y.get(yk) == x.get(xk)));
                if !joins {
                    continue;
                }
                let mut tuple = x.clone();
                for attr in &unbound {
                    let key = attr.qualified_name();
                    if let Some(value) = y.get(&key) {
                        tuple.insert(key, value.clone());
                    }
                }
                tuples.push(tuple);
            }
        }

        let attributes = self
            .attributes
            .iter()
            .cloned()
            .chain(unbound.into_iter().cloned())
            .collect();
        Relation::new_unchecked(attributes, tuples)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::predicate::{CompareOp, Operand};

    pub(crate) fn movies() -> Relation {
        Relation::from_rows(
            "movies",
            &[
                ("id", DataType::Number),
                ("title", DataType::String),
                ("year", DataType::Number),
            ],
            vec![
                vec![1.into(), "Drive".into(), 2007.into()],
                vec![2.into(), "Brooklyn".into(), 2015.into()],
                vec![3.into(), "Gladiator".into(), 2000.into()],
                vec![4.into(), "Armageddon".into(), 1998.into()],
                vec![5.into(), "Ratatoullie".into(), 2007.into()],
            ],
        )
        .unwrap()
    }

    pub(crate) fn favorites() -> Relation {
        Relation::from_rows(
            "favorites",
            &[("movie_id", DataType::Number), ("rating", DataType::Number)],
            vec![vec![1.into(), 7.into()], vec![4.into(), 5.into()]],
        )
        .unwrap()
    }

    fn attr(relation: &Relation, name: &str) -> Attribute {
        relation
            .attributes()
            .iter()
            .find(|a| a.attribute == name)
            .unwrap()
            .clone()
    }

    fn values(relation: &Relation) -> Vec<Vec<String>> {
        relation
            .rows()
            .into_iter()
            .map(|row| row.into_iter().map(Value::to_string).collect())
            .collect()
    }

    #[test]
    fn test_new_rejects_duplicate_attributes() {
        let attrs = vec![
            Attribute::new("t", "a", DataType::Number),
            Attribute::new("t", "a", DataType::String),
        ];
        assert!(matches!(Relation::new(attrs, vec![]), Err(Error::DataSet(_))));
    }

    #[test]
    fn test_new_rejects_bad_tuples() {
        let result = Relation::from_rows(
            "t",
            &[("a", DataType::Number)],
            vec![vec!["not a number".into()]],
        );
        assert!(matches!(result, Err(Error::DataSet(_))));

        let result = Relation::from_rows("t", &[("a", DataType::Number)], vec![vec![]]);
        assert!(matches!(result, Err(Error::DataSet(_))));
    }

    #[test]
    fn test_qualified_attributes() {
        let relation = movies();
        assert_eq!(
            relation.qualified_attributes(),
            vec!["movies.id", "movies.title", "movies.year"]
        );
        assert_eq!(relation.unqualified_attributes(), vec!["id", "title", "year"]);
    }

    #[test]
    fn test_projection_follows_requested_order() {
        let relation = movies();
        let projected =
            relation.projection(&[attr(&relation, "year"), attr(&relation, "title")]);

        assert_eq!(projected.qualified_attributes(), vec!["movies.year", "movies.title"]);
        assert_eq!(projected.len(), 5);
        assert_eq!(values(&projected)[0], vec!["2007", "Drive"]);
        assert_eq!(projected.tuples()[0].len(), 2);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let relation = movies();
        let predicate = Predicate::Compare {
            op: CompareOp::Eq,
            lhs: Operand::Attribute(attr(&relation, "year")),
            rhs: Operand::Literal(2007.into()),
        };

        let once = relation.selection(&predicate).unwrap();
        let twice = once.selection(&predicate).unwrap();

        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
        assert_eq!(once.attributes(), relation.attributes());
    }

    #[test]
    fn test_rename_rewrites_schema_and_tuples() {
        let relation = movies();
        let bindings: Bindings = [
            ("movies.id", QualifiedName::new("films", "identifier")),
            ("movies.title", QualifiedName::new("movies", "title")),
            ("movies.year", QualifiedName::new("films", "released")),
        ]
        .into_iter()
        .map(|(old, new)| (old.to_string(), new))
        .collect();

        let renamed = relation.rename(&bindings);

        assert_eq!(
            renamed.qualified_attributes(),
            vec!["films.identifier", "movies.title", "films.released"]
        );
        assert_eq!(values(&renamed), values(&relation));
        assert_eq!(renamed.attributes()[2].data_type, DataType::Number);
        // the receiver is untouched
        assert_eq!(relation, movies());
    }

    #[test]
    fn test_union_skips_existing_tuples() {
        let x = Relation::from_rows(
            "x",
            &[("a", DataType::Number), ("b", DataType::String)],
            vec![vec![1.into(), "one".into()], vec![2.into(), "two".into()]],
        )
        .unwrap();
        let y = Relation::from_rows(
            "y",
            &[("c", DataType::Number), ("d", DataType::String)],
            vec![vec![2.into(), "two".into()], vec![3.into(), "three".into()]],
        )
        .unwrap();

        let union = x.union(&y);
        assert_eq!(union.qualified_attributes(), vec!["x.a", "x.b"]);
        assert_eq!(
            values(&union),
            vec![vec!["1", "one"], vec!["2", "two"], vec!["3", "three"]]
        );
    }

    #[test]
    fn test_union_keeps_repeats_from_other() {
        let x = Relation::from_rows("x", &[("year", DataType::Number)], vec![vec![2015.into()]])
            .unwrap();
        let y = Relation::from_rows(
            "y",
            &[("year", DataType::Number)],
            vec![vec![2007.into()], vec![2015.into()], vec![2007.into()]],
        )
        .unwrap();

        assert_eq!(
            values(&x.union(&y)),
            vec![vec!["2015"], vec!["2007"], vec!["2007"]]
        );
    }

    #[test]
    fn test_intersection_and_difference() {
        let x = Relation::from_rows(
            "x",
            &[("a", DataType::Number)],
            vec![vec![1.into()], vec![2.into()], vec![3.into()]],
        )
        .unwrap();
        let y = Relation::from_rows(
            "y",
            &[("a", DataType::Number)],
            vec![vec![2.into()], vec![3.into()], vec![4.into()]],
        )
        .unwrap();

        assert_eq!(values(&x.intersection(&y)), vec![vec!["2"], vec!["3"]]);
        assert_eq!(values(&x.difference(&y)), vec![vec!["1"]]);
        assert_eq!(x.intersection(&y).qualified_attributes(), vec!["x.a"]);
    }

    #[test]
    fn test_set_identity_is_stringly() {
        let x = Relation::from_rows("x", &[("a", DataType::Number)], vec![vec![4.into()]])
            .unwrap();
        let y = Relation::from_rows("y", &[("a", DataType::String)], vec![vec!["4".into()]])
            .unwrap();

        assert_eq!(x.union(&y).len(), 1);
        assert_eq!(x.intersection(&y).len(), 1);
        assert!(x.difference(&y).is_empty());
    }

    #[test]
    fn test_cartesian_product() {
        let product = movies().cartesian_product(&favorites());
        assert_eq!(
            product.qualified_attributes(),
            vec![
                "movies.id",
                "movies.title",
                "movies.year",
                "favorites.movie_id",
                "favorites.rating"
            ]
        );
        assert_eq!(product.len(), 10);
        assert_eq!(values(&product)[1], vec!["1", "Drive", "2007", "4", "5"]);
    }

    #[test]
    fn test_natural_join_on_shared_names() {
        let films = Relation::from_rows(
            "films",
            &[("id", DataType::Number), ("rating", DataType::Number)],
            vec![vec![1.into(), 7.into()], vec![4.into(), 5.into()]],
        )
        .unwrap();

        let joined = movies().natural_join(&films);
        assert_eq!(
            joined.qualified_attributes(),
            vec!["movies.id", "movies.title", "movies.year", "films.rating"]
        );
        assert_eq!(
            values(&joined),
            vec![
                vec!["1", "Drive", "2007", "7"],
                vec!["4", "Armageddon", "1998", "5"]
            ]
        );
    }

    #[test]
    fn test_natural_join_without_shared_names_is_a_product() {
        let x = movies();
        let y = favorites();
        let joined = x.natural_join(&y);
        assert_eq!(joined.len(), x.len() * y.len());
        assert_eq!(joined, x.cartesian_product(&y));
    }

    #[test]
    fn test_self_join_is_identity() {
        let relation = movies();
        assert_eq!(relation.natural_join(&relation), relation);
    }
}
